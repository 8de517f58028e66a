//! Effects - the only unit of state mutation

use serde::{Deserialize, Serialize};

use crate::character::Stat;
use crate::core::types::{EntityId, HexCoord, HexDirection, StoryId};
use crate::encounter::Encounter;
use crate::entity::RumorDraft;
use crate::project::StageEvent;

/// Which entities an effect applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetSelector {
    Entity(EntityId),
    Entities(Vec<EntityId>),
    /// Every living character
    AllCharacters,
    /// Characters standing within `radius` hexes of `center`
    CharactersWithin { center: HexCoord, radius: u32 },
    /// Game-wide effects that name their subject in the kind (stories)
    World,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectKind {
    ModifyStat { stat: Stat, amount: i32 },
    ModifySkillXp { skill: String, amount: i32 },
    ChangeJob { job: String },
    /// Move `distance` hexes in a straight line; the direction is drawn from
    /// the resolution's random source when unspecified
    Transport { distance: u32, direction: Option<HexDirection> },
    Relocate { to: HexCoord },
    ModifyProjectXp { amount: i32 },
    StageProgress { event: StageEvent },
    CompleteStage { stage: usize },
    AssignStage { assignee: EntityId },
    StripTokens,
    PlaceToken { at: HexCoord },
    DestroyEntity,
    ExpireStory { story: StoryId },
    FlipMystery { story: StoryId },
    QueueEncounter { encounter: Box<Encounter> },
    /// Attach a confirmed rumor, introducing its new entity first
    ConfirmRumor { draft: Box<RumorDraft> },
    /// Needs a human or skill-check decision before anything happens
    Adjudicate {
        prompt: String,
        on_success: Vec<Effect>,
        on_failure: Vec<Effect>,
        fallback: Vec<Effect>,
    },
}

impl EffectKind {
    /// Short name used in logs and resolution records
    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::ModifyStat { .. } => "modify-stat",
            EffectKind::ModifySkillXp { .. } => "modify-skill-xp",
            EffectKind::ChangeJob { .. } => "change-job",
            EffectKind::Transport { .. } => "transport",
            EffectKind::Relocate { .. } => "relocate",
            EffectKind::ModifyProjectXp { .. } => "modify-project-xp",
            EffectKind::StageProgress { .. } => "stage-progress",
            EffectKind::CompleteStage { .. } => "complete-stage",
            EffectKind::AssignStage { .. } => "assign-stage",
            EffectKind::StripTokens => "strip-tokens",
            EffectKind::PlaceToken { .. } => "place-token",
            EffectKind::DestroyEntity => "destroy-entity",
            EffectKind::ExpireStory { .. } => "expire-story",
            EffectKind::FlipMystery { .. } => "flip-mystery",
            EffectKind::QueueEncounter { .. } => "queue-encounter",
            EffectKind::ConfirmRumor { .. } => "confirm-rumor",
            EffectKind::Adjudicate { .. } => "adjudicate",
        }
    }
}

/// An atomic state-transition descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub target: TargetSelector,
    pub kind: EffectKind,
    pub comment: Option<String>,
}

impl Effect {
    pub fn new(target: TargetSelector, kind: EffectKind) -> Self {
        Self { target, kind, comment: None }
    }

    pub fn on(entity: EntityId, kind: EffectKind) -> Self {
        Self::new(TargetSelector::Entity(entity), kind)
    }

    pub fn modify(entity: EntityId, stat: Stat, amount: i32) -> Self {
        Self::on(entity, EffectKind::ModifyStat { stat, amount })
    }

    pub fn skill_xp(entity: EntityId, skill: &str, amount: i32) -> Self {
        Self::on(entity, EffectKind::ModifySkillXp { skill: skill.to_string(), amount })
    }

    pub fn change_job(entity: EntityId, job: &str) -> Self {
        Self::on(entity, EffectKind::ChangeJob { job: job.to_string() })
    }

    pub fn transport(entity: EntityId, distance: u32) -> Self {
        Self::on(entity, EffectKind::Transport { distance, direction: None })
    }

    pub fn relocate(entity: EntityId, to: HexCoord) -> Self {
        Self::on(entity, EffectKind::Relocate { to })
    }

    pub fn project_xp(project: EntityId, amount: i32) -> Self {
        Self::on(project, EffectKind::ModifyProjectXp { amount })
    }

    pub fn stage_progress(project: EntityId, event: StageEvent) -> Self {
        Self::on(project, EffectKind::StageProgress { event })
    }

    pub fn complete_stage(project: EntityId, stage: usize) -> Self {
        Self::on(project, EffectKind::CompleteStage { stage })
    }

    pub fn expire_story(story: StoryId) -> Self {
        Self::new(TargetSelector::World, EffectKind::ExpireStory { story })
    }

    pub fn flip_mystery(story: StoryId) -> Self {
        Self::new(TargetSelector::World, EffectKind::FlipMystery { story })
    }

    pub fn queue_encounter(character: EntityId, encounter: Encounter) -> Self {
        Self::on(character, EffectKind::QueueEncounter { encounter: Box::new(encounter) })
    }

    pub fn confirm_rumor(draft: RumorDraft) -> Self {
        Self::new(TargetSelector::World, EffectKind::ConfirmRumor { draft: Box::new(draft) })
    }

    /// An effect that asks the adjudicator; `fallback` applies when no
    /// decision can be had at a non-interactive boundary
    pub fn adjudicate(
        target: TargetSelector,
        prompt: &str,
        on_success: Vec<Effect>,
        on_failure: Vec<Effect>,
        fallback: Vec<Effect>,
    ) -> Self {
        Self::new(
            target,
            EffectKind::Adjudicate { prompt: prompt.to_string(), on_success, on_failure, fallback },
        )
    }

    /// Fix the direction of a transport effect
    pub fn toward(mut self, direction: HexDirection) -> Self {
        if let EffectKind::Transport { direction: dir, .. } = &mut self.kind {
            *dir = Some(direction);
        }
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}
