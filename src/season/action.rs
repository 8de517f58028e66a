//! Play actions a character can submit on their turn

use serde::{Deserialize, Serialize};

use crate::character::Stat;
use crate::core::error::{EngineError, Result};
use crate::core::types::{CardId, EncounterId, EntityId, HexCoord, StoryId};
use crate::effect::{Effect, EffectKind};
use crate::encounter::{Encounter, QueuePayload};
use crate::game::GameState;
use crate::project::{StageEvent, StageKind};
use crate::season::tableau::EncounterDeck;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Move to a tableau card's hex and face its encounter
    TakeCard { card: CardId },
    Travel { to: HexCoord },
    /// Rest and draw a camp encounter
    Camp,
    ChangeJob { job: String },
    /// Spend the turn without doing anything
    Pass,
    StoryAction { story: StoryId, index: usize },
    FlipMystery { story: StoryId },
    SearchHex { project: EntityId },
    DeliverResource { project: EntityId, resource: String },
    AttemptChallenge { project: EntityId },
    TakeStage { project: EntityId },
}

fn illegal(reason: impl Into<String>) -> EngineError {
    EngineError::IllegalAction { reason: reason.into() }
}

fn effects(list: Vec<Effect>) -> Result<Option<QueuePayload>> {
    Ok(Some(QueuePayload::Effects(list)))
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::TakeCard { .. } => "take-card",
            Action::Travel { .. } => "travel",
            Action::Camp => "camp",
            Action::ChangeJob { .. } => "change-job",
            Action::Pass => "pass",
            Action::StoryAction { .. } => "story-action",
            Action::FlipMystery { .. } => "flip-mystery",
            Action::SearchHex { .. } => "search-hex",
            Action::DeliverResource { .. } => "deliver-resource",
            Action::AttemptChallenge { .. } => "attempt-challenge",
            Action::TakeStage { .. } => "take-stage",
        }
    }

    /// What the action puts in the character's queue
    ///
    /// `None` when the action has no consequence (passing, or camping with
    /// nothing drawn). Takes the card off the tableau for `TakeCard`.
    pub(crate) fn into_payload(
        self,
        character: EntityId,
        state: &mut GameState,
        deck: &mut dyn EncounterDeck,
    ) -> Result<Option<QueuePayload>> {
        let ch = state.world.require_character(character)?.clone();
        match self {
            Action::TakeCard { card } => {
                let taken = state
                    .season
                    .tableau_mut(character)
                    .take(card)
                    .ok_or(EngineError::CardNotFound(card))?;
                let mut encounter = taken.encounter.at(taken.hex);
                encounter.character = character;
                encounter.effects.insert(0, Effect::relocate(character, taken.hex));
                Ok(Some(QueuePayload::Encounter(encounter)))
            }
            Action::Travel { to } => {
                if to == ch.location {
                    return Err(illegal(format!("{} is already at {}", ch.name, to)));
                }
                effects(vec![Effect::relocate(character, to)])
            }
            Action::Camp => {
                let mut rng = state.seeds.next_rng();
                let Some(mut encounter) = deck.draw_camp(&ch, &mut rng) else {
                    tracing::debug!("{} camps without incident", ch.name);
                    return Ok(None);
                };
                encounter.id = state.ids.next_encounter();
                encounter.character = character;
                Ok(Some(QueuePayload::Encounter(encounter)))
            }
            Action::ChangeJob { job } => {
                if job == ch.job {
                    return Err(illegal(format!("{} already works as {}", ch.name, job)));
                }
                effects(vec![Effect::change_job(character, &job)])
            }
            Action::Pass => Ok(None),
            Action::StoryAction { story, index } => {
                let overlay = &state.world.overlay;
                if !overlay
                    .actions_available(character, &ch.location)
                    .iter()
                    .any(|a| a.story == story && a.index == index)
                {
                    return Err(illegal("that story action is not available here"));
                }
                let list = overlay
                    .story(story)
                    .and_then(|s| s.actions().nth(index))
                    .map(|a| a.effects.clone())
                    .ok_or(EngineError::StoryNotFound(story))?;
                effects(list)
            }
            Action::FlipMystery { story } => {
                let overlay = &state.world.overlay;
                let s = overlay.story(story).ok_or(EngineError::StoryNotFound(story))?;
                if !overlay.is_live(s) || !s.has_hidden_mystery() {
                    return Err(illegal(format!("'{}' hides nothing", s.title)));
                }
                effects(vec![Effect::flip_mystery(story)])
            }
            Action::SearchHex { project } => {
                state.world.project(project).ok_or(EngineError::ProjectNotFound(project))?;
                effects(vec![Effect::stage_progress(
                    project,
                    StageEvent::HexSearched { hex: ch.location, by: character },
                )])
            }
            Action::DeliverResource { project, resource } => {
                state.world.project(project).ok_or(EngineError::ProjectNotFound(project))?;
                if ch.stats.resources <= 0 {
                    return Err(illegal(format!("{} has nothing to deliver", ch.name)));
                }
                effects(vec![
                    Effect::modify(character, Stat::Resources, -1),
                    Effect::stage_progress(project, StageEvent::ResourceDelivered { resource, by: character }),
                ])
            }
            Action::AttemptChallenge { project } => {
                let p = state.world.project(project).ok_or(EngineError::ProjectNotFound(project))?;
                let stage = p
                    .active_stage()
                    .and_then(|i| p.stage(i))
                    .ok_or_else(|| illegal(format!("{} has no active stage", p.name)))?;
                let StageKind::Challenge { skill, difficulty } = &stage.kind else {
                    return Err(illegal(format!("{} is a {} stage", stage.name, stage.kind.name())));
                };
                let mut encounter =
                    Encounter::new(EncounterId(0), &format!("{}: {}", p.name, stage.name), character)
                        .with_check(skill, *difficulty)
                        .for_project(project)
                        .at(p.target);
                encounter.id = state.ids.next_encounter();
                Ok(Some(QueuePayload::Encounter(encounter)))
            }
            Action::TakeStage { project } => {
                state.world.project(project).ok_or(EngineError::ProjectNotFound(project))?;
                effects(vec![Effect::on(project, EffectKind::AssignStage { assignee: character })])
            }
        }
    }
}
