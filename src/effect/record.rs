//! Resolution records - the auditable log of resolved chains

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::character::Stat;
use crate::core::types::{EffectId, EncounterId, EntityId, HexCoord, ResolutionId, StoryId};
use crate::encounter::EncounterSource;
use crate::entity::{Entity, Story};
use crate::project::{ProjectStatus, StageStatus};

/// A piece of state an effect can change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Stat(Stat),
    SkillXp(String),
    Job,
    Location,
    Tokens,
    Alive,
    /// The entity itself, present or absent on the board
    Introduced,
    /// A story attached to its owner
    Story(StoryId),
    StoryExpired(StoryId),
    MysteryFlipped(StoryId),
    StageXp(usize),
    StageStatus(usize),
    StageCompleted(usize),
    StageAssignee(usize),
    StageExplored(usize),
    ProjectStatus,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Stat(stat) => write!(f, "{}", stat.label()),
            Field::SkillXp(skill) => write!(f, "xp:{}", skill),
            Field::Job => write!(f, "job"),
            Field::Location => write!(f, "location"),
            Field::Tokens => write!(f, "tokens"),
            Field::Alive => write!(f, "alive"),
            Field::Introduced => write!(f, "entity"),
            Field::Story(story) => write!(f, "{}", story),
            Field::StoryExpired(story) => write!(f, "{}:expired", story),
            Field::MysteryFlipped(story) => write!(f, "{}:mystery", story),
            Field::StageXp(stage) => write!(f, "stage{}:xp", stage + 1),
            Field::StageStatus(stage) => write!(f, "stage{}:status", stage + 1),
            Field::StageCompleted(stage) => write!(f, "stage{}:completed", stage + 1),
            Field::StageAssignee(stage) => write!(f, "stage{}:assignee", stage + 1),
            Field::StageExplored(stage) => write!(f, "stage{}:explored", stage + 1),
            Field::ProjectStatus => write!(f, "project:status"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Int(i32),
    Text(String),
    Hex(HexCoord),
    Hexes(Vec<HexCoord>),
    Flag(bool),
    Assignee(Option<EntityId>),
    Stage(StageStatus),
    Project(ProjectStatus),
    Absent,
    Entity(Box<Entity>),
    Story(Box<Story>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Hex(h) => write!(f, "{}", h),
            FieldValue::Hexes(hs) => write!(f, "{} hexes", hs.len()),
            FieldValue::Flag(b) => write!(f, "{}", b),
            FieldValue::Assignee(Some(id)) => write!(f, "{}", id),
            FieldValue::Assignee(None) => write!(f, "nobody"),
            FieldValue::Stage(s) => write!(f, "{:?}", s),
            FieldValue::Project(p) => write!(f, "{:?}", p),
            FieldValue::Absent => write!(f, "none"),
            FieldValue::Entity(e) => write!(f, "{}", e.name),
            FieldValue::Story(s) => write!(f, "{}", s.title),
        }
    }
}

/// One mutation: `(target, field, old, new, cause)`
///
/// `target` is `None` for world-level state such as loose stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub target: Option<EntityId>,
    pub field: Field,
    pub old: FieldValue,
    pub new: FieldValue,
    pub cause: EffectId,
}

/// Flat export row for the display/history collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRow {
    pub target: Option<EntityId>,
    pub field: String,
    pub old: String,
    pub new: String,
    pub cause: EffectId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectOutcome {
    Applied,
    /// Applied but nothing changed (clamped, idempotent repeat...)
    Unchanged,
    /// Selector matched nothing; recorded as a no-op
    NoTarget,
}

/// One effect inside a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEffect {
    pub id: EffectId,
    pub kind: String,
    pub origin: Option<EffectId>,
    pub depth: usize,
    /// Rule variant that produced this effect
    pub via: Option<String>,
    pub targets: Vec<EntityId>,
    pub outcome: EffectOutcome,
    pub comment: Option<String>,
}

/// What started a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RootCause {
    Encounter { id: EncounterId, name: String },
    Effects,
    SeasonBoundary,
    TurnEnd,
    /// A confirmed rumor or GM draw
    Rumor { title: String },
}

/// The full record of one resolution chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub id: ResolutionId,
    pub seed: u64,
    pub subject: Option<EntityId>,
    pub root: RootCause,
    pub source: Option<EncounterSource>,
    pub effects: Vec<ResolvedEffect>,
    pub changes: Vec<FieldChange>,
    pub notes: Vec<String>,
    pub summary: String,
}

impl ResolutionRecord {
    pub fn new(id: ResolutionId, seed: u64, subject: Option<EntityId>, root: RootCause) -> Self {
        Self {
            id,
            seed,
            subject,
            root,
            source: None,
            effects: Vec::new(),
            changes: Vec::new(),
            notes: Vec::new(),
            summary: String::new(),
        }
    }

    pub fn export_rows(&self) -> Vec<ChangeRow> {
        self.changes
            .iter()
            .map(|c| ChangeRow {
                target: c.target,
                field: c.field.to_string(),
                old: c.old.to_string(),
                new: c.new.to_string(),
                cause: c.cause,
            })
            .collect()
    }

    pub fn effect(&self, id: EffectId) -> Option<&ResolvedEffect> {
        self.effects.iter().find(|e| e.id == id)
    }

    /// Build the recap text from the changes
    ///
    /// Changes to the same field of the same target are merged into one
    /// fragment; later contributions produced by a rule variant are called
    /// out by name. Targets other than the subject are prefixed by name.
    pub fn build_summary(&mut self, name_of: impl Fn(EntityId) -> Option<String>) {
        let mut groups: Vec<(Option<EntityId>, Field, Vec<&FieldChange>)> = Vec::new();
        for change in &self.changes {
            match groups
                .iter_mut()
                .find(|(t, f, _)| *t == change.target && *f == change.field)
            {
                Some((_, _, members)) => members.push(change),
                None => groups.push((change.target, change.field.clone(), vec![change])),
            }
        }

        let fragments: Vec<String> = groups
            .iter()
            .filter_map(|(target, field, members)| {
                let text = self.describe(field, members)?;
                match target {
                    Some(id) if Some(*id) != self.subject => {
                        let name = name_of(*id).unwrap_or_else(|| id.to_string());
                        Some(format!("{}: {}", name, text))
                    }
                    _ => Some(text),
                }
            })
            .collect();

        self.summary = fragments.join("; ");
    }

    fn via_of(&self, change: &FieldChange) -> Option<&str> {
        self.effect(change.cause).and_then(|e| e.via.as_deref())
    }

    fn describe(&self, field: &Field, members: &[&FieldChange]) -> Option<String> {
        let first = members.first()?;
        let last = members.last()?;

        let text = match (field, &first.old, &last.new) {
            (Field::Job, _, FieldValue::Text(job)) => format!("switched to {}", job),
            (Field::Location, FieldValue::Hex(from), FieldValue::Hex(to)) => {
                let mut text = format!("moved {} hexes", from.distance(to));
                for change in members.iter().skip(1) {
                    if let (Some(name), FieldValue::Hex(a), FieldValue::Hex(b)) =
                        (self.via_of(change), &change.old, &change.new)
                    {
                        text.push_str(&format!(" (+{} due to {})", a.distance(b), name));
                    }
                }
                text
            }
            (Field::Stat(stat), FieldValue::Int(old), FieldValue::Int(new)) => {
                let mut text = format!("{:+} {}", new - old, stat.label());
                for change in members.iter().skip(1) {
                    if let (Some(name), FieldValue::Int(a), FieldValue::Int(b)) =
                        (self.via_of(change), &change.old, &change.new)
                    {
                        text.push_str(&format!(" ({:+} due to {})", b - a, name));
                    }
                }
                text
            }
            (Field::SkillXp(skill), FieldValue::Int(old), FieldValue::Int(new)) => {
                format!("{:+} {} xp", new - old, skill)
            }
            (Field::StageXp(stage), FieldValue::Int(old), FieldValue::Int(new)) => {
                format!("stage {} xp {} -> {}", stage + 1, old, new)
            }
            (Field::StageStatus(stage), _, FieldValue::Stage(status)) => {
                format!("stage {} {}", stage + 1, status.label())
            }
            (Field::StageCompleted(stage), _, _) => format!("stage {} completed", stage + 1),
            (Field::StageAssignee(stage), _, FieldValue::Assignee(Some(_))) => {
                format!("took stage {}", stage + 1)
            }
            (Field::StageExplored(_), _, _) => "searched the area".to_string(),
            (Field::ProjectStatus, _, FieldValue::Project(ProjectStatus::Finished)) => {
                "project finished".to_string()
            }
            (Field::Tokens, FieldValue::Hexes(old), FieldValue::Hexes(new)) => {
                if new.len() < old.len() {
                    "tokens removed".to_string()
                } else {
                    "token placed".to_string()
                }
            }
            (Field::Alive, _, FieldValue::Flag(false)) => "destroyed".to_string(),
            (Field::Introduced, _, FieldValue::Entity(e)) => format!("{} appears", e.name),
            (Field::Story(_), _, FieldValue::Story(s)) => format!("rumor '{}' takes hold", s.title),
            (Field::StoryExpired(_), _, FieldValue::Flag(true)) => "story expired".to_string(),
            (Field::MysteryFlipped(_), _, FieldValue::Flag(true)) => "mystery revealed".to_string(),
            _ => return None,
        };
        Some(text)
    }
}

/// Log of every committed chain of a game
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionLog {
    pub records: Vec<ResolutionRecord>,
}

impl ResolutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ResolutionRecord) {
        self.records.push(record);
    }

    pub fn last(&self) -> Option<&ResolutionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn for_subject(&self, entity: EntityId) -> impl Iterator<Item = &ResolutionRecord> {
        self.records.iter().filter(move |r| r.subject == Some(entity))
    }
}
