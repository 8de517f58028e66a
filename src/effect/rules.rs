//! Rule variants - registered interceptors that react to applied changes
//!
//! A variant is a `(trigger, producer)` pair. After every direct mutation
//! the engine asks the registry which variants match the change and resolves
//! whatever they produce before moving on.

use crate::character::Stat;
use crate::core::types::EntityId;
use crate::effect::kind::Effect;
use crate::effect::record::{Field, FieldChange, FieldValue};
use crate::project::StageStatus;

/// Index of a variant in its registry
pub type VariantId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerPattern {
    JobLost,
    Relocated,
    StatDecreased(Stat),
    StatIncreased(Stat),
    StageFinished,
    EntityDestroyed,
    StoryExpired,
}

impl TriggerPattern {
    pub fn matches(&self, change: &FieldChange) -> bool {
        match (self, &change.field, &change.old, &change.new) {
            (TriggerPattern::JobLost, Field::Job, _, _) => true,
            (TriggerPattern::Relocated, Field::Location, _, _) => true,
            (TriggerPattern::StatDecreased(s), Field::Stat(f), FieldValue::Int(a), FieldValue::Int(b)) => {
                s == f && b < a
            }
            (TriggerPattern::StatIncreased(s), Field::Stat(f), FieldValue::Int(a), FieldValue::Int(b)) => {
                s == f && b > a
            }
            (TriggerPattern::StageFinished, Field::StageStatus(_), _, FieldValue::Stage(status)) => {
                *status == StageStatus::Finished
            }
            (TriggerPattern::EntityDestroyed, Field::Alive, _, FieldValue::Flag(alive)) => !alive,
            (TriggerPattern::StoryExpired, Field::StoryExpired(_), _, FieldValue::Flag(expired)) => *expired,
            _ => false,
        }
    }
}

/// What a producer sees
pub struct Interception<'a> {
    pub change: &'a FieldChange,
    pub effect: &'a Effect,
}

impl Interception<'_> {
    pub fn target(&self) -> Option<EntityId> {
        self.change.target
    }
}

pub type Producer = Box<dyn Fn(&Interception) -> Vec<Effect> + Send + Sync>;

pub struct RuleVariant {
    pub name: String,
    pub trigger: TriggerPattern,
    /// Only fire for changes to this entity
    pub only_for: Option<EntityId>,
    producer: Producer,
}

impl std::fmt::Debug for RuleVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleVariant")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("only_for", &self.only_for)
            .finish()
    }
}

impl RuleVariant {
    pub fn new(name: &str, trigger: TriggerPattern, producer: Producer) -> Self {
        Self { name: name.to_string(), trigger, only_for: None, producer }
    }

    pub fn only_for(mut self, entity: EntityId) -> Self {
        self.only_for = Some(entity);
        self
    }

    pub fn matches(&self, change: &FieldChange) -> bool {
        self.only_for.map_or(true, |id| change.target == Some(id)) && self.trigger.matches(change)
    }

    pub fn produce(&self, interception: &Interception) -> Vec<Effect> {
        (self.producer)(interception)
    }

    /// On losing a job, get carried `distance` hexes in a random direction
    pub fn relocate_on_job_loss(name: &str, distance: u32) -> Self {
        Self::new(
            name,
            TriggerPattern::JobLost,
            Box::new(move |i: &Interception| {
                i.target().map(|t| vec![Effect::transport(t, distance)]).unwrap_or_default()
            }),
        )
    }

    /// Every move of `character` carries on `extra` hexes the same way
    ///
    /// A move that is not a straight line carries on along the closest of
    /// the six directions.
    pub fn extend_relocation(name: &str, character: EntityId, extra: u32) -> Self {
        Self::new(
            name,
            TriggerPattern::Relocated,
            Box::new(move |i: &Interception| match (&i.change.old, &i.change.new) {
                (FieldValue::Hex(from), FieldValue::Hex(to)) => from
                    .direction_to(to)
                    .map(|dir| vec![Effect::transport(character, extra).toward(dir)])
                    .unwrap_or_default(),
                _ => Vec::new(),
            }),
        )
        .only_for(character)
    }
}

#[derive(Debug, Default)]
pub struct RuleRegistry {
    variants: Vec<RuleVariant>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, variant: RuleVariant) -> VariantId {
        tracing::debug!("Registered rule variant '{}'", variant.name);
        self.variants.push(variant);
        self.variants.len() - 1
    }

    pub fn get(&self, id: VariantId) -> Option<&RuleVariant> {
        self.variants.get(id)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Variants matching `change`, in registration order
    pub fn matching<'a>(&'a self, change: &'a FieldChange) -> impl Iterator<Item = (VariantId, &'a RuleVariant)> {
        self.variants.iter().enumerate().filter(move |(_, v)| v.matches(change))
    }
}
