//! Stories - time-bounded overlays providing effects, actions and mysteries

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, StoryId};
use crate::effect::Effect;
use crate::encounter::EncounterModifier;

/// Who a story is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoryOwner {
    Entity(EntityId),
    /// Loose stories and rumors
    World,
}

/// Area a story effect covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectRange {
    Global,
    /// Every hex of a country holding one of the owner's tokens
    Country,
    /// Hexes within the radius of any of the owner's tokens
    HexRadius(u32),
}

impl EffectRange {
    pub fn kind(&self) -> RangeKind {
        match self {
            EffectRange::Global => RangeKind::Global,
            EffectRange::Country => RangeKind::Country,
            EffectRange::HexRadius(_) => RangeKind::Hex,
        }
    }
}

/// Filter for range queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeKind {
    Global,
    Country,
    Hex,
    Any,
}

impl RangeKind {
    pub fn accepts(&self, range: &EffectRange) -> bool {
        *self == RangeKind::Any || *self == range.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryEffect {
    pub description: String,
    pub range: EffectRange,
    pub modifier: EncounterModifier,
}

/// A player-invocable action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryAction {
    pub name: String,
    pub effects: Vec<Effect>,
}

/// Drawn through influence; modifies the encounter it lands in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trait {
    pub name: String,
    pub modifiers: Vec<EncounterModifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluenceRange {
    pub radius: u32,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatContribution {
    pub stat: String,
    pub amount: i32,
}

/// Everything a story provides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryContent {
    pub effects: Vec<StoryEffect>,
    pub actions: Vec<StoryAction>,
    pub traits: Vec<Trait>,
    pub influence: Vec<InfluenceRange>,
    pub stats: Vec<StatContribution>,
}

/// Concealed content revealed by a successful skill check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mystery {
    pub skill: String,
    pub difficulty: i32,
    pub revealed: StoryContent,
    pub flipped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Expiry {
    EndOfSeason,
    #[default]
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    pub owner: StoryOwner,
    pub content: StoryContent,
    pub mystery: Option<Mystery>,
    /// The owner exists because of this story
    pub grants_identity: bool,
    pub expiry: Expiry,
    pub expired: bool,
}

impl Story {
    /// Unattached story; the overlay assigns id and owner on attach
    pub fn new(title: &str, content: StoryContent) -> Self {
        Self {
            id: StoryId(0),
            title: title.to_string(),
            owner: StoryOwner::World,
            content,
            mystery: None,
            grants_identity: false,
            expiry: Expiry::Never,
            expired: false,
        }
    }

    pub fn with_mystery(mut self, skill: &str, difficulty: i32, revealed: StoryContent) -> Self {
        self.mystery = Some(Mystery { skill: skill.to_string(), difficulty, revealed, flipped: false });
        self
    }

    pub fn granting_identity(mut self) -> Self {
        self.grants_identity = true;
        self
    }

    pub fn expiring(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    fn revealed(&self) -> Option<&StoryContent> {
        self.mystery.as_ref().filter(|m| m.flipped).map(|m| &m.revealed)
    }

    fn parts(&self) -> impl Iterator<Item = &StoryContent> {
        std::iter::once(&self.content).chain(self.revealed())
    }

    /// Base content plus anything a flipped mystery revealed
    pub fn effects(&self) -> impl Iterator<Item = &StoryEffect> {
        self.parts().flat_map(|c| c.effects.iter())
    }

    pub fn actions(&self) -> impl Iterator<Item = &StoryAction> {
        self.parts().flat_map(|c| c.actions.iter())
    }

    pub fn traits(&self) -> impl Iterator<Item = &Trait> {
        self.parts().flat_map(|c| c.traits.iter())
    }

    pub fn influence(&self) -> impl Iterator<Item = &InfluenceRange> {
        self.parts().flat_map(|c| c.influence.iter())
    }

    pub fn stats(&self) -> impl Iterator<Item = &StatContribution> {
        self.parts().flat_map(|c| c.stats.iter())
    }

    pub fn has_hidden_mystery(&self) -> bool {
        self.mystery.as_ref().is_some_and(|m| !m.flipped)
    }
}
