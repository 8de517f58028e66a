//! Entities and the stories overlaid on them

pub mod board;
pub mod overlay;
pub mod rumor;
pub mod story;

pub use board::{Entity, EntityKind, Token};
pub use overlay::{
    AvailableAction, CascadePolicy, EntityStoryOverlay, IdentityCascade, InfluenceSource, NoCascade,
};
pub use rumor::{RumorDraft, RumorTarget, RumorTemplate};
pub use story::{
    EffectRange, Expiry, InfluenceRange, Mystery, RangeKind, StatContribution, Story, StoryAction,
    StoryContent, StoryEffect, StoryOwner, Trait,
};
