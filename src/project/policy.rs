//! Stage XP policies
//!
//! Each stage kind earns XP from a different kind of event. The tracker only
//! accumulates; the policy decides what an event is worth.

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, HexCoord};
use crate::project::stage::{Stage, StageKind};

/// Something that happened which may be worth stage XP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageEvent {
    HexSearched { hex: HexCoord, by: EntityId },
    ResourceDelivered { resource: String, by: EntityId },
    ChallengeSucceeded { successes: u32, by: EntityId },
    TurnElapsed { by: EntityId },
}

impl StageEvent {
    pub fn actor(&self) -> EntityId {
        match self {
            StageEvent::HexSearched { by, .. }
            | StageEvent::ResourceDelivered { by, .. }
            | StageEvent::ChallengeSucceeded { by, .. }
            | StageEvent::TurnElapsed { by } => *by,
        }
    }
}

/// What an event is worth to a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XpAward {
    pub xp: i32,
    /// Candidate hex ruled out by a search
    pub explored: Option<HexCoord>,
}

pub trait XpPolicy: Send + Sync {
    fn award(&self, stage: &Stage, event: &StageEvent) -> XpAward;
}

/// XP each wanted resource is worth
pub const RESOURCE_XP: i32 = 5;
/// XP each challenge success is worth
pub const SUCCESS_XP: i32 = 5;

/// Standard per-kind rules
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultXpPolicy;

impl XpPolicy for DefaultXpPolicy {
    fn award(&self, stage: &Stage, event: &StageEvent) -> XpAward {
        match (&stage.kind, event) {
            (StageKind::Search { secret, candidates }, StageEvent::HexSearched { hex, .. }) => {
                if hex == secret {
                    XpAward { xp: stage.max_xp, explored: None }
                } else if candidates.contains(hex) && !stage.explored.contains(hex) {
                    XpAward { xp: 0, explored: Some(*hex) }
                } else {
                    XpAward::default()
                }
            }
            (StageKind::Gather { wanted }, StageEvent::ResourceDelivered { resource, .. }) => {
                if wanted.contains(resource) {
                    XpAward { xp: RESOURCE_XP, explored: None }
                } else {
                    XpAward::default()
                }
            }
            (StageKind::Challenge { .. }, StageEvent::ChallengeSucceeded { successes, .. }) => {
                XpAward { xp: SUCCESS_XP * *successes as i32, explored: None }
            }
            (StageKind::Time, StageEvent::TurnElapsed { by }) if stage.assignee == Some(*by) => {
                XpAward { xp: 1, explored: None }
            }
            _ => XpAward::default(),
        }
    }
}
