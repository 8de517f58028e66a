//! What happens to entries still queued when a season ends
//!
//! Every queue entry carries its source so the rule can tell last season's
//! leftovers from rumor-phase arrivals. The rule is pluggable; the config
//! picks one of the built-in rules.

use serde::{Deserialize, Serialize};

use crate::encounter::{EncounterSource, QueueEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposal {
    /// Resolve now with default outcomes
    Resolve,
    /// Drop without resolving
    Cancel,
    /// Keep it for the next season's play phase
    CarryOver,
}

pub trait DisposalStrategy: Send + Sync {
    fn dispose(&self, entry: &QueueEntry) -> Disposal;
}

/// Built-in disposal rules selectable from config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposalRule {
    #[default]
    ResolveAll,
    /// Resolve everything except rumor-phase entries, which are dropped
    CancelRumors,
    /// Resolve everything except rumor-phase entries, which wait a season
    CarryOverRumors,
}

impl DisposalStrategy for DisposalRule {
    fn dispose(&self, entry: &QueueEntry) -> Disposal {
        let rumor = entry.source == EncounterSource::RumorPhase;
        match (self, rumor) {
            (DisposalRule::CancelRumors, true) => Disposal::Cancel,
            (DisposalRule::CarryOverRumors, true) => Disposal::CarryOver,
            _ => Disposal::Resolve,
        }
    }
}
