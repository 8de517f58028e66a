//! Per-game season state: phase, queues, tableaus and held rumors

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::EntityId;
use crate::encounter::{Encounter, EncounterQueue, QueueEntry};
use crate::season::tableau::Tableau;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    SeasonStart,
    Play,
    SeasonEnd,
    RumorPhase,
}

impl Phase {
    pub fn next(&self) -> Phase {
        match self {
            Phase::SeasonStart => Phase::Play,
            Phase::Play => Phase::SeasonEnd,
            Phase::SeasonEnd => Phase::RumorPhase,
            Phase::RumorPhase => Phase::SeasonStart,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::SeasonStart => "season start",
            Phase::Play => "play",
            Phase::SeasonEnd => "season end",
            Phase::RumorPhase => "rumor phase",
        }
    }
}

/// Where a character stands in the turn loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStatus {
    /// Queue must drain before anything else
    MustResolve,
    AwaitingAction,
    TurnComplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonState {
    pub season: u32,
    pub phase: Phase,
    pub queues: BTreeMap<EntityId, EncounterQueue>,
    pub tableaus: BTreeMap<EntityId, Tableau>,
    /// Rumor encounters waiting for publication, per character
    pub rumor_hold: Vec<(EntityId, Encounter)>,
    /// Entries set aside at season end for next season's play phase
    pub carried_over: Vec<(EntityId, QueueEntry)>,
}

impl Default for SeasonState {
    fn default() -> Self {
        Self::new()
    }
}

impl SeasonState {
    pub fn new() -> Self {
        Self {
            season: 1,
            phase: Phase::SeasonStart,
            queues: BTreeMap::new(),
            tableaus: BTreeMap::new(),
            rumor_hold: Vec::new(),
            carried_over: Vec::new(),
        }
    }

    pub fn queue(&self, character: EntityId) -> Option<&EncounterQueue> {
        self.queues.get(&character)
    }

    /// The character's queue, created on first use
    pub fn queue_mut(&mut self, character: EntityId) -> &mut EncounterQueue {
        self.queues
            .entry(character)
            .or_insert_with(|| EncounterQueue::new(character))
    }

    pub fn tableau_mut(&mut self, character: EntityId) -> &mut Tableau {
        self.tableaus.entry(character).or_default()
    }

    pub fn queue_is_empty(&self, character: EntityId) -> bool {
        self.queues.get(&character).map_or(true, |q| q.is_empty())
    }

    pub fn all_queues_empty(&self) -> bool {
        self.queues.values().all(|q| q.is_empty())
    }

    pub fn pending_entries(&self) -> usize {
        self.queues.values().map(|q| q.len()).sum()
    }
}
