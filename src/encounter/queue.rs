//! Per-character encounter queue
//!
//! Top-level entries are served FIFO. Anything enqueued while an entry is
//! in flight is buffered and spliced in front of the remaining entries when
//! that entry completes, so consequences resolve depth-first before the
//! next sibling.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::error::{EngineError, Result};
use crate::core::types::{EntityId, QueueEntryId};
use crate::effect::Effect;
use crate::encounter::{CausalOrigin, Encounter, EncounterSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueuePayload {
    Encounter(Encounter),
    /// Post-resolution effects waiting for their own chain
    Effects(Vec<Effect>),
}

impl QueuePayload {
    pub fn label(&self) -> String {
        match self {
            QueuePayload::Encounter(enc) => enc.name.clone(),
            QueuePayload::Effects(effects) => format!("{} effect(s)", effects.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    pub payload: QueuePayload,
    pub source: EncounterSource,
    pub origin: CausalOrigin,
    /// 0 for top-level entries, parent depth + 1 for nested ones
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterQueue {
    pub character: EntityId,
    entries: VecDeque<QueueEntry>,
    in_flight: Option<QueueEntry>,
    nested: Vec<QueueEntry>,
    next_id: u64,
}

impl EncounterQueue {
    pub fn new(character: EntityId) -> Self {
        Self {
            character,
            entries: VecDeque::new(),
            in_flight: None,
            nested: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> QueueEntryId {
        let id = QueueEntryId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add an entry. Never fails.
    pub fn enqueue(
        &mut self,
        payload: QueuePayload,
        source: EncounterSource,
        origin: CausalOrigin,
    ) -> QueueEntryId {
        let id = self.allocate_id();
        match &self.in_flight {
            Some(parent) => {
                let entry = QueueEntry { id, payload, source, origin, depth: parent.depth + 1 };
                tracing::debug!("{}: nested {} under {}", self.character, id, parent.id);
                self.nested.push(entry);
            }
            None => {
                let entry = QueueEntry { id, payload, source, origin, depth: 0 };
                tracing::debug!("{}: queued {}", self.character, id);
                self.entries.push_back(entry);
            }
        }
        id
    }

    /// Pop the next entry and mark it in flight
    pub fn drain_next(&mut self) -> Result<QueueEntry> {
        if let Some(current) = &self.in_flight {
            return Err(EngineError::QueueOrder {
                character: self.character,
                detail: format!("{} is still resolving", current.id),
            });
        }
        let entry = self
            .entries
            .pop_front()
            .ok_or(EngineError::EmptyQueue { character: self.character })?;
        self.in_flight = Some(entry.clone());
        Ok(entry)
    }

    /// Finish the in-flight entry; anything it raised goes to the front
    pub fn complete(&mut self, id: QueueEntryId) -> Result<()> {
        match &self.in_flight {
            Some(current) if current.id == id => {}
            other => {
                return Err(EngineError::QueueOrder {
                    character: self.character,
                    detail: format!(
                        "completed {} while {} is in flight",
                        id,
                        other.as_ref().map(|e| e.id.to_string()).unwrap_or_else(|| "nothing".into())
                    ),
                })
            }
        }
        self.in_flight = None;
        for entry in self.nested.drain(..).rev() {
            self.entries.push_front(entry);
        }
        Ok(())
    }

    /// Remove a queued entry that has not started resolving
    pub fn withdraw(&mut self, id: QueueEntryId) -> Result<QueueEntry> {
        if self.in_flight.as_ref().map(|e| e.id) == Some(id) {
            return Err(EngineError::WithdrawInFlight(id));
        }
        if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
            return self.entries.remove(pos).ok_or(EngineError::EntryNotFound(id));
        }
        if let Some(pos) = self.nested.iter().position(|e| e.id == id) {
            return Ok(self.nested.remove(pos));
        }
        Err(EngineError::EntryNotFound(id))
    }

    /// Take every waiting entry, in service order
    pub fn take_all(&mut self) -> Vec<QueueEntry> {
        self.entries.drain(..).collect()
    }

    pub fn push_back(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.in_flight.is_none() && self.nested.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.nested.len() + usize::from(self.in_flight.is_some())
    }

    pub fn in_flight(&self) -> Option<&QueueEntry> {
        self.in_flight.as_ref()
    }

    pub fn peek(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }
}
