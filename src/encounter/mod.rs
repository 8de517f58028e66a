//! Encounters and the per-character queue that orders them

pub mod bundle;
pub mod queue;

pub use bundle::{CausalOrigin, Check, ChoiceType, DefaultOutcome, Encounter, EncounterModifier, EncounterSource};
pub use queue::{EncounterQueue, QueueEntry, QueuePayload};
