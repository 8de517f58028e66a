use thiserror::Error;

use crate::core::types::{CardId, EntityId, QueueEntryId, StoryId};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Not {character}'s turn to act: {reason}")]
    OutOfTurn { character: EntityId, reason: String },

    #[error("Encounter queue for {character} is empty")]
    EmptyQueue { character: EntityId },

    #[error("Queue ordering violated for {character}: {detail}")]
    QueueOrder { character: EntityId, detail: String },

    #[error("Entry {0} is already resolving and cannot be withdrawn")]
    WithdrawInFlight(QueueEntryId),

    #[error("Entry {0} is not queued")]
    EntryNotFound(QueueEntryId),

    #[error("Stage {stage} of project {project} has a malformed XP limit ({max_xp})")]
    StageOverflow { project: EntityId, stage: usize, max_xp: i32 },

    #[error("Stage {stage} of project {project} is out of sequence")]
    StageOutOfSequence { project: EntityId, stage: usize },

    #[error("No adjudicator available for: {request}")]
    AdjudicationUnavailable { request: String },

    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Story not found: {0}")]
    StoryNotFound(StoryId),

    #[error("Project not found: {0}")]
    ProjectNotFound(EntityId),

    #[error("Tableau card not found: {0}")]
    CardNotFound(CardId),

    #[error("Illegal action: {reason}")]
    IllegalAction { reason: String },

    #[error("Wrong phase: expected {expected}, currently {actual}")]
    WrongPhase { expected: String, actual: String },

    #[error("Resolution chain exceeded depth {depth}")]
    ChainTooDeep { depth: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl EngineError {
    /// Ordering and invariant violations. These abort the enclosing chain and
    /// the transaction discards every partial mutation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::EmptyQueue { .. }
                | EngineError::QueueOrder { .. }
                | EngineError::StageOverflow { .. }
                | EngineError::StageOutOfSequence { .. }
                | EngineError::ChainTooDeep { .. }
        )
    }

    /// The only text a player ever sees for a failure
    pub fn user_message(&self) -> String {
        match self {
            EngineError::OutOfTurn { .. } | EngineError::IllegalAction { .. } => self.to_string(),
            _ => "Resolution failed, no changes applied.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(EngineError::StageOutOfSequence { project: EntityId(1), stage: 2 }.is_fatal());
        assert!(EngineError::ChainTooDeep { depth: 32 }.is_fatal());
        assert!(!EngineError::OutOfTurn { character: EntityId(1), reason: "x".into() }.is_fatal());
        assert!(!EngineError::AdjudicationUnavailable { request: "x".into() }.is_fatal());
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = EngineError::QueueOrder { character: EntityId(4), detail: "double drain".into() };
        assert_eq!(err.user_message(), "Resolution failed, no changes applied.");

        let err = EngineError::OutOfTurn { character: EntityId(4), reason: "encounter pending".into() };
        assert!(err.user_message().contains("encounter pending"));
    }
}
