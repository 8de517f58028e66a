//! Seasons, turns and the tableau
//!
//! The state machine itself lives in `machine` as methods on `Game`.

pub mod action;
pub mod disposal;
pub mod machine;
pub mod state;
pub mod tableau;

pub use action::Action;
pub use disposal::{Disposal, DisposalRule, DisposalStrategy};
pub use state::{Phase, SeasonState, TurnStatus};
pub use tableau::{EncounterDeck, ListDeck, Tableau, TableauCard};
