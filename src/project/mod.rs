//! Projects, stages and XP tracking

pub mod policy;
pub mod stage;
pub mod tracker;

pub use policy::{DefaultXpPolicy, StageEvent, XpAward, XpPolicy};
pub use stage::{Project, ProjectStatus, Stage, StageKind, StageStatus};
pub use tracker::{ProjectStageTracker, TrackerOutcome};
