//! Projects and their ordered stages

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, HexCoord};
use crate::effect::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Future,
    Active,
    Finished,
}

impl StageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Future => "pending",
            StageStatus::Active => "active",
            StageStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[default]
    Active,
    Finished,
}

/// How a stage earns XP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageKind {
    /// One of `candidates` hides the goal; finding `secret` completes the stage
    Search { secret: HexCoord, candidates: Vec<HexCoord> },
    Challenge { skill: String, difficulty: i32 },
    Gather { wanted: Vec<String> },
    Time,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Search { .. } => "search",
            StageKind::Challenge { .. } => "challenge",
            StageKind::Gather { .. } => "gather",
            StageKind::Time => "time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub kind: StageKind,
    pub status: StageStatus,
    pub xp: i32,
    /// 0 until placed; `Game::add_project` fills it from the config
    pub max_xp: i32,
    pub assignee: Option<EntityId>,
    /// Set once the completion effect has been applied
    pub completion_fired: bool,
    /// Searched candidate hexes
    pub explored: Vec<HexCoord>,
    /// Applied when the stage completes
    pub rewards: Vec<Effect>,
}

impl Stage {
    pub fn new(name: &str, kind: StageKind, max_xp: i32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            status: StageStatus::Future,
            xp: 0,
            max_xp,
            assignee: None,
            completion_fired: false,
            explored: Vec::new(),
            rewards: Vec::new(),
        }
    }

    /// A stage that takes the game's default XP ceiling when placed
    pub fn with_default_max(name: &str, kind: StageKind) -> Self {
        Self::new(name, kind, 0)
    }

    pub fn with_rewards(mut self, rewards: Vec<Effect>) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.status == StageStatus::Finished
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Same id as the project's entity on the board
    pub id: EntityId,
    pub name: String,
    pub kind: String,
    pub target: HexCoord,
    pub stages: Vec<Stage>,
    pub status: ProjectStatus,
}

impl Project {
    /// The first stage starts active, the rest wait in order
    pub fn new(id: EntityId, name: &str, kind: &str, target: HexCoord, stages: Vec<Stage>) -> Self {
        let mut stages = stages;
        for (i, stage) in stages.iter_mut().enumerate() {
            stage.status = if i == 0 { StageStatus::Active } else { StageStatus::Future };
        }
        let status = if stages.is_empty() { ProjectStatus::Finished } else { ProjectStatus::Active };
        Self {
            id,
            name: name.to_string(),
            kind: kind.to_string(),
            target,
            stages,
            status,
        }
    }

    pub fn active_stage(&self) -> Option<usize> {
        self.stages.iter().position(|s| s.status == StageStatus::Active)
    }

    pub fn is_finished(&self) -> bool {
        self.status == ProjectStatus::Finished
    }

    pub fn stage(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_activates_first_stage_only() {
        let project = Project::new(
            EntityId(5),
            "Lost Shrine",
            "exploration",
            HexCoord::new(3, 3),
            vec![
                Stage::new("Find", StageKind::Time, 25),
                Stage::new("Clear", StageKind::Time, 25),
            ],
        );
        assert_eq!(project.active_stage(), Some(0));
        assert_eq!(project.stages[1].status, StageStatus::Future);
        assert!(!project.is_finished());
    }

    #[test]
    fn test_empty_project_is_finished() {
        let project = Project::new(EntityId(5), "Nothing", "none", HexCoord::default(), vec![]);
        assert!(project.is_finished());
        assert_eq!(project.active_stage(), None);
    }
}
