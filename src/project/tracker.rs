//! Stage XP accumulation and sequencing
//!
//! Stages go `Future -> Active -> Finished` strictly in list order. XP is
//! clamped to the stage maximum and overflow is dropped; reaching the
//! maximum finishes the stage and activates the next one in the same step.

use crate::core::error::{EngineError, Result};
use crate::core::types::EntityId;
use crate::effect::record::{Field, FieldValue};
use crate::effect::Effect;
use crate::project::policy::{DefaultXpPolicy, StageEvent, XpPolicy};
use crate::project::stage::{Project, ProjectStatus, StageStatus};

/// Field changes made to a project plus the effects they produced
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrackerOutcome {
    pub changes: Vec<(Field, FieldValue, FieldValue)>,
    pub effects: Vec<Effect>,
}

impl TrackerOutcome {
    fn change(&mut self, field: Field, old: FieldValue, new: FieldValue) {
        if old != new {
            self.changes.push((field, old, new));
        }
    }

    fn merge(&mut self, other: TrackerOutcome) {
        self.changes.extend(other.changes);
        self.effects.extend(other.effects);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.effects.is_empty()
    }
}

pub struct ProjectStageTracker {
    policy: Box<dyn XpPolicy>,
}

impl Default for ProjectStageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectStageTracker {
    pub fn new() -> Self {
        Self { policy: Box::new(DefaultXpPolicy) }
    }

    pub fn with_policy(policy: Box<dyn XpPolicy>) -> Self {
        Self { policy }
    }

    /// Credit XP to the active stage
    ///
    /// Returns a stage-completion effect when the stage fills up. Crediting
    /// any stage other than the active one is an ordering violation.
    pub fn add_xp(&self, project: &mut Project, stage: usize, amount: i32) -> Result<TrackerOutcome> {
        let mut outcome = TrackerOutcome::default();
        if project.is_finished() {
            return Ok(outcome);
        }

        let pid = project.id;
        let current = project
            .stages
            .get(stage)
            .ok_or(EngineError::StageOutOfSequence { project: pid, stage })?;
        if current.status != StageStatus::Active {
            return Err(EngineError::StageOutOfSequence { project: pid, stage });
        }
        if current.max_xp <= 0 {
            return Err(EngineError::StageOverflow { project: pid, stage, max_xp: current.max_xp });
        }

        let old = current.xp;
        let new = old.saturating_add(amount).clamp(0, current.max_xp);
        if new - old < amount {
            tracing::debug!("{} stage {}: {} xp overflow dropped", pid, stage + 1, amount - (new - old));
        }
        project.stages[stage].xp = new;
        outcome.change(Field::StageXp(stage), FieldValue::Int(old), FieldValue::Int(new));

        if new == project.stages[stage].max_xp {
            outcome.merge(finish_stage(project, stage));
            outcome.effects.push(Effect::complete_stage(pid, stage));
        }
        Ok(outcome)
    }

    /// Apply a stage's completion
    ///
    /// Idempotent: a second call for the same stage changes nothing and
    /// produces no further effects.
    pub fn complete_stage(&self, project: &mut Project, stage: usize) -> Result<TrackerOutcome> {
        let mut outcome = TrackerOutcome::default();
        let pid = project.id;
        let current = project
            .stages
            .get(stage)
            .ok_or(EngineError::StageOutOfSequence { project: pid, stage })?;
        if current.completion_fired {
            tracing::debug!("{} stage {} already completed", pid, stage + 1);
            return Ok(outcome);
        }
        match current.status {
            StageStatus::Future => {
                return Err(EngineError::StageOutOfSequence { project: pid, stage });
            }
            StageStatus::Active => {
                // Forced completion fills the stage first
                let (old, max) = (current.xp, current.max_xp);
                project.stages[stage].xp = max;
                outcome.change(Field::StageXp(stage), FieldValue::Int(old), FieldValue::Int(max));
                outcome.merge(finish_stage(project, stage));
            }
            StageStatus::Finished => {}
        }

        project.stages[stage].completion_fired = true;
        outcome.change(Field::StageCompleted(stage), FieldValue::Flag(false), FieldValue::Flag(true));
        outcome.effects.extend(project.stages[stage].rewards.iter().cloned());
        Ok(outcome)
    }

    /// Route an event to the active stage through the XP policy
    pub fn record_event(&self, project: &mut Project, event: &StageEvent) -> Result<TrackerOutcome> {
        let mut outcome = TrackerOutcome::default();
        let Some(stage) = project.active_stage() else {
            return Ok(outcome);
        };

        let award = self.policy.award(&project.stages[stage], event);
        if let Some(hex) = award.explored {
            let old = project.stages[stage].explored.clone();
            project.stages[stage].explored.push(hex);
            outcome.change(
                Field::StageExplored(stage),
                FieldValue::Hexes(old),
                FieldValue::Hexes(project.stages[stage].explored.clone()),
            );
        }
        if award.xp != 0 {
            outcome.merge(self.add_xp(project, stage, award.xp)?);
        }
        Ok(outcome)
    }

    /// Assign a character to work a stage
    pub fn assign(&self, project: &mut Project, stage: usize, assignee: EntityId) -> Result<TrackerOutcome> {
        let mut outcome = TrackerOutcome::default();
        let pid = project.id;
        let current = project
            .stages
            .get_mut(stage)
            .ok_or(EngineError::StageOutOfSequence { project: pid, stage })?;
        if current.is_finished() {
            return Err(EngineError::IllegalAction {
                reason: format!("stage {} of {} is already finished", stage + 1, pid),
            });
        }
        let old = current.assignee.replace(assignee);
        outcome.change(
            Field::StageAssignee(stage),
            FieldValue::Assignee(old),
            FieldValue::Assignee(Some(assignee)),
        );
        Ok(outcome)
    }
}

/// Finish `stage` and activate the next future stage, or finish the project
fn finish_stage(project: &mut Project, stage: usize) -> TrackerOutcome {
    let mut outcome = TrackerOutcome::default();
    project.stages[stage].status = StageStatus::Finished;
    outcome.change(
        Field::StageStatus(stage),
        FieldValue::Stage(StageStatus::Active),
        FieldValue::Stage(StageStatus::Finished),
    );

    let next = project
        .stages
        .iter()
        .enumerate()
        .skip(stage + 1)
        .find(|(_, s)| s.status == StageStatus::Future)
        .map(|(i, _)| i);

    match next {
        Some(i) => {
            project.stages[i].status = StageStatus::Active;
            outcome.change(
                Field::StageStatus(i),
                FieldValue::Stage(StageStatus::Future),
                FieldValue::Stage(StageStatus::Active),
            );
        }
        None if project.stages.iter().all(|s| s.is_finished()) => {
            project.status = ProjectStatus::Finished;
            outcome.change(
                Field::ProjectStatus,
                FieldValue::Project(ProjectStatus::Active),
                FieldValue::Project(ProjectStatus::Finished),
            );
            tracing::info!("Project {} finished", project.name);
        }
        None => {}
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::HexCoord;
    use crate::effect::EffectKind;
    use crate::project::stage::{Stage, StageKind};
    use proptest::prelude::*;

    fn project(max_xp: i32) -> Project {
        Project::new(
            EntityId(9),
            "Ruined Tower",
            "restoration",
            HexCoord::new(1, 1),
            vec![
                Stage::new("Clear rubble", StageKind::Time, max_xp),
                Stage::new("Rebuild", StageKind::Time, max_xp),
            ],
        )
    }

    #[test]
    fn test_clamp_and_finish() {
        let tracker = ProjectStageTracker::new();
        let mut p = project(25);

        let first = tracker.add_xp(&mut p, 0, 20).unwrap();
        assert!(first.effects.is_empty());
        let second = tracker.add_xp(&mut p, 0, 10).unwrap();

        assert_eq!(p.stages[0].xp, 25);
        assert_eq!(p.stages[0].status, StageStatus::Finished);
        assert_eq!(p.stages[1].status, StageStatus::Active);
        assert_eq!(second.effects.len(), 1);
        assert_eq!(second.effects[0].kind, EffectKind::CompleteStage { stage: 0 });
    }

    #[test]
    fn test_out_of_sequence_is_fatal() {
        let tracker = ProjectStageTracker::new();
        let mut p = project(25);
        let err = tracker.add_xp(&mut p, 1, 5).unwrap_err();
        assert!(matches!(err, EngineError::StageOutOfSequence { stage: 1, .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_malformed_max_is_overflow() {
        let tracker = ProjectStageTracker::new();
        let mut p = project(0);
        assert!(matches!(tracker.add_xp(&mut p, 0, 5), Err(EngineError::StageOverflow { .. })));
    }

    #[test]
    fn test_completion_is_idempotent() {
        let tracker = ProjectStageTracker::new();
        let mut p = project(25);
        p.stages[0].rewards = vec![Effect::modify(EntityId(1), crate::character::Stat::Coins, 10)];
        tracker.add_xp(&mut p, 0, 25).unwrap();

        let first = tracker.complete_stage(&mut p, 0).unwrap();
        assert_eq!(first.effects.len(), 1);
        let again = tracker.complete_stage(&mut p, 0).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_last_stage_finishes_project() {
        let tracker = ProjectStageTracker::new();
        let mut p = project(10);
        tracker.add_xp(&mut p, 0, 10).unwrap();
        let outcome = tracker.add_xp(&mut p, 1, 10).unwrap();
        assert!(p.is_finished());
        assert!(outcome.changes.iter().any(|(f, _, _)| *f == Field::ProjectStatus));

        // Finished projects stop producing effects
        assert!(tracker.add_xp(&mut p, 1, 10).unwrap().is_empty());
    }

    #[test]
    fn test_time_stage_needs_assignee() {
        let tracker = ProjectStageTracker::new();
        let mut p = project(25);
        let worker = EntityId(1);
        let idle = tracker.record_event(&mut p, &StageEvent::TurnElapsed { by: worker }).unwrap();
        assert!(idle.is_empty());

        tracker.assign(&mut p, 0, worker).unwrap();
        tracker.record_event(&mut p, &StageEvent::TurnElapsed { by: worker }).unwrap();
        assert_eq!(p.stages[0].xp, 1);
    }

    proptest! {
        #[test]
        fn prop_xp_stays_in_bounds(max in 1i32..60, credits in prop::collection::vec(-20i32..40, 1..20)) {
            let tracker = ProjectStageTracker::new();
            let mut p = project(max);
            for amount in credits {
                let Some(stage) = p.active_stage() else { break };
                tracker.add_xp(&mut p, stage, amount).unwrap();
                for s in &p.stages {
                    prop_assert!(s.xp >= 0 && s.xp <= s.max_xp);
                    if s.xp == s.max_xp {
                        prop_assert_eq!(s.status, StageStatus::Finished);
                    }
                }
                prop_assert!(p.stages.iter().filter(|s| s.status == StageStatus::Active).count() <= 1);
            }
        }
    }
}
