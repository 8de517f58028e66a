//! The board: every entity, character, story and project of a game

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::character::Character;
use crate::core::error::{EngineError, Result};
use crate::core::types::{EntityId, HexCoord};
use crate::effect::record::{Field, FieldChange, FieldValue};
use crate::entity::{Entity, EntityKind, EntityStoryOverlay};
use crate::project::{Project, Stage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub overlay: EntityStoryOverlay,
    pub characters: BTreeMap<EntityId, Character>,
    pub projects: BTreeMap<EntityId, Project>,
    next_entity_id: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            overlay: EntityStoryOverlay::new(),
            characters: BTreeMap::new(),
            projects: BTreeMap::new(),
            next_entity_id: 1,
        }
    }

    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    pub fn add_character(&mut self, name: &str, job: &str, location: HexCoord) -> EntityId {
        let id = self.next_entity_id();
        self.overlay.insert_entity(Entity::new(id, EntityKind::Character, name));
        self.characters.insert(id, Character::new(id, name, job, location));
        tracing::info!("Added character {} ({}) at {}", name, id, location);
        id
    }

    pub fn add_entity(&mut self, kind: EntityKind, name: &str, tokens: &[HexCoord]) -> EntityId {
        let id = self.next_entity_id();
        let mut entity = Entity::new(id, kind, name);
        entity.tokens.extend_from_slice(tokens);
        self.overlay.insert_entity(entity);
        id
    }

    pub fn add_project(&mut self, name: &str, kind: &str, target: HexCoord, stages: Vec<Stage>) -> EntityId {
        let id = self.add_entity(EntityKind::Project, name, &[target]);
        self.projects.insert(id, Project::new(id, name, kind, target, stages));
        id
    }

    pub fn character(&self, id: EntityId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn character_mut(&mut self, id: EntityId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    pub fn require_character(&self, id: EntityId) -> Result<&Character> {
        self.characters.get(&id).ok_or(EngineError::EntityNotFound(id))
    }

    pub fn project(&self, id: EntityId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn project_mut(&mut self, id: EntityId) -> Option<&mut Project> {
        self.projects.get_mut(&id)
    }

    /// Living characters in id order
    pub fn living_characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values().filter(|c| self.overlay.is_alive(c.id))
    }

    pub fn name_of(&self, id: EntityId) -> Option<String> {
        self.overlay.entity(id).map(|e| e.name.clone())
    }

    /// Current value of a field, if the target has it
    pub fn read_field(&self, target: Option<EntityId>, field: &Field) -> Option<FieldValue> {
        let character = || target.and_then(|id| self.characters.get(&id));
        let entity = || target.and_then(|id| self.overlay.entity(id));
        let stage = |i: usize| target.and_then(|id| self.projects.get(&id)).and_then(|p| p.stages.get(i));

        Some(match field {
            Field::Stat(stat) => FieldValue::Int(character()?.get(*stat)),
            Field::SkillXp(skill) => FieldValue::Int(character()?.skill_xp(skill)),
            Field::Job => FieldValue::Text(character()?.job.clone()),
            Field::Location => FieldValue::Hex(character()?.location),
            Field::Tokens => FieldValue::Hexes(entity()?.tokens.clone()),
            Field::Alive => FieldValue::Flag(entity()?.alive),
            Field::Introduced => match entity() {
                Some(e) => FieldValue::Entity(Box::new(e.clone())),
                None => FieldValue::Absent,
            },
            Field::Story(story) => match self.overlay.story(*story) {
                Some(s) => FieldValue::Story(Box::new(s.clone())),
                None => FieldValue::Absent,
            },
            Field::StoryExpired(story) => FieldValue::Flag(self.overlay.story(*story)?.expired),
            Field::MysteryFlipped(story) => {
                FieldValue::Flag(self.overlay.story(*story)?.mystery.as_ref()?.flipped)
            }
            Field::StageXp(i) => FieldValue::Int(stage(*i)?.xp),
            Field::StageStatus(i) => FieldValue::Stage(stage(*i)?.status),
            Field::StageCompleted(i) => FieldValue::Flag(stage(*i)?.completion_fired),
            Field::StageAssignee(i) => FieldValue::Assignee(stage(*i)?.assignee),
            Field::StageExplored(i) => FieldValue::Hexes(stage(*i)?.explored.clone()),
            Field::ProjectStatus => {
                FieldValue::Project(target.and_then(|id| self.projects.get(&id))?.status)
            }
        })
    }

    /// Overwrite a field without any game rule applied
    pub fn write_field(&mut self, target: Option<EntityId>, field: &Field, value: &FieldValue) -> Result<()> {
        let mismatch = || EngineError::IllegalAction {
            reason: format!("cannot write {} to {}", value, field),
        };
        let id = target.ok_or_else(mismatch);

        match (field, value) {
            (Field::StoryExpired(story), FieldValue::Flag(b)) => {
                self.overlay.story_mut(*story).ok_or(EngineError::StoryNotFound(*story))?.expired = *b;
            }
            (Field::MysteryFlipped(story), FieldValue::Flag(b)) => {
                let s = self.overlay.story_mut(*story).ok_or(EngineError::StoryNotFound(*story))?;
                s.mystery.as_mut().ok_or_else(mismatch)?.flipped = *b;
            }
            (Field::Tokens, FieldValue::Hexes(hexes)) => {
                let id = id?;
                self.overlay.entity_mut(id).ok_or(EngineError::EntityNotFound(id))?.tokens = hexes.clone();
            }
            (Field::Introduced, FieldValue::Entity(entity)) => {
                self.overlay.insert_entity((**entity).clone());
            }
            (Field::Story(_), FieldValue::Story(story)) => {
                self.overlay.restore_story((**story).clone());
            }
            (Field::Alive, FieldValue::Flag(b)) => {
                let id = id?;
                self.overlay.entity_mut(id).ok_or(EngineError::EntityNotFound(id))?.alive = *b;
            }
            (Field::Stat(_) | Field::SkillXp(_) | Field::Job | Field::Location, _) => {
                let id = id?;
                let ch = self.characters.get_mut(&id).ok_or(EngineError::EntityNotFound(id))?;
                match (field, value) {
                    (Field::Stat(stat), FieldValue::Int(v)) => ch.set(*stat, *v),
                    (Field::SkillXp(skill), FieldValue::Int(v)) => {
                        ch.skill_xp.insert(skill.clone(), *v);
                    }
                    (Field::Job, FieldValue::Text(job)) => ch.job = job.clone(),
                    (Field::Location, FieldValue::Hex(hex)) => ch.location = *hex,
                    _ => return Err(mismatch()),
                }
            }
            (Field::ProjectStatus, FieldValue::Project(status)) => {
                let id = id?;
                self.projects.get_mut(&id).ok_or(EngineError::ProjectNotFound(id))?.status = *status;
            }
            (
                Field::StageXp(i)
                | Field::StageStatus(i)
                | Field::StageCompleted(i)
                | Field::StageAssignee(i)
                | Field::StageExplored(i),
                _,
            ) => {
                let id = id?;
                let project = self.projects.get_mut(&id).ok_or(EngineError::ProjectNotFound(id))?;
                let stage = project
                    .stages
                    .get_mut(*i)
                    .ok_or(EngineError::StageOutOfSequence { project: id, stage: *i })?;
                match (field, value) {
                    (Field::StageXp(_), FieldValue::Int(v)) => stage.xp = *v,
                    (Field::StageStatus(_), FieldValue::Stage(s)) => stage.status = *s,
                    (Field::StageCompleted(_), FieldValue::Flag(b)) => stage.completion_fired = *b,
                    (Field::StageAssignee(_), FieldValue::Assignee(a)) => stage.assignee = *a,
                    (Field::StageExplored(_), FieldValue::Hexes(h)) => stage.explored = h.clone(),
                    _ => return Err(mismatch()),
                }
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    /// Re-apply logged changes in order
    pub fn replay(&mut self, changes: &[FieldChange]) -> Result<()> {
        for change in changes {
            self.write_field(change.target, &change.field, &change.new)?;
        }
        Ok(())
    }
}
