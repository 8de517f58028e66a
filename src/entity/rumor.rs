//! Rumor and GM draws
//!
//! A drawn template plus a target becomes a draft story. Nothing touches the
//! board until the draft is confirmed.

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{EntityId, HexCoord, StoryId};
use crate::entity::board::{Entity, EntityKind};
use crate::entity::overlay::EntityStoryOverlay;
use crate::entity::story::{Expiry, Story, StoryContent, StoryOwner};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RumorTemplate {
    pub title: String,
    pub content: StoryContent,
    /// `(skill, difficulty, revealed)` for rumors hiding a mystery
    pub mystery: Option<(String, i32, StoryContent)>,
    pub expiry: Expiry,
}

impl RumorTemplate {
    pub fn new(title: &str, content: StoryContent) -> Self {
        Self { title: title.to_string(), content, mystery: None, expiry: Expiry::EndOfSeason }
    }
}

/// Where a drawn rumor lands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RumorTarget {
    Entity(EntityId),
    /// A loose rumor attached to the world
    World,
    /// Introduce a new entity whose identity is the rumor
    NewEntity { id: EntityId, kind: EntityKind, name: String, at: HexCoord },
}

/// An instantiated rumor awaiting confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RumorDraft {
    pub story: Story,
    pub owner: StoryOwner,
    pub new_entity: Option<Entity>,
}

impl RumorTemplate {
    pub fn instantiate(&self, target: RumorTarget) -> RumorDraft {
        let mut story = Story::new(&self.title, self.content.clone()).expiring(self.expiry);
        if let Some((skill, difficulty, revealed)) = &self.mystery {
            story = story.with_mystery(skill, *difficulty, revealed.clone());
        }
        match target {
            RumorTarget::Entity(id) => RumorDraft { story, owner: StoryOwner::Entity(id), new_entity: None },
            RumorTarget::World => RumorDraft { story, owner: StoryOwner::World, new_entity: None },
            RumorTarget::NewEntity { id, kind, name, at } => RumorDraft {
                story: story.granting_identity(),
                owner: StoryOwner::Entity(id),
                new_entity: Some(Entity::new(id, kind, &name).with_token(at)),
            },
        }
    }
}

impl RumorDraft {
    /// Attach the draft, introducing its entity first if it has one
    pub fn confirm(self, overlay: &mut EntityStoryOverlay) -> Result<StoryId> {
        if let Some(entity) = self.new_entity {
            tracing::info!("Rumor introduces {} '{}'", entity.id, entity.name);
            overlay.insert_entity(entity);
        }
        overlay.attach_story(self.owner, self.story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entity_rumor_grants_identity() {
        let template = RumorTemplate::new("Bandit Camp", StoryContent::default());
        let draft = template.instantiate(RumorTarget::NewEntity {
            id: EntityId(40),
            kind: EntityKind::Villain,
            name: "Red Hand".into(),
            at: HexCoord::new(4, -2),
        });
        assert!(draft.story.grants_identity);
        assert_eq!(draft.story.expiry, Expiry::EndOfSeason);

        let mut overlay = EntityStoryOverlay::new();
        let story = draft.confirm(&mut overlay).unwrap();
        assert!(overlay.is_alive(EntityId(40)));
        assert_eq!(overlay.story(story).unwrap().owner, StoryOwner::Entity(EntityId(40)));
    }

    #[test]
    fn test_draft_is_not_attached_until_confirmed() {
        let mut template = RumorTemplate::new("Whispers", StoryContent::default());
        template.mystery = Some(("Lore".into(), 5, StoryContent::default()));
        let draft = template.instantiate(RumorTarget::World);
        assert!(draft.story.has_hidden_mystery());

        let mut overlay = EntityStoryOverlay::new();
        assert_eq!(overlay.stories().count(), 0);
        draft.confirm(&mut overlay).unwrap();
        assert_eq!(overlay.stories_of(StoryOwner::World).count(), 1);
    }
}
