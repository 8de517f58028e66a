//! Entities, their stories and range queries over them
//!
//! Pure state and lookups; no resolution logic lives here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{EngineError, Result};
use crate::core::types::{EntityId, HexCoord, StoryId};
use crate::entity::board::Entity;
use crate::entity::story::{
    EffectRange, Expiry, InfluenceRange, RangeKind, Story, StoryEffect, StoryOwner, Trait,
};

/// Decides whether expiring a story takes its owner with it
pub trait CascadePolicy: Send + Sync {
    fn destroys_owner(&self, owner: &Entity, expired: &Story, remaining: &[&Story]) -> bool;
}

/// Destroy the owner once its last identity-granting story expires
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCascade;

impl CascadePolicy for IdentityCascade {
    fn destroys_owner(&self, _owner: &Entity, expired: &Story, remaining: &[&Story]) -> bool {
        expired.grants_identity && !remaining.iter().any(|s| s.grants_identity)
    }
}

/// Never destroy owners
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCascade;

impl CascadePolicy for NoCascade {
    fn destroys_owner(&self, _owner: &Entity, _expired: &Story, _remaining: &[&Story]) -> bool {
        false
    }
}

/// An action a character may invoke right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableAction {
    pub story: StoryId,
    pub index: usize,
    pub name: String,
}

/// Read-only influence input for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct InfluenceSource {
    pub entity: EntityId,
    pub tokens: Vec<HexCoord>,
    pub ranges: Vec<InfluenceRange>,
    pub traits: Vec<Trait>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityStoryOverlay {
    entities: BTreeMap<EntityId, Entity>,
    stories: BTreeMap<StoryId, Story>,
    /// Hex to country name
    countries: Vec<(HexCoord, String)>,
    next_story_id: u32,
}

impl EntityStoryOverlay {
    pub fn new() -> Self {
        Self { next_story_id: 1, ..Default::default() }
    }

    // === Entities ===

    pub fn insert_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|e| e.alive)
    }

    // === Countries ===

    pub fn set_country(&mut self, hex: HexCoord, country: &str) {
        self.countries.retain(|(h, _)| *h != hex);
        self.countries.push((hex, country.to_string()));
    }

    pub fn country_of(&self, hex: &HexCoord) -> Option<&str> {
        self.countries.iter().find(|(h, _)| h == hex).map(|(_, c)| c.as_str())
    }

    // === Stories ===

    /// Attach a story; its id and owner are assigned here
    pub fn attach_story(&mut self, owner: StoryOwner, mut story: Story) -> Result<StoryId> {
        if let StoryOwner::Entity(id) = owner {
            if !self.is_alive(id) {
                return Err(EngineError::EntityNotFound(id));
            }
        }
        let id = StoryId(self.next_story_id.max(1));
        self.next_story_id = id.0 + 1;
        story.id = id;
        story.owner = owner;
        tracing::debug!("Attached {} '{}' to {:?}", id, story.title, owner);
        self.stories.insert(id, story);
        Ok(id)
    }

    /// Put back a story exactly as it was attached, keeping its id
    pub fn restore_story(&mut self, story: Story) {
        self.next_story_id = self.next_story_id.max(story.id.0 + 1);
        self.stories.insert(story.id, story);
    }

    pub fn story(&self, id: StoryId) -> Option<&Story> {
        self.stories.get(&id)
    }

    pub fn story_mut(&mut self, id: StoryId) -> Option<&mut Story> {
        self.stories.get_mut(&id)
    }

    pub fn stories(&self) -> impl Iterator<Item = &Story> {
        self.stories.values()
    }

    pub fn stories_of(&self, owner: StoryOwner) -> impl Iterator<Item = &Story> {
        self.stories.values().filter(move |s| s.owner == owner)
    }

    /// Unexpired, and the owner still exists
    pub fn is_live(&self, story: &Story) -> bool {
        !story.expired
            && match story.owner {
                StoryOwner::Entity(id) => self.is_alive(id),
                StoryOwner::World => true,
            }
    }

    pub fn live_stories(&self) -> impl Iterator<Item = &Story> {
        self.stories.values().filter(|s| self.is_live(s))
    }

    fn covers(&self, story: &Story, range: &EffectRange, anchor: &HexCoord) -> bool {
        let owner = match story.owner {
            StoryOwner::Entity(id) => self.entities.get(&id),
            StoryOwner::World => None,
        };
        match (range, owner) {
            (EffectRange::Global, _) => true,
            (EffectRange::Country, Some(owner)) => match self.country_of(anchor) {
                Some(country) => owner.tokens.iter().any(|t| self.country_of(t) == Some(country)),
                None => false,
            },
            (EffectRange::HexRadius(radius), Some(owner)) => owner.covers(anchor, *radius),
            (_, None) => false,
        }
    }

    /// Live story effects whose range covers `anchor`
    pub fn effects_in_range(&self, anchor: &HexCoord, kind: RangeKind) -> Vec<(StoryId, &StoryEffect)> {
        self.live_stories()
            .flat_map(|story| {
                story
                    .effects()
                    .filter(move |e| kind.accepts(&e.range) && self.covers(story, &e.range, anchor))
                    .map(move |e| (story.id, e))
            })
            .collect()
    }

    /// Actions from the character's own stories and from stories of
    /// entities with a token on the character's hex
    pub fn actions_available(&self, character: EntityId, location: &HexCoord) -> Vec<AvailableAction> {
        self.live_stories()
            .filter(|story| match story.owner {
                StoryOwner::Entity(id) if id == character => true,
                StoryOwner::Entity(id) => {
                    self.entities.get(&id).is_some_and(|e| e.has_token_at(location))
                }
                StoryOwner::World => false,
            })
            .flat_map(|story| {
                story.actions().enumerate().map(move |(index, a)| AvailableAction {
                    story: story.id,
                    index,
                    name: a.name.clone(),
                })
            })
            .collect()
    }

    /// Mark a story expired
    ///
    /// Returns the owner when `policy` says it goes with the story.
    pub fn expire_story(&mut self, id: StoryId, policy: &dyn CascadePolicy) -> Result<Option<EntityId>> {
        let story = self.stories.get_mut(&id).ok_or(EngineError::StoryNotFound(id))?;
        if story.expired {
            return Ok(None);
        }
        story.expired = true;
        let StoryOwner::Entity(owner_id) = story.owner else {
            return Ok(None);
        };

        let Some(owner) = self.entities.get(&owner_id).filter(|e| e.alive) else {
            return Ok(None);
        };
        let Some(expired) = self.stories.get(&id) else {
            return Ok(None);
        };
        let remaining: Vec<&Story> = self
            .stories_of(StoryOwner::Entity(owner_id))
            .filter(|s| !s.expired)
            .collect();
        Ok(policy.destroys_owner(owner, expired, &remaining).then_some(owner_id))
    }

    /// Stories that expire when the season ends, in id order
    pub fn expiring_at_season_end(&self) -> Vec<StoryId> {
        self.stories
            .values()
            .filter(|s| !s.expired && s.expiry == Expiry::EndOfSeason)
            .map(|s| s.id)
            .collect()
    }

    /// Effective stats: a fold over live stories, never cached
    pub fn entity_stats(&self, id: EntityId) -> BTreeMap<String, i32> {
        let mut stats = BTreeMap::new();
        if !self.is_alive(id) {
            return stats;
        }
        for story in self.stories_of(StoryOwner::Entity(id)).filter(|s| !s.expired) {
            for c in story.stats() {
                *stats.entry(c.stat.clone()).or_insert(0) += c.amount;
            }
        }
        stats
    }

    /// Influence sources of living entities, in id order
    pub fn influence_sources(&self) -> Vec<InfluenceSource> {
        let mut sources = Vec::new();
        for entity in self.entities.values().filter(|e| e.alive) {
            let live: Vec<&Story> = self
                .stories_of(StoryOwner::Entity(entity.id))
                .filter(|s| !s.expired)
                .collect();
            let ranges: Vec<InfluenceRange> = live.iter().flat_map(|s| s.influence().copied()).collect();
            if ranges.is_empty() {
                continue;
            }
            sources.push(InfluenceSource {
                entity: entity.id,
                tokens: entity.tokens.clone(),
                ranges,
                traits: live.iter().flat_map(|s| s.traits().cloned()).collect(),
            });
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::EncounterModifier;
    use crate::entity::board::EntityKind;
    use crate::entity::story::{StatContribution, StoryAction, StoryContent};

    fn city(id: u32, at: HexCoord) -> Entity {
        Entity::new(EntityId(id), EntityKind::City, "Vell").with_token(at)
    }

    fn toll_story(range: EffectRange) -> Story {
        Story::new(
            "Toll Road",
            StoryContent {
                effects: vec![StoryEffect {
                    description: "tolls".into(),
                    range,
                    modifier: EncounterModifier::Difficulty(1),
                }],
                actions: vec![StoryAction { name: "Pay toll".into(), effects: vec![] }],
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_hex_radius_range() {
        let mut overlay = EntityStoryOverlay::new();
        overlay.insert_entity(city(1, HexCoord::new(0, 0)));
        overlay.attach_story(StoryOwner::Entity(EntityId(1)), toll_story(EffectRange::HexRadius(2))).unwrap();

        assert_eq!(overlay.effects_in_range(&HexCoord::new(2, 0), RangeKind::Any).len(), 1);
        assert!(overlay.effects_in_range(&HexCoord::new(3, 0), RangeKind::Any).is_empty());
        assert!(overlay.effects_in_range(&HexCoord::new(1, 0), RangeKind::Global).is_empty());
    }

    #[test]
    fn test_country_range() {
        let mut overlay = EntityStoryOverlay::new();
        overlay.insert_entity(city(1, HexCoord::new(0, 0)));
        overlay.set_country(HexCoord::new(0, 0), "Ostria");
        overlay.set_country(HexCoord::new(9, 9), "Ostria");
        overlay.set_country(HexCoord::new(5, 5), "Marrow");
        overlay.attach_story(StoryOwner::Entity(EntityId(1)), toll_story(EffectRange::Country)).unwrap();

        assert_eq!(overlay.effects_in_range(&HexCoord::new(9, 9), RangeKind::Country).len(), 1);
        assert!(overlay.effects_in_range(&HexCoord::new(5, 5), RangeKind::Country).is_empty());
    }

    #[test]
    fn test_dead_owner_stories_are_not_live() {
        let mut overlay = EntityStoryOverlay::new();
        overlay.insert_entity(city(1, HexCoord::new(0, 0)));
        overlay.attach_story(StoryOwner::Entity(EntityId(1)), toll_story(EffectRange::Global)).unwrap();
        overlay.entity_mut(EntityId(1)).unwrap().alive = false;
        assert!(overlay.effects_in_range(&HexCoord::new(0, 0), RangeKind::Any).is_empty());
    }

    #[test]
    fn test_actions_available_on_token_hex() {
        let mut overlay = EntityStoryOverlay::new();
        overlay.insert_entity(city(1, HexCoord::new(2, 2)));
        overlay.attach_story(StoryOwner::Entity(EntityId(1)), toll_story(EffectRange::Global)).unwrap();

        let here = overlay.actions_available(EntityId(7), &HexCoord::new(2, 2));
        assert_eq!(here.len(), 1);
        assert_eq!(here[0].name, "Pay toll");
        assert!(overlay.actions_available(EntityId(7), &HexCoord::new(0, 0)).is_empty());
    }

    #[test]
    fn test_identity_cascade() {
        let mut overlay = EntityStoryOverlay::new();
        overlay.insert_entity(city(1, HexCoord::new(0, 0)));
        let founding = overlay
            .attach_story(StoryOwner::Entity(EntityId(1)), Story::new("Founding", StoryContent::default()).granting_identity())
            .unwrap();
        let fair = overlay
            .attach_story(StoryOwner::Entity(EntityId(1)), Story::new("Fair", StoryContent::default()))
            .unwrap();

        assert_eq!(overlay.expire_story(fair, &IdentityCascade).unwrap(), None);
        assert_eq!(overlay.expire_story(founding, &IdentityCascade).unwrap(), Some(EntityId(1)));
        // Already expired
        assert_eq!(overlay.expire_story(founding, &IdentityCascade).unwrap(), None);
    }

    #[test]
    fn test_no_cascade_policy() {
        let mut overlay = EntityStoryOverlay::new();
        overlay.insert_entity(city(1, HexCoord::new(0, 0)));
        let founding = overlay
            .attach_story(StoryOwner::Entity(EntityId(1)), Story::new("Founding", StoryContent::default()).granting_identity())
            .unwrap();
        assert_eq!(overlay.expire_story(founding, &NoCascade).unwrap(), None);
    }

    #[test]
    fn test_stats_fold_skips_expired() {
        let mut overlay = EntityStoryOverlay::new();
        overlay.insert_entity(city(1, HexCoord::new(0, 0)));
        let content = |n| StoryContent {
            stats: vec![StatContribution { stat: "defense".into(), amount: n }],
            ..Default::default()
        };
        overlay.attach_story(StoryOwner::Entity(EntityId(1)), Story::new("Walls", content(3))).unwrap();
        let militia = overlay
            .attach_story(StoryOwner::Entity(EntityId(1)), Story::new("Militia", content(2)))
            .unwrap();
        assert_eq!(overlay.entity_stats(EntityId(1))["defense"], 5);

        overlay.expire_story(militia, &NoCascade).unwrap();
        assert_eq!(overlay.entity_stats(EntityId(1))["defense"], 3);
    }

    #[test]
    fn test_attach_to_missing_entity_fails() {
        let mut overlay = EntityStoryOverlay::new();
        let result = overlay.attach_story(StoryOwner::Entity(EntityId(4)), Story::new("x", StoryContent::default()));
        assert!(matches!(result, Err(EngineError::EntityNotFound(_))));
    }
}
