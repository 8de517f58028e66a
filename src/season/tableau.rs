//! The tableau - face-up action cards around each character
//!
//! Cards come from an external deck, sit on a hex a few steps from the
//! character, age each turn and are discarded when they run out of age or
//! the character drifts too far away.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::core::config::EngineConfig;
use crate::core::types::{CardId, HexCoord};
use crate::encounter::Encounter;

/// Source of card and camp encounters; content lives outside the engine
pub trait EncounterDeck: Send {
    /// Next card for `character`; `None` when the deck has nothing to offer
    fn draw(&mut self, character: &Character, rng: &mut dyn RngCore) -> Option<Encounter>;

    fn draw_camp(&mut self, character: &Character, rng: &mut dyn RngCore) -> Option<Encounter>;
}

/// Deals prepared encounters in order, cycling when exhausted
#[derive(Debug, Clone, Default)]
pub struct ListDeck {
    cards: Vec<Encounter>,
    camp: Vec<Encounter>,
    next_card: usize,
    next_camp: usize,
}

impl ListDeck {
    pub fn new(cards: Vec<Encounter>, camp: Vec<Encounter>) -> Self {
        Self { cards, camp, next_card: 0, next_camp: 0 }
    }
}

impl EncounterDeck for ListDeck {
    fn draw(&mut self, _character: &Character, _rng: &mut dyn RngCore) -> Option<Encounter> {
        let card = self.cards.get(self.next_card % self.cards.len().max(1))?.clone();
        self.next_card += 1;
        Some(card)
    }

    fn draw_camp(&mut self, _character: &Character, _rng: &mut dyn RngCore) -> Option<Encounter> {
        let card = self.camp.get(self.next_camp % self.camp.len().max(1))?.clone();
        self.next_camp += 1;
        Some(card)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableauCard {
    pub id: CardId,
    pub encounter: Encounter,
    pub hex: HexCoord,
    /// Turns left before the card is discarded
    pub age: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tableau {
    pub cards: Vec<TableauCard>,
}

impl Tableau {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn card(&self, id: CardId) -> Option<&TableauCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn take(&mut self, id: CardId) -> Option<TableauCard> {
        let pos = self.cards.iter().position(|c| c.id == id)?;
        Some(self.cards.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Age every card one turn and discard expired or far-away cards
    pub fn age(&mut self, location: &HexCoord, config: &EngineConfig) -> usize {
        let before = self.cards.len();
        for card in &mut self.cards {
            card.age = card.age.saturating_sub(1);
        }
        self.cards
            .retain(|c| c.age > 0 && c.hex.distance(location) <= config.tableau_max_drift);
        before - self.cards.len()
    }

    /// Hex for a new card around `center`
    pub fn placement<R: Rng + ?Sized>(center: &HexCoord, config: &EngineConfig, rng: &mut R) -> HexCoord {
        let distance = rng.gen_range(config.tableau_min_distance..=config.tableau_max_distance);
        let ring = center.ring(distance);
        ring[rng.gen_range(0..ring.len())]
    }
}
