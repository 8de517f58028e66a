use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, HexCoord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Character,
    City,
    Mine,
    Project,
    Task,
    Villain,
    World,
}

/// A board-presence marker owned by exactly one entity
pub type Token = HexCoord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    /// May be empty without the entity being destroyed
    pub tokens: Vec<Token>,
    pub alive: bool,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, name: &str) -> Self {
        Self { id, kind, name: name.to_string(), tokens: Vec::new(), alive: true }
    }

    pub fn with_token(mut self, at: HexCoord) -> Self {
        self.tokens.push(at);
        self
    }

    pub fn is_character(&self) -> bool {
        self.kind == EntityKind::Character
    }

    pub fn has_token_at(&self, hex: &HexCoord) -> bool {
        self.tokens.contains(hex)
    }

    /// Any token within `radius` of `hex`
    pub fn covers(&self, hex: &HexCoord, radius: u32) -> bool {
        self.tokens.iter().any(|t| t.distance(hex) <= radius)
    }
}
