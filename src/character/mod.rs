//! Player characters
//!
//! A character is an entity with a position, a job and a sheet of clamped
//! numeric stats. Outside of turn bookkeeping, its fields change only through
//! resolved effects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::EngineConfig;
use crate::core::types::{EntityId, HexCoord};

/// Numeric stats an effect can add to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stat {
    Coins,
    Reputation,
    Health,
    Resources,
    Luck,
    Speed,
    Turns,
}

impl Stat {
    pub fn label(&self) -> &'static str {
        match self {
            Stat::Coins => "coins",
            Stat::Reputation => "reputation",
            Stat::Health => "health",
            Stat::Resources => "resources",
            Stat::Luck => "luck",
            Stat::Speed => "speed",
            Stat::Turns => "turns",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub coins: i32,
    pub reputation: i32,
    pub health: i32,
    pub resources: i32,
    pub luck: i32,
    pub speed: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: EntityId,
    pub name: String,
    pub player: String,
    pub job: String,
    pub location: HexCoord,
    pub stats: CharacterStats,
    pub skill_xp: BTreeMap<String, i32>,
    pub remaining_turns: u32,
    pub acted_this_turn: bool,
}

impl Character {
    pub fn new(id: EntityId, name: &str, job: &str, location: HexCoord) -> Self {
        Self {
            id,
            name: name.to_string(),
            player: String::new(),
            job: job.to_string(),
            location,
            stats: CharacterStats::default(),
            skill_xp: BTreeMap::new(),
            remaining_turns: 0,
            acted_this_turn: false,
        }
    }

    pub fn with_player(mut self, player: &str) -> Self {
        self.player = player.to_string();
        self
    }

    pub fn with_coins(mut self, coins: i32) -> Self {
        self.stats.coins = coins;
        self
    }

    pub fn with_stats(mut self, stats: CharacterStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Coins => self.stats.coins,
            Stat::Reputation => self.stats.reputation,
            Stat::Health => self.stats.health,
            Stat::Resources => self.stats.resources,
            Stat::Luck => self.stats.luck,
            Stat::Speed => self.stats.speed,
            Stat::Turns => self.remaining_turns as i32,
        }
    }

    /// Set a stat without clamping (replay path)
    pub fn set(&mut self, stat: Stat, value: i32) {
        match stat {
            Stat::Coins => self.stats.coins = value,
            Stat::Reputation => self.stats.reputation = value,
            Stat::Health => self.stats.health = value,
            Stat::Resources => self.stats.resources = value,
            Stat::Luck => self.stats.luck = value,
            Stat::Speed => self.stats.speed = value,
            Stat::Turns => self.remaining_turns = value.max(0) as u32,
        }
    }

    /// Value a stat would take after adding `delta`, clamped to its limits
    ///
    /// Every stat floors at zero. Health and luck are capped by config;
    /// speed may exceed its per-turn value within a turn.
    pub fn clamped(&self, stat: Stat, delta: i32, config: &EngineConfig) -> i32 {
        let raw = self.get(stat).saturating_add(delta).max(0);
        match stat {
            Stat::Health => raw.min(config.max_health),
            Stat::Luck => raw.min(config.max_luck),
            _ => raw,
        }
    }

    pub fn skill_xp(&self, skill: &str) -> i32 {
        self.skill_xp.get(skill).copied().unwrap_or(0)
    }

    /// Skill rank from accumulated XP
    ///
    /// 20 xp for rank 1, 30 xp for rank 5, 25 xp for all others.
    pub fn skill_rank(&self, skill: &str) -> i32 {
        match self.skill_xp(skill) {
            xp if xp < 20 => 0,
            xp if xp < 45 => 1,
            xp if xp < 70 => 2,
            xp if xp < 95 => 3,
            xp if xp < 125 => 4,
            _ => 5,
        }
    }

    /// Reset per-season turn bookkeeping
    ///
    /// Luck is refilled by the season-start chain, not here.
    pub fn start_season(&mut self, config: &EngineConfig) {
        self.remaining_turns = config.turns_per_season;
        self.acted_this_turn = false;
    }

    /// Luck needed to reach the configured maximum
    pub fn luck_shortfall(&self, config: &EngineConfig) -> i32 {
        (config.max_luck - self.stats.luck).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scout() -> Character {
        Character::new(EntityId(1), "Ayla", "Scout", HexCoord::new(0, 0))
    }

    #[test]
    fn test_skill_rank_thresholds() {
        let mut ch = scout();
        assert_eq!(ch.skill_rank("Stealth"), 0);

        ch.skill_xp.insert("Stealth".into(), 20);
        assert_eq!(ch.skill_rank("Stealth"), 1);

        ch.skill_xp.insert("Stealth".into(), 94);
        assert_eq!(ch.skill_rank("Stealth"), 3);

        ch.skill_xp.insert("Stealth".into(), 125);
        assert_eq!(ch.skill_rank("Stealth"), 5);
    }

    #[test]
    fn test_stats_floor_at_zero() {
        let ch = scout().with_coins(3);
        let config = EngineConfig::default();
        assert_eq!(ch.clamped(Stat::Coins, -10, &config), 0);
        assert_eq!(ch.clamped(Stat::Coins, 4, &config), 7);
    }

    #[test]
    fn test_health_and_luck_capped() {
        let mut ch = scout();
        let config = EngineConfig::default();
        ch.stats.health = 18;
        assert_eq!(ch.clamped(Stat::Health, 10, &config), config.max_health);
        assert_eq!(ch.clamped(Stat::Luck, 50, &config), config.max_luck);
        // Speed has no cap within a turn
        assert_eq!(ch.clamped(Stat::Speed, 50, &config), 50);
    }

    #[test]
    fn test_start_season_resets_turns_only() {
        let mut ch = scout();
        ch.acted_this_turn = true;
        ch.stats.luck = 2;
        let config = EngineConfig::default();
        ch.start_season(&config);
        assert_eq!(ch.remaining_turns, 20);
        assert_eq!(ch.stats.luck, 2);
        assert!(!ch.acted_this_turn);
        assert_eq!(ch.luck_shortfall(&config), 3);
    }
}
