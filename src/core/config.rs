//! Engine configuration with documented constants
//!
//! All tunable numbers of a campaign are collected here with notes on how
//! they interact. A config can be loaded from TOML; missing keys fall back
//! to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{EngineError, Result};
use crate::season::disposal::DisposalRule;

/// Configuration for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === SEASON ===
    /// Turns each character gets per season
    ///
    /// A season ends once every character has used all of them.
    pub turns_per_season: u32,

    // === TABLEAU ===
    /// Number of action cards kept face-up for each character
    pub tableau_size: usize,

    /// Turns a tableau card stays available before it is discarded
    pub tableau_card_age: u32,

    /// Minimum distance (hexes) from the character at which new cards are placed
    pub tableau_min_distance: u32,

    /// Maximum distance (hexes) from the character at which new cards are placed
    pub tableau_max_distance: u32,

    /// Cards further than this from the character are discarded at end of turn
    ///
    /// Should be >= tableau_max_distance, or fresh cards could be discarded
    /// on the turn they are drawn.
    pub tableau_max_drift: u32,

    // === INFLUENCE ===
    /// Minimum pool size for influence sampling
    ///
    /// When the summed weight W of the sources covering a hex is below this,
    /// the pool is padded with "nothing" so that nothing is drawn with
    /// probability (min_pool_size - W) / min_pool_size.
    pub min_pool_size: u32,

    // === PROJECTS ===
    /// XP ceiling of a stage when the stage does not declare its own
    pub default_stage_max_xp: i32,

    // === RESOLUTION ===
    /// Deepest interception nesting allowed inside one chain
    ///
    /// Exceeding it aborts the chain; this guards against rule variants that
    /// keep triggering each other.
    pub max_chain_depth: usize,

    /// Sides of the die rolled per skill check
    pub check_die_sides: i32,

    // === CHARACTER LIMITS ===
    pub max_health: i32,
    pub max_luck: i32,

    /// Master seed for the game's random source
    pub seed: u64,

    /// What happens to entries still queued when a season ends
    pub disposal: DisposalRule,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            turns_per_season: 20,

            tableau_size: 3,
            tableau_card_age: 3,
            tableau_min_distance: 1,
            tableau_max_distance: 3,
            tableau_max_drift: 5,

            min_pool_size: 8,

            default_stage_max_xp: 25,

            max_chain_depth: 32,
            check_die_sides: 8,

            max_health: 20,
            max_luck: 5,

            seed: 0,
            disposal: DisposalRule::ResolveAll,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.min_pool_size == 0 {
            return Err(EngineError::InvalidConfig("min_pool_size must be positive".into()));
        }

        if self.tableau_min_distance > self.tableau_max_distance {
            return Err(EngineError::InvalidConfig(format!(
                "tableau_min_distance ({}) should be <= tableau_max_distance ({})",
                self.tableau_min_distance, self.tableau_max_distance
            )));
        }

        if self.tableau_max_drift < self.tableau_max_distance {
            return Err(EngineError::InvalidConfig(format!(
                "tableau_max_drift ({}) should be >= tableau_max_distance ({})",
                self.tableau_max_drift, self.tableau_max_distance
            )));
        }

        if self.tableau_card_age == 0 {
            return Err(EngineError::InvalidConfig("tableau_card_age must be positive".into()));
        }

        if self.default_stage_max_xp <= 0 {
            return Err(EngineError::InvalidConfig(
                "default_stage_max_xp must be positive".into(),
            ));
        }

        if self.check_die_sides < 2 || self.max_chain_depth == 0 {
            return Err(EngineError::InvalidConfig(
                "check_die_sides must be >= 2 and max_chain_depth positive".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("turns_per_season = 12\nseed = 99\n").unwrap();
        assert_eq!(config.turns_per_season, 12);
        assert_eq!(config.seed, 99);
        assert_eq!(config.min_pool_size, 8);
        assert_eq!(config.default_stage_max_xp, 25);
    }

    #[test]
    fn test_disposal_from_toml() {
        let config = EngineConfig::from_toml_str("disposal = \"cancel_rumors\"\n").unwrap();
        assert_eq!(config.disposal, DisposalRule::CancelRumors);
    }

    #[test]
    fn test_invalid_distances_rejected() {
        let result = EngineConfig::from_toml_str(
            "tableau_min_distance = 4\ntableau_max_distance = 2\n",
        );
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_pool_rejected() {
        let config = EngineConfig { min_pool_size: 0, ..EngineConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = EngineConfig::from_toml_str("turns_per_season = \"many\"");
        assert!(matches!(result, Err(EngineError::TomlError(_))));
    }
}
