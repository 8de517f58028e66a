//! A running game: board, season state, rules and external collaborators
//!
//! `GameState` is the part that is committed atomically. The resolution
//! log sits beside it and only grows when a commit succeeds.
//! `Ruleset` holds the code-supplied pieces (rule variants, XP policy,
//! cascade and disposal strategies) that are re-supplied on restore.

pub mod session;
pub mod snapshot;
pub mod transaction;
pub mod world;

pub use session::GameHandle;
pub use snapshot::{GameSnapshot, JsonFileStore, MemoryStore, SnapshotStore};
pub use transaction::{atomically, atomically_logged};
pub use world::World;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::{CardId, EncounterId, EntityId, GameId, HexCoord, ResolutionId};
use crate::effect::{ResolutionContext, ResolutionLog, ResolutionMode, RuleRegistry, RuleVariant};
use crate::entity::{CascadePolicy, IdentityCascade};
use crate::project::{ProjectStageTracker, Stage, XpPolicy};
use crate::season::disposal::DisposalStrategy;
use crate::season::state::SeasonState;
use crate::season::tableau::EncounterDeck;

/// Per-chain seeds derived from the master seed
///
/// Each draw uses its own ChaCha8 stream, so the n-th seed depends only on
/// the master seed and n.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSource {
    pub master: u64,
    pub draws: u64,
}

impl SeedSource {
    pub fn new(master: u64) -> Self {
        Self { master, draws: 0 }
    }

    pub fn next_seed(&mut self) -> u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(self.master);
        rng.set_stream(self.draws);
        self.draws += 1;
        rng.next_u64()
    }

    pub fn next_rng(&mut self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.next_seed())
    }
}

/// Id counters kept outside the world so replays compare equal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounters {
    /// Last effect id handed out
    pub effects: u64,
    pub encounters: u64,
    pub resolutions: u64,
    pub cards: u32,
}

impl IdCounters {
    pub fn next_encounter(&mut self) -> EncounterId {
        self.encounters += 1;
        EncounterId(self.encounters)
    }

    pub fn next_resolution(&mut self) -> ResolutionId {
        self.resolutions += 1;
        ResolutionId(self.resolutions)
    }

    pub fn next_card(&mut self) -> CardId {
        self.cards += 1;
        CardId(self.cards)
    }
}

/// Everything a game commits as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub world: World,
    pub season: SeasonState,
    pub seeds: SeedSource,
    pub ids: IdCounters,
}

impl GameState {
    pub fn new(seed: u64) -> Self {
        Self {
            world: World::new(),
            season: SeasonState::new(),
            seeds: SeedSource::new(seed),
            ids: IdCounters::default(),
        }
    }
}

/// Code-supplied rules of a game
pub struct Ruleset {
    pub config: EngineConfig,
    pub rules: RuleRegistry,
    pub tracker: ProjectStageTracker,
    pub cascade: Box<dyn CascadePolicy>,
    pub disposal: Box<dyn DisposalStrategy>,
}

impl Ruleset {
    pub fn new(config: EngineConfig) -> Self {
        let disposal = Box::new(config.disposal);
        Self {
            config,
            rules: RuleRegistry::new(),
            tracker: ProjectStageTracker::new(),
            cascade: Box::new(IdentityCascade),
            disposal,
        }
    }

    pub fn context(&self, mode: ResolutionMode) -> ResolutionContext<'_> {
        ResolutionContext {
            config: &self.config,
            rules: &self.rules,
            tracker: &self.tracker,
            cascade: &*self.cascade,
            mode,
        }
    }
}

pub struct Game {
    pub id: GameId,
    pub ruleset: Ruleset,
    pub state: GameState,
    pub log: ResolutionLog,
    pub deck: Box<dyn EncounterDeck>,
}

impl Game {
    /// Create a game in `SeasonStart` of season 1
    pub fn new(config: EngineConfig, deck: Box<dyn EncounterDeck>) -> Result<Self> {
        config.validate()?;
        let state = GameState::new(config.seed);
        let id = GameId::new();
        tracing::info!("Created game {} (seed {})", id, config.seed);
        Ok(Self { id, ruleset: Ruleset::new(config), state, log: ResolutionLog::new(), deck })
    }

    pub fn with_rule(mut self, variant: RuleVariant) -> Self {
        self.ruleset.rules.register(variant);
        self
    }

    pub fn with_rules(mut self, rules: RuleRegistry) -> Self {
        self.ruleset.rules = rules;
        self
    }

    pub fn with_xp_policy(mut self, policy: Box<dyn XpPolicy>) -> Self {
        self.ruleset.tracker = ProjectStageTracker::with_policy(policy);
        self
    }

    pub fn with_cascade(mut self, cascade: Box<dyn CascadePolicy>) -> Self {
        self.ruleset.cascade = cascade;
        self
    }

    pub fn with_disposal(mut self, disposal: Box<dyn DisposalStrategy>) -> Self {
        self.ruleset.disposal = disposal;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ruleset.config
    }

    pub fn world(&self) -> &World {
        &self.state.world
    }

    pub fn log(&self) -> &ResolutionLog {
        &self.log
    }

    pub fn add_character(&mut self, name: &str, job: &str, location: HexCoord) -> EntityId {
        let id = self.state.world.add_character(name, job, location);
        self.state.season.queue_mut(id);
        id
    }

    /// Place a project; stages without a ceiling get `default_stage_max_xp`
    pub fn add_project(&mut self, name: &str, kind: &str, target: HexCoord, mut stages: Vec<Stage>) -> EntityId {
        let default_max = self.ruleset.config.default_stage_max_xp;
        for stage in stages.iter_mut().filter(|s| s.max_xp <= 0) {
            stage.max_xp = default_max;
        }
        self.state.world.add_project(name, kind, target, stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_source_is_reproducible() {
        let mut a = SeedSource::new(42);
        let mut b = SeedSource::new(42);
        let first: Vec<u64> = (0..4).map(|_| a.next_seed()).collect();
        let second: Vec<u64> = (0..4).map(|_| b.next_seed()).collect();
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);
        assert_ne!(SeedSource::new(7).next_seed(), first[0]);
    }

    #[test]
    fn test_add_project_fills_default_ceiling() {
        use crate::project::StageKind;
        use crate::season::ListDeck;

        let config = EngineConfig { default_stage_max_xp: 40, ..EngineConfig::default() };
        let mut game = Game::new(config, Box::new(ListDeck::default())).unwrap();
        let id = game.add_project(
            "Well",
            "dig",
            HexCoord::new(1, 1),
            vec![Stage::with_default_max("Dig", StageKind::Time), Stage::new("Line", StageKind::Time, 10)],
        );

        let project = game.world().project(id).unwrap();
        assert_eq!(project.stages[0].max_xp, 40);
        assert_eq!(project.stages[1].max_xp, 10);
    }

    #[test]
    fn test_id_counters_start_at_one() {
        let mut ids = IdCounters::default();
        assert_eq!(ids.next_resolution(), ResolutionId(1));
        assert_eq!(ids.next_card(), CardId(1));
        assert_eq!(ids.next_card(), CardId(2));
    }
}
