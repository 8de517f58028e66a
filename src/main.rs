//! Picaro - demo driver
//!
//! Sets up a small campaign, plays a few seasons with two characters taking
//! their turns concurrently, prints the recap of every resolution chain and
//! optionally saves a snapshot.

use picaro::character::Stat;
use picaro::core::config::EngineConfig;
use picaro::core::error::Result;
use picaro::core::types::{EncounterId, EntityId, HexCoord};
use picaro::effect::{DiceAdjudicator, Effect, EffectKind, RuleVariant, TargetSelector};
use picaro::encounter::{DefaultOutcome, Encounter, EncounterModifier};
use picaro::entity::{
    EffectRange, EntityKind, InfluenceRange, Story, StoryContent, StoryEffect, StoryOwner, Trait,
};
use picaro::game::{Game, GameHandle, JsonFileStore, SnapshotStore};
use picaro::project::{Stage, StageKind};
use picaro::season::{Action, ListDeck};

use clap::Parser;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Play a short demo campaign
#[derive(Parser, Debug)]
#[command(name = "picaro")]
#[command(about = "Run a demo campaign through the turn and season engine")]
struct Args {
    /// Master seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to save the final snapshot in
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Seasons to play
    #[arg(long, default_value_t = 2)]
    seasons: u32,

    /// Turns per character per season
    #[arg(long, default_value_t = 3)]
    turns: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("picaro=info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.turns_per_season = args.turns;

    let rt = Runtime::new()?;
    let mut game = Game::new(config, Box::new(demo_deck()))?;
    let characters = setup(&mut game);
    let id = game.id;
    let handle = GameHandle::new(game);

    rt.block_on(async {
        for _ in 0..args.seasons {
            play_season(&handle, &characters).await?;
        }
        Ok::<(), picaro::core::error::EngineError>(())
    })?;

    let game = handle.game();
    let game = game.blocking_lock();
    println!("\n=== RESOLUTION LOG ({}) ===", id);
    for record in &game.log().records {
        if !record.summary.is_empty() {
            let who = record.subject.and_then(|s| game.world().name_of(s)).unwrap_or_else(|| "world".into());
            println!("{:>4} {:<8} {}", record.id.0, who, record.summary);
        }
    }
    for ch in game.world().living_characters() {
        println!(
            "{} the {}: {} coins, {} reputation, at {}",
            ch.name, ch.job, ch.stats.coins, ch.stats.reputation, ch.location
        );
    }

    if let Some(dir) = &args.snapshot {
        let mut store = JsonFileStore::new(dir)?;
        store.save(&game.snapshot())?;
        println!("Snapshot saved to {}", dir.display());
    }
    Ok(())
}

async fn play_season(handle: &GameHandle, characters: &[EntityId]) -> Result<()> {
    {
        let game = handle.game();
        let mut game = game.lock().await;
        let sides = game.config().check_die_sides;
        game.start_season(&mut DiceAdjudicator::new(sides))?;
    }

    let (turns, sides) = {
        let game = handle.game();
        let game = game.lock().await;
        (game.config().turns_per_season, game.config().check_die_sides)
    };
    for _ in 0..turns {
        let mut tasks = Vec::new();
        for &character in characters {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let action = {
                    let game = handle.game();
                    let game = game.lock().await;
                    choose_action(&game, character)
                };
                let (tx, mut rx) = mpsc::channel(1);
                // A closed channel ends the turn if the choice is rejected
                if tx.send(action).await.is_err() {
                    return;
                }
                drop(tx);
                let mut dice = DiceAdjudicator::new(sides);
                if let Err(e) = handle.run_turn(character, &mut rx, &mut dice).await {
                    tracing::warn!("{}: turn ended early: {}", character, e);
                }
            }));
        }
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!("Turn task failed: {}", e);
            }
        }
    }

    let game = handle.game();
    let mut game = game.lock().await;
    game.end_season(&mut DiceAdjudicator::new(sides))?;
    game.queue_rumor(
        characters[0],
        Encounter::new(EncounterId(0), "Whispers in the Market", characters[0])
            .with_effect(Effect::modify(characters[0], Stat::Reputation, 1)),
    )?;
    Ok(())
}

/// Take the nearest tableau card, or camp when there is none
fn choose_action(game: &Game, character: EntityId) -> Action {
    let Some(location) = game.world().character(character).map(|c| c.location) else {
        return Action::Camp;
    };
    game.state
        .season
        .tableaus
        .get(&character)
        .and_then(|t| t.cards.iter().min_by_key(|c| (c.hex.distance(&location), c.id)))
        .map(|card| Action::TakeCard { card: card.id })
        .unwrap_or(Action::Camp)
}

fn demo_deck() -> ListDeck {
    let nobody = EntityId(0);
    let wolves = Encounter::new(EncounterId(0), "Wolves", nobody)
        .with_check("Survival", 6)
        .with_penalties(vec![Effect::new(
            TargetSelector::AllCharacters,
            EffectKind::ModifyStat { stat: Stat::Health, amount: -1 },
        )])
        .defaulting_to(DefaultOutcome::Failure);
    let merchant = Encounter::new(EncounterId(0), "Travelling Merchant", nobody)
        .with_check("Haggle", 5)
        .defaulting_to(DefaultOutcome::Neutral);
    let camp = Encounter::new(EncounterId(0), "Quiet Night", nobody);
    ListDeck::new(vec![wolves, merchant], vec![camp])
}

/// Two characters, a project, a bandit camp with influence and the
/// Wandering Feet variants
fn setup(game: &mut Game) -> Vec<EntityId> {
    let ayla = game.add_character("Ayla", "Scout", HexCoord::new(0, 0));
    let bram = game.add_character("Bram", "Guard", HexCoord::new(4, -2));

    game.add_project(
        "Watchtower",
        "construction",
        HexCoord::new(1, 1),
        vec![
            Stage::with_default_max("Survey", StageKind::Search { secret: HexCoord::new(1, 1), candidates: vec![HexCoord::new(0, 1)] }),
            Stage::new("Raise", StageKind::Time, 3).with_rewards(vec![Effect::modify(ayla, Stat::Reputation, 2)]),
        ],
    );

    let world = &mut game.state.world;

    let camp = world.add_entity(EntityKind::Villain, "Red Hand", &[HexCoord::new(2, 0)]);
    let mut content = StoryContent::default();
    content.influence.push(InfluenceRange { radius: 3, weight: 2 });
    content.traits.push(Trait { name: "Cruel".into(), modifiers: vec![EncounterModifier::Difficulty(1)] });
    content.effects.push(StoryEffect {
        description: "The roads are watched".into(),
        range: EffectRange::HexRadius(2),
        modifier: EncounterModifier::Difficulty(1),
    });
    if let Err(e) = world.overlay.attach_story(StoryOwner::Entity(camp), Story::new("Bandit Camp", content).granting_identity()) {
        tracing::warn!("Bandit camp not placed: {}", e);
    }

    game.ruleset.rules.register(RuleVariant::relocate_on_job_loss("Restless", 5));
    game.ruleset.rules.register(RuleVariant::extend_relocation("Wandering Feet", ayla, 2));
    vec![ayla, bram]
}
