//! Season flow integration tests
//!
//! Covers the turn and season boundaries end to end:
//! - season end settling queued encounters without a human
//! - turn-order rejections
//! - rumor-phase holding, publication and disposal

use picaro::character::Stat;
use picaro::core::config::EngineConfig;
use picaro::core::error::EngineError;
use picaro::core::types::{EncounterId, EntityId, HexCoord};
use picaro::effect::{Effect, NoAdjudicator, ResolutionMode, RootCause, TargetSelector};
use picaro::encounter::{CausalOrigin, DefaultOutcome, Encounter, EncounterSource, QueuePayload};
use picaro::game::Game;
use picaro::season::{Action, DisposalRule, ListDeck, Phase, TurnStatus};

fn deck() -> ListDeck {
    ListDeck::new(
        vec![Encounter::new(EncounterId(0), "Wolves", EntityId(0))],
        vec![Encounter::new(EncounterId(0), "Quiet Night", EntityId(0))],
    )
}

fn game_in_play(turns: u32) -> (Game, EntityId) {
    let mut config = EngineConfig::default().with_seed(42);
    config.turns_per_season = turns;
    let mut game = Game::new(config, Box::new(deck())).unwrap();
    let id = game.add_character("Ayla", "Scout", HexCoord::new(0, 0));
    game.start_season(&mut NoAdjudicator).unwrap();
    (game, id)
}

fn undecided(id: EntityId) -> Effect {
    Effect::adjudicate(
        TargetSelector::Entity(id),
        "Pay the toll?",
        vec![Effect::modify(id, Stat::Coins, 10)],
        vec![Effect::modify(id, Stat::Health, -1)],
        vec![Effect::modify(id, Stat::Coins, 1)],
    )
}

// ============================================================================
// Season end
// ============================================================================

#[test]
fn test_season_end_settles_undecided_encounters() {
    let (mut game, id) = game_in_play(3);
    for _ in 0..3 {
        game.state.season.queue_mut(id).enqueue(
            QueuePayload::Effects(vec![undecided(id)]),
            EncounterSource::Oracle,
            CausalOrigin::Root,
        );
    }
    assert_eq!(game.status(id).unwrap(), TurnStatus::MustResolve);
    let logged = game.log().len();

    game.end_season(&mut NoAdjudicator).unwrap();

    assert_eq!(game.phase(), Phase::RumorPhase);
    assert!(game.state.season.all_queues_empty());
    // Every fallback applied exactly once
    assert_eq!(game.world().character(id).unwrap().stats.coins, 3);
    assert_eq!(game.log().len(), logged + 3);

    game.start_season(&mut NoAdjudicator).unwrap();
    assert_eq!(game.phase(), Phase::Play);
    assert_eq!(game.season_number(), 2);
    assert_eq!(game.status(id).unwrap(), TurnStatus::AwaitingAction);
}

#[test]
fn test_interactive_resolution_refuses_without_decision() {
    let (mut game, id) = game_in_play(3);
    game.state.season.queue_mut(id).enqueue(
        QueuePayload::Effects(vec![undecided(id)]),
        EncounterSource::Oracle,
        CausalOrigin::Root,
    );
    let logged = game.log().len();
    let result = game.resolve_next(id, &mut NoAdjudicator, ResolutionMode::Interactive);
    assert!(matches!(result, Err(EngineError::AdjudicationUnavailable { .. })));
    assert_eq!(game.status(id).unwrap(), TurnStatus::MustResolve);
    assert_eq!(game.log().len(), logged);
}

#[test]
fn test_season_end_settles_undecided_challenges() {
    let (mut game, id) = game_in_play(3);
    let outcomes = [DefaultOutcome::Success, DefaultOutcome::Failure, DefaultOutcome::Neutral];
    for (n, outcome) in outcomes.into_iter().enumerate() {
        let challenge = Encounter::new(EncounterId(0), &format!("Rope Bridge {}", n + 1), id)
            .with_check("Athletics", 6)
            .with_effect(Effect::modify(id, Stat::Coins, 1))
            .with_rewards(vec![Effect::modify(id, Stat::Reputation, 2)])
            .with_penalties(vec![Effect::modify(id, Stat::Resources, 4)])
            .defaulting_to(outcome);
        game.state.season.queue_mut(id).enqueue(
            QueuePayload::Encounter(challenge),
            EncounterSource::Oracle,
            CausalOrigin::Root,
        );
    }
    let logged = game.log().len();

    game.end_season(&mut NoAdjudicator).unwrap();

    assert!(game.state.season.all_queues_empty());
    assert_eq!(game.log().len(), logged + 3);
    let ch = game.world().character(id).unwrap();
    assert_eq!(ch.stats.coins, 3);
    // Only the success default rewards, only the failure default penalizes
    assert_eq!(ch.stats.reputation, 2);
    assert_eq!(ch.stats.resources, 4);
    for record in &game.log().records[logged..] {
        assert!(matches!(record.root, RootCause::Encounter { .. }));
        assert!(record.notes.iter().any(|n| n.contains("default applied")));
    }
}

#[test]
fn test_full_season_uses_every_turn() {
    let (mut game, id) = game_in_play(2);
    for step in 0..2 {
        game.submit_action(id, Action::Travel { to: HexCoord::new(step + 1, 0) }).unwrap();
        game.resolve_pending(id, &mut NoAdjudicator, ResolutionMode::Interactive).unwrap();
        game.finish_turn(id).unwrap();
    }
    assert_eq!(game.world().character(id).unwrap().remaining_turns, 0);
    assert_eq!(game.status(id).unwrap(), TurnStatus::TurnComplete);

    game.end_season(&mut NoAdjudicator).unwrap();
    assert!(game.state.season.tableaus.is_empty());
    game.start_season(&mut NoAdjudicator).unwrap();
    assert_eq!(game.world().character(id).unwrap().remaining_turns, 2);
    assert_eq!(game.state.season.tableaus[&id].len(), 3);
}

// ============================================================================
// Turn order
// ============================================================================

#[test]
fn test_out_of_turn_while_queue_pending() {
    let (mut game, id) = game_in_play(3);
    game.submit_action(id, Action::Travel { to: HexCoord::new(1, 0) }).unwrap();
    let result = game.submit_action(id, Action::Camp);
    assert!(matches!(result, Err(EngineError::OutOfTurn { .. })));
}

#[test]
fn test_out_of_turn_after_acting() {
    let (mut game, id) = game_in_play(3);
    game.submit_action(id, Action::Travel { to: HexCoord::new(1, 0) }).unwrap();
    game.resolve_next(id, &mut NoAdjudicator, ResolutionMode::Interactive).unwrap();
    let result = game.submit_action(id, Action::Travel { to: HexCoord::new(2, 0) });
    assert!(matches!(result, Err(EngineError::OutOfTurn { .. })));
}

#[test]
fn test_out_of_turn_with_no_turns_left() {
    let (mut game, id) = game_in_play(1);
    game.submit_action(id, Action::Travel { to: HexCoord::new(1, 0) }).unwrap();
    game.resolve_next(id, &mut NoAdjudicator, ResolutionMode::Interactive).unwrap();
    game.finish_turn(id).unwrap();

    let result = game.submit_action(id, Action::Travel { to: HexCoord::new(2, 0) });
    assert!(matches!(result, Err(EngineError::OutOfTurn { .. })));
    assert!(matches!(game.finish_turn(id), Err(EngineError::OutOfTurn { .. })));
}

#[test]
fn test_rejected_action_changes_nothing() {
    let (mut game, id) = game_in_play(3);
    let before = game.state.clone();
    let result = game.submit_action(id, Action::ChangeJob { job: "Scout".into() });
    assert!(matches!(result, Err(EngineError::IllegalAction { .. })));
    assert_eq!(game.state, before);
}

// ============================================================================
// Rumor phase
// ============================================================================

#[test]
fn test_rumor_published_then_resolved_in_rumor_phase() {
    let (mut game, id) = game_in_play(3);
    game.queue_rumor(
        id,
        Encounter::new(EncounterId(0), "Strange Lights", id).with_effect(Effect::modify(id, Stat::Reputation, 2)),
    )
    .unwrap();
    assert!(game.state.season.queue_is_empty(id));

    game.end_season(&mut NoAdjudicator).unwrap();
    assert_eq!(game.status(id).unwrap(), TurnStatus::MustResolve);

    let record = game.resolve_next(id, &mut NoAdjudicator, ResolutionMode::Interactive).unwrap();
    assert!(matches!(record.root, RootCause::Encounter { ref name, .. } if name == "Strange Lights"));
    assert_eq!(record.source, Some(EncounterSource::RumorPhase));
    assert_eq!(game.world().character(id).unwrap().stats.reputation, 2);
}

#[test]
fn test_unresolved_rumors_resolve_at_season_start_by_default() {
    let (mut game, id) = game_in_play(3);
    game.end_season(&mut NoAdjudicator).unwrap();
    game.queue_rumor(
        id,
        Encounter::new(EncounterId(0), "Strange Lights", id).with_effect(Effect::modify(id, Stat::Coins, 2)),
    )
    .unwrap();

    game.start_season(&mut NoAdjudicator).unwrap();
    assert_eq!(game.world().character(id).unwrap().stats.coins, 2);
    assert_eq!(game.status(id).unwrap(), TurnStatus::AwaitingAction);
}

#[test]
fn test_cancelled_rumors_never_resolve() {
    let (game, id) = game_in_play(3);
    let mut game = game.with_disposal(Box::new(DisposalRule::CancelRumors));
    game.end_season(&mut NoAdjudicator).unwrap();
    game.queue_rumor(
        id,
        Encounter::new(EncounterId(0), "Strange Lights", id).with_effect(Effect::modify(id, Stat::Coins, 2)),
    )
    .unwrap();

    let logged = game.log().len();
    game.start_season(&mut NoAdjudicator).unwrap();
    assert_eq!(game.world().character(id).unwrap().stats.coins, 0);
    assert_eq!(game.log().len(), logged);
    assert!(game.state.season.queue_is_empty(id));
}
