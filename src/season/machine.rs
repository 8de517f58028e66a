//! Turn and season state machine
//!
//! `SeasonStart -> Play -> SeasonEnd -> RumorPhase -> SeasonStart`
//!
//! Every operation that changes state commits through `atomically_logged`,
//! so a failed chain leaves no trace in the state or the log. Season boundaries never wait for a human:
//! anything still queued is settled with the disposal strategy and resolved
//! non-interactively.

use crate::character::Character;
use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::character::Stat;
use crate::core::types::{EntityId, HexCoord, QueueEntryId, StoryId};
use crate::effect::{
    Adjudicator, ChainStart, Effect, EffectResolutionEngine, Field, NoAdjudicator, ResolutionContext,
    ResolutionMode, ResolutionRecord, RootCause,
};
use crate::encounter::{CausalOrigin, Encounter, EncounterSource, QueueEntry, QueuePayload};
use crate::entity::{AvailableAction, EntityKind, RumorDraft, RumorTarget, RumorTemplate, StoryOwner};
use crate::game::{atomically, atomically_logged, Game, GameState};
use crate::project::StageEvent;
use crate::season::action::Action;
use crate::season::disposal::{Disposal, DisposalStrategy};
use crate::season::state::{Phase, TurnStatus};
use crate::season::tableau::{EncounterDeck, Tableau, TableauCard};

fn require_phase(state: &GameState, allowed: &[Phase]) -> Result<()> {
    if allowed.contains(&state.season.phase) {
        return Ok(());
    }
    Err(EngineError::WrongPhase {
        expected: allowed.iter().map(|p| p.label()).collect::<Vec<_>>().join(" or "),
        actual: state.season.phase.label().to_string(),
    })
}

/// Resolve one payload as a chain, queue what it raised and stage the record
#[allow(clippy::too_many_arguments)]
fn run_chain(
    state: &mut GameState,
    records: &mut Vec<ResolutionRecord>,
    ctx: &ResolutionContext<'_>,
    adjudicator: &mut dyn Adjudicator,
    subject: Option<EntityId>,
    root: RootCause,
    payload: QueuePayload,
    source: EncounterSource,
) -> Result<ResolutionRecord> {
    let start = ChainStart {
        id: state.ids.next_resolution(),
        seed: state.seeds.next_seed(),
        subject,
        root,
    };
    let engine =
        EffectResolutionEngine::new(ctx, &mut state.world, adjudicator, &mut state.ids.effects, start);
    let outcome = match payload {
        QueuePayload::Encounter(encounter) => engine.resolve_encounter(encounter)?,
        QueuePayload::Effects(effects) => engine.resolve_effects(effects)?,
    };

    let mut record = outcome.record;
    record.source = Some(source);
    for raised in outcome.raised {
        let mut encounter = raised.encounter;
        encounter.id = state.ids.next_encounter();
        state.season.queue_mut(raised.character).enqueue(
            QueuePayload::Encounter(encounter),
            source,
            CausalOrigin::Effect(raised.cause),
        );
    }

    tracing::info!(
        "{} committed: {} effect(s), {} change(s)",
        record.id,
        record.effects.len(),
        record.changes.len()
    );
    records.push(record.clone());
    Ok(record)
}

/// Drain the character's next entry and resolve it
fn resolve_entry(
    state: &mut GameState,
    records: &mut Vec<ResolutionRecord>,
    ctx: &ResolutionContext<'_>,
    adjudicator: &mut dyn Adjudicator,
    character: EntityId,
) -> Result<ResolutionRecord> {
    let entry = state.season.queue_mut(character).drain_next()?;
    tracing::debug!("{}: resolving {} ({})", character, entry.id, entry.payload.label());
    let root = match &entry.payload {
        QueuePayload::Encounter(enc) => RootCause::Encounter { id: enc.id, name: enc.name.clone() },
        QueuePayload::Effects(_) => RootCause::Effects,
    };
    let record = run_chain(state, records, ctx, adjudicator, Some(character), root, entry.payload, entry.source)?;
    state.season.queue_mut(character).complete(entry.id)?;
    Ok(record)
}

/// Dispose of every queued entry and resolve the ones that must resolve
///
/// Returns the entries set aside for the next play phase. Leaves every
/// queue empty.
fn settle_queues(
    state: &mut GameState,
    records: &mut Vec<ResolutionRecord>,
    ctx: &ResolutionContext<'_>,
    disposal: &dyn DisposalStrategy,
    adjudicator: &mut dyn Adjudicator,
) -> Result<Vec<(EntityId, QueueEntry)>> {
    let mut kept = Vec::new();
    loop {
        let pending: Vec<EntityId> = state
            .season
            .queues
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(id, _)| *id)
            .collect();
        if pending.is_empty() {
            return Ok(kept);
        }

        for character in pending {
            let entries = state.season.queue_mut(character).take_all();
            for entry in entries {
                match disposal.dispose(&entry) {
                    Disposal::Resolve => state.season.queue_mut(character).push_back(entry),
                    Disposal::Cancel => {
                        tracing::info!("{}: cancelled {} ({})", character, entry.id, entry.payload.label())
                    }
                    Disposal::CarryOver => kept.push((character, entry)),
                }
            }
            while !state.season.queue_is_empty(character) {
                resolve_entry(state, records, ctx, &mut *adjudicator, character)?;
            }
        }
    }
}

/// Top the character's tableau up to the configured size
fn refill_tableau(
    state: &mut GameState,
    config: &EngineConfig,
    deck: &mut dyn EncounterDeck,
    character: EntityId,
) {
    let Some(ch) = state.world.character(character).cloned() else {
        return;
    };
    let missing = config.tableau_size.saturating_sub(state.season.tableau_mut(character).len());
    if missing == 0 {
        return;
    }
    let mut rng = state.seeds.next_rng();
    let mut fresh = Vec::with_capacity(missing);
    for _ in 0..missing {
        let Some(mut encounter) = deck.draw(&ch, &mut rng) else {
            break;
        };
        encounter.id = state.ids.next_encounter();
        encounter.character = character;
        let hex = Tableau::placement(&ch.location, config, &mut rng);
        fresh.push(TableauCard { id: state.ids.next_card(), encounter, hex, age: config.tableau_card_age });
    }
    tracing::debug!("{}: {} card(s) dealt", character, fresh.len());
    state.season.tableau_mut(character).cards.extend(fresh);
}

/// Move held rumor encounters into the live queues
fn publish_rumors(state: &mut GameState) -> usize {
    let held = std::mem::take(&mut state.season.rumor_hold);
    let count = held.len();
    for (character, encounter) in held {
        state.season.queue_mut(character).enqueue(
            QueuePayload::Encounter(encounter),
            EncounterSource::RumorPhase,
            CausalOrigin::Root,
        );
    }
    if count > 0 {
        tracing::info!("Published {} rumor encounter(s)", count);
    }
    count
}

impl Game {
    pub fn phase(&self) -> Phase {
        self.state.season.phase
    }

    pub fn season_number(&self) -> u32 {
        self.state.season.season
    }

    /// Where a character stands in the turn loop
    pub fn status(&self, character: EntityId) -> Result<TurnStatus> {
        let ch = self.state.world.require_character(character)?;
        if !self.state.season.queue_is_empty(character) {
            return Ok(TurnStatus::MustResolve);
        }
        if self.state.season.phase == Phase::Play && !ch.acted_this_turn && ch.remaining_turns > 0 {
            Ok(TurnStatus::AwaitingAction)
        } else {
            Ok(TurnStatus::TurnComplete)
        }
    }

    /// Enter the play phase
    ///
    /// 1. From the rumor phase, advance the season counter
    /// 2. Settle leftover queue entries without asking anyone
    /// 3. Reset every character's turns and deal a fresh tableau
    /// 4. Refill luck to the maximum as one audited chain
    /// 5. Put carried-over entries back in their queues
    pub fn start_season(&mut self, adjudicator: &mut dyn Adjudicator) -> Result<()> {
        require_phase(&self.state, &[Phase::SeasonStart, Phase::RumorPhase])?;
        let ctx = self.ruleset.context(ResolutionMode::NonInteractive);
        let config = &self.ruleset.config;
        let disposal = &*self.ruleset.disposal;
        let deck = &mut *self.deck;

        atomically_logged(&mut self.state, &mut self.log, |state, records| {
            if state.season.phase == Phase::RumorPhase {
                state.season.season += 1;
            }
            state.season.phase = Phase::SeasonStart;
            tracing::info!("Season {} starting", state.season.season);

            let kept = settle_queues(state, records, &ctx, disposal, &mut *adjudicator)?;
            state.season.carried_over.extend(kept);

            let characters: Vec<EntityId> = state.world.living_characters().map(|c| c.id).collect();
            let mut refills = Vec::new();
            for &id in &characters {
                if let Some(ch) = state.world.character_mut(id) {
                    ch.start_season(config);
                    let shortfall = ch.luck_shortfall(config);
                    if shortfall > 0 {
                        refills.push(Effect::modify(id, Stat::Luck, shortfall));
                    }
                }
                state.season.tableau_mut(id).cards.clear();
                refill_tableau(state, config, deck, id);
            }
            if !refills.is_empty() {
                run_chain(
                    state,
                    records,
                    &ctx,
                    &mut *adjudicator,
                    None,
                    RootCause::SeasonBoundary,
                    QueuePayload::Effects(refills),
                    EncounterSource::SeasonBoundary,
                )?;
            }

            for (character, entry) in std::mem::take(&mut state.season.carried_over) {
                tracing::debug!("{}: {} carried into season {}", character, entry.id, state.season.season);
                state.season.queue_mut(character).push_back(entry);
            }

            state.season.phase = Phase::Play;
            tracing::info!("Season {}: play phase", state.season.season);
            Ok(())
        })
    }

    /// Take an action for a character whose turn it is
    ///
    /// Rejected with `OutOfTurn` while anything is queued for the character,
    /// after it has acted this turn, or once its turns are used up.
    pub fn submit_action(&mut self, character: EntityId, action: Action) -> Result<Option<QueueEntryId>> {
        require_phase(&self.state, &[Phase::Play])?;
        let ch = self.state.world.require_character(character)?;
        let out_of_turn = |reason: &str| EngineError::OutOfTurn { character, reason: reason.to_string() };
        if !self.state.season.queue_is_empty(character) {
            return Err(out_of_turn("an encounter is still pending"));
        }
        if ch.acted_this_turn {
            return Err(out_of_turn("already acted this turn"));
        }
        if ch.remaining_turns == 0 {
            return Err(out_of_turn("no turns left this season"));
        }
        if !self.state.world.overlay.is_alive(character) {
            return Err(EngineError::EntityNotFound(character));
        }

        let name = action.name();
        let deck = &mut *self.deck;
        let entry = atomically(&mut self.state, |state| {
            let payload = action.into_payload(character, state, deck)?;
            let entry = payload.map(|payload| {
                state.season.queue_mut(character).enqueue(
                    payload,
                    EncounterSource::PlayPhase,
                    CausalOrigin::Action(name.to_string()),
                )
            });
            if let Some(ch) = state.world.character_mut(character) {
                ch.acted_this_turn = true;
            }
            Ok(entry)
        })?;
        tracing::info!("{}: {} accepted", character, name);
        Ok(entry)
    }

    /// Resolve the character's next queued entry as one committed chain
    pub fn resolve_next(
        &mut self,
        character: EntityId,
        adjudicator: &mut dyn Adjudicator,
        mode: ResolutionMode,
    ) -> Result<ResolutionRecord> {
        require_phase(&self.state, &[Phase::Play, Phase::RumorPhase])?;
        let ctx = self.ruleset.context(mode);
        atomically_logged(&mut self.state, &mut self.log, |state, records| {
            resolve_entry(state, records, &ctx, adjudicator, character)
        })
    }

    /// Resolve entries until the character's queue is empty
    ///
    /// Each entry commits on its own; an error leaves the failing entry and
    /// everything behind it queued.
    pub fn resolve_pending(
        &mut self,
        character: EntityId,
        adjudicator: &mut dyn Adjudicator,
        mode: ResolutionMode,
    ) -> Result<Vec<ResolutionRecord>> {
        let mut records = Vec::new();
        while !self.state.season.queue_is_empty(character) {
            records.push(self.resolve_next(character, &mut *adjudicator, mode)?);
        }
        Ok(records)
    }

    /// Close a character's turn
    ///
    /// Rejected with `OutOfTurn` until the character has acted; submit
    /// `Action::Pass` to skip a turn.
    ///
    /// 1. Credit elapsed time to project stages the character has taken
    /// 2. Use up one turn and clear the acted flag
    /// 3. Age the tableau and refill it
    pub fn finish_turn(&mut self, character: EntityId) -> Result<()> {
        require_phase(&self.state, &[Phase::Play])?;
        let ch = self.state.world.require_character(character)?;
        if !self.state.season.queue_is_empty(character) {
            return Err(EngineError::OutOfTurn {
                character,
                reason: "encounters are still pending".to_string(),
            });
        }
        if ch.remaining_turns == 0 {
            return Err(EngineError::OutOfTurn { character, reason: "no turns left this season".to_string() });
        }
        if !ch.acted_this_turn {
            return Err(EngineError::OutOfTurn { character, reason: "has not acted this turn".to_string() });
        }

        let ctx = self.ruleset.context(ResolutionMode::NonInteractive);
        let config = &self.ruleset.config;
        let deck = &mut *self.deck;
        atomically_logged(&mut self.state, &mut self.log, |state, records| {
            let worked: Vec<Effect> = state
                .world
                .projects
                .values()
                .filter(|p| {
                    p.active_stage()
                        .and_then(|i| p.stage(i))
                        .is_some_and(|s| s.assignee == Some(character))
                })
                .map(|p| Effect::stage_progress(p.id, StageEvent::TurnElapsed { by: character }))
                .collect();
            if !worked.is_empty() {
                run_chain(
                    state,
                    records,
                    &ctx,
                    &mut NoAdjudicator,
                    Some(character),
                    RootCause::TurnEnd,
                    QueuePayload::Effects(worked),
                    EncounterSource::PlayPhase,
                )?;
            }

            let ch: &mut Character =
                state.world.character_mut(character).ok_or(EngineError::EntityNotFound(character))?;
            ch.remaining_turns = ch.remaining_turns.saturating_sub(1);
            ch.acted_this_turn = false;
            let location = ch.location;

            let dropped = state.season.tableau_mut(character).age(&location, config);
            if dropped > 0 {
                tracing::debug!("{}: {} card(s) discarded", character, dropped);
            }
            refill_tableau(state, config, deck, character);
            Ok(())
        })
    }

    /// Close the play phase
    ///
    /// 1. Settle every queue with the disposal strategy, without asking anyone
    /// 2. Expire end-of-season stories as one audited chain
    /// 3. Tear down tableaus
    /// 4. Enter the rumor phase and publish held rumors
    pub fn end_season(&mut self, adjudicator: &mut dyn Adjudicator) -> Result<()> {
        require_phase(&self.state, &[Phase::Play])?;
        let ctx = self.ruleset.context(ResolutionMode::NonInteractive);
        let disposal = &*self.ruleset.disposal;

        atomically_logged(&mut self.state, &mut self.log, |state, records| {
            state.season.phase = Phase::SeasonEnd;
            tracing::info!("Season {} ending", state.season.season);

            let kept = settle_queues(state, records, &ctx, disposal, &mut *adjudicator)?;
            state.season.carried_over.extend(kept);

            let expiring = state.world.overlay.expiring_at_season_end();
            if !expiring.is_empty() {
                let effects = expiring.into_iter().map(Effect::expire_story).collect();
                run_chain(
                    state,
                    records,
                    &ctx,
                    &mut *adjudicator,
                    None,
                    RootCause::SeasonBoundary,
                    QueuePayload::Effects(effects),
                    EncounterSource::SeasonBoundary,
                )?;
                let kept = settle_queues(state, records, &ctx, disposal, &mut *adjudicator)?;
                state.season.carried_over.extend(kept);
            }

            state.season.tableaus.clear();
            state.season.phase = Phase::RumorPhase;
            tracing::info!("Season {}: rumor phase", state.season.season);
            publish_rumors(state);
            Ok(())
        })
    }

    /// Queue a rumor-phase encounter for a character
    ///
    /// Outside the rumor phase the encounter is held back and only reaches
    /// the live queue when the game enters the rumor phase.
    pub fn queue_rumor(&mut self, character: EntityId, mut encounter: Encounter) -> Result<()> {
        self.state.world.require_character(character)?;
        encounter.id = self.state.ids.next_encounter();
        encounter.character = character;
        if self.state.season.phase == Phase::RumorPhase {
            self.state.season.queue_mut(character).enqueue(
                QueuePayload::Encounter(encounter),
                EncounterSource::RumorPhase,
                CausalOrigin::Root,
            );
        } else {
            tracing::debug!("{}: rumor '{}' held until publication", character, encounter.name);
            self.state.season.rumor_hold.push((character, encounter));
        }
        Ok(())
    }

    /// Remove a queued entry that has not started resolving
    pub fn withdraw(&mut self, character: EntityId, entry: QueueEntryId) -> Result<QueueEntry> {
        let queue = self
            .state
            .season
            .queues
            .get_mut(&character)
            .ok_or(EngineError::EntityNotFound(character))?;
        let withdrawn = queue.withdraw(entry)?;
        tracing::info!("{}: withdrew {} ({})", character, entry, withdrawn.payload.label());
        Ok(withdrawn)
    }

    /// Story actions the character could invoke where it stands
    pub fn story_actions(&self, character: EntityId) -> Result<Vec<AvailableAction>> {
        let ch = self.state.world.require_character(character)?;
        Ok(self.state.world.overlay.actions_available(character, &ch.location))
    }

    /// Rumor target introducing a new entity, with its id reserved
    pub fn new_entity_target(&mut self, kind: EntityKind, name: &str, at: HexCoord) -> RumorTarget {
        RumorTarget::NewEntity { id: self.state.world.next_entity_id(), kind, name: name.to_string(), at }
    }

    /// Instantiate a drawn rumor for confirmation; nothing is attached yet
    pub fn draw_rumor(&self, template: &RumorTemplate, target: RumorTarget) -> Result<RumorDraft> {
        if let RumorTarget::Entity(id) = target {
            if !self.state.world.overlay.is_alive(id) {
                return Err(EngineError::EntityNotFound(id));
            }
        }
        Ok(template.instantiate(target))
    }

    /// Attach a confirmed rumor as one audited chain
    ///
    /// A new entity named by the draft enters the board in the same chain.
    pub fn confirm_rumor(&mut self, draft: RumorDraft) -> Result<StoryId> {
        let ctx = self.ruleset.context(ResolutionMode::NonInteractive);
        let subject = match draft.owner {
            StoryOwner::Entity(id) => Some(id),
            StoryOwner::World => None,
        };
        let root = RootCause::Rumor { title: draft.story.title.clone() };
        let story = atomically_logged(&mut self.state, &mut self.log, |state, records| {
            let record = run_chain(
                state,
                records,
                &ctx,
                &mut NoAdjudicator,
                subject,
                root,
                QueuePayload::Effects(vec![Effect::confirm_rumor(draft)]),
                EncounterSource::Oracle,
            )?;
            record
                .changes
                .iter()
                .find_map(|c| match c.field {
                    Field::Story(id) => Some(id),
                    _ => None,
                })
                .ok_or(EngineError::IllegalAction { reason: "rumor attached no story".to_string() })
        })?;
        tracing::info!("Rumor confirmed as {}", story);
        Ok(story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EncounterId;
    use crate::effect::{ScriptedAdjudicator, Verdict};
    use crate::encounter::DefaultOutcome;
    use crate::season::disposal::DisposalRule;
    use crate::season::tableau::ListDeck;

    fn deck() -> Box<ListDeck> {
        Box::new(ListDeck::new(
            vec![Encounter::new(EncounterId(0), "Wolves", EntityId(0))],
            vec![Encounter::new(EncounterId(0), "Quiet Night", EntityId(0))],
        ))
    }

    fn game() -> (Game, EntityId) {
        let mut game = Game::new(EngineConfig::default().with_seed(42), deck()).unwrap();
        let id = game.add_character("Ayla", "Scout", HexCoord::new(0, 0));
        game.start_season(&mut NoAdjudicator).unwrap();
        (game, id)
    }

    #[test]
    fn test_start_season_deals_tableau() {
        let (game, id) = game();
        assert_eq!(game.phase(), Phase::Play);
        assert_eq!(game.state.season.tableaus[&id].len(), 3);
        assert_eq!(game.world().character(id).unwrap().remaining_turns, 20);
        assert_eq!(game.status(id).unwrap(), TurnStatus::AwaitingAction);
    }

    #[test]
    fn test_luck_refill_is_logged() {
        let (game, id) = game();
        assert_eq!(game.world().character(id).unwrap().stats.luck, 5);
        let record = game.log().last().unwrap();
        assert_eq!(record.root, RootCause::SeasonBoundary);
        assert_eq!(record.source, Some(EncounterSource::SeasonBoundary));
        let change = &record.changes[0];
        assert_eq!(change.field, Field::Stat(Stat::Luck));
        assert_eq!(change.target, Some(id));
    }

    #[test]
    fn test_season_start_replays_from_log() {
        let (mut game, id) = game();
        game.state.season.queue_mut(id).enqueue(
            QueuePayload::Effects(vec![Effect::modify(id, Stat::Luck, -4)]),
            EncounterSource::Oracle,
            CausalOrigin::Root,
        );
        game.resolve_next(id, &mut NoAdjudicator, ResolutionMode::Interactive).unwrap();
        assert_eq!(game.world().character(id).unwrap().stats.luck, 1);
        game.end_season(&mut NoAdjudicator).unwrap();

        let mut replayed = game.world().clone();
        let logged = game.log().len();
        game.start_season(&mut NoAdjudicator).unwrap();
        assert_eq!(game.world().character(id).unwrap().stats.luck, 5);
        for record in &game.log().records[logged..] {
            replayed.replay(&record.changes).unwrap();
        }
        assert_eq!(&replayed, game.world());
    }

    #[test]
    fn test_full_luck_needs_no_refill() {
        let (mut game, _) = game();
        game.end_season(&mut NoAdjudicator).unwrap();
        let logged = game.log().len();
        game.start_season(&mut NoAdjudicator).unwrap();
        assert_eq!(game.log().len(), logged);
    }

    #[test]
    fn test_turn_loop() {
        let (mut game, id) = game();
        game.submit_action(id, Action::Travel { to: HexCoord::new(2, 0) }).unwrap();
        assert_eq!(game.status(id).unwrap(), TurnStatus::MustResolve);

        game.resolve_next(id, &mut NoAdjudicator, ResolutionMode::Interactive).unwrap();
        assert_eq!(game.status(id).unwrap(), TurnStatus::TurnComplete);
        assert_eq!(game.world().character(id).unwrap().location, HexCoord::new(2, 0));

        game.finish_turn(id).unwrap();
        let ch = game.world().character(id).unwrap();
        assert_eq!(ch.remaining_turns, 19);
        assert!(!ch.acted_this_turn);
        assert_eq!(game.status(id).unwrap(), TurnStatus::AwaitingAction);
    }

    #[test]
    fn test_finish_turn_requires_an_action() {
        let (mut game, id) = game();
        let result = game.finish_turn(id);
        assert!(matches!(result, Err(EngineError::OutOfTurn { .. })));
        assert_eq!(game.world().character(id).unwrap().remaining_turns, 20);

        assert_eq!(game.submit_action(id, Action::Pass).unwrap(), None);
        assert_eq!(game.status(id).unwrap(), TurnStatus::TurnComplete);
        game.finish_turn(id).unwrap();
        assert_eq!(game.world().character(id).unwrap().remaining_turns, 19);
    }

    #[test]
    fn test_finish_turn_rejected_with_pending_queue() {
        let (mut game, id) = game();
        game.submit_action(id, Action::Camp).unwrap();
        assert!(matches!(game.finish_turn(id), Err(EngineError::OutOfTurn { .. })));
    }

    #[test]
    fn test_wrong_phase() {
        let (mut game, id) = game();
        assert!(matches!(game.start_season(&mut NoAdjudicator), Err(EngineError::WrongPhase { .. })));
        game.end_season(&mut NoAdjudicator).unwrap();
        let result = game.submit_action(id, Action::Camp);
        assert!(matches!(result, Err(EngineError::WrongPhase { .. })));
    }

    #[test]
    fn test_rumors_held_until_rumor_phase() {
        let (mut game, id) = game();
        game.queue_rumor(id, Encounter::new(EncounterId(0), "Strange Lights", id)).unwrap();
        assert!(game.state.season.queue_is_empty(id));
        assert_eq!(game.state.season.rumor_hold.len(), 1);

        game.end_season(&mut NoAdjudicator).unwrap();
        assert_eq!(game.phase(), Phase::RumorPhase);
        let entry = game.state.season.queue(id).and_then(|q| q.peek()).unwrap();
        assert_eq!(entry.source, EncounterSource::RumorPhase);
    }

    #[test]
    fn test_carried_over_rumors_return_next_season() {
        let (game, id) = game();
        let mut game = game.with_disposal(Box::new(DisposalRule::CarryOverRumors));
        game.end_season(&mut NoAdjudicator).unwrap();
        game.queue_rumor(id, Encounter::new(EncounterId(0), "Strange Lights", id)).unwrap();

        game.start_season(&mut NoAdjudicator).unwrap();
        assert_eq!(game.season_number(), 2);
        assert_eq!(game.status(id).unwrap(), TurnStatus::MustResolve);
        let before = game.log().len();
        game.resolve_pending(id, &mut NoAdjudicator, ResolutionMode::Interactive).unwrap();
        assert_eq!(game.log().len(), before + 1);
    }

    #[test]
    fn test_end_season_expires_stories() {
        let (mut game, id) = game();
        let template = RumorTemplate::new("Bandit Camp", Default::default());
        let target = game.new_entity_target(EntityKind::Villain, "Red Hand", HexCoord::new(3, 3));
        let RumorTarget::NewEntity { id: camp, .. } = target else { unreachable!() };
        let draft = game.draw_rumor(&template, target).unwrap();
        game.confirm_rumor(draft).unwrap();
        assert!(game.world().overlay.is_alive(camp));

        game.end_season(&mut NoAdjudicator).unwrap();
        assert!(!game.world().overlay.is_alive(camp));
        assert_eq!(game.log().last().unwrap().root, RootCause::SeasonBoundary);
        assert!(game.world().overlay.is_alive(id));
    }

    #[test]
    fn test_confirmed_rumor_is_logged_and_replays() {
        let (mut game, _) = game();
        let template = RumorTemplate::new("Bandit Camp", Default::default());
        let target = game.new_entity_target(EntityKind::Villain, "Red Hand", HexCoord::new(3, 3));
        let RumorTarget::NewEntity { id: camp, .. } = target else { unreachable!() };
        let draft = game.draw_rumor(&template, target).unwrap();
        let mut replayed = game.world().clone();
        let logged = game.log().len();

        let story = game.confirm_rumor(draft).unwrap();
        assert_eq!(game.log().len(), logged + 1);
        let record = game.log().last().unwrap();
        assert_eq!(record.root, RootCause::Rumor { title: "Bandit Camp".into() });
        assert_eq!(record.subject, Some(camp));
        let fields: Vec<Field> = record.changes.iter().map(|c| c.field.clone()).collect();
        assert_eq!(fields, vec![Field::Introduced, Field::Story(story)]);
        assert_eq!(record.summary, "Red Hand appears; rumor 'Bandit Camp' takes hold");

        replayed.replay(&record.changes).unwrap();
        assert_eq!(&replayed, game.world());
    }

    #[test]
    fn test_rumor_on_missing_entity_leaves_no_record() {
        let (mut game, _) = game();
        let template = RumorTemplate::new("Ghost Ship", Default::default());
        let target = game.new_entity_target(EntityKind::Villain, "Wraith", HexCoord::new(1, 1));
        let mut draft = game.draw_rumor(&template, target).unwrap();
        draft.new_entity = None;
        let logged = game.log().len();
        assert!(matches!(game.confirm_rumor(draft), Err(EngineError::EntityNotFound(_))));
        assert_eq!(game.log().len(), logged);
    }

    #[test]
    fn test_interactive_failure_rolls_back() {
        let (mut game, id) = game();
        let challenge = Encounter::new(EncounterId(0), "Rope Bridge", id)
            .with_check("Athletics", 5)
            .with_effect(Effect::modify(id, Stat::Coins, 4))
            .defaulting_to(DefaultOutcome::Failure);
        game.state.season.queue_mut(id).enqueue(
            QueuePayload::Encounter(challenge),
            EncounterSource::Oracle,
            CausalOrigin::Root,
        );
        let before = game.state.clone();
        let logged = game.log().clone();

        let result = game.resolve_next(id, &mut NoAdjudicator, ResolutionMode::Interactive);
        assert!(matches!(result, Err(EngineError::AdjudicationUnavailable { .. })));
        assert_eq!(game.state, before);
        assert_eq!(game.log(), &logged);

        let mut gm = ScriptedAdjudicator::new(vec![Verdict::Success { successes: 1 }]);
        game.resolve_next(id, &mut gm, ResolutionMode::Interactive).unwrap();
        assert_eq!(game.world().character(id).unwrap().stats.coins, 4);
    }

    #[test]
    fn test_withdraw_queued_entry() {
        let (mut game, id) = game();
        let entry = game.submit_action(id, Action::Camp).unwrap().unwrap();
        let withdrawn = game.withdraw(id, entry).unwrap();
        assert_eq!(withdrawn.id, entry);
        assert!(game.state.season.queue_is_empty(id));
    }
}
