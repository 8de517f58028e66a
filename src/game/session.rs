//! Async per-character turn driver
//!
//! Several characters' turns may be in progress at once. Each step of a
//! turn (one chain, one action, the turn close) runs under the game lock;
//! the lock is released only while waiting for the player's next action.

use ahash::AHashSet;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};

use crate::core::error::{EngineError, Result};
use crate::core::types::EntityId;
use crate::effect::{Adjudicator, ResolutionMode, ResolutionRecord};
use crate::game::Game;
use crate::season::{Action, TurnStatus};

/// Shared handle to a running game
#[derive(Clone)]
pub struct GameHandle {
    game: Arc<Mutex<Game>>,
    /// Characters with a turn in progress
    running: Arc<StdMutex<AHashSet<EntityId>>>,
}

/// Marks a character's turn as running until dropped
struct TurnGuard {
    running: Arc<StdMutex<AHashSet<EntityId>>>,
    character: EntityId,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.remove(&self.character);
    }
}

impl GameHandle {
    pub fn new(game: Game) -> Self {
        Self { game: Arc::new(Mutex::new(game)), running: Arc::new(StdMutex::new(AHashSet::new())) }
    }

    pub fn game(&self) -> Arc<Mutex<Game>> {
        Arc::clone(&self.game)
    }

    pub fn is_running(&self, character: EntityId) -> bool {
        self.running.lock().unwrap_or_else(|e| e.into_inner()).contains(&character)
    }

    fn claim(&self, character: EntityId) -> Result<TurnGuard> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if !running.insert(character) {
            return Err(EngineError::OutOfTurn {
                character,
                reason: "a turn is already in progress".to_string(),
            });
        }
        Ok(TurnGuard { running: Arc::clone(&self.running), character })
    }

    /// Play one turn for `character`
    ///
    /// Drains the character's queue, waits for an action whenever the
    /// character may act, then closes the turn. Rejected actions are logged
    /// and the next one is awaited. Returns the records of every chain
    /// resolved during the turn.
    pub async fn run_turn(
        &self,
        character: EntityId,
        actions: &mut mpsc::Receiver<Action>,
        adjudicator: &mut dyn Adjudicator,
    ) -> Result<Vec<ResolutionRecord>> {
        let _guard = self.claim(character)?;
        let mut records = Vec::new();

        loop {
            let status = self.game.lock().await.status(character)?;
            match status {
                TurnStatus::MustResolve => {
                    let mut game = self.game.lock().await;
                    records.push(game.resolve_next(character, &mut *adjudicator, ResolutionMode::Interactive)?);
                }
                TurnStatus::AwaitingAction => {
                    let Some(action) = actions.recv().await else {
                        return Err(EngineError::IllegalAction {
                            reason: format!("{} left without choosing an action", character),
                        });
                    };
                    let mut game = self.game.lock().await;
                    match game.submit_action(character, action) {
                        Ok(_) => {}
                        Err(e) if !e.is_fatal() => {
                            tracing::warn!("{}: action rejected: {}", character, e.user_message())
                        }
                        Err(e) => return Err(e),
                    }
                }
                TurnStatus::TurnComplete => break,
            }
        }

        self.game.lock().await.finish_turn(character)?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::types::HexCoord;
    use crate::effect::NoAdjudicator;
    use crate::season::ListDeck;

    async fn handle() -> (GameHandle, EntityId) {
        let mut game = Game::new(EngineConfig::default().with_seed(42), Box::new(ListDeck::default())).unwrap();
        let id = game.add_character("Ayla", "Scout", HexCoord::new(0, 0));
        game.start_season(&mut NoAdjudicator).unwrap();
        (GameHandle::new(game), id)
    }

    #[tokio::test]
    async fn test_turn_retries_after_rejected_action() {
        let (handle, id) = handle().await;
        let (tx, mut rx) = mpsc::channel(4);
        // Already there: rejected, then the second choice is taken
        tx.send(Action::Travel { to: HexCoord::new(0, 0) }).await.unwrap();
        tx.send(Action::Travel { to: HexCoord::new(0, 2) }).await.unwrap();

        let records = handle.run_turn(id, &mut rx, &mut NoAdjudicator).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!handle.is_running(id));

        let game = handle.game();
        let game = game.lock().await;
        let ch = game.world().character(id).unwrap();
        assert_eq!(ch.location, HexCoord::new(0, 2));
        assert_eq!(ch.remaining_turns, 19);
    }

    #[tokio::test]
    async fn test_closed_channel_ends_turn_with_error() {
        let (handle, id) = handle().await;
        let (tx, mut rx) = mpsc::channel::<Action>(1);
        drop(tx);
        let result = handle.run_turn(id, &mut rx, &mut NoAdjudicator).await;
        assert!(result.is_err());
        assert!(!handle.is_running(id));
    }

    #[test]
    fn test_second_claim_is_out_of_turn() {
        let game = Game::new(EngineConfig::default(), Box::new(ListDeck::default())).unwrap();
        let handle = GameHandle::new(game);
        let guard = handle.claim(EntityId(1)).unwrap();
        assert!(matches!(handle.claim(EntityId(1)), Err(EngineError::OutOfTurn { .. })));
        drop(guard);
        assert!(handle.claim(EntityId(1)).is_ok());
    }
}
