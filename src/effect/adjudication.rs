//! Skill-check and GM decision boundary
//!
//! Challenges, mystery flips and effects that need a decision call out to an
//! `Adjudicator`. Returning `None` means no decision can be had; what happens
//! then depends on the `ResolutionMode`.
//!
//! Challenge dice are rolled by the engine and shown in the request. A player
//! answers with `Verdict::Played`: luck spent on adjusts, transfers between
//! rolls, fleeing and the picked choice.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::error::{EngineError, Result};
use crate::core::types::{EntityId, StoryId};
use crate::effect::kind::Effect;
use crate::encounter::ChoiceType;

/// A check together with the rank the character brings to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCheck {
    pub skill: String,
    pub difficulty: i32,
    pub rank: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdjudicationRequest {
    /// An encounter card in play; `checks` may be empty when only a choice
    /// is asked for
    Challenge {
        character: EntityId,
        encounter: String,
        checks: Vec<RankedCheck>,
        required_successes: u32,
        /// One roll per check, rank included
        rolls: Vec<i32>,
        luck: i32,
        choice: ChoiceType,
        choices: usize,
        /// Rolled index for random choices
        drawn_choice: Option<usize>,
    },
    Mystery {
        character: Option<EntityId>,
        story: StoryId,
        check: RankedCheck,
    },
    Decision {
        prompt: String,
        targets: Vec<EntityId>,
    },
}

impl AdjudicationRequest {
    pub fn describe(&self) -> String {
        match self {
            AdjudicationRequest::Challenge { encounter, checks, .. } => {
                format!("challenge '{}' ({} checks)", encounter, checks.len())
            }
            AdjudicationRequest::Mystery { story, check, .. } => {
                format!("mystery of {} ({} vs {})", story, check.skill, check.difficulty)
            }
            AdjudicationRequest::Decision { prompt, .. } => format!("decision '{}'", prompt),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Success { successes: u32 },
    Failure { successes: u32 },
    /// Replace the outcome with these effects
    Override(Vec<Effect>),
    /// Score the rolled dice after the player's actions
    Played(EncounterActions),
}

/// What a player does with a challenge's rolls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterActions {
    /// Roll indices raised by one, one luck each
    pub adjusts: Vec<usize>,
    /// `(from, to)`: lower `from` by two to raise `to` by one
    pub transfers: Vec<(usize, usize)>,
    /// Spend one luck to skip the outcome and the choice
    pub flee: bool,
    pub choice: Option<usize>,
}

/// Rolls and luck after a player's actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedRolls {
    pub rolls: Vec<i32>,
    pub luck_spent: i32,
    pub fled: bool,
}

impl EncounterActions {
    pub fn choosing(index: usize) -> Self {
        Self { choice: Some(index), ..Self::default() }
    }

    /// Apply adjusts, then transfers, then flee to the dealt rolls
    pub fn play(&self, rolls: &[i32], luck: i32) -> Result<PlayedRolls> {
        let illegal = |reason: String| EngineError::IllegalAction { reason };
        let mut rolls = rolls.to_vec();
        let mut left = luck;
        let index = |i: usize, len: usize| {
            if i < len {
                Ok(i)
            } else {
                Err(illegal(format!("no roll {} ({} rolled)", i + 1, len)))
            }
        };

        for &adj in &self.adjusts {
            let adj = index(adj, rolls.len())?;
            if left <= 0 {
                return Err(illegal("not enough luck to adjust".into()));
            }
            left -= 1;
            rolls[adj] += 1;
        }
        for &(from, to) in &self.transfers {
            let from = index(from, rolls.len())?;
            let to = index(to, rolls.len())?;
            if rolls[from] < 2 {
                return Err(illegal(format!("roll {} is too low to transfer from", from + 1)));
            }
            rolls[from] -= 2;
            rolls[to] += 1;
        }
        if self.flee {
            if left <= 0 {
                return Err(illegal("not enough luck to flee".into()));
            }
            left -= 1;
        }
        Ok(PlayedRolls { rolls, luck_spent: luck - left, fled: self.flee })
    }
}

/// Whether the resolution may wait on a human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionMode {
    /// A missing decision is an error; the chain is rolled back
    Interactive,
    /// A missing decision falls back to the declared default
    NonInteractive,
}

pub trait Adjudicator: Send {
    fn adjudicate(&mut self, request: &AdjudicationRequest, rng: &mut dyn RngCore) -> Option<Verdict>;
}

/// Nobody is available
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAdjudicator;

impl Adjudicator for NoAdjudicator {
    fn adjudicate(&mut self, _request: &AdjudicationRequest, _rng: &mut dyn RngCore) -> Option<Verdict> {
        None
    }
}

/// Plays challenges as dealt and rolls mysteries: `1..=die_sides` plus rank
/// against the difficulty. Required choices take the first option. Free-form
/// decisions are left to a GM.
#[derive(Debug, Clone, Copy)]
pub struct DiceAdjudicator {
    pub die_sides: i32,
}

impl DiceAdjudicator {
    pub fn new(die_sides: i32) -> Self {
        Self { die_sides }
    }

    fn passes(&self, check: &RankedCheck, rng: &mut dyn RngCore) -> bool {
        let roll = rng.gen_range(1..=self.die_sides.max(1));
        roll + check.rank >= check.difficulty
    }
}

impl Adjudicator for DiceAdjudicator {
    fn adjudicate(&mut self, request: &AdjudicationRequest, rng: &mut dyn RngCore) -> Option<Verdict> {
        match request {
            AdjudicationRequest::Challenge { choice, .. } => Some(Verdict::Played(EncounterActions {
                choice: (*choice == ChoiceType::Required).then_some(0),
                ..EncounterActions::default()
            })),
            AdjudicationRequest::Mystery { check, .. } => Some(if self.passes(check, rng) {
                Verdict::Success { successes: 1 }
            } else {
                Verdict::Failure { successes: 0 }
            }),
            AdjudicationRequest::Decision { .. } => None,
        }
    }
}

/// Hands out prepared verdicts in order; unavailable once they run out
#[derive(Debug, Clone, Default)]
pub struct ScriptedAdjudicator {
    verdicts: VecDeque<Verdict>,
    pub requests: Vec<AdjudicationRequest>,
}

impl ScriptedAdjudicator {
    pub fn new(verdicts: Vec<Verdict>) -> Self {
        Self { verdicts: verdicts.into(), requests: Vec::new() }
    }
}

impl Adjudicator for ScriptedAdjudicator {
    fn adjudicate(&mut self, request: &AdjudicationRequest, _rng: &mut dyn RngCore) -> Option<Verdict> {
        self.requests.push(request.clone());
        self.verdicts.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn challenge(difficulty: i32, rank: i32, n: usize, required: u32) -> AdjudicationRequest {
        AdjudicationRequest::Challenge {
            character: EntityId(1),
            encounter: "Rockslide".into(),
            checks: vec![RankedCheck { skill: "Athletics".into(), difficulty, rank }; n],
            required_successes: required,
            rolls: vec![4; n],
            luck: 2,
            choice: ChoiceType::None,
            choices: 0,
            drawn_choice: None,
        }
    }

    fn mystery(difficulty: i32, rank: i32) -> AdjudicationRequest {
        AdjudicationRequest::Mystery {
            character: Some(EntityId(1)),
            story: StoryId(1),
            check: RankedCheck { skill: "Lore".into(), difficulty, rank },
        }
    }

    #[test]
    fn test_dice_plays_challenges_as_dealt() {
        let mut dice = DiceAdjudicator::new(8);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let verdict = dice.adjudicate(&challenge(5, 0, 3, 3), &mut rng);
        assert_eq!(verdict, Some(Verdict::Played(EncounterActions::default())));

        let mut required = challenge(5, 0, 1, 1);
        if let AdjudicationRequest::Challenge { choice, choices, .. } = &mut required {
            *choice = ChoiceType::Required;
            *choices = 2;
        }
        assert_eq!(dice.adjudicate(&required, &mut rng), Some(Verdict::Played(EncounterActions::choosing(0))));
    }

    #[test]
    fn test_trivial_mystery_always_passes() {
        let mut dice = DiceAdjudicator::new(8);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(dice.adjudicate(&mystery(1, 0), &mut rng), Some(Verdict::Success { successes: 1 }));
    }

    #[test]
    fn test_impossible_mystery_always_fails() {
        let mut dice = DiceAdjudicator::new(8);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(dice.adjudicate(&mystery(20, 2), &mut rng), Some(Verdict::Failure { successes: 0 }));
    }

    #[test]
    fn test_adjust_costs_luck() {
        let actions = EncounterActions { adjusts: vec![0, 0, 1], ..Default::default() };
        let played = actions.play(&[3, 5], 4).unwrap();
        assert_eq!(played.rolls, vec![5, 6]);
        assert_eq!(played.luck_spent, 3);
        assert!(!played.fled);

        let broke = EncounterActions { adjusts: vec![0, 0], ..Default::default() };
        assert!(matches!(broke.play(&[3, 5], 1), Err(EngineError::IllegalAction { .. })));
    }

    #[test]
    fn test_transfer_moves_two_for_one() {
        let actions = EncounterActions { transfers: vec![(0, 1)], ..Default::default() };
        let played = actions.play(&[6, 3], 0).unwrap();
        assert_eq!(played.rolls, vec![4, 4]);
        assert_eq!(played.luck_spent, 0);

        assert!(actions.play(&[1, 3], 0).is_err());
        let out_of_range = EncounterActions { transfers: vec![(0, 2)], ..Default::default() };
        assert!(out_of_range.play(&[6, 3], 0).is_err());
    }

    #[test]
    fn test_flee_costs_one_luck() {
        let flee = EncounterActions { flee: true, ..Default::default() };
        let played = flee.play(&[2], 1).unwrap();
        assert!(played.fled);
        assert_eq!(played.luck_spent, 1);
        assert!(flee.play(&[2], 0).is_err());

        // Adjusting first can leave nothing to flee with
        let both = EncounterActions { adjusts: vec![0], flee: true, ..Default::default() };
        assert!(both.play(&[2], 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_play_never_overspends(
            rolls in proptest::collection::vec(1i32..12, 1..4),
            adjusts in proptest::collection::vec(0usize..4, 0..6),
            luck in 0i32..6,
        ) {
            let actions = EncounterActions { adjusts, ..Default::default() };
            if let Ok(played) = actions.play(&rolls, luck) {
                prop_assert!(played.luck_spent <= luck);
                let before: i32 = rolls.iter().sum();
                let after: i32 = played.rolls.iter().sum();
                prop_assert_eq!(after - before, played.luck_spent);
            }
        }
    }

    #[test]
    fn test_dice_defers_decisions() {
        let mut dice = DiceAdjudicator::new(8);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let request = AdjudicationRequest::Decision { prompt: "Spare the thief?".into(), targets: vec![] };
        assert_eq!(dice.adjudicate(&request, &mut rng), None);
    }

    #[test]
    fn test_scripted_runs_out() {
        let mut gm = ScriptedAdjudicator::new(vec![Verdict::Failure { successes: 0 }]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let request = challenge(5, 0, 1, 1);
        assert_eq!(gm.adjudicate(&request, &mut rng), Some(Verdict::Failure { successes: 0 }));
        assert_eq!(gm.adjudicate(&request, &mut rng), None);
        assert_eq!(gm.requests.len(), 2);
    }

    #[test]
    fn test_no_adjudicator() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(NoAdjudicator.adjudicate(&challenge(5, 0, 1, 1), &mut rng), None);
    }
}
