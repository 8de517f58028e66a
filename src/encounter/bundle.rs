//! Encounters - unresolved bundles of candidate effects

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{EffectId, EncounterId, EntityId, HexCoord};
use crate::effect::Effect;

/// Where a queued item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncounterSource {
    /// Drawn from the tableau or a play action
    PlayPhase,
    RumorPhase,
    ProjectResolution,
    /// GM or oracle intervention
    Oracle,
    SeasonBoundary,
}

/// What produced a queued item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CausalOrigin {
    Root,
    Action(String),
    Effect(EffectId),
}

/// Outcome applied when nobody can adjudicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DefaultOutcome {
    /// Neither rewards nor penalties
    #[default]
    Neutral,
    Success,
    Failure,
}

/// How an encounter's choices are picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChoiceType {
    #[default]
    None,
    Required,
    Optional,
    /// Picked by a die the engine rolls
    Random,
}

impl ChoiceType {
    /// Check a submitted choice against the card
    ///
    /// `drawn` is the index rolled for random choices; a random choice left
    /// blank takes the drawn index.
    pub fn validate(self, given: Option<usize>, options: usize, drawn: Option<usize>) -> Result<Option<usize>> {
        let illegal = |reason: String| EngineError::IllegalAction { reason };
        let picked = match (self, given) {
            (ChoiceType::None, Some(_)) => return Err(illegal("no choice is allowed here".into())),
            (ChoiceType::None, None) => return Ok(None),
            (ChoiceType::Required, None) => return Err(illegal("a choice must be made".into())),
            (ChoiceType::Random, given) => {
                let drawn = drawn.ok_or_else(|| illegal("no choice was rolled".into()))?;
                if given.is_some_and(|g| g != drawn) {
                    return Err(illegal(format!("choice must match the roll ({})", drawn + 1)));
                }
                Some(drawn)
            }
            (_, given) => given,
        };
        if let Some(index) = picked {
            if index >= options {
                return Err(illegal(format!("choice {} out of range ({} options)", index + 1, options)));
            }
        }
        Ok(picked)
    }

    /// Choice taken when nobody can pick
    pub fn fallback(self, drawn: Option<usize>) -> Option<usize> {
        match self {
            ChoiceType::None | ChoiceType::Optional => None,
            ChoiceType::Required => Some(0),
            ChoiceType::Random => drawn,
        }
    }

    /// Whether a player picks
    pub fn asks(self) -> bool {
        matches!(self, ChoiceType::Required | ChoiceType::Optional)
    }
}

/// One skill check of a challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub skill: String,
    pub difficulty: i32,
}

impl Check {
    pub fn new(skill: &str, difficulty: i32) -> Self {
        Self { skill: skill.to_string(), difficulty }
    }
}

/// Adjustment merged into an encounter by stories and influence traits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EncounterModifier {
    /// Added to the difficulty of every check
    Difficulty(i32),
    RequiredSuccesses(i32),
    ReplaceRewards(Vec<Effect>),
    ReplacePenalties(Vec<Effect>),
    AddEffect(Effect),
    SubstituteDefault(DefaultOutcome),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub name: String,
    pub character: EntityId,
    /// Hex the encounter happens on; enables story and influence modifiers
    pub anchor: Option<HexCoord>,
    /// Applied unconditionally
    pub effects: Vec<Effect>,
    pub checks: Vec<Check>,
    pub required_successes: u32,
    pub rewards: Vec<Effect>,
    pub penalties: Vec<Effect>,
    pub default_outcome: DefaultOutcome,
    /// Project credited with challenge successes
    pub project: Option<EntityId>,
    pub choice_type: ChoiceType,
    /// Effect lists to pick from; the picked one is applied after the outcome
    pub choices: Vec<Vec<Effect>>,
}

impl Encounter {
    pub fn new(id: EncounterId, name: &str, character: EntityId) -> Self {
        Self {
            id,
            name: name.to_string(),
            character,
            anchor: None,
            effects: Vec::new(),
            checks: Vec::new(),
            required_successes: 0,
            rewards: Vec::new(),
            penalties: Vec::new(),
            default_outcome: DefaultOutcome::Neutral,
            project: None,
            choice_type: ChoiceType::None,
            choices: Vec::new(),
        }
    }

    pub fn at(mut self, anchor: HexCoord) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_check(mut self, skill: &str, difficulty: i32) -> Self {
        self.checks.push(Check::new(skill, difficulty));
        if self.required_successes == 0 {
            self.required_successes = 1;
        }
        self
    }

    pub fn requiring(mut self, successes: u32) -> Self {
        self.required_successes = successes;
        self
    }

    pub fn with_rewards(mut self, rewards: Vec<Effect>) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_penalties(mut self, penalties: Vec<Effect>) -> Self {
        self.penalties = penalties;
        self
    }

    pub fn defaulting_to(mut self, outcome: DefaultOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    pub fn for_project(mut self, project: EntityId) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_choices(mut self, choice_type: ChoiceType, choices: Vec<Vec<Effect>>) -> Self {
        self.choice_type = choice_type;
        self.choices = choices;
        self
    }

    pub fn is_challenge(&self) -> bool {
        !self.checks.is_empty()
    }

    /// True when the card asks for a decision before its effects run
    pub fn needs_adjudication(&self) -> bool {
        self.is_challenge() || self.choice_type.asks()
    }

    pub fn apply_modifier(&mut self, modifier: &EncounterModifier) {
        match modifier {
            EncounterModifier::Difficulty(delta) => {
                for check in &mut self.checks {
                    check.difficulty += delta;
                }
            }
            EncounterModifier::RequiredSuccesses(delta) => {
                let required = self.required_successes as i32 + delta;
                self.required_successes = required.max(0) as u32;
            }
            EncounterModifier::ReplaceRewards(rewards) => self.rewards = rewards.clone(),
            EncounterModifier::ReplacePenalties(penalties) => self.penalties = penalties.clone(),
            EncounterModifier::AddEffect(effect) => self.effects.push(effect.clone()),
            EncounterModifier::SubstituteDefault(outcome) => self.default_outcome = *outcome,
        }
    }
}
