//! Effects, their resolution and the records resolution leaves behind

pub mod adjudication;
pub mod kind;
pub mod record;
pub mod resolver;
pub mod rules;

pub use adjudication::{
    AdjudicationRequest, Adjudicator, DiceAdjudicator, EncounterActions, NoAdjudicator, PlayedRolls,
    RankedCheck, ResolutionMode, ScriptedAdjudicator, Verdict,
};
pub use kind::{Effect, EffectKind, TargetSelector};
pub use record::{
    ChangeRow, EffectOutcome, Field, FieldChange, FieldValue, ResolutionLog, ResolutionRecord,
    ResolvedEffect, RootCause,
};
pub use resolver::{ChainOutcome, ChainStart, EffectResolutionEngine, RaisedEncounter, ResolutionContext};
pub use rules::{Interception, RuleRegistry, RuleVariant, TriggerPattern, VariantId};
