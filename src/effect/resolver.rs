//! Effect resolution engine
//!
//! Applies effects to the world, runs the registered rule variants against
//! every change and resolves what they produce depth-first, collecting the
//! whole chain into one `ResolutionRecord`.
//!
//! Order inside a chain:
//! 1. the effect's own mutation, applied to its targets in ascending id order
//! 2. follow-up effects of the kind itself (stage completion, cascades,
//!    adjudication outcomes)
//! 3. effects produced by interceptors, in registration order
//!
//! Children always resolve before the next sibling. A variant never fires on
//! an effect descended from its own output, and nesting deeper than
//! `max_chain_depth` aborts the chain.
//!
//! All randomness comes from one ChaCha8 source seeded with the record's
//! seed, so a chain can be re-run exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::character::{Character, Stat};
use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{EffectId, EntityId, HexDirection, ResolutionId, StoryId};
use crate::effect::adjudication::{AdjudicationRequest, Adjudicator, RankedCheck, ResolutionMode, Verdict};
use crate::effect::kind::{Effect, EffectKind, TargetSelector};
use crate::effect::record::{
    EffectOutcome, Field, FieldChange, FieldValue, ResolutionRecord, ResolvedEffect, RootCause,
};
use crate::effect::rules::{Interception, RuleRegistry, VariantId};
use crate::encounter::{ChoiceType, DefaultOutcome, Encounter};
use crate::entity::{CascadePolicy, RangeKind, RumorDraft, StoryOwner};
use crate::game::world::World;
use crate::influence::InfluencePool;
use crate::project::{ProjectStageTracker, StageEvent, TrackerOutcome};

/// Everything a chain needs besides the world itself
pub struct ResolutionContext<'a> {
    pub config: &'a EngineConfig,
    pub rules: &'a RuleRegistry,
    pub tracker: &'a ProjectStageTracker,
    pub cascade: &'a dyn CascadePolicy,
    pub mode: ResolutionMode,
}

/// Identity of a chain about to run
#[derive(Debug, Clone)]
pub struct ChainStart {
    pub id: ResolutionId,
    pub seed: u64,
    pub subject: Option<EntityId>,
    pub root: RootCause,
}

/// An encounter raised during a chain, to be queued by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct RaisedEncounter {
    pub character: EntityId,
    pub encounter: Encounter,
    pub cause: EffectId,
}

#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub record: ResolutionRecord,
    pub raised: Vec<RaisedEncounter>,
}

struct Pending {
    effect: Effect,
    origin: Option<EffectId>,
    depth: usize,
    lineage: Vec<VariantId>,
    via: Option<String>,
}

impl Pending {
    fn root(effect: Effect) -> Self {
        Self { effect, origin: None, depth: 0, lineage: Vec::new(), via: None }
    }
}

#[derive(Default)]
struct Applied {
    targets: Vec<EntityId>,
    changes: Vec<FieldChange>,
    children: Vec<Effect>,
    raised: usize,
    no_target: bool,
}

pub struct EffectResolutionEngine<'a> {
    ctx: &'a ResolutionContext<'a>,
    world: &'a mut World,
    adjudicator: &'a mut dyn Adjudicator,
    effect_ids: &'a mut u64,
    rng: ChaCha8Rng,
    record: ResolutionRecord,
    raised: Vec<RaisedEncounter>,
}

impl<'a> EffectResolutionEngine<'a> {
    pub fn new(
        ctx: &'a ResolutionContext<'a>,
        world: &'a mut World,
        adjudicator: &'a mut dyn Adjudicator,
        effect_ids: &'a mut u64,
        start: ChainStart,
    ) -> Self {
        Self {
            ctx,
            world,
            adjudicator,
            effect_ids,
            rng: ChaCha8Rng::seed_from_u64(start.seed),
            record: ResolutionRecord::new(start.id, start.seed, start.subject, start.root),
            raised: Vec::new(),
        }
    }

    /// Resolve a list of root effects as one chain
    pub fn resolve_effects(mut self, effects: Vec<Effect>) -> Result<ChainOutcome> {
        self.run(effects)?;
        Ok(self.finish())
    }

    /// Merge modifiers into an encounter, adjudicate it and resolve the
    /// resulting effects as one chain
    pub fn resolve_encounter(mut self, encounter: Encounter) -> Result<ChainOutcome> {
        let mut enc = encounter;
        let Some(character) = self.world.character(enc.character).cloned() else {
            self.note(format!("{}: no such character, encounter '{}' skipped", enc.character, enc.name));
            return Ok(self.finish());
        };
        let anchor = enc.anchor.unwrap_or(character.location);

        let story_mods: Vec<_> = self
            .world
            .overlay
            .effects_in_range(&anchor, RangeKind::Any)
            .into_iter()
            .map(|(_, e)| (e.description.clone(), e.modifier.clone()))
            .collect();
        for (description, modifier) in story_mods {
            enc.apply_modifier(&modifier);
            self.note(format!("{} applies", description));
        }

        let pool = InfluencePool::new(self.ctx.config.min_pool_size);
        let sources = self.world.overlay.influence_sources();
        match pool.sample(&anchor, &sources, &mut self.rng) {
            Some((entity, drawn)) => {
                for modifier in &drawn.modifiers {
                    enc.apply_modifier(modifier);
                }
                let name = self.world.name_of(entity).unwrap_or_else(|| entity.to_string());
                self.note(format!("influence: {} of {}", drawn.name, name));
            }
            None => self.note("influence: nothing".to_string()),
        }

        let checks: Vec<RankedCheck> = enc
            .checks
            .iter()
            .map(|c| RankedCheck { skill: c.skill.clone(), difficulty: c.difficulty, rank: character.skill_rank(&c.skill) })
            .collect();
        let die = self.ctx.config.check_die_sides.max(1);
        let rolls: Vec<i32> = checks.iter().map(|c| self.rng.gen_range(1..=die) + c.rank).collect();
        let drawn_choice = (enc.choice_type == ChoiceType::Random && !enc.choices.is_empty())
            .then(|| self.rng.gen_range(0..enc.choices.len()));
        if !rolls.is_empty() {
            self.note(format!("rolled {:?}", rolls));
        }

        let mut roots = enc.effects.clone();
        let mut choice = enc.choice_type.fallback(drawn_choice);
        if enc.needs_adjudication() {
            let request = AdjudicationRequest::Challenge {
                character: character.id,
                encounter: enc.name.clone(),
                checks,
                required_successes: enc.required_successes,
                rolls: rolls.clone(),
                luck: character.stats.luck,
                choice: enc.choice_type,
                choices: enc.choices.len(),
                drawn_choice,
            };
            match self.adjudicator.adjudicate(&request, &mut self.rng) {
                Some(Verdict::Success { successes }) => {
                    choice = enc.choice_type.validate(None, enc.choices.len(), drawn_choice)?;
                    self.outcome(&enc, character.id, successes, true, &mut roots);
                }
                Some(Verdict::Failure { successes }) => {
                    choice = enc.choice_type.validate(None, enc.choices.len(), drawn_choice)?;
                    self.outcome(&enc, character.id, successes, false, &mut roots);
                }
                Some(Verdict::Override(effects)) => {
                    choice = None;
                    roots.extend(effects);
                }
                Some(Verdict::Played(actions)) => {
                    let played = actions.play(&rolls, character.stats.luck)?;
                    choice = enc.choice_type.validate(actions.choice, enc.choices.len(), drawn_choice)?;
                    if played.luck_spent > 0 {
                        let spent = Effect::modify(character.id, Stat::Luck, -played.luck_spent).with_comment("luck spent");
                        roots.insert(0, spent);
                    }
                    if played.fled {
                        self.note(format!("{} fled {}", character.name, enc.name));
                        choice = None;
                    } else if enc.is_challenge() {
                        if played.rolls != rolls {
                            self.note(format!("played {:?}", played.rolls));
                        }
                        let successes = enc
                            .checks
                            .iter()
                            .zip(&played.rolls)
                            .filter(|(check, roll)| **roll >= check.difficulty)
                            .count() as u32;
                        self.outcome(&enc, character.id, successes, successes >= enc.required_successes, &mut roots);
                    }
                }
                None => {
                    self.unavailable(&request)?;
                    if enc.is_challenge() {
                        match enc.default_outcome {
                            DefaultOutcome::Success => roots.extend(enc.rewards.iter().cloned()),
                            DefaultOutcome::Failure => roots.extend(enc.penalties.iter().cloned()),
                            DefaultOutcome::Neutral => {}
                        }
                    }
                }
            }
        }

        if let Some(index) = choice {
            self.note(format!("choice {} taken", index + 1));
            roots.extend(enc.choices.get(index).cloned().unwrap_or_default());
        }

        self.run(roots)?;
        Ok(self.finish())
    }

    fn outcome(&mut self, enc: &Encounter, character: EntityId, successes: u32, passed: bool, roots: &mut Vec<Effect>) {
        if passed {
            self.note(format!("{} passed with {} successes", enc.name, successes));
            roots.extend(enc.rewards.iter().cloned());
            if let Some(project) = enc.project {
                roots.push(Effect::stage_progress(project, StageEvent::ChallengeSucceeded { successes, by: character }));
            }
        } else {
            self.note(format!("{} failed with {} successes", enc.name, successes));
            roots.extend(enc.penalties.iter().cloned());
        }
    }

    /// A play answers only a challenge
    fn misplayed(request: &AdjudicationRequest) -> EngineError {
        EngineError::IllegalAction { reason: format!("{} takes a verdict, not a play", request.describe()) }
    }

    fn finish(mut self) -> ChainOutcome {
        let world = &*self.world;
        self.record.build_summary(|id| world.name_of(id));
        ChainOutcome { record: self.record, raised: self.raised }
    }

    fn note(&mut self, text: String) {
        tracing::debug!("{}: {}", self.record.id, text);
        self.record.notes.push(text);
    }

    fn next_effect_id(&mut self) -> EffectId {
        *self.effect_ids += 1;
        EffectId(*self.effect_ids)
    }

    /// No decision available: an error when interactive, logged otherwise
    fn unavailable(&mut self, request: &AdjudicationRequest) -> Result<()> {
        match self.ctx.mode {
            ResolutionMode::Interactive => {
                Err(EngineError::AdjudicationUnavailable { request: request.describe() })
            }
            ResolutionMode::NonInteractive => {
                tracing::warn!("No adjudicator for {}, applying default", request.describe());
                self.note(format!("no adjudicator for {}; default applied", request.describe()));
                Ok(())
            }
        }
    }

    fn run(&mut self, roots: Vec<Effect>) -> Result<()> {
        let mut stack: Vec<Pending> = roots.into_iter().rev().map(Pending::root).collect();

        while let Some(pending) = stack.pop() {
            if pending.depth > self.ctx.config.max_chain_depth {
                return Err(EngineError::ChainTooDeep { depth: pending.depth });
            }
            let id = self.next_effect_id();
            let applied = self.apply(id, &pending.effect)?;
            tracing::debug!(
                "Applied {} {} to {:?}: {} change(s)",
                id,
                pending.effect.kind.name(),
                applied.targets,
                applied.changes.len()
            );

            let child = |effect: Effect, lineage: Vec<VariantId>, via: Option<String>| Pending {
                effect,
                origin: Some(id),
                depth: pending.depth + 1,
                lineage,
                via,
            };
            let mut next: Vec<Pending> = applied
                .children
                .iter()
                .cloned()
                .map(|e| child(e, pending.lineage.clone(), None))
                .collect();

            let rules = self.ctx.rules;
            for change in &applied.changes {
                for (variant_id, variant) in rules.matching(change) {
                    if pending.lineage.contains(&variant_id) {
                        continue;
                    }
                    let produced = variant.produce(&Interception { change, effect: &pending.effect });
                    if !produced.is_empty() {
                        tracing::debug!("'{}' intercepts {}", variant.name, id);
                    }
                    for effect in produced {
                        let mut lineage = pending.lineage.clone();
                        lineage.push(variant_id);
                        next.push(child(effect, lineage, Some(variant.name.clone())));
                    }
                }
            }

            let outcome = if applied.no_target {
                EffectOutcome::NoTarget
            } else if applied.changes.is_empty() && applied.children.is_empty() && applied.raised == 0 {
                EffectOutcome::Unchanged
            } else {
                EffectOutcome::Applied
            };
            self.record.effects.push(ResolvedEffect {
                id,
                kind: pending.effect.kind.name().to_string(),
                origin: pending.origin,
                depth: pending.depth,
                via: pending.via.clone(),
                targets: applied.targets,
                outcome,
                comment: pending.effect.comment.clone(),
            });
            self.record.changes.extend(applied.changes);

            stack.extend(next.into_iter().rev());
        }
        Ok(())
    }

    /// Living entities matched by a selector, ascending and deduplicated
    fn select(&self, selector: &TargetSelector) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = match selector {
            TargetSelector::Entity(id) => vec![*id],
            TargetSelector::Entities(ids) => ids.clone(),
            TargetSelector::AllCharacters => self.world.characters.keys().copied().collect(),
            TargetSelector::CharactersWithin { center, radius } => self
                .world
                .characters
                .values()
                .filter(|c| c.location.distance(center) <= *radius)
                .map(|c| c.id)
                .collect(),
            TargetSelector::World => Vec::new(),
        };
        ids.retain(|id| self.world.overlay.is_alive(*id));
        ids.sort();
        ids.dedup();
        ids
    }

    fn apply(&mut self, id: EffectId, effect: &Effect) -> Result<Applied> {
        let mut out = Applied::default();
        match &effect.kind {
            EffectKind::ExpireStory { story } => self.expire_story(id, *story, &mut out)?,
            EffectKind::FlipMystery { story } => self.flip_mystery(id, *story, &mut out)?,
            EffectKind::ConfirmRumor { draft } => self.confirm_rumor(id, draft, &mut out)?,
            EffectKind::Adjudicate { prompt, on_success, on_failure, fallback } => {
                out.targets = self.select(&effect.target);
                let request = AdjudicationRequest::Decision {
                    prompt: prompt.clone(),
                    targets: out.targets.clone(),
                };
                match self.adjudicator.adjudicate(&request, &mut self.rng) {
                    Some(Verdict::Success { .. }) => out.children.extend(on_success.iter().cloned()),
                    Some(Verdict::Failure { .. }) => out.children.extend(on_failure.iter().cloned()),
                    Some(Verdict::Override(effects)) => out.children.extend(effects),
                    Some(Verdict::Played(_)) => return Err(Self::misplayed(&request)),
                    None => {
                        self.unavailable(&request)?;
                        out.children.extend(fallback.iter().cloned());
                    }
                }
            }
            kind => {
                out.targets = self.select(&effect.target);
                if out.targets.is_empty() {
                    tracing::warn!("{} {} matched no entity", id, kind.name());
                    self.note(format!("{} {}: no matching entity, skipped", id, kind.name()));
                    out.no_target = true;
                }
                for target in out.targets.clone() {
                    self.apply_to(id, target, kind, &mut out)?;
                }
            }
        }
        Ok(out)
    }

    fn apply_to(&mut self, cause: EffectId, target: EntityId, kind: &EffectKind, out: &mut Applied) -> Result<()> {
        match kind {
            EffectKind::ModifyStat { stat, amount } => {
                let Some(ch) = self.character_or_note(target, kind) else { return Ok(()) };
                let new = ch.clamped(*stat, *amount, self.ctx.config);
                self.set(out, cause, target, Field::Stat(*stat), FieldValue::Int(new))
            }
            EffectKind::ModifySkillXp { skill, amount } => {
                let Some(ch) = self.character_or_note(target, kind) else { return Ok(()) };
                let new = ch.skill_xp(skill).saturating_add(*amount).max(0);
                self.set(out, cause, target, Field::SkillXp(skill.clone()), FieldValue::Int(new))
            }
            EffectKind::ChangeJob { job } => {
                if self.character_or_note(target, kind).is_none() {
                    return Ok(());
                }
                self.set(out, cause, target, Field::Job, FieldValue::Text(job.clone()))
            }
            EffectKind::Transport { distance, direction } => {
                let Some(ch) = self.character_or_note(target, kind) else { return Ok(()) };
                let from = ch.location;
                let dir = match direction {
                    Some(dir) => *dir,
                    None => HexDirection::all()[self.rng.gen_range(0..6)],
                };
                let to = from.step(dir, *distance as i32);
                self.set(out, cause, target, Field::Location, FieldValue::Hex(to))
            }
            EffectKind::Relocate { to } => {
                if self.character_or_note(target, kind).is_none() {
                    return Ok(());
                }
                self.set(out, cause, target, Field::Location, FieldValue::Hex(*to))
            }
            EffectKind::ModifyProjectXp { amount } => {
                let tracker = self.ctx.tracker;
                let Some(project) = self.world.projects.get_mut(&target) else {
                    self.note(format!("{} is not a project", target));
                    return Ok(());
                };
                match project.active_stage() {
                    Some(stage) => {
                        let result = tracker.add_xp(project, stage, *amount)?;
                        self.absorb(out, cause, target, result);
                    }
                    None => self.note(format!("{} has no active stage", target)),
                }
                Ok(())
            }
            EffectKind::StageProgress { event } => {
                let tracker = self.ctx.tracker;
                let Some(project) = self.world.projects.get_mut(&target) else {
                    self.note(format!("{} is not a project", target));
                    return Ok(());
                };
                let result = tracker.record_event(project, event)?;
                self.absorb(out, cause, target, result);
                Ok(())
            }
            EffectKind::CompleteStage { stage } => {
                let tracker = self.ctx.tracker;
                let Some(project) = self.world.projects.get_mut(&target) else {
                    self.note(format!("{} is not a project", target));
                    return Ok(());
                };
                let result = tracker.complete_stage(project, *stage)?;
                self.absorb(out, cause, target, result);
                Ok(())
            }
            EffectKind::AssignStage { assignee } => {
                let tracker = self.ctx.tracker;
                let Some(project) = self.world.projects.get_mut(&target) else {
                    self.note(format!("{} is not a project", target));
                    return Ok(());
                };
                match project.active_stage() {
                    Some(stage) => {
                        let result = tracker.assign(project, stage, *assignee)?;
                        self.absorb(out, cause, target, result);
                    }
                    None => self.note(format!("{} has no stage to take", target)),
                }
                Ok(())
            }
            EffectKind::StripTokens => {
                self.set(out, cause, target, Field::Tokens, FieldValue::Hexes(Vec::new()))
            }
            EffectKind::PlaceToken { at } => {
                let mut tokens = self
                    .world
                    .overlay
                    .entity(target)
                    .map(|e| e.tokens.clone())
                    .unwrap_or_default();
                tokens.push(*at);
                self.set(out, cause, target, Field::Tokens, FieldValue::Hexes(tokens))
            }
            EffectKind::DestroyEntity => {
                self.set(out, cause, target, Field::Alive, FieldValue::Flag(false))?;
                if let Some(name) = self.world.name_of(target) {
                    tracing::info!("{} ({}) destroyed", name, target);
                }
                Ok(())
            }
            EffectKind::QueueEncounter { encounter } => {
                if self.character_or_note(target, kind).is_none() {
                    return Ok(());
                }
                let mut encounter = (**encounter).clone();
                encounter.character = target;
                self.raised.push(RaisedEncounter { character: target, encounter, cause });
                out.raised += 1;
                Ok(())
            }
            EffectKind::ExpireStory { .. }
            | EffectKind::FlipMystery { .. }
            | EffectKind::ConfirmRumor { .. }
            | EffectKind::Adjudicate { .. } => Ok(()),
        }
    }

    fn character_or_note(&mut self, target: EntityId, kind: &EffectKind) -> Option<Character> {
        let found = self.world.character(target).cloned();
        if found.is_none() {
            self.note(format!("{}: {} is not a character", kind.name(), target));
        }
        found
    }

    /// Write a field and log the change; unchanged values are not logged
    fn set(
        &mut self,
        out: &mut Applied,
        cause: EffectId,
        target: EntityId,
        field: Field,
        new: FieldValue,
    ) -> Result<()> {
        let Some(old) = self.world.read_field(Some(target), &field) else {
            self.note(format!("{} has no {}", target, field));
            return Ok(());
        };
        if old == new {
            return Ok(());
        }
        self.world.write_field(Some(target), &field, &new)?;
        out.changes.push(FieldChange { target: Some(target), field, old, new, cause });
        Ok(())
    }

    fn absorb(&mut self, out: &mut Applied, cause: EffectId, project: EntityId, result: TrackerOutcome) {
        for (field, old, new) in result.changes {
            out.changes.push(FieldChange { target: Some(project), field, old, new, cause });
        }
        out.children.extend(result.effects);
    }

    fn expire_story(&mut self, cause: EffectId, story: StoryId, out: &mut Applied) -> Result<()> {
        let Some(owner) = self.world.overlay.story(story).map(|s| s.owner) else {
            self.note(format!("{} not found, expiry skipped", story));
            out.no_target = true;
            return Ok(());
        };
        let target = match owner {
            StoryOwner::Entity(id) => Some(id),
            StoryOwner::World => None,
        };
        out.targets.extend(target);

        let was_expired = self.world.overlay.story(story).is_some_and(|s| s.expired);
        if was_expired {
            return Ok(());
        }
        let victim = self.world.overlay.expire_story(story, self.ctx.cascade)?;
        out.changes.push(FieldChange {
            target,
            field: Field::StoryExpired(story),
            old: FieldValue::Flag(false),
            new: FieldValue::Flag(true),
            cause,
        });
        if let Some(victim) = victim {
            out.children.push(Effect::on(victim, EffectKind::DestroyEntity));
        }
        Ok(())
    }

    /// Introduce the draft's entity and attach its story, logging both whole
    fn confirm_rumor(&mut self, cause: EffectId, draft: &RumorDraft, out: &mut Applied) -> Result<()> {
        let introduced = draft.new_entity.as_ref().map(|e| e.id);
        let target = match draft.owner {
            StoryOwner::Entity(id) => Some(id),
            StoryOwner::World => None,
        };
        let story = draft.clone().confirm(&mut self.world.overlay)?;

        if let Some(id) = introduced {
            let new = self.world.read_field(Some(id), &Field::Introduced).unwrap_or(FieldValue::Absent);
            out.changes.push(FieldChange { target: Some(id), field: Field::Introduced, old: FieldValue::Absent, new, cause });
        }
        out.targets.extend(target);
        let new = self.world.read_field(target, &Field::Story(story)).unwrap_or(FieldValue::Absent);
        out.changes.push(FieldChange { target, field: Field::Story(story), old: FieldValue::Absent, new, cause });
        Ok(())
    }

    fn flip_mystery(&mut self, cause: EffectId, story: StoryId, out: &mut Applied) -> Result<()> {
        let Some((owner, check)) = self.world.overlay.story(story).and_then(|s| {
            let mystery = s.mystery.as_ref().filter(|m| !m.flipped)?;
            Some((s.owner, (mystery.skill.clone(), mystery.difficulty)))
        }) else {
            self.note(format!("{} has no hidden mystery", story));
            out.no_target = true;
            return Ok(());
        };
        let target = match owner {
            StoryOwner::Entity(id) => Some(id),
            StoryOwner::World => None,
        };
        out.targets.extend(target);

        let character = self.record.subject;
        let rank = character
            .and_then(|id| self.world.character(id))
            .map_or(0, |c| c.skill_rank(&check.0));
        let request = AdjudicationRequest::Mystery {
            character,
            story,
            check: RankedCheck { skill: check.0, difficulty: check.1, rank },
        };

        match self.adjudicator.adjudicate(&request, &mut self.rng) {
            Some(Verdict::Success { .. }) => {
                self.world.write_field(target, &Field::MysteryFlipped(story), &FieldValue::Flag(true))?;
                out.changes.push(FieldChange {
                    target,
                    field: Field::MysteryFlipped(story),
                    old: FieldValue::Flag(false),
                    new: FieldValue::Flag(true),
                    cause,
                });
            }
            Some(Verdict::Failure { .. }) => self.note(format!("the mystery of {} stays hidden", story)),
            Some(Verdict::Override(effects)) => out.children.extend(effects),
            Some(Verdict::Played(_)) => return Err(Self::misplayed(&request)),
            None => self.unavailable(&request)?,
        }
        Ok(())
    }
}
