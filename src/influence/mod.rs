//! Influence-weighted trait selection
//!
//! Every (radius, weight) pair of an entity that covers the anchor adds
//! `weight` slots for that entity to a materialized pool. Sparse pools are
//! padded with "nothing" slots up to the configured minimum, then one slot
//! is drawn uniformly. A single draw per sample keeps the cost bounded and
//! the result fixed for a given seed.

use rand::Rng;

use crate::core::types::{EntityId, HexCoord};
use crate::entity::{InfluenceSource, Trait};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfluencePool {
    pub min_pool_size: u32,
}

impl InfluencePool {
    pub fn new(min_pool_size: u32) -> Self {
        Self { min_pool_size }
    }

    /// Slots for `anchor`: `Some(i)` names `sources[i]`, `None` is nothing
    ///
    /// Sources are visited in entity id order regardless of input order.
    pub fn slots(&self, anchor: &HexCoord, sources: &[InfluenceSource]) -> Vec<Option<usize>> {
        let mut order: Vec<usize> = (0..sources.len()).collect();
        order.sort_by_key(|&i| sources[i].entity);

        let mut slots = Vec::new();
        for i in order {
            let source = &sources[i];
            for range in &source.ranges {
                let covered = source.tokens.iter().any(|t| t.distance(anchor) <= range.radius);
                if covered {
                    slots.extend(std::iter::repeat(Some(i)).take(range.weight as usize));
                }
            }
        }
        let min = self.min_pool_size as usize;
        if slots.len() < min {
            slots.resize(min, None);
        }
        slots
    }

    /// Total weight covering `anchor`, before padding
    pub fn covering_weight(&self, anchor: &HexCoord, sources: &[InfluenceSource]) -> u32 {
        self.slots(anchor, sources).iter().filter(|s| s.is_some()).count() as u32
    }

    /// Draw an entity and one of its traits, or nothing
    pub fn sample<R: Rng>(
        &self,
        anchor: &HexCoord,
        sources: &[InfluenceSource],
        rng: &mut R,
    ) -> Option<(EntityId, Trait)> {
        let slots = self.slots(anchor, sources);
        if slots.is_empty() {
            return None;
        }
        let drawn = slots[rng.gen_range(0..slots.len())]?;
        let source = &sources[drawn];
        if source.traits.is_empty() {
            tracing::debug!("Influence drew {} at {} but it has no traits", source.entity, anchor);
            return None;
        }
        let chosen = source.traits[rng.gen_range(0..source.traits.len())].clone();
        tracing::debug!("Influence drew '{}' of {} at {}", chosen.name, source.entity, anchor);
        Some((source.entity, chosen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::InfluenceRange;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn source(id: u32, at: HexCoord, radius: u32, weight: u32) -> InfluenceSource {
        InfluenceSource {
            entity: EntityId(id),
            tokens: vec![at],
            ranges: vec![InfluenceRange { radius, weight }],
            traits: vec![
                Trait { name: format!("trait-a-{}", id), modifiers: vec![] },
                Trait { name: format!("trait-b-{}", id), modifiers: vec![] },
            ],
        }
    }

    #[test]
    fn test_padding_up_to_minimum() {
        let pool = InfluencePool::new(8);
        let sources = vec![source(1, HexCoord::new(0, 0), 2, 3)];
        let slots = pool.slots(&HexCoord::new(1, 0), &sources);
        assert_eq!(slots.len(), 8);
        assert_eq!(slots.iter().filter(|s| s.is_none()).count(), 5);
    }

    #[test]
    fn test_no_padding_when_weight_exceeds_minimum() {
        let pool = InfluencePool::new(8);
        let sources = vec![source(1, HexCoord::new(0, 0), 2, 6), source(2, HexCoord::new(1, 0), 1, 6)];
        let slots = pool.slots(&HexCoord::new(0, 0), &sources);
        assert_eq!(slots.len(), 12);
        assert!(slots.iter().all(|s| s.is_some()));
    }

    #[test]
    fn test_out_of_range_sources_ignored() {
        let pool = InfluencePool::new(8);
        let sources = vec![source(1, HexCoord::new(10, 0), 2, 5)];
        assert_eq!(pool.covering_weight(&HexCoord::new(0, 0), &sources), 0);

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(pool.sample(&HexCoord::new(0, 0), &sources, &mut rng).is_none());
    }

    #[test]
    fn test_sample_deterministic_for_seed() {
        let pool = InfluencePool::new(8);
        let sources = vec![source(2, HexCoord::new(0, 0), 3, 4), source(1, HexCoord::new(1, 1), 3, 4)];
        let mut reversed = sources.clone();
        reversed.reverse();

        for seed in 0..20 {
            let a = pool.sample(&HexCoord::new(0, 0), &sources, &mut ChaCha8Rng::seed_from_u64(seed));
            let b = pool.sample(&HexCoord::new(0, 0), &reversed, &mut ChaCha8Rng::seed_from_u64(seed));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_nothing_frequency_matches_padding() {
        // W = 2, min = 8: nothing with probability 6/8
        let pool = InfluencePool::new(8);
        let sources = vec![source(1, HexCoord::new(0, 0), 1, 2)];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let trials = 8000;
        let nothing = (0..trials)
            .filter(|_| pool.sample(&HexCoord::new(0, 0), &sources, &mut rng).is_none())
            .count();
        let observed = nothing as f64 / trials as f64;
        assert!((observed - 0.75).abs() < 0.03, "observed {}", observed);
    }

    proptest! {
        #[test]
        fn prop_nothing_slots_match_formula(weight in 0u32..8, min in 1u32..16) {
            let pool = InfluencePool::new(min);
            let sources = vec![source(1, HexCoord::new(0, 0), 1, weight)];
            let slots = pool.slots(&HexCoord::new(0, 0), &sources);
            let nothing = slots.iter().filter(|s| s.is_none()).count() as u32;
            if weight < min {
                prop_assert_eq!(slots.len() as u32, min);
                prop_assert_eq!(nothing, min - weight);
            } else {
                prop_assert_eq!(nothing, 0);
            }
        }
    }
}
