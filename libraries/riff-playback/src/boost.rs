//! Weighted-random selection of a promoted track
//!
//! Each boosted track wins with probability `level / total`. Entries are
//! scanned in id order, so a seeded generator makes the pick reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use riff_core::{BoostLevels, TrackId};

/// Pick one id from `levels` using `rng`
///
/// Levels below 1 are ignored. Returns `None` when nothing is boosted.
pub fn select_weighted<R: Rng + ?Sized>(levels: &BoostLevels, rng: &mut R) -> Option<TrackId> {
    let candidates: Vec<(&TrackId, u64)> = levels
        .iter()
        .filter(|&(_, &level)| level >= 1)
        .map(|(id, &level)| (id, u64::from(level)))
        .collect();

    let total: u64 = candidates.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return None;
    }

    let draw = rng.gen_range(0..total);
    let mut cumulative = 0u64;
    for (id, weight) in &candidates {
        cumulative += *weight;
        if cumulative > draw {
            return Some((*id).clone());
        }
    }

    // Scan exhausted without a hit: last entry wins
    candidates.last().map(|(id, _)| (*id).clone())
}

/// Pick one id using the thread-local generator
pub fn select(levels: &BoostLevels) -> Option<TrackId> {
    select_weighted(levels, &mut rand::thread_rng())
}

/// Boost selector owned by a playback session
#[derive(Debug, Clone)]
pub struct BoostSelector {
    rng: StdRng,
}

impl BoostSelector {
    /// Selector seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic selector (tests, reproducible renders)
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick one boosted track id
    pub fn pick(&mut self, levels: &BoostLevels) -> Option<TrackId> {
        select_weighted(levels, &mut self.rng)
    }
}

impl Default for BoostSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(entries: &[(&str, u32)]) -> BoostLevels {
        entries.iter().map(|(id, l)| (TrackId::new(*id), *l)).collect()
    }

    #[test]
    fn empty_or_zero_levels_pick_nothing() {
        let mut selector = BoostSelector::seeded(1);
        assert_eq!(selector.pick(&BoostLevels::new()), None);
        assert_eq!(selector.pick(&levels(&[("a", 0), ("b", 0)])), None);
    }

    #[test]
    fn single_candidate_always_wins() {
        let mut selector = BoostSelector::seeded(7);
        let levels = levels(&[("a", 0), ("only", 5)]);
        for _ in 0..100 {
            assert_eq!(selector.pick(&levels), Some(TrackId::new("only")));
        }
    }

    #[test]
    fn distribution_follows_weights() {
        let mut selector = BoostSelector::seeded(42);
        let levels = levels(&[("A", 1), ("B", 3), ("C", 1)]);
        let draws = 10_000;

        let mut counts = std::collections::HashMap::new();
        for _ in 0..draws {
            *counts.entry(selector.pick(&levels).unwrap()).or_insert(0usize) += 1;
        }

        let share = |id: &str| counts.get(&TrackId::new(id)).copied().unwrap_or(0) as f64 / draws as f64;
        assert!((share("A") - 0.2).abs() < 0.03, "A share {}", share("A"));
        assert!((share("B") - 0.6).abs() < 0.03, "B share {}", share("B"));
        assert!((share("C") - 0.2).abs() < 0.03, "C share {}", share("C"));
    }

    #[test]
    fn same_seed_same_picks() {
        let levels = levels(&[("a", 2), ("b", 2), ("c", 9)]);
        let mut first = BoostSelector::seeded(99);
        let mut second = BoostSelector::seeded(99);

        for _ in 0..50 {
            assert_eq!(first.pick(&levels), second.pick(&levels));
        }
    }

    #[test]
    fn thread_rng_variant_picks_a_candidate() {
        let levels = levels(&[("x", 1)]);
        assert_eq!(select(&levels), Some(TrackId::new("x")));
    }
}
