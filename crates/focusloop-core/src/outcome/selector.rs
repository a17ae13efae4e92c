//! Reward/punishment token selection.
//!
//! Selection is an injectable strategy so tests can substitute a
//! deterministic selector for the uniform-random default. Draws are with
//! replacement; repeats across consecutive sessions are allowed.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Strategy for drawing one token from a configured list.
pub trait TokenSelector {
    /// Draw a token. An empty list yields `None` (no selection, no modal).
    fn select(&mut self, options: &[String]) -> Option<String>;
}

/// Uniform-random selection with replacement.
pub struct UniformSelector<R: Rng> {
    rng: R,
}

impl UniformSelector<Pcg64Mcg> {
    /// Entropy-seeded selector for production use.
    pub fn from_entropy() -> Self {
        Self {
            rng: Pcg64Mcg::from_entropy(),
        }
    }

    /// Deterministic selector for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> TokenSelector for UniformSelector<R> {
    fn select(&mut self, options: &[String]) -> Option<String> {
        options.choose(&mut self.rng).cloned()
    }
}

/// Always selects the first entry. For tests.
#[derive(Debug, Default)]
pub struct FirstSelector;

impl TokenSelector for FirstSelector {
    fn select(&mut self, options: &[String]) -> Option<String> {
        options.first().cloned()
    }
}
