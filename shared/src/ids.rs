//! Identifier generation for pickups and projectiles.
//!
//! The game takes its generator as a trait object so tests can swap in the
//! sequential one and get predictable ids.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait IdGenerator: Send + Sync {
    /// Returns a fresh identifier starting with `prefix`.
    fn next_id(&mut self, prefix: &str) -> String;
}

/// Monotonic counter: `food-1`, `food-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, self.next.max(1));
        self.next = self.next.max(1) + 1;
        id
    }
}

/// Random eight character suffixes.
pub struct RandomIds {
    rng: StdRng,
}

impl RandomIds {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for RandomIds {
    fn next_id(&mut self, prefix: &str) -> String {
        let suffix: String = (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        format!("{}-{}", prefix, suffix.to_lowercase())
    }
}
