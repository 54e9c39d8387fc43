use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random source shared by the strategies of one scheduler instance.
///
/// Seeded sources make placement decisions reproducible in tests.
#[derive(Debug)]
pub struct RandomSource {
    rng: Mutex<StdRng>,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Returns a value in `[0, upper)`. `upper` must be greater than zero.
    pub fn below(&self, upper: u64) -> u64 {
        // Poisoning leaves the generator state intact.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random_range(0..upper)
    }

    pub fn index(&self, len: usize) -> usize {
        self.below(len as u64) as usize
    }
}
