use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Named RNG streams derived from a single master seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    master_seed: u64,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self { master_seed: seed }
    }

    /// Use the given seed, or draw one from entropy.
    pub fn from_optional(seed: Option<u64>) -> Self {
        Self::new(seed.unwrap_or_else(rand::random))
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    // Hash the stream name with the master seed so each component is independent
    pub fn get_rng(&self, name: &str) -> ChaCha8Rng {
        let mut hasher = DefaultHasher::new();
        self.master_seed.hash(&mut hasher);
        name.hash(&mut hasher);
        ChaCha8Rng::seed_from_u64(hasher.finish())
    }

    /// Stream for an indexed sub-component, e.g. one per rendered frame.
    pub fn get_indexed_rng(&self, name: &str, index: u64) -> ChaCha8Rng {
        let mut hasher = DefaultHasher::new();
        self.master_seed.hash(&mut hasher);
        name.hash(&mut hasher);
        index.hash(&mut hasher);
        ChaCha8Rng::seed_from_u64(hasher.finish())
    }
}
