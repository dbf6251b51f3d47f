//! Deterministic random number generation.
//!
//! RULE: Nothing in the registry may call any platform RNG.
//! All randomness flows through WorkerRng instances derived
//! from the single master seed in SimConfig.
//!
//! Each worker gets its own RNG stream, seeded deterministically
//! from (master_seed XOR slot_index). This means:
//!   - Adding a new worker never changes existing workers' streams.
//!   - Each worker's stream is fully reproducible in isolation.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single worker.
pub struct WorkerRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl WorkerRng {
    /// Create a worker RNG from the master seed and a stable
    /// slot index. The index must never change once assigned.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index in [0, len). `len` must be non-zero.
    pub fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "pick_index on empty range");
        let len = len.max(1) as u64;
        (self.inner.next_u64() % len) as usize
    }

    /// Uniform signed draw in [-swing, swing].
    pub fn swing(&mut self, swing: u32) -> i64 {
        let span = u64::from(swing) * 2 + 1;
        (self.inner.next_u64() % span) as i64 - i64::from(swing)
    }
}

/// All worker RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_slot(&self, slot: WorkerSlot) -> WorkerRng {
        WorkerRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries — only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum WorkerSlot {
    StatusDrift = 0,
    Traffic = 1,
    EmergencyScenario = 2,
    Proximity = 3,
}

impl WorkerSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StatusDrift => "status_drift",
            Self::Traffic => "traffic",
            Self::EmergencyScenario => "emergency_scenario",
            Self::Proximity => "proximity",
        }
    }
}
