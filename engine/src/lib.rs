//! Turn-based tactical combat resolution on small fixed grids.
//!
//! A [`battle::Battle`] owns the whole mutable state of one fight plus the
//! seeded [`Dice`] it draws from. Everything else in the crate is either
//! immutable data ([`model`], [`grid`]) or pure resolution logic
//! ([`damage`], [`combat::targeting`], [`status`]).

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod api;
pub mod battle;
pub mod combat;
pub mod content;
pub mod damage;
pub mod error;
pub mod event;
pub mod grid;
pub mod life;
pub mod model;
pub mod scenario;
pub mod status;

pub use battle::{Action, Battle, BattleSetup, Outcome, Placement, Side, UnitId};
pub use error::{Rejection, SetupError};
pub use grid::{Grid, Position};

#[derive(Debug, Clone)]
enum Source {
    Seeded(ChaCha8Rng),
    /// Fixed unit draws in `[0, 1)`, cycled when exhausted.
    Scripted { draws: VecDeque<f64> },
}

/// The single random stream a battle draws from.
///
/// Every roll in the engine goes through [`Dice::unit`], so a battle replayed
/// with the same seed and the same actions draws the same numbers in the same
/// order.
#[derive(Debug, Clone)]
pub struct Dice {
    source: Source,
    draws: u64,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { source: Source::Seeded(ChaCha8Rng::seed_from_u64(seed)), draws: 0 }
    }

    /// Dice that return `draws` in order, wrapping around. Values are clamped into `[0, 1)`.
    pub fn from_scripted(draws: Vec<f64>) -> Self {
        let draws = draws
            .into_iter()
            .map(|d| d.clamp(0.0, 1.0 - f64::EPSILON))
            .collect::<VecDeque<_>>();
        Self { source: Source::Scripted { draws }, draws: 0 }
    }

    /// Number of values drawn so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn unit(&mut self) -> f64 {
        self.draws += 1;
        match &mut self.source {
            Source::Seeded(rng) => rng.gen_range(0.0..1.0),
            Source::Scripted { draws } => match draws.pop_front() {
                Some(d) => {
                    draws.push_back(d);
                    d
                }
                None => 0.0,
            },
        }
    }

    /// A percentile roll in `[0, 100)`.
    pub fn percent(&mut self) -> f64 {
        self.unit() * 100.0
    }

    /// True with probability `chance`% (values outside 0..=100 saturate).
    pub fn chance(&mut self, chance: f64) -> bool {
        self.percent() < chance
    }

    /// Uniform integer in `lo..=hi`. Swapped bounds are tolerated.
    pub fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let span = (hi - lo) as f64 + 1.0;
        let offset = (self.unit() * span).floor() as u32;
        lo + offset.min(hi - lo)
    }
}
