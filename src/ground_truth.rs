//! Reference labels for the evaluation path.
//!
//! Real evaluation needs an independently labelled record file. When none is
//! available the run can fall back to [`synthesize`], which copies the
//! predictions and flips roughly one label in ten. Scores computed against
//! synthetic labels only show that the metric plumbing works; they say nothing
//! about detector accuracy, and every report states which source was used.

use crate::error::Result;
use crate::record::{EventCategory, RecordStore};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Probability that a synthetic label disagrees with the prediction
pub const FLIP_PROBABILITY: f64 = 0.10;

/// Seed used when the caller does not supply one
pub const DEFAULT_SEED: u64 = 42;

/// Where reference labels come from for one evaluation run
#[derive(Debug, Clone)]
pub enum GroundTruthSource {
    /// Labels from a record file annotated independently of the detector
    Recorded(RecordStore),
    /// Predictions with seeded label noise; not a correctness oracle
    Synthetic { seed: u64 },
}

/// How the report describes the reference labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundTruthKind {
    Recorded,
    Synthetic,
}

impl GroundTruthSource {
    pub fn load_recorded(path: &Path) -> Result<Self> {
        Ok(GroundTruthSource::Recorded(RecordStore::load(path)?))
    }

    pub fn kind(&self) -> GroundTruthKind {
        match self {
            GroundTruthSource::Recorded(_) => GroundTruthKind::Recorded,
            GroundTruthSource::Synthetic { .. } => GroundTruthKind::Synthetic,
        }
    }

    /// Reference labels for `category`, given the detector's own labels for it
    pub fn labels_for(&self, category: EventCategory, predicted: &[bool]) -> Vec<bool> {
        match self {
            GroundTruthSource::Recorded(store) => category.labels(store.records()),
            // Stand-in only: each category restarts from the run seed so results do not
            // depend on the order categories are evaluated in.
            GroundTruthSource::Synthetic { seed } => synthesize(predicted, *seed, FLIP_PROBABILITY),
        }
    }
}

/// Copy `predicted`, flipping each label independently with `flip_probability`
///
/// The generator is created from `seed` on every call, so the output is a pure
/// function of `(predicted, seed, flip_probability)`.
pub fn synthesize(predicted: &[bool], seed: u64, flip_probability: f64) -> Vec<bool> {
    let mut rng = StdRng::seed_from_u64(seed);
    let keep_below = 1.0 - flip_probability;
    predicted
        .iter()
        .map(|&label| {
            let draw: f64 = rng.random();
            if draw > keep_below { !label } else { label }
        })
        .collect()
}
