//! Classification metrics for binary event labels
//!
//! Each event category is scored independently: the detector's labels are
//! compared elementwise with reference labels to fill a 2×2 confusion matrix,
//! and accuracy, precision, recall and F1 are derived from it.
//!
//! # Degenerate cases
//!
//! Every ratio has a zero-denominator branch that resolves to `0.0`:
//!
//! - accuracy with no samples
//! - precision with no positive predictions
//! - recall with no positive reference labels
//! - F1 when precision and recall are both zero
//!
//! No metric is ever NaN, so the report always serializes to plain numbers.

use crate::error::{AnalysisError, Result};
use nalgebra::Matrix2;

/// Counts of (reference, predicted) outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfusionMatrix {
    pub true_negative: u64,
    pub false_positive: u64,
    pub false_negative: u64,
    pub true_positive: u64,
}

impl ConfusionMatrix {
    /// Compare `truth` and `pred` position by position
    ///
    /// Fails with `LabelLengthMismatch` if the sequences differ in length.
    pub fn from_labels(truth: &[bool], pred: &[bool]) -> Result<Self> {
        if truth.len() != pred.len() {
            return Err(AnalysisError::LabelLengthMismatch { truth: truth.len(), pred: pred.len() });
        }

        let mut matrix = ConfusionMatrix::default();
        for (&t, &p) in truth.iter().zip(pred) {
            match (t, p) {
                (false, false) => matrix.true_negative += 1,
                (false, true) => matrix.false_positive += 1,
                (true, false) => matrix.false_negative += 1,
                (true, true) => matrix.true_positive += 1,
            }
        }
        Ok(matrix)
    }

    pub fn total(&self) -> u64 {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// Rows are the reference label, columns the prediction: `[[tn, fp], [fn, tp]]`
    pub fn grid(&self) -> Matrix2<u64> {
        Matrix2::new(self.true_negative, self.false_positive, self.false_negative, self.true_positive)
    }

    /// The grid as nested rows, the shape written to the results document
    pub fn rows(&self) -> [[u64; 2]; 2] {
        let g = self.grid();
        [[g[(0, 0)], g[(0, 1)]], [g[(1, 0)], g[(1, 1)]]]
    }
}

/// Scores for one event category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsResult {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

impl MetricsResult {
    pub fn evaluate(truth: &[bool], pred: &[bool]) -> Result<Self> {
        Ok(Self::from_confusion(ConfusionMatrix::from_labels(truth, pred)?))
    }

    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let accuracy = ratio(confusion.true_positive + confusion.true_negative, confusion.total());
        let precision = ratio(confusion.true_positive, confusion.true_positive + confusion.false_positive);
        let recall = ratio(confusion.true_positive, confusion.true_positive + confusion.false_negative);
        let f1 = if precision + recall > 0.0 { 2.0 * precision * recall / (precision + recall) } else { 0.0 };
        Self { accuracy, precision, recall, f1, confusion }
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den > 0 { num as f64 / den as f64 } else { 0.0 }
}
