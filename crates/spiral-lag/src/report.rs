use crate::schedule::ShiftPolicy;
use thiserror::Error;

/// Which of the two paired trains a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "report-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrainSide {
    /// The train that is phase-shifted around the cycle.
    Shifted,
    /// The train held fixed while the other one rotates.
    Reference,
}

impl std::fmt::Display for TrainSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainSide::Shifted => write!(f, "shifted"),
            TrainSide::Reference => write!(f, "reference"),
        }
    }
}

/// Errors that can be emitted while enumerating circular lags.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LagError {
    #[error("{side} train holds non-finite timestamp {value} at index {index}")]
    NonFiniteTimestamp {
        side: TrainSide,
        index: usize,
        value: f64,
    },
    #[error("invalid threshold {epsilon} (expected a non-negative value)")]
    InvalidThreshold { epsilon: f64 },
    #[error("invalid period {period} (expected a finite value > 0)")]
    InvalidPeriod { period: f64 },
    #[error("invalid shift step {step} (expected a finite value > 0)")]
    InvalidStep { step: f64 },
    #[error("invalid shift range {start}..={end}")]
    InvalidRange { start: f64, end: f64 },
    #[error("schedule needs {count} shifts, more than can be enumerated")]
    TooManyShifts { count: f64 },
    #[error("{shifted} x {reference} timestamps over {shifts} shifts overflow the pair count")]
    TooManyPairs {
        shifted: usize,
        reference: usize,
        shifts: usize,
    },
}

/// Summary of a single circular lag enumeration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "report-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LagRun {
    /// Retained lags in shift order (shifted train outer, reference inner).
    pub lags: Vec<f64>,
    pub policy: ShiftPolicy,
    pub period: f64,
    pub shifts: usize,
    /// Number of `(u_i, v_j)` pairs tested across every shift.
    pub pairs_considered: usize,
}

impl LagRun {
    pub(crate) fn new(
        lags: Vec<f64>,
        policy: ShiftPolicy,
        period: f64,
        shifts: usize,
        pairs_considered: usize,
    ) -> Self {
        Self {
            lags,
            policy,
            period,
            shifts,
            pairs_considered,
        }
    }

    pub fn retained(&self) -> usize {
        self.lags.len()
    }

    /// Fraction of tested pairs that fell inside the threshold.
    pub fn acceptance_ratio(&self) -> f64 {
        if self.pairs_considered == 0 {
            0.0
        } else {
            self.lags.len() as f64 / self.pairs_considered as f64
        }
    }

    /// Returns the lags in ascending order, leaving the run untouched.
    pub fn sorted_lags(&self) -> Vec<f64> {
        let mut lags = self.lags.clone();
        crate::pairwise::sort_lags(&mut lags);
        lags
    }

    pub fn into_lags(self) -> Vec<f64> {
        self.lags
    }
}
