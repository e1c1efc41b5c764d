//! Phase-shift schedules that drive the circular lag enumeration.
//!
//! A schedule pairs a cycle length (the period used to wrap shifted
//! timestamps) with the ordered list of shift offsets sampled across that
//! cycle. The auto-derived integer schedule stops one step short of the
//! period; the parameterised and uniform schedules include their upper bound.

use crate::report::LagError;

/// Relative slack used when snapping `(end - start) / step` to a whole
/// number of steps, so `0.0..=0.3` by `0.1` still yields four offsets.
const SNAP_TOLERANCE: f64 = 1e-9;

/// Rule for deriving the period and shift offsets of a run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "report-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShiftPolicy {
    /// `period = floor(max(u ∪ v)) + 1`, offsets `0, 1, ..., period - 1`.
    #[default]
    AutoDerived,
    /// `period = end + step`, offsets `start, start + step, ..., end`.
    Parameterized { start: f64, end: f64, step: f64 },
    /// Explicit period, offsets `0, step, 2·step, ...` while `≤ period`.
    Uniform { period: f64, step: f64 },
}

impl ShiftPolicy {
    /// Short label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            ShiftPolicy::AutoDerived => "auto",
            ShiftPolicy::Parameterized { .. } => "parameterized",
            ShiftPolicy::Uniform { .. } => "uniform",
        }
    }
}

/// Resolved period and offsets for one pair of trains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftSchedule {
    period: f64,
    start: f64,
    step: f64,
    count: usize,
}

impl ShiftSchedule {
    /// Resolves `policy` against the trains it will be applied to.
    ///
    /// Only [`ShiftPolicy::AutoDerived`] looks at the timestamps. With no
    /// timestamps at all it falls back to the unit cycle (`period = 1`, a
    /// single identity shift). Timestamps are assumed finite.
    pub fn resolve(policy: ShiftPolicy, u: &[f64], v: &[f64]) -> Result<Self, LagError> {
        match policy {
            ShiftPolicy::AutoDerived => {
                let latest = u
                    .iter()
                    .chain(v.iter())
                    .copied()
                    .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |m| m.max(t))))
                    .unwrap_or(0.0);
                Self::auto_derived(latest)
            }
            ShiftPolicy::Parameterized { start, end, step } => {
                Self::parameterized(start, end, step)
            }
            ShiftPolicy::Uniform { period, step } => Self::uniform(period, step),
        }
    }

    /// Integer cycle covering every timestamp up to `latest`.
    pub fn auto_derived(latest: f64) -> Result<Self, LagError> {
        let period = latest.floor() + 1.0;
        validate_period(period)?;
        Ok(Self {
            period,
            start: 0.0,
            step: 1.0,
            count: shift_count(period)?,
        })
    }

    /// Offsets `start..=end` by `step` over a cycle of `end + step`.
    pub fn parameterized(start: f64, end: f64, step: f64) -> Result<Self, LagError> {
        validate_step(step)?;
        if !start.is_finite() || !end.is_finite() || end < start {
            return Err(LagError::InvalidRange { start, end });
        }
        let period = end + step;
        validate_period(period)?;
        Ok(Self {
            period,
            start,
            step,
            count: inclusive_count(start, end, step)?,
        })
    }

    /// Offsets `0..=period` by `step` over a cycle of `period`.
    pub fn uniform(period: f64, step: f64) -> Result<Self, LagError> {
        validate_period(period)?;
        validate_step(step)?;
        Ok(Self {
            period,
            start: 0.0,
            step,
            count: inclusive_count(0.0, period, step)?,
        })
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of shift positions sampled per cycle.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The `k`-th offset, computed directly rather than by accumulation.
    #[inline]
    pub fn offset(&self, k: usize) -> f64 {
        self.start + k as f64 * self.step
    }

    pub fn offsets(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.count).map(move |k| self.offset(k))
    }

    /// Shifts `t` by `offset` and wraps it back onto the cycle.
    #[inline]
    pub fn wrap(&self, t: f64, offset: f64) -> f64 {
        wrap_phase(t + offset, self.period)
    }
}

/// Maps `t` into `[0, period)` using the Euclidean remainder.
///
/// `rem_euclid` can round up to exactly `period` for tiny negative inputs;
/// that case folds back to zero.
#[inline]
pub fn wrap_phase(t: f64, period: f64) -> f64 {
    let wrapped = t.rem_euclid(period);
    if wrapped >= period {
        0.0
    } else {
        wrapped
    }
}

fn inclusive_count(start: f64, end: f64, step: f64) -> Result<usize, LagError> {
    let span = (end - start) / step;
    let nearest = span.round();
    let whole = if (span - nearest).abs() <= SNAP_TOLERANCE * nearest.abs().max(1.0) {
        nearest
    } else {
        span.floor()
    };
    shift_count(whole + 1.0)
}

/// Converts a whole number of shifts to `usize`, rejecting counts that do not
/// fit (including the infinite count of an overflowing `span / step`).
fn shift_count(count: f64) -> Result<usize, LagError> {
    if count < usize::MAX as f64 {
        Ok(count as usize)
    } else {
        Err(LagError::TooManyShifts { count })
    }
}

fn validate_period(period: f64) -> Result<(), LagError> {
    if period.is_finite() && period > 0.0 {
        Ok(())
    } else {
        Err(LagError::InvalidPeriod { period })
    }
}

fn validate_step(step: f64) -> Result<(), LagError> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(LagError::InvalidStep { step })
    }
}
