//! Circular lag enumeration between paired spike trains.
//!
//! Given two trains of firing times, `u` and `v`, the crate collects every
//! difference `u_i - v_j` within a threshold `epsilon` while `u` is rotated
//! around a periodic timeline. Each rotation wraps the shifted timestamps
//! back into `[0, period)`, so lags are measured on a circle instead of a
//! line.
//!
//! [`compute_lags`] is the plain pairwise filter. [`CircularLagEnumerator`]
//! drives it across a [`ShiftSchedule`] resolved from a [`ShiftPolicy`] and
//! reports the outcome as a [`LagRun`]. Sorting or binning the lags is left to callers.

pub mod enumerator;
pub mod pairwise;
pub mod report;
pub mod schedule;

pub use enumerator::{
    lag_vector_auto, lag_vector_parameterized, lag_vector_uniform, CircularLagEnumerator,
    DEFAULT_EPSILON,
};
pub use pairwise::{compute_lags, extend_lags, sort_lags};
pub use report::{LagError, LagRun, TrainSide};
pub use schedule::{wrap_phase, ShiftPolicy, ShiftSchedule};
