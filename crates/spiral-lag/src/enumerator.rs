use crate::pairwise::extend_lags;
use crate::report::{LagError, LagRun, TrainSide};
use crate::schedule::{ShiftPolicy, ShiftSchedule};
use tracing::{debug, trace};

/// Default inclusion threshold. Large enough to keep every lag of a
/// demonstration-sized cycle.
pub const DEFAULT_EPSILON: f64 = 10.0;

/// Rotates one spike train around a cycle and collects the lags it forms
/// with a fixed reference train at every sampled phase.
///
/// For each offset `t` of the resolved [`ShiftSchedule`] the shifted train is
/// `(u_i + t) mod period`, and every difference against `v` within
/// `epsilon` is appended in shift order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularLagEnumerator {
    policy: ShiftPolicy,
    epsilon: f64,
}

impl Default for CircularLagEnumerator {
    fn default() -> Self {
        Self::new(ShiftPolicy::AutoDerived)
    }
}

impl CircularLagEnumerator {
    pub fn new(policy: ShiftPolicy) -> Self {
        Self {
            policy,
            epsilon: DEFAULT_EPSILON,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn policy(&self) -> ShiftPolicy {
        self.policy
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Runs the enumeration and returns the lags with a summary of the cycle.
    ///
    /// # Errors
    ///
    /// Fails before any lag is computed when `epsilon` is NaN or negative,
    /// when either train holds a non-finite timestamp, when the policy
    /// resolves to a non-positive period or step, or when the shift or pair
    /// count does not fit in a `usize`.
    pub fn run(&self, u: &[f64], v: &[f64]) -> Result<LagRun, LagError> {
        validate_epsilon(self.epsilon)?;
        validate_train(u, TrainSide::Shifted)?;
        validate_train(v, TrainSide::Reference)?;
        let schedule = ShiftSchedule::resolve(self.policy, u, v)?;
        let period = schedule.period();

        if u.is_empty() || v.is_empty() {
            debug!(policy = self.policy.label(), period, "empty train, no lags to enumerate");
            return Ok(LagRun::new(Vec::new(), self.policy, period, schedule.len(), 0));
        }

        let pairs_considered = u
            .len()
            .checked_mul(v.len())
            .and_then(|pairs| pairs.checked_mul(schedule.len()))
            .ok_or(LagError::TooManyPairs {
                shifted: u.len(),
                reference: v.len(),
                shifts: schedule.len(),
            })?;

        let mut shifted = Vec::with_capacity(u.len());
        let mut lags = Vec::new();
        for (index, offset) in schedule.offsets().enumerate() {
            shifted.clear();
            shifted.extend(u.iter().map(|&t| schedule.wrap(t, offset)));
            let before = lags.len();
            extend_lags(&shifted, v, self.epsilon, &mut lags);
            trace!(shift = index, offset, retained = lags.len() - before, "filtered shifted train");
        }

        debug!(
            policy = self.policy.label(),
            period,
            shifts = schedule.len(),
            pairs = pairs_considered,
            retained = lags.len(),
            "enumerated circular lags"
        );
        Ok(LagRun::new(
            lags,
            self.policy,
            period,
            schedule.len(),
            pairs_considered,
        ))
    }

    /// Flat lag collection for `u` rotated against `v`.
    pub fn lag_vector(&self, u: &[f64], v: &[f64]) -> Result<Vec<f64>, LagError> {
        self.run(u, v).map(LagRun::into_lags)
    }
}

/// Integer-mode lags: `period = floor(max(u ∪ v)) + 1`, unit shifts.
pub fn lag_vector_auto(u: &[f64], v: &[f64], epsilon: f64) -> Result<Vec<f64>, LagError> {
    CircularLagEnumerator::new(ShiftPolicy::AutoDerived)
        .with_epsilon(epsilon)
        .lag_vector(u, v)
}

/// Continuous-mode lags over shifts `start..=end` by `step`, period `end + step`.
pub fn lag_vector_parameterized(
    u: &[f64],
    v: &[f64],
    start: f64,
    end: f64,
    step: f64,
    epsilon: f64,
) -> Result<Vec<f64>, LagError> {
    CircularLagEnumerator::new(ShiftPolicy::Parameterized { start, end, step })
        .with_epsilon(epsilon)
        .lag_vector(u, v)
}

/// Lags over an explicit `period`, shifting by `step` up to and including it.
pub fn lag_vector_uniform(
    u: &[f64],
    v: &[f64],
    period: f64,
    step: f64,
    epsilon: f64,
) -> Result<Vec<f64>, LagError> {
    CircularLagEnumerator::new(ShiftPolicy::Uniform { period, step })
        .with_epsilon(epsilon)
        .lag_vector(u, v)
}

fn validate_epsilon(epsilon: f64) -> Result<(), LagError> {
    // +inf is a valid "keep everything" threshold.
    if epsilon >= 0.0 {
        Ok(())
    } else {
        Err(LagError::InvalidThreshold { epsilon })
    }
}

fn validate_train(train: &[f64], side: TrainSide) -> Result<(), LagError> {
    match train.iter().position(|t| !t.is_finite()) {
        Some(index) => Err(LagError::NonFiniteTimestamp {
            side,
            index,
            value: train[index],
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairwise::sort_lags;

    #[test]
    fn auto_mode_matches_hand_enumeration() {
        let run = CircularLagEnumerator::default()
            .run(&[1.0, 2.0], &[3.0])
            .expect("enumeration succeeds");
        assert_eq!(run.period, 4.0);
        assert_eq!(run.shifts, 4);
        // t = 0: [1, 2]; t = 1: [2, 3]; t = 2: [3, 0]; t = 3: [0, 1]
        assert_eq!(run.lags, vec![-2.0, -1.0, -1.0, 0.0, 0.0, -3.0, -3.0, -2.0]);
        assert_eq!(run.pairs_considered, 8);
        assert_eq!(run.acceptance_ratio(), 1.0);
    }

    #[test]
    fn threshold_applies_after_wrapping() {
        let mut lags = CircularLagEnumerator::default()
            .with_epsilon(1.0)
            .lag_vector(&[1.0, 2.0], &[3.0])
            .unwrap();
        sort_lags(&mut lags);
        assert_eq!(lags, vec![-1.0, -1.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_trains_short_circuit() {
        let run = CircularLagEnumerator::default().run(&[], &[2.0]).unwrap();
        assert!(run.lags.is_empty());
        assert_eq!(run.pairs_considered, 0);
        assert!(lag_vector_auto(&[1.0], &[], 10.0).unwrap().is_empty());
        assert!(lag_vector_parameterized(&[], &[], 0.0, 3.0, 0.5, 10.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn negative_offsets_wrap_into_the_cycle() {
        let run = CircularLagEnumerator::new(ShiftPolicy::Parameterized {
            start: -1.0,
            end: 1.0,
            step: 1.0,
        })
        .with_epsilon(f64::INFINITY)
        .run(&[0.5], &[0.0])
        .unwrap();
        // period 2: offsets -1, 0, 1 put 0.5 at 1.5, 0.5, 1.5
        assert_eq!(run.lags, vec![1.5, 0.5, 1.5]);
    }

    #[test]
    fn rejects_invalid_threshold_and_timestamps() {
        assert_eq!(
            lag_vector_auto(&[1.0], &[2.0], -0.5),
            Err(LagError::InvalidThreshold { epsilon: -0.5 })
        );
        assert!(matches!(
            lag_vector_auto(&[1.0], &[2.0], f64::NAN),
            Err(LagError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            lag_vector_auto(&[1.0, f64::INFINITY], &[2.0], 1.0),
            Err(LagError::NonFiniteTimestamp {
                side: TrainSide::Shifted,
                index: 1,
                ..
            })
        ));
        assert!(matches!(
            lag_vector_uniform(&[1.0], &[f64::NAN], 4.0, 1.0, 1.0),
            Err(LagError::NonFiniteTimestamp {
                side: TrainSide::Reference,
                index: 0,
                ..
            })
        ));
        assert_eq!(
            lag_vector_uniform(&[1.0], &[2.0], -4.0, 1.0, 1.0),
            Err(LagError::InvalidPeriod { period: -4.0 })
        );
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_cycles_fail_before_enumerating() {
        let u = vec![0.5; 100];
        assert_eq!(
            lag_vector_uniform(&u, &[1.0], 1e18, 1.0, 1.0),
            Err(LagError::TooManyPairs {
                shifted: 100,
                reference: 1,
                shifts: 1_000_000_000_000_000_000,
            })
        );
        assert!(matches!(
            lag_vector_parameterized(&[1.0], &[1.0], 0.0, 1e20, 1.0, 1.0),
            Err(LagError::TooManyShifts { .. })
        ));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let enumerator = CircularLagEnumerator::new(ShiftPolicy::Uniform {
            period: 5.0,
            step: 0.5,
        });
        let u = [0.25, 1.5, 4.75];
        let v = [2.0, 3.25];
        assert_eq!(enumerator.run(&u, &v).unwrap(), enumerator.run(&u, &v).unwrap());
    }
}
