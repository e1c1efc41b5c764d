use approx::assert_relative_eq;
use spiral_lag::{
    compute_lags, lag_vector_auto, lag_vector_parameterized, lag_vector_uniform, sort_lags,
    wrap_phase, CircularLagEnumerator, ShiftPolicy, ShiftSchedule,
};

#[test]
fn integer_cycle_reproduces_reference_lags() {
    let mut lags = lag_vector_auto(&[1.0, 2.0], &[3.0], 10.0).expect("auto mode succeeds");
    sort_lags(&mut lags);
    assert_eq!(lags, vec![-3.0, -3.0, -2.0, -2.0, -1.0, -1.0, 0.0, 0.0]);
}

#[test]
fn continuous_cycle_samples_seven_phases() {
    let run = CircularLagEnumerator::new(ShiftPolicy::Parameterized {
        start: 0.0,
        end: 3.0,
        step: 0.5,
    })
    .run(&[1.0, 2.5], &[1.5])
    .expect("parameterized mode succeeds");

    assert_relative_eq!(run.period, 3.5);
    assert_eq!(run.shifts, 7);
    assert_eq!(run.lags.len(), 14);
    assert!(run.lags.iter().all(|lag| lag.is_finite()));
    // wrapped timestamps live in [0, 3.5), so lags against 1.5 stay in [-1.5, 2)
    assert!(run.lags.iter().all(|&lag| (-1.5..2.0).contains(&lag)));

    let flat = lag_vector_parameterized(&[1.0, 2.5], &[1.5], 0.0, 3.0, 0.5, 10.0).unwrap();
    assert_eq!(flat, run.lags);
}

#[test]
fn distant_spikes_produce_no_lags() {
    assert!(compute_lags(&[0.0], &[100.0], 1.0).is_empty());
}

#[test]
fn full_cycle_returns_train_to_alignment() {
    let u = [0.0, 1.25, 3.5, 6.0];
    let v = [2.0];
    let schedule = ShiftSchedule::resolve(ShiftPolicy::AutoDerived, &u, &v).unwrap();
    assert_eq!(schedule.period(), 7.0);
    assert_eq!(schedule.offset(0), 0.0);
    for &t in &u {
        let wrapped = schedule.wrap(t, schedule.period());
        assert_relative_eq!(wrapped, wrap_phase(t, schedule.period()));
        assert_relative_eq!(wrapped, t);
    }
}

#[test]
fn identity_shift_contributes_unwrapped_lags() {
    let u = [0.5, 2.0];
    let v = [1.0, 2.5];
    let direct = compute_lags(&u, &v, 10.0);
    let circular = lag_vector_auto(&u, &v, 10.0).unwrap();
    assert_eq!(&circular[..direct.len()], direct.as_slice());
    assert_eq!(circular.len(), direct.len() * 3);
}

#[test]
fn uniform_cycle_repeats_the_identity_phase() {
    let lags = lag_vector_uniform(&[1.0], &[0.0], 2.0, 1.0, 10.0).unwrap();
    // offsets 0, 1, 2 over period 2: the last shift lands back on the first
    assert_eq!(lags, vec![1.0, 0.0, 1.0]);
}

#[test]
fn wrapped_timestamps_never_reach_the_period() {
    let enumerator = CircularLagEnumerator::new(ShiftPolicy::Parameterized {
        start: 0.0,
        end: 0.9,
        step: 0.1,
    })
    .with_epsilon(f64::INFINITY);
    let run = enumerator.run(&[0.05, 0.55, 0.95], &[0.0]).unwrap();
    assert_eq!(run.shifts, 10);
    for lag in &run.lags {
        assert!((0.0..run.period).contains(lag), "lag {lag} escaped the cycle");
    }
}
