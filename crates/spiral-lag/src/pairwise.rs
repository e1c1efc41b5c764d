//! Threshold filtering of pairwise differences between two spike trains.

/// Returns every difference `u_i - v_j` whose magnitude is at most `epsilon`.
///
/// Pairs are visited with `u` in the outer loop and `v` in the inner loop.
/// The function is total: empty trains produce an empty collection and no
/// input is validated. Non-finite timestamps yield unspecified lags.
pub fn compute_lags(u: &[f64], v: &[f64], epsilon: f64) -> Vec<f64> {
    let mut lags = Vec::new();
    extend_lags(u, v, epsilon, &mut lags);
    lags
}

/// Appends the lags of [`compute_lags`] to `out` without clearing it.
pub fn extend_lags(u: &[f64], v: &[f64], epsilon: f64, out: &mut Vec<f64>) {
    for &ui in u {
        for &vj in v {
            let lag = ui - vj;
            if lag.abs() <= epsilon {
                out.push(lag);
            }
        }
    }
}

/// Sorts lags ascending under the IEEE total order.
pub fn sort_lags(lags: &mut [f64]) {
    lags.sort_by(f64::total_cmp);
}
