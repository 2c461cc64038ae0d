use common::{EngineError, PriceSeries, Result, StochasticParameters, StochasticSet};

use super::sma::smooth_defined;

/// %K reported when the lookback window has no range
pub const FLAT_RANGE_SENTINEL: f64 = 50.0;

/// Minimum bars for every component to be defined on the last bar
pub fn stochastic_min_len(params: &StochasticParameters) -> usize {
    params.k_period + 2 * params.d_period.saturating_sub(1)
}

/// Calculate the Stochastic Oscillator
///
/// fast %K compares adjusted close with the `k_period` high/low range,
/// fast %D is its `d_period` SMA, slow %K is fast %D and slow %D is the
/// `d_period` SMA of slow %K.
pub fn compute_stochastic(
    series: &PriceSeries,
    params: &StochasticParameters,
) -> Result<Vec<StochasticSet>> {
    if params.k_period == 0 || params.d_period == 0 {
        return Err(EngineError::InvalidParameter(format!(
            "stochastic periods must be positive, got k={} d={}",
            params.k_period, params.d_period
        )));
    }
    series.require_len(stochastic_min_len(params))?;

    let bars = series.bars();
    let mut fast_k = vec![None; bars.len()];

    for i in (params.k_period - 1)..bars.len() {
        let window = &bars[i + 1 - params.k_period..=i];
        let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);

        fast_k[i] = Some(percent_k(bars[i].adj_close, lowest, highest));
    }

    let fast_d = smooth_defined(&fast_k, params.d_period);
    let slow_d = smooth_defined(&fast_d, params.d_period);

    Ok((0..bars.len())
        .map(|i| StochasticSet {
            fast_k: fast_k[i],
            fast_d: fast_d[i],
            slow_k: fast_d[i],
            slow_d: slow_d[i],
        })
        .collect())
}

fn percent_k(close: f64, lowest: f64, highest: f64) -> f64 {
    let range = highest - lowest;
    if range <= 0.0 {
        return FLAT_RANGE_SENTINEL;
    }
    100.0 * (close - lowest) / range
}
