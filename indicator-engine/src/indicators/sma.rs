use common::{EngineError, IndicatorSeries, Result};

/// Calculate Simple Moving Average
///
/// # Arguments
/// * `values` - Slice of values
/// * `period` - SMA period
///
/// # Returns
/// Vector of Option<f64>, None for the first `period - 1` values
pub fn compute_sma(values: &[f64], period: usize) -> Result<IndicatorSeries> {
    if period == 0 {
        return Err(EngineError::InvalidParameter(
            "SMA period must be positive".to_string(),
        ));
    }
    if values.len() < period {
        return Err(EngineError::InsufficientHistory {
            required: period,
            actual: values.len(),
        });
    }

    let n = values.len();
    let mut sma = vec![None; n];

    // Calculate initial sum
    let mut sum: f64 = values[..period].iter().sum();
    sma[period - 1] = Some(sum / period as f64);

    // Sliding window for subsequent values
    for i in period..n {
        sum = sum - values[i - period] + values[i];
        sma[i] = Some(sum / period as f64);
    }

    Ok(sma)
}

/// Simple moving average over a partially defined series.
///
/// A window containing any `None` yields `None`, so warm-up windows chain
/// through successive smoothing passes.
pub fn smooth_defined(values: &[Option<f64>], period: usize) -> IndicatorSeries {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    for i in (period.saturating_sub(1))..values.len() {
        let window = &values[i + 1 - period..=i];
        if window.iter().all(|v| v.is_some()) {
            let sum: f64 = window.iter().flatten().sum();
            out[i] = Some(sum / period as f64);
        }
    }

    out
}
