use common::{EngineError, Result};

/// Calculate Exponential Moving Average with span-based smoothing
///
/// # Arguments
/// * `values` - Slice of values
/// * `span` - EMA span; alpha = 2 / (span + 1)
///
/// # Returns
/// Vector of EMA values, each the decay-weighted mean of all values so far:
/// sum((1 - alpha)^i * x[t - i]) / sum((1 - alpha)^i)
pub fn compute_ema(values: &[f64], span: usize) -> Result<Vec<f64>> {
    if span == 0 {
        return Err(EngineError::InvalidParameter(
            "EMA span must be positive".to_string(),
        ));
    }
    if values.is_empty() {
        return Err(EngineError::InsufficientHistory {
            required: 1,
            actual: 0,
        });
    }

    let decay = 1.0 - 2.0 / (span as f64 + 1.0);
    let mut numerator = 0.0;
    let mut denominator = 0.0;

    let ema = values
        .iter()
        .map(|&value| {
            numerator = value + decay * numerator;
            denominator = 1.0 + decay * denominator;
            numerator / denominator
        })
        .collect();

    Ok(ema)
}
