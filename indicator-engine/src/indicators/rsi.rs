use common::{EngineError, IndicatorSeries, PriceField, PriceSeries, Result, RsiSmoothing};

/// Calculate RSI over one column of a price series
///
/// # Arguments
/// * `series` - Daily bars
/// * `field` - Column to read (adjusted close for the RSI(2) strategy)
/// * `period` - RSI period (2 for the mean-reversion rule)
/// * `smoothing` - Rolling simple mean or Wilder's smoothing
///
/// # Returns
/// Values aligned with `series`, `None` for the first `period` bars
pub fn compute_rsi(
    series: &PriceSeries,
    field: PriceField,
    period: usize,
    smoothing: RsiSmoothing,
) -> Result<IndicatorSeries> {
    if period == 0 {
        return Err(EngineError::InvalidParameter(
            "RSI period must be positive".to_string(),
        ));
    }
    series.require_len(period + 1)?;

    let prices = series.column(field);
    Ok(match smoothing {
        RsiSmoothing::Simple => rsi_simple(&prices, period),
        RsiSmoothing::Wilder => rsi_wilder(&prices, period),
    })
}

/// RSI from the average gain and average absolute loss
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

fn split_delta(delta: f64) -> (f64, f64) {
    if delta > 0.0 {
        (delta, 0.0)
    } else {
        (0.0, -delta)
    }
}

fn rsi_simple(prices: &[f64], period: usize) -> IndicatorSeries {
    let n = prices.len();
    let mut rsi = vec![None; n];

    // Summing each window from scratch keeps the result exact for short periods
    for i in period..n {
        let (gains, losses) = ((i + 1 - period)..=i)
            .map(|j| split_delta(prices[j] - prices[j - 1]))
            .fold((0.0, 0.0), |(g, l), (dg, dl)| (g + dg, l + dl));

        rsi[i] = Some(rsi_from_averages(
            gains / period as f64,
            losses / period as f64,
        ));
    }

    rsi
}

fn rsi_wilder(prices: &[f64], period: usize) -> IndicatorSeries {
    let n = prices.len();
    let mut rsi = vec![None; n];
    let alpha = 1.0 / period as f64;

    // Calculate initial averages
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..=period {
        let (gain, loss) = split_delta(prices[i] - prices[i - 1]);
        avg_gain += gain;
        avg_loss += loss;
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    rsi[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    // Wilder's Smoothing for subsequent values
    for i in (period + 1)..n {
        let (gain, loss) = split_delta(prices[i] - prices[i - 1]);

        avg_gain = avg_gain * (1.0 - alpha) + gain * alpha;
        avg_loss = avg_loss * (1.0 - alpha) + loss * alpha;

        rsi[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    rsi
}
