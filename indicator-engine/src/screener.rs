//! Point-in-time readings per instrument and parallel scans over a universe.

use common::{
    BollingerParameters, EngineError, PriceField, PriceSeries, Result, RsiSmoothing,
    ScreenerParameters, StochasticParameters,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::data::SymbolSeries;
use crate::indicators::{
    classify_price_vs_bands, compute_bollinger_bands, compute_ema, compute_rsi, compute_sma,
    compute_stochastic, percent_b, stochastic_min_len, BandPosition,
};

/// Latest RSI reading with the two-day-high exit target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsiSnapshot {
    pub rsi: f64,
    /// Highest high of the last two bars
    pub target: f64,
    pub price: f64,
    pub upside_pct: f64,
    /// Change since the first bar of the series
    pub variation_pct: f64,
    /// `None` when the series is too short for the trend SMA
    pub sma_rising: Option<bool>,
}

/// Latest Bollinger reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSnapshot {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
    pub price: f64,
    /// 0 at the lower band, 1 at the upper band
    pub percent_b: f64,
    pub position: BandPosition,
    pub text: String,
}

/// Latest stochastic reading with slope and crossing flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StochasticSnapshot {
    pub fast_k: f64,
    pub fast_d: f64,
    pub slow_k: f64,
    pub slow_d: f64,
    pub price: f64,
    pub variation_pct: f64,
    pub k_rising: bool,
    pub k_crossed_above: bool,
    pub k_crossed_below: bool,
    pub ema_rising: bool,
}

fn pct_change(from: f64, to: f64) -> f64 {
    (to - from) / from * 100.0
}

fn last_two(values: &[Option<f64>]) -> Option<(f64, f64)> {
    match values {
        [.., Some(prev), Some(today)] => Some((*prev, *today)),
        _ => None,
    }
}

/// RSI reading on adjusted close, with target and trend
pub fn rsi_snapshot(
    series: &PriceSeries,
    period: usize,
    screener: &ScreenerParameters,
) -> Result<RsiSnapshot> {
    series.require_len(2)?;
    let rsi = compute_rsi(series, PriceField::AdjClose, period, RsiSmoothing::Simple)?;
    let bars = series.bars();
    let (yesterday, today) = (&bars[bars.len() - 2], &bars[bars.len() - 1]);

    // Orders are placed after the close, so tomorrow's ceiling is today's and yesterday's high
    let target = today.high.max(yesterday.high);
    let price = today.adj_close;

    let closes = series.column(PriceField::AdjClose);
    let sma_rising = if closes.len() > screener.sma_period {
        let sma = compute_sma(&closes, screener.sma_period)?;
        last_two(&sma).map(|(prev, now)| now > prev)
    } else {
        None
    };

    let latest_rsi = rsi[rsi.len() - 1].ok_or(EngineError::InsufficientHistory {
        required: period + 1,
        actual: series.len(),
    })?;

    Ok(RsiSnapshot {
        rsi: latest_rsi,
        target,
        price,
        upside_pct: pct_change(price, target),
        variation_pct: pct_change(bars[0].adj_close, price),
        sma_rising,
    })
}

/// Bollinger reading of the latest adjusted close
pub fn bollinger_snapshot(series: &PriceSeries, params: &BollingerParameters) -> Result<BandSnapshot> {
    let bands = compute_bollinger_bands(series, params.k, params.n)?;
    let price = series.bars()[series.len() - 1].adj_close;
    let position = classify_price_vs_bands(price, &bands, params.k, params.n)?;
    let latest = bands[bands.len() - 1].ok_or(EngineError::InsufficientHistory {
        required: params.n,
        actual: series.len(),
    })?;

    Ok(BandSnapshot {
        middle: latest.middle,
        upper: latest.upper,
        lower: latest.lower,
        price,
        percent_b: percent_b(price, &latest),
        position,
        text: position.describe(params.k, params.n),
    })
}

/// Stochastic reading, comparing today's slow pair against yesterday's
pub fn stochastic_snapshot(
    series: &PriceSeries,
    params: &StochasticParameters,
    screener: &ScreenerParameters,
) -> Result<StochasticSnapshot> {
    series.require_len(stochastic_min_len(params) + 1)?;
    let sets = compute_stochastic(series, params)?;
    let closes = series.column(PriceField::AdjClose);
    let ema = compute_ema(&closes, screener.ema_span)?;

    let (prev, today) = (&sets[sets.len() - 2], &sets[sets.len() - 1]);
    let missing = || EngineError::InsufficientHistory {
        required: stochastic_min_len(params) + 1,
        actual: series.len(),
    };

    let k_prev = prev.slow_k.ok_or_else(missing)?;
    let d_prev = prev.slow_d.ok_or_else(missing)?;
    let k_today = today.slow_k.ok_or_else(missing)?;
    let d_today = today.slow_d.ok_or_else(missing)?;

    let price = closes[closes.len() - 1];

    Ok(StochasticSnapshot {
        fast_k: today.fast_k.ok_or_else(missing)?,
        fast_d: today.fast_d.ok_or_else(missing)?,
        slow_k: k_today,
        slow_d: d_today,
        price,
        variation_pct: pct_change(closes[0], price),
        k_rising: k_today > k_prev,
        k_crossed_above: k_prev < d_prev && k_today > d_today,
        k_crossed_below: k_prev > d_prev && k_today < d_today,
        ema_rising: ema[ema.len() - 1] > ema[ema.len() - 2],
    })
}

/// Outcome of one instrument in a scan
#[derive(Debug)]
pub struct ScanEntry<T> {
    pub symbol: String,
    pub outcome: Result<T>,
}

/// Evaluate `snapshot` for every instrument in parallel, preserving input order
pub fn scan<T, F>(universe: &[SymbolSeries], snapshot: F) -> Vec<ScanEntry<T>>
where
    T: Send,
    F: Fn(&PriceSeries) -> Result<T> + Sync,
{
    let entries: Vec<ScanEntry<T>> = universe
        .par_iter()
        .map(|item| ScanEntry {
            symbol: item.symbol.clone(),
            outcome: snapshot(&item.series),
        })
        .collect();

    let failed = entries.iter().filter(|e| e.outcome.is_err()).count();
    for entry in &entries {
        if let Err(e) = &entry.outcome {
            warn!(symbol = %entry.symbol, error = %e, "instrument skipped");
        }
    }
    info!(
        instruments = entries.len(),
        failed,
        "scan complete"
    );

    entries
}
