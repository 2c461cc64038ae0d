use std::time::Instant;

use common::{BacktestResult, PriceSeries, Result, SignalEvent, Statistics, StrategyParameters};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backtest::run_backtest;
use crate::indicators::compute_rsi;
use crate::metrics::StatisticsCalculator;
use crate::signals::{Rsi2MeanReversion, SignalRule};

/// Everything one pipeline run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub strategy: String,
    pub signals: Vec<SignalEvent>,
    pub result: BacktestResult,
    pub statistics: Statistics,
}

/// RSI(2) backtest pipeline: RSI -> signals -> trades -> statistics
pub struct BacktestEngine {
    params: StrategyParameters,
}

impl BacktestEngine {
    pub fn new(params: StrategyParameters) -> Self {
        Self { params }
    }

    /// Run the full pipeline on one price series
    pub fn run(&self, series: &PriceSeries) -> Result<BacktestReport> {
        let start_time = Instant::now();
        self.params.validate()?;

        let rsi = compute_rsi(
            series,
            self.params.signals.price_field,
            self.params.rsi_period,
            self.params.rsi_smoothing,
        )?;

        let rule = Rsi2MeanReversion::new(&self.params.signals);
        let signals = rule.generate(series, &rsi)?;
        let result = run_backtest(series, &signals, self.params.starting_capital)?;
        let statistics = StatisticsCalculator::summarize(&result);

        info!(
            strategy = rule.name(),
            bars = series.len(),
            trades = statistics.trade_count,
            open = statistics.has_open_position,
            final_capital = statistics.final_capital,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "backtest complete"
        );

        Ok(BacktestReport {
            strategy: rule.name().to_string(),
            signals,
            result,
            statistics,
        })
    }
}
