use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::types::PriceField;

/// Entry threshold used when no override is supplied
pub const DEFAULT_ENTRY_THRESHOLD: f64 = 30.0;

/// Starting capital used when none is supplied
pub const DEFAULT_STARTING_CAPITAL: f64 = 100.0;

/// How the average gain/loss of RSI is smoothed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiSmoothing {
    /// Rolling simple mean of the last `period` changes
    #[default]
    Simple,
    /// Simple-mean seed followed by Wilder's recursive smoothing
    Wilder,
}

/// Price recorded on the exit signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPricing {
    /// The exit bar's value in the signal price field
    #[default]
    BarClose,
    /// Limit fill at the two-day-high ceiling, or at the open when the bar gaps above it
    Ceiling,
}

/// RSI(2) mean-reversion signal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalParameters {
    /// Entry fires when RSI <= this value
    pub entry_threshold: f64,
    /// Column RSI is computed on and entry prices are read from
    pub price_field: PriceField,
    pub exit_pricing: ExitPricing,
}

impl Default for SignalParameters {
    fn default() -> Self {
        Self {
            entry_threshold: DEFAULT_ENTRY_THRESHOLD,
            price_field: PriceField::AdjClose,
            exit_pricing: ExitPricing::BarClose,
        }
    }
}

impl SignalParameters {
    /// Resolve an optional threshold override against the configured default
    pub fn with_threshold_override(mut self, threshold: Option<f64>) -> Self {
        if let Some(t) = threshold {
            self.entry_threshold = t;
        }
        self
    }

    pub fn with_exit_pricing(mut self, exit_pricing: ExitPricing) -> Self {
        self.exit_pricing = exit_pricing;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.entry_threshold.is_finite() || !(0.0..=100.0).contains(&self.entry_threshold) {
            return Err(EngineError::InvalidParameter(format!(
                "entry threshold must be within [0, 100], got {}",
                self.entry_threshold
            )));
        }
        Ok(())
    }
}

/// Full strategy parameters for one backtest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub rsi_period: usize,
    #[serde(default)]
    pub rsi_smoothing: RsiSmoothing,
    #[serde(default)]
    pub signals: SignalParameters,
    pub starting_capital: f64,
}

impl Default for StrategyParameters {
    fn default() -> Self {
        Self {
            rsi_period: 2,
            rsi_smoothing: RsiSmoothing::Simple,
            signals: SignalParameters::default(),
            starting_capital: DEFAULT_STARTING_CAPITAL,
        }
    }
}

impl StrategyParameters {
    pub fn with_capital(mut self, capital: f64) -> Self {
        self.starting_capital = capital;
        self
    }

    pub fn with_entry_threshold(mut self, threshold: f64) -> Self {
        self.signals.entry_threshold = threshold;
        self
    }

    pub fn with_rsi_period(mut self, period: usize) -> Self {
        self.rsi_period = period;
        self
    }

    pub fn with_smoothing(mut self, smoothing: RsiSmoothing) -> Self {
        self.rsi_smoothing = smoothing;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.rsi_period == 0 {
            return Err(EngineError::InvalidParameter(
                "RSI period must be positive".to_string(),
            ));
        }
        if !self.starting_capital.is_finite() || self.starting_capital <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "starting capital must be positive, got {}",
                self.starting_capital
            )));
        }
        self.signals.validate()
    }
}

/// Bollinger band settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerParameters {
    /// Band width in standard deviations
    pub k: f64,
    /// Rolling window
    pub n: usize,
}

impl Default for BollingerParameters {
    fn default() -> Self {
        Self { k: 2.0, n: 20 }
    }
}

/// Stochastic oscillator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticParameters {
    /// High/low lookback for %K
    pub k_period: usize,
    /// Smoothing window for %D and slow %D
    pub d_period: usize,
}

impl Default for StochasticParameters {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
        }
    }
}

/// Trend filters reported by the screener
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenerParameters {
    pub sma_period: usize,
    pub ema_span: usize,
}

impl Default for ScreenerParameters {
    fn default() -> Self {
        Self {
            sma_period: 50,
            ema_span: 80,
        }
    }
}

/// Everything the CLI can read from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub strategy: StrategyParameters,
    pub bollinger: BollingerParameters,
    pub stochastic: StochasticParameters,
    pub screener: ScreenerParameters,
}

impl EngineConfig {
    /// Load a config from a JSON file; absent sections take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| EngineError::DataLoadError(e.to_string()))?;
        let config: EngineConfig = serde_json::from_reader(BufReader::new(file))?;
        config.strategy.validate()?;
        Ok(config)
    }
}
