use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Daily OHLC bar with adjusted close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, adj_close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            adj_close,
        }
    }

    /// Read a single column of the bar
    pub fn field(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
        }
    }

    fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.adj_close]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Price column an indicator reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    #[default]
    AdjClose,
}

/// Time-ordered daily bars for one instrument.
///
/// Dates are strictly increasing and every price is finite; both are checked
/// on construction so downstream indicators can index positionally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        for (i, bar) in bars.iter().enumerate() {
            if !bar.is_finite() {
                return Err(EngineError::InvalidParameter(format!(
                    "non-finite price on {}",
                    bar.date
                )));
            }
            if i > 0 && bars[i - 1].date >= bar.date {
                return Err(EngineError::InvalidParameter(format!(
                    "bars out of order or duplicated at {} (previous {})",
                    bar.date,
                    bars[i - 1].date
                )));
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Copy one column out as a plain vector
    pub fn column(&self, field: PriceField) -> Vec<f64> {
        self.bars.iter().map(|b| b.field(field)).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Index of the bar dated `date`, if present
    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    /// Fail with `InsufficientHistory` unless at least `required` bars exist
    pub fn require_len(&self, required: usize) -> Result<()> {
        if self.bars.len() < required {
            return Err(EngineError::InsufficientHistory {
                required,
                actual: self.bars.len(),
            });
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for PriceSeries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            bars: Vec<Bar>,
        }

        let raw = Raw::deserialize(deserializer)?;
        PriceSeries::new(raw.bars).map_err(serde::de::Error::custom)
    }
}

/// Scalar indicator values aligned with a `PriceSeries`; `None` inside the warm-up window
pub type IndicatorSeries = Vec<Option<f64>>;

/// Bollinger band values for one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSet {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Stochastic oscillator values for one bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StochasticSet {
    pub fast_k: Option<f64>,
    pub fast_d: Option<f64>,
    pub slow_k: Option<f64>,
    pub slow_d: Option<f64>,
}

/// Signal kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Entry,
    Exit,
}

/// Discrete strategy event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub trigger_date: NaiveDate,
    pub kind: SignalKind,
    pub reference_price: f64,
}

impl SignalEvent {
    pub fn entry(trigger_date: NaiveDate, reference_price: f64) -> Self {
        Self {
            trigger_date,
            kind: SignalKind::Entry,
            reference_price,
        }
    }

    pub fn exit(trigger_date: NaiveDate, reference_price: f64) -> Self {
        Self {
            trigger_date,
            kind: SignalKind::Exit,
            reference_price,
        }
    }
}

/// Closed trade record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub profit: f64,
    /// Fractional return, 0.05 = 5%
    pub return_pct: f64,
    pub holding_days: i64,
}

/// Entry still waiting for its exit when the series ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
}

/// Backtest result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub trades: Vec<Trade>,
    pub capital_curve: Vec<(NaiveDate, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_position: Option<OpenPosition>,
}

impl BacktestResult {
    /// Capital after the last closed trade
    pub fn final_capital(&self) -> f64 {
        self.capital_curve
            .last()
            .map(|(_, c)| *c)
            .unwrap_or(self.initial_capital)
    }
}

/// Summary statistics of a backtest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub trade_count: u32,
    pub win_count: u32,
    pub loss_count: u32,
    pub win_rate_pct: f64,
    pub average_return_pct: f64,
    pub total_return_pct: f64,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub best_return_pct: f64,
    pub worst_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub avg_holding_days: f64,
    pub has_open_position: bool,
}
