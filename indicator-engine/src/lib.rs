pub mod backtest;
pub mod data;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod portfolio;
pub mod screener;
pub mod signals;

pub use backtest::run_backtest;
pub use data::{generate_synthetic_bars, load_file, load_universe, SymbolSeries};
pub use engine::{BacktestEngine, BacktestReport};
pub use indicators::{
    classify_price_vs_bands, compute_bollinger_bands, compute_indicator, compute_rsi,
    compute_stochastic, BandPosition, IndicatorOutput, IndicatorRequest,
};
pub use metrics::StatisticsCalculator;
pub use portfolio::Portfolio;
pub use screener::{scan, ScanEntry};
pub use signals::{generate_signals, Rsi2MeanReversion, SignalRule};

// Re-export common types
pub use common::{
    BacktestResult, BandSet, Bar, EngineConfig, EngineError, IndicatorSeries, OpenPosition,
    PriceField, PriceSeries, Result, SignalEvent, SignalKind, SignalParameters, Statistics,
    StochasticSet, StrategyParameters, Trade,
};
