pub mod config;
pub mod error;
pub mod types;

pub use config::{
    BollingerParameters, EngineConfig, ExitPricing, RsiSmoothing, ScreenerParameters,
    SignalParameters, StochasticParameters, StrategyParameters, DEFAULT_ENTRY_THRESHOLD,
    DEFAULT_STARTING_CAPITAL,
};
pub use error::{EngineError, Result};
pub use types::*;
