pub mod generator;

pub use generator::{generate_signals, Rsi2MeanReversion, SignalRule};
