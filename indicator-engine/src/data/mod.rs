pub mod loader;
pub mod synthetic;

pub use loader::{load_csv, load_json, load_universe, read_csv, SymbolSeries};
pub use synthetic::{generate_bars_with_rsi_pattern, generate_synthetic_bars};

use std::path::Path;

use common::{EngineError, PriceSeries, Result};

/// Load a price series from file, detecting format from extension
pub fn load_file(path: &Path) -> Result<PriceSeries> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        _ => Err(EngineError::DataLoadError(format!(
            "Unsupported file format: {}",
            ext
        ))),
    }
}
