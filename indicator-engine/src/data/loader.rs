use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use common::{Bar, EngineError, PriceSeries, Result};
use tracing::debug;

/// Instrument symbol paired with its price history
#[derive(Debug, Clone)]
pub struct SymbolSeries {
    pub symbol: String,
    pub series: PriceSeries,
}

/// Column positions resolved from a CSV header
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    adj_close: Option<usize>,
}

impl Columns {
    fn from_header(header: &csv::StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            header.iter().position(|h| {
                let h = h.trim().to_lowercase().replace([' ', '-'], "_");
                names.contains(&h.as_str())
            })
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| {
                EngineError::CsvError(format!("missing column {}", names[0]))
            })
        };

        Ok(Self {
            date: require(&["date", "timestamp", "datetime"])?,
            open: require(&["open"])?,
            high: require(&["high"])?,
            low: require(&["low"])?,
            close: require(&["close"])?,
            adj_close: find(&["adj_close", "adjclose", "adjusted_close"]),
        })
    }
}

fn parse_price(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64> {
    record
        .get(idx)
        .unwrap_or("")
        .trim()
        .parse()
        .map_err(|_| EngineError::CsvError(format!("Invalid {} price", name)))
}

/// Load bars from CSV: date, open, high, low, close and optional adjusted close
pub fn load_csv(path: &Path) -> Result<PriceSeries> {
    let file = File::open(path).map_err(|e| EngineError::DataLoadError(e.to_string()))?;
    read_csv(BufReader::new(file))
}

/// Parse CSV bars from any reader
pub fn read_csv<R: Read>(reader: R) -> Result<PriceSeries> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header = csv_reader
        .headers()
        .map_err(|e| EngineError::CsvError(e.to_string()))?
        .clone();
    let columns = Columns::from_header(&header)?;

    let mut bars = Vec::new();

    for result in csv_reader.records() {
        let record = result.map_err(|e| EngineError::CsvError(e.to_string()))?;

        // Providers emit blank rows for halted days
        let raw_close = record.get(columns.close).unwrap_or("").trim();
        if raw_close.is_empty() || raw_close.eq_ignore_ascii_case("null") {
            continue;
        }

        let date = parse_date(record.get(columns.date).unwrap_or(""))?;
        let close = parse_price(&record, columns.close, "close")?;
        let adj_close = match columns.adj_close {
            Some(idx) => parse_price(&record, idx, "adjusted close")?,
            None => close,
        };

        bars.push(Bar {
            date,
            open: parse_price(&record, columns.open, "open")?,
            high: parse_price(&record, columns.high, "high")?,
            low: parse_price(&record, columns.low, "low")?,
            close,
            adj_close,
        });
    }

    PriceSeries::new(bars)
}

/// Load bars from a JSON array of `Bar`
pub fn load_json(path: &Path) -> Result<PriceSeries> {
    let file = File::open(path).map_err(|e| EngineError::DataLoadError(e.to_string()))?;
    let bars: Vec<Bar> = serde_json::from_reader(BufReader::new(file))?;
    PriceSeries::new(bars)
}

/// Load every `*.csv` in `dir` as one instrument named after the file stem
pub fn load_universe(dir: &Path) -> Result<Vec<SymbolSeries>> {
    let mut universe = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            continue;
        }

        let symbol = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_uppercase(),
            None => continue,
        };
        let series = load_csv(&path)
            .map_err(|e| EngineError::DataLoadError(format!("{}: {}", symbol, e)))?;
        debug!(symbol = %symbol, bars = series.len(), "loaded instrument");
        universe.push(SymbolSeries { symbol, series });
    }

    universe.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(universe)
}

/// Parse a calendar date from the formats market-data exports use
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    // Unix timestamp (seconds)
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt.date_naive());
        }
    }

    Err(EngineError::CsvError(format!("Unable to parse date: {}", s)))
}
