pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use bollinger::{classify_price_vs_bands, compute_bollinger_bands, percent_b, BandPosition};
pub use ema::compute_ema;
pub use rsi::compute_rsi;
pub use sma::{compute_sma, smooth_defined};
pub use stochastic::{compute_stochastic, stochastic_min_len, FLAT_RANGE_SENTINEL};

use common::{
    BandSet, IndicatorSeries, PriceField, PriceSeries, Result, RsiSmoothing, StochasticParameters,
    StochasticSet,
};
use serde::{Deserialize, Serialize};

/// Indicator to compute, with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IndicatorRequest {
    Rsi {
        field: PriceField,
        period: usize,
        smoothing: RsiSmoothing,
    },
    Bollinger {
        k: f64,
        n: usize,
    },
    Stochastic(StochasticParameters),
    Sma {
        field: PriceField,
        period: usize,
    },
    Ema {
        field: PriceField,
        span: usize,
    },
}

/// Output of `compute_indicator`, aligned 1:1 with the input series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndicatorOutput {
    Scalar(IndicatorSeries),
    Bands(Vec<Option<BandSet>>),
    Stochastic(Vec<StochasticSet>),
}

impl IndicatorOutput {
    pub fn len(&self) -> usize {
        match self {
            IndicatorOutput::Scalar(v) => v.len(),
            IndicatorOutput::Bands(v) => v.len(),
            IndicatorOutput::Stochastic(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute any supported indicator over one price series
pub fn compute_indicator(series: &PriceSeries, request: &IndicatorRequest) -> Result<IndicatorOutput> {
    Ok(match *request {
        IndicatorRequest::Rsi {
            field,
            period,
            smoothing,
        } => IndicatorOutput::Scalar(compute_rsi(series, field, period, smoothing)?),
        IndicatorRequest::Bollinger { k, n } => {
            IndicatorOutput::Bands(compute_bollinger_bands(series, k, n)?)
        }
        IndicatorRequest::Stochastic(params) => {
            IndicatorOutput::Stochastic(compute_stochastic(series, &params)?)
        }
        IndicatorRequest::Sma { field, period } => {
            IndicatorOutput::Scalar(compute_sma(&series.column(field), period)?)
        }
        IndicatorRequest::Ema { field, span } => IndicatorOutput::Scalar(
            compute_ema(&series.column(field), span)?
                .into_iter()
                .map(Some)
                .collect(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use common::{Bar, EngineError};

    fn series(n: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::new(
            (0..n)
                .map(|i| {
                    let p = 50.0 + (i as f64 * 0.3).sin() * 4.0;
                    Bar::new(start + Duration::days(i as i64), p, p + 1.0, p - 1.0, p, p)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_dispatch_is_aligned() {
        let s = series(30);
        let requests = [
            IndicatorRequest::Rsi {
                field: PriceField::AdjClose,
                period: 2,
                smoothing: RsiSmoothing::Simple,
            },
            IndicatorRequest::Bollinger { k: 2.0, n: 20 },
            IndicatorRequest::Stochastic(StochasticParameters::default()),
            IndicatorRequest::Sma {
                field: PriceField::Close,
                period: 5,
            },
            IndicatorRequest::Ema {
                field: PriceField::Close,
                span: 10,
            },
        ];

        for request in &requests {
            let output = compute_indicator(&s, request).unwrap();
            assert_eq!(output.len(), s.len());
        }
    }

    #[test]
    fn test_dispatch_propagates_errors() {
        let s = series(10);
        let err = compute_indicator(&s, &IndicatorRequest::Bollinger { k: 2.0, n: 20 }).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientHistory { .. }));
    }

    #[test]
    fn test_request_from_json() {
        let request: IndicatorRequest =
            serde_json::from_str(r#"{"kind":"bollinger","k":2.0,"n":20}"#).unwrap();
        assert_eq!(request, IndicatorRequest::Bollinger { k: 2.0, n: 20 });
    }
}
