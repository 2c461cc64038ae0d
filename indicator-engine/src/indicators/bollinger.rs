use std::fmt;

use common::{BandSet, EngineError, PriceField, PriceSeries, Result};
use serde::{Deserialize, Serialize};

/// Calculate Bollinger Bands on adjusted close
///
/// # Arguments
/// * `series` - Daily bars
/// * `k` - Number of standard deviations (typically 2.0)
/// * `n` - Rolling window (typically 20)
///
/// # Returns
/// One `BandSet` per bar, `None` for the first `n - 1` bars
pub fn compute_bollinger_bands(
    series: &PriceSeries,
    k: f64,
    n: usize,
) -> Result<Vec<Option<BandSet>>> {
    validate_band_params(k, n)?;
    series.require_len(n)?;

    let prices = series.column(PriceField::AdjClose);
    let mut bands = vec![None; prices.len()];

    for i in (n - 1)..prices.len() {
        let window = &prices[i + 1 - n..=i];

        let mean: f64 = window.iter().sum::<f64>() / n as f64;

        // Sample standard deviation
        let variance: f64 = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let std = variance.sqrt();

        bands[i] = Some(BandSet {
            middle: mean,
            upper: mean + std * k,
            lower: mean - std * k,
        });
    }

    Ok(bands)
}

fn validate_band_params(k: f64, n: usize) -> Result<()> {
    if n < 2 {
        return Err(EngineError::InvalidParameter(format!(
            "Bollinger window must be at least 2, got {}",
            n
        )));
    }
    if !k.is_finite() || k < 0.0 {
        return Err(EngineError::InvalidParameter(format!(
            "Bollinger width must be a non-negative number, got {}",
            k
        )));
    }
    Ok(())
}

/// Where a price sits relative to the bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPosition {
    AboveUpper,
    Within,
    BelowLower,
}

impl BandPosition {
    pub fn label(&self) -> &'static str {
        match self {
            BandPosition::AboveUpper => "above upper band",
            BandPosition::Within => "within bands",
            BandPosition::BelowLower => "below lower band",
        }
    }

    /// Human-readable sentence naming the band parameters
    pub fn describe(&self, k: f64, n: usize) -> String {
        format!(
            "Price is {} of the Bollinger Bands ({} periods, {} standard deviations)",
            self.label(),
            n,
            k
        )
    }
}

impl fmt::Display for BandPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify `price` against the latest band set.
///
/// A price equal to a band counts as within. `bands` must come from a
/// computation with window `n` and must have a defined final entry.
pub fn classify_price_vs_bands(
    price: f64,
    bands: &[Option<BandSet>],
    k: f64,
    n: usize,
) -> Result<BandPosition> {
    validate_band_params(k, n)?;
    if !price.is_finite() {
        return Err(EngineError::InvalidParameter(format!(
            "price must be finite, got {}",
            price
        )));
    }

    let latest = match bands.last() {
        Some(Some(latest)) if bands.len() >= n => latest,
        _ => {
            return Err(EngineError::InsufficientHistory {
                required: n,
                actual: bands.iter().filter(|b| b.is_some()).count(),
            })
        }
    };

    Ok(if price > latest.upper {
        BandPosition::AboveUpper
    } else if price < latest.lower {
        BandPosition::BelowLower
    } else {
        BandPosition::Within
    })
}

/// Calculate %B indicator (position within bands)
/// Returns value between 0 and 1 when within bands
/// < 0 means below lower band, > 1 means above upper band
pub fn percent_b(price: f64, bands: &BandSet) -> f64 {
    if bands.upper == bands.lower {
        return 0.5;
    }
    (price - bands.lower) / (bands.upper - bands.lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::sma::compute_sma;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use common::Bar;
    use proptest::prelude::*;

    fn series_from(prices: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, &p)| Bar::new(start + Duration::days(i as i64), p, p, p, p, p))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_bollinger_bands_basic() {
        let prices = vec![
            22.27, 22.19, 22.08, 22.17, 22.18, 22.13, 22.23, 22.43, 22.24, 22.29, 22.15, 22.39,
            22.38, 22.61, 23.36, 24.05, 23.75, 23.83, 23.95, 23.63,
        ];
        let bb = compute_bollinger_bands(&series_from(&prices), 2.0, 20).unwrap();

        assert_eq!(bb.len(), prices.len());
        assert!(bb[..19].iter().all(|b| b.is_none()));

        let last = bb[19].unwrap();
        assert!(last.upper > last.middle);
        assert!(last.lower < last.middle);
    }

    #[test]
    fn test_sample_standard_deviation() {
        // mean 2, sample variance 1
        let bb = compute_bollinger_bands(&series_from(&[1.0, 2.0, 3.0]), 2.0, 3).unwrap();
        let last = bb[2].unwrap();

        assert_relative_eq!(last.middle, 2.0);
        assert_relative_eq!(last.upper, 4.0);
        assert_relative_eq!(last.lower, 0.0);
    }

    #[test]
    fn test_flat_series_collapses_bands() {
        let prices = vec![100.0; 20];
        let bb = compute_bollinger_bands(&series_from(&prices), 2.0, 20).unwrap();
        let last = bb[19].unwrap();

        assert_eq!(last.middle, 100.0);
        assert_eq!(last.upper, 100.0);
        assert_eq!(last.lower, 100.0);

        let position = classify_price_vs_bands(100.0, &bb, 2.0, 20).unwrap();
        assert_eq!(position, BandPosition::Within);
        assert_eq!(position.to_string(), "within bands");
    }

    #[test]
    fn test_classify_above_and_below() {
        let bands = vec![
            None,
            Some(BandSet {
                middle: 100.0,
                upper: 110.0,
                lower: 90.0,
            }),
        ];

        assert_eq!(
            classify_price_vs_bands(110.5, &bands, 2.0, 2).unwrap(),
            BandPosition::AboveUpper
        );
        assert_eq!(
            classify_price_vs_bands(89.0, &bands, 2.0, 2).unwrap(),
            BandPosition::BelowLower
        );
        assert_eq!(
            classify_price_vs_bands(110.0, &bands, 2.0, 2).unwrap(),
            BandPosition::Within
        );
        assert_eq!(
            classify_price_vs_bands(90.0, &bands, 2.0, 2).unwrap(),
            BandPosition::Within
        );
    }

    #[test]
    fn test_classify_requires_defined_latest() {
        let bands: Vec<Option<BandSet>> = vec![None, None];
        assert!(matches!(
            classify_price_vs_bands(1.0, &bands, 2.0, 2),
            Err(EngineError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let series = series_from(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            compute_bollinger_bands(&series, 2.0, 1),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            compute_bollinger_bands(&series, -1.0, 2),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            compute_bollinger_bands(&series, 2.0, 5),
            Err(EngineError::InsufficientHistory {
                required: 5,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_describe_names_parameters() {
        let text = BandPosition::AboveUpper.describe(2.0, 20);
        assert!(text.contains("above upper band"));
        assert!(text.contains("20 periods"));
    }

    #[test]
    fn test_percent_b() {
        let bands = BandSet {
            middle: 105.0,
            upper: 110.0,
            lower: 100.0,
        };

        assert_eq!(percent_b(100.0, &bands), 0.0);
        assert_eq!(percent_b(105.0, &bands), 0.5);
        assert_eq!(percent_b(110.0, &bands), 1.0);
        assert!(percent_b(95.0, &bands) < 0.0);
    }

    proptest! {
        #[test]
        fn middle_band_equals_sma(
            prices in proptest::collection::vec(1.0f64..500.0, 20..60),
            n in 2usize..20,
        ) {
            let bb = compute_bollinger_bands(&series_from(&prices), 2.0, n).unwrap();
            let sma = compute_sma(&prices, n).unwrap();

            for (band, avg) in bb.iter().zip(sma.iter()) {
                match (band, avg) {
                    (Some(b), Some(a)) => prop_assert!((b.middle - a).abs() < 1e-9),
                    (None, None) => {}
                    _ => prop_assert!(false, "warm-up mismatch"),
                }
            }
        }

        #[test]
        fn middle_band_shifts_with_prices(
            prices in proptest::collection::vec(1.0f64..500.0, 20..40),
            shift in 1.0f64..50.0,
        ) {
            let shifted: Vec<f64> = prices.iter().map(|p| p + shift).collect();
            let base = compute_bollinger_bands(&series_from(&prices), 2.0, 20).unwrap();
            let moved = compute_bollinger_bands(&series_from(&shifted), 2.0, 20).unwrap();

            let (b, m) = (base.last().unwrap().unwrap(), moved.last().unwrap().unwrap());
            prop_assert!((m.middle - b.middle - shift).abs() < 1e-9);
        }
    }
}
