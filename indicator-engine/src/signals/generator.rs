use common::{
    EngineError, ExitPricing, PriceSeries, Result, SignalEvent, SignalParameters,
};
use tracing::debug;

/// A strategy rule turning an indicator series into entry/exit events.
///
/// Implementations must emit events in chronological order, alternating
/// Entry/Exit, optionally ending with an unmatched Entry.
pub trait SignalRule {
    fn name(&self) -> &str;

    fn generate(&self, series: &PriceSeries, indicator: &[Option<f64>]) -> Result<Vec<SignalEvent>>;
}

/// RSI(2) mean reversion: buy the oversold close, sell the breakout above the two-day high
pub struct Rsi2MeanReversion {
    params: SignalParameters,
}

impl Rsi2MeanReversion {
    pub fn new(params: &SignalParameters) -> Self {
        Self {
            params: params.clone(),
        }
    }
}

impl SignalRule for Rsi2MeanReversion {
    fn name(&self) -> &str {
        "rsi2_mean_reversion"
    }

    fn generate(&self, series: &PriceSeries, indicator: &[Option<f64>]) -> Result<Vec<SignalEvent>> {
        self.params.validate()?;
        if indicator.len() != series.len() {
            return Err(EngineError::InvalidParameter(format!(
                "indicator has {} values for {} bars",
                indicator.len(),
                series.len()
            )));
        }

        let bars = series.bars();
        let threshold = self.params.entry_threshold;
        let mut events = Vec::new();
        // Two-day high ceiling of the open position
        let mut ceiling: Option<f64> = None;

        for i in 1..bars.len() {
            let bar = &bars[i];

            if let Some(target) = ceiling {
                if bar.high > target {
                    let price = match self.params.exit_pricing {
                        ExitPricing::BarClose => bar.field(self.params.price_field),
                        ExitPricing::Ceiling => target.max(bar.open),
                    };
                    debug!(date = %bar.date, high = bar.high, target, price, "exit signal");
                    events.push(SignalEvent::exit(bar.date, price));
                    ceiling = None;
                }
                continue;
            }

            let rsi = match indicator[i] {
                Some(v) => v,
                None => continue,
            };
            if rsi > threshold {
                continue;
            }

            let price = bar.field(self.params.price_field);
            let target = bar.high.max(bars[i - 1].high);
            debug!(date = %bar.date, rsi, threshold, price, target, "entry signal");
            events.push(SignalEvent::entry(bar.date, price));
            ceiling = Some(target);
        }

        Ok(events)
    }
}

/// Generate RSI(2) signals with default settings.
///
/// `threshold_override` replaces `DEFAULT_ENTRY_THRESHOLD` when given.
pub fn generate_signals(
    series: &PriceSeries,
    indicator: &[Option<f64>],
    threshold_override: Option<f64>,
) -> Result<Vec<SignalEvent>> {
    let params = SignalParameters::default().with_threshold_override(threshold_override);
    Rsi2MeanReversion::new(&params).generate(series, indicator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::compute_rsi;
    use chrono::{Duration, NaiveDate};
    use common::{Bar, PriceField, RsiSmoothing, SignalKind, DEFAULT_ENTRY_THRESHOLD};
    use proptest::prelude::*;

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64)
    }

    /// Bars with the given adjusted closes and highs; open sits just under the close
    fn make_series(closes: &[f64], highs: &[f64]) -> PriceSeries {
        PriceSeries::new(
            closes
                .iter()
                .zip(highs)
                .enumerate()
                .map(|(i, (&c, &h))| Bar::new(day(i), c - 0.1, h, c - 0.5, c, c))
                .collect(),
        )
        .unwrap()
    }

    fn scenario() -> PriceSeries {
        make_series(&[10.0, 9.0, 8.0, 7.0, 13.0], &[10.5, 9.5, 8.5, 7.5, 13.5])
    }

    #[test]
    fn test_scenario_entry_and_exit() {
        let series = scenario();
        let rsi = compute_rsi(&series, PriceField::AdjClose, 2, RsiSmoothing::Simple).unwrap();
        let events = generate_signals(&series, &rsi, Some(30.0)).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SignalEvent::entry(day(2), 8.0));
        // Ceiling max(8.5, 9.5) is first exceeded on the last bar
        assert_eq!(events[1], SignalEvent::exit(day(4), 13.0));
    }

    #[test]
    fn test_ceiling_exit_pricing() {
        let series = scenario();
        let rsi = compute_rsi(&series, PriceField::AdjClose, 2, RsiSmoothing::Simple).unwrap();
        let params = SignalParameters::default().with_exit_pricing(ExitPricing::Ceiling);
        let events = Rsi2MeanReversion::new(&params).generate(&series, &rsi).unwrap();

        // Bar 4 gaps open above the 9.5 ceiling
        approx::assert_relative_eq!(events[1].reference_price, 12.9, epsilon = 1e-12);
    }

    #[test]
    fn test_ceiling_fill_without_gap() {
        let series = make_series(&[10.0, 9.0, 8.0, 9.0], &[10.5, 9.5, 8.5, 9.8]);
        let rsi = compute_rsi(&series, PriceField::AdjClose, 2, RsiSmoothing::Simple).unwrap();
        let params = SignalParameters::default().with_exit_pricing(ExitPricing::Ceiling);
        let events = Rsi2MeanReversion::new(&params).generate(&series, &rsi).unwrap();

        assert_eq!(events[1], SignalEvent::exit(day(3), 9.5));
    }

    #[test]
    fn test_unresolved_entry_stays_open() {
        let series = make_series(&[10.0, 9.0, 8.0, 7.0], &[10.5, 9.5, 8.5, 7.5]);
        let rsi = compute_rsi(&series, PriceField::AdjClose, 2, RsiSmoothing::Simple).unwrap();
        let events = generate_signals(&series, &rsi, None).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SignalKind::Entry);
    }

    #[test]
    fn test_no_entry_while_position_open() {
        // RSI stays at 0 on bars 2 and 3; only bar 2 may enter
        let series = make_series(&[10.0, 9.0, 8.0, 7.0, 6.0], &[10.5, 9.5, 8.5, 7.5, 6.5]);
        let rsi = compute_rsi(&series, PriceField::AdjClose, 2, RsiSmoothing::Simple).unwrap();
        let events = generate_signals(&series, &rsi, None).unwrap();

        assert_eq!(events, vec![SignalEvent::entry(day(2), 8.0)]);
    }

    #[test]
    fn test_threshold_default_and_override() {
        let series = scenario();
        let rsi = compute_rsi(&series, PriceField::AdjClose, 2, RsiSmoothing::Simple).unwrap();

        assert!(rsi[4].unwrap() > DEFAULT_ENTRY_THRESHOLD);
        let strict = generate_signals(&series, &rsi, Some(0.0)).unwrap();
        assert_eq!(strict[0].trigger_date, day(2));

        let none = generate_signals(&series, &vec![Some(50.0); 5], None).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_warmup_never_signals() {
        let series = scenario();
        let indicator = vec![None, None, None, None, None];
        assert!(generate_signals(&series, &indicator, Some(100.0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rejects_misaligned_indicator() {
        let series = scenario();
        assert!(matches!(
            generate_signals(&series, &[Some(10.0)], None),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_threshold() {
        let series = scenario();
        assert!(matches!(
            generate_signals(&series, &vec![None; 5], Some(f64::NAN)),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            generate_signals(&series, &vec![None; 5], Some(-1.0)),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    proptest! {
        #[test]
        fn entries_never_overlap(
            closes in proptest::collection::vec(5.0f64..50.0, 3..80),
            bumps in proptest::collection::vec(0.0f64..3.0, 80),
            threshold in 0.0f64..100.0,
        ) {
            let highs: Vec<f64> = closes.iter().zip(&bumps).map(|(c, b)| c + b).collect();
            let series = make_series(&closes, &highs);
            let rsi = compute_rsi(&series, PriceField::AdjClose, 2, RsiSmoothing::Simple).unwrap();
            let events = generate_signals(&series, &rsi, Some(threshold)).unwrap();

            for (i, event) in events.iter().enumerate() {
                let expected = if i % 2 == 0 { SignalKind::Entry } else { SignalKind::Exit };
                prop_assert_eq!(event.kind, expected);
                if i > 0 {
                    prop_assert!(event.trigger_date > events[i - 1].trigger_date);
                }
            }
        }
    }
}
