use common::{BacktestResult, EngineError, PriceSeries, Result, SignalEvent, SignalKind};
use tracing::debug;

use crate::portfolio::Portfolio;

/// Replay entry/exit events against a price series.
///
/// Events must alternate Entry/Exit in chronological order and every trigger
/// date must be a bar of `series`. A trailing Entry is reported as the open
/// position and excluded from the closed-trade ledger.
pub fn run_backtest(
    series: &PriceSeries,
    signals: &[SignalEvent],
    starting_capital: f64,
) -> Result<BacktestResult> {
    if !starting_capital.is_finite() || starting_capital <= 0.0 {
        return Err(EngineError::InvalidParameter(format!(
            "starting capital must be positive, got {}",
            starting_capital
        )));
    }
    let start_date = series.first_date().ok_or(EngineError::InsufficientHistory {
        required: 1,
        actual: 0,
    })?;

    let mut portfolio = Portfolio::new(starting_capital, start_date);

    for signal in signals {
        if series.position_of(signal.trigger_date).is_none() {
            return Err(EngineError::InvalidSignalSequence(format!(
                "signal on {} does not match any bar",
                signal.trigger_date
            )));
        }
        if !signal.reference_price.is_finite() || signal.reference_price <= 0.0 {
            return Err(EngineError::InvalidSignalSequence(format!(
                "signal on {} has invalid price {}",
                signal.trigger_date, signal.reference_price
            )));
        }

        match signal.kind {
            SignalKind::Entry => {
                portfolio.open_position(signal.trigger_date, signal.reference_price)?;
            }
            SignalKind::Exit => {
                let trade = portfolio
                    .close_position(signal.trigger_date, signal.reference_price)?
                    .clone();
                debug!(
                    entry = %trade.entry_date,
                    exit = %trade.exit_date,
                    profit = trade.profit,
                    return_pct = trade.return_pct,
                    capital = portfolio.capital(),
                    "trade closed"
                );
            }
        }
    }

    let initial_capital = portfolio.initial_capital();
    let (trades, capital_curve, open_position) = portfolio.into_parts();

    Ok(BacktestResult {
        initial_capital,
        trades,
        capital_curve,
        open_position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use common::{Bar, DEFAULT_STARTING_CAPITAL};

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64)
    }

    fn series(n: usize) -> PriceSeries {
        PriceSeries::new(
            (0..n)
                .map(|i| {
                    let p = 10.0 + i as f64;
                    Bar::new(day(i), p, p, p, p, p)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_signals() {
        let result = run_backtest(&series(5), &[], DEFAULT_STARTING_CAPITAL).unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.capital_curve, vec![(day(0), 100.0)]);
        assert_eq!(result.final_capital(), 100.0);
        assert!(result.open_position.is_none());
    }

    #[test]
    fn test_sequential_compounding() {
        let signals = vec![
            SignalEvent::entry(day(1), 10.0),
            SignalEvent::exit(day(2), 12.0),
            SignalEvent::entry(day(3), 20.0),
            SignalEvent::exit(day(5), 15.0),
        ];
        let result = run_backtest(&series(6), &signals, 100.0).unwrap();

        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].profit, 2.0);
        assert_eq!(result.trades[1].profit, -5.0);
        assert_eq!(result.capital_curve.len(), 3);
        assert_eq!(result.capital_curve[1].0, day(2));
        approx::assert_relative_eq!(result.final_capital(), 100.0 * 1.2 * 0.75);
    }

    #[test]
    fn test_trailing_entry_is_open_position() {
        let signals = vec![
            SignalEvent::entry(day(1), 10.0),
            SignalEvent::exit(day(2), 11.0),
            SignalEvent::entry(day(4), 14.0),
        ];
        let result = run_backtest(&series(6), &signals, 100.0).unwrap();

        assert_eq!(result.trades.len(), 1);
        let open = result.open_position.unwrap();
        assert_eq!(open.entry_date, day(4));
        assert_eq!(open.entry_price, 14.0);
    }

    #[test]
    fn test_rejects_unmatched_exit() {
        let signals = vec![SignalEvent::exit(day(2), 11.0)];
        assert!(matches!(
            run_backtest(&series(6), &signals, 100.0),
            Err(EngineError::InvalidSignalSequence(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_order() {
        let signals = vec![
            SignalEvent::entry(day(3), 10.0),
            SignalEvent::exit(day(1), 11.0),
        ];
        assert!(matches!(
            run_backtest(&series(6), &signals, 100.0),
            Err(EngineError::InvalidSignalSequence(_))
        ));

        let signals = vec![
            SignalEvent::entry(day(1), 10.0),
            SignalEvent::exit(day(3), 11.0),
            SignalEvent::entry(day(2), 12.0),
        ];
        assert!(matches!(
            run_backtest(&series(6), &signals, 100.0),
            Err(EngineError::InvalidSignalSequence(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_date() {
        let signals = vec![SignalEvent::entry(day(40), 10.0)];
        assert!(matches!(
            run_backtest(&series(6), &signals, 100.0),
            Err(EngineError::InvalidSignalSequence(_))
        ));
    }

    #[test]
    fn test_rejects_bad_capital_and_empty_series() {
        assert!(matches!(
            run_backtest(&series(3), &[], 0.0),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            run_backtest(&series(0), &[], 100.0),
            Err(EngineError::InsufficientHistory { .. })
        ));
    }
}
