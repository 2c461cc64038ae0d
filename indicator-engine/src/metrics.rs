use chrono::NaiveDate;
use common::{BacktestResult, Statistics, Trade};

/// Reduce a backtest into summary statistics
pub struct StatisticsCalculator;

impl StatisticsCalculator {
    /// Summarize a backtest; zero trades yields zeroed statistics
    pub fn summarize(result: &BacktestResult) -> Statistics {
        let initial_capital = result.initial_capital;
        let final_capital = result.final_capital();

        let total_return_pct = if initial_capital > 0.0 {
            (final_capital / initial_capital - 1.0) * 100.0
        } else {
            0.0
        };

        let trade_stats = Self::calculate_trade_stats(&result.trades);

        Statistics {
            trade_count: result.trades.len() as u32,
            win_count: trade_stats.winning,
            loss_count: trade_stats.losing,
            win_rate_pct: trade_stats.win_rate,
            average_return_pct: trade_stats.avg_return,
            total_return_pct,
            initial_capital,
            final_capital,
            best_return_pct: trade_stats.best,
            worst_return_pct: trade_stats.worst,
            max_drawdown_pct: Self::calculate_max_drawdown(&result.capital_curve),
            avg_holding_days: trade_stats.avg_duration,
            has_open_position: result.open_position.is_some(),
        }
    }

    /// Largest peak-to-trough decline of the capital curve, in percent
    fn calculate_max_drawdown(capital_curve: &[(NaiveDate, f64)]) -> f64 {
        let mut peak = match capital_curve.first() {
            Some((_, c)) => *c,
            None => return 0.0,
        };
        let mut max_drawdown = 0.0;

        for (_, capital) in capital_curve {
            if *capital > peak {
                peak = *capital;
            }
            if peak > 0.0 {
                let drawdown = (peak - capital) / peak * 100.0;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }

        max_drawdown
    }

    /// Calculate trade statistics
    fn calculate_trade_stats(trades: &[Trade]) -> TradeStats {
        if trades.is_empty() {
            return TradeStats::default();
        }

        let mut winning = 0u32;
        let mut losing = 0u32;
        let mut total_return = 0.0;
        let mut total_duration = 0i64;
        let mut best = f64::MIN;
        let mut worst = f64::MAX;

        for trade in trades {
            if trade.profit > 0.0 {
                winning += 1;
            } else if trade.profit < 0.0 {
                losing += 1;
            }

            total_return += trade.return_pct;
            total_duration += trade.holding_days;
            best = best.max(trade.return_pct);
            worst = worst.min(trade.return_pct);
        }

        let n = trades.len() as f64;

        TradeStats {
            winning,
            losing,
            win_rate: (winning as f64 / n) * 100.0,
            avg_return: total_return / n * 100.0,
            avg_duration: total_duration as f64 / n,
            best: best * 100.0,
            worst: worst * 100.0,
        }
    }
}

#[derive(Debug, Default)]
struct TradeStats {
    winning: u32,
    losing: u32,
    win_rate: f64,
    avg_return: f64,
    avg_duration: f64,
    best: f64,
    worst: f64,
}
