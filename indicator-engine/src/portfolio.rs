use chrono::NaiveDate;
use common::{EngineError, OpenPosition, Result, Trade};

/// Compounding ledger for a single-position, fully invested strategy
#[derive(Debug)]
pub struct Portfolio {
    initial_capital: f64,
    capital: f64,
    position: Option<OpenPosition>,
    trades: Vec<Trade>,
    capital_curve: Vec<(NaiveDate, f64)>,
}

impl Portfolio {
    /// Start a ledger whose curve begins at `start_date`
    pub fn new(initial_capital: f64, start_date: NaiveDate) -> Self {
        Self {
            initial_capital,
            capital: initial_capital,
            position: None,
            trades: Vec::new(),
            capital_curve: vec![(start_date, initial_capital)],
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Capital after the last closed trade
    pub fn capital(&self) -> f64 {
        self.capital
    }

    /// Open a new position
    pub fn open_position(&mut self, date: NaiveDate, price: f64) -> Result<()> {
        if let Some(open) = &self.position {
            return Err(EngineError::InvalidSignalSequence(format!(
                "entry on {} while position from {} is open",
                date, open.entry_date
            )));
        }
        if let Some(last) = self.trades.last() {
            if date < last.exit_date {
                return Err(EngineError::InvalidSignalSequence(format!(
                    "entry on {} precedes previous exit on {}",
                    date, last.exit_date
                )));
            }
        }

        self.position = Some(OpenPosition {
            entry_date: date,
            entry_price: price,
        });
        Ok(())
    }

    /// Close the open position and compound capital by the trade's return
    pub fn close_position(&mut self, date: NaiveDate, price: f64) -> Result<&Trade> {
        let position = match self.position {
            Some(open) if date <= open.entry_date => {
                return Err(EngineError::InvalidSignalSequence(format!(
                    "exit on {} is not after entry on {}",
                    date, open.entry_date
                )));
            }
            Some(open) => open,
            None => {
                return Err(EngineError::InvalidSignalSequence(format!(
                    "exit on {} without an open entry",
                    date
                )));
            }
        };
        self.position = None;

        let profit = price - position.entry_price;
        let return_pct = profit / position.entry_price;

        self.capital *= 1.0 + return_pct;
        self.capital_curve.push((date, self.capital));

        self.trades.push(Trade {
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_date: date,
            exit_price: price,
            profit,
            return_pct,
            holding_days: (date - position.entry_date).num_days(),
        });

        Ok(&self.trades[self.trades.len() - 1])
    }

    /// Consume the ledger into its trades, curve and open position
    pub fn into_parts(self) -> (Vec<Trade>, Vec<(NaiveDate, f64)>, Option<OpenPosition>) {
        (self.trades, self.capital_curve, self.position)
    }
}
