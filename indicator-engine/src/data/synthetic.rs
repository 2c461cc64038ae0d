use chrono::{Datelike, Duration, NaiveDate, Weekday};
use common::{Bar, PriceSeries, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// First date of every synthetic series
fn synthetic_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or_default()
}

/// Advance to the next weekday
fn next_trading_day(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next += Duration::days(1);
    }
    next
}

/// Generate a seeded random-walk equity series on weekdays
pub fn generate_synthetic_bars(days: usize, initial_price: f64, seed: u64) -> Result<PriceSeries> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(days);

    let mut price = initial_price;
    let mut date = synthetic_start();

    let daily_volatility = 0.02;
    let drift = 0.0002;

    for _ in 0..days {
        let random_return: f64 = rng.gen_range(-1.0..1.0);
        let daily_return = drift + daily_volatility * random_return;
        let new_price = price * (1.0 + daily_return);

        // Generate OHLC
        let intraday_range = price * rng.gen_range(0.005..0.03);
        let open = price + rng.gen_range(-intraday_range / 2.0..intraday_range / 2.0);
        let close = new_price;

        let high = open.max(close) + rng.gen_range(0.0..intraday_range / 2.0);
        let low = open.min(close) - rng.gen_range(0.0..intraday_range / 2.0);

        bars.push(Bar::new(date, open, high, low, close, close));

        price = new_price;
        date = next_trading_day(date);
    }

    PriceSeries::new(bars)
}

/// Generate a series with scripted drops and rallies for testing
pub fn generate_bars_with_rsi_pattern(
    days: usize,
    initial_price: f64,
    oversold_days: &[usize],
    overbought_days: &[usize],
) -> Result<PriceSeries> {
    let mut bars = Vec::with_capacity(days);
    let mut price = initial_price;
    let mut date = synthetic_start();

    for i in 0..days {
        let daily_return = if oversold_days.contains(&i) {
            -0.03
        } else if overbought_days.contains(&i) {
            0.03
        } else {
            0.001
        };

        let new_price = price * (1.0 + daily_return);
        let range = price * 0.01;

        bars.push(Bar::new(
            date,
            price,
            price.max(new_price) + range,
            price.min(new_price) - range,
            new_price,
            new_price,
        ));

        price = new_price;
        date = next_trading_day(date);
    }

    PriceSeries::new(bars)
}
