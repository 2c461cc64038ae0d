use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{EngineConfig, ExitPricing, PriceSeries, RsiSmoothing};
use indicator_engine::screener::{
    bollinger_snapshot, rsi_snapshot, scan, stochastic_snapshot, BandSnapshot, RsiSnapshot,
    StochasticSnapshot,
};
use indicator_engine::{generate_synthetic_bars, load_file, load_universe, BacktestEngine, BacktestReport};

#[derive(Parser, Debug)]
#[command(name = "indicator-engine")]
#[command(version = "0.1.0")]
#[command(about = "RSI(2), Bollinger and stochastic readings with an RSI(2) mean-reversion backtest", long_about = None)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (json, text)
    #[arg(short, long, default_value = "json", global = true)]
    output: String,

    /// Pretty print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Data file path (CSV/JSON). If not provided, uses synthetic data.
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// Number of synthetic trading days
    #[arg(short, long, default_value = "500")]
    days: usize,

    /// Initial price for synthetic data
    #[arg(long, default_value = "50.0")]
    initial_price: f64,

    /// Seed for synthetic data
    #[arg(long, default_value = "1")]
    seed: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Latest RSI with the two-day-high target
    Rsi {
        #[command(flatten)]
        data: DataArgs,

        /// RSI period
        #[arg(long)]
        period: Option<usize>,
    },
    /// Latest Bollinger bands and where the price sits
    Bollinger {
        #[command(flatten)]
        data: DataArgs,

        /// Standard deviations
        #[arg(short)]
        k: Option<f64>,

        /// Window
        #[arg(short)]
        n: Option<usize>,
    },
    /// Latest stochastic oscillator reading
    Stochastic {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Backtest the RSI(2) mean-reversion rule
    Backtest {
        #[command(flatten)]
        data: DataArgs,

        /// Entry threshold; the configured default applies when absent
        #[arg(long)]
        entry: Option<f64>,

        /// Starting capital
        #[arg(short, long)]
        capital: Option<f64>,

        /// RSI period
        #[arg(long)]
        rsi_period: Option<usize>,

        #[arg(long, value_enum)]
        smoothing: Option<SmoothingArg>,

        #[arg(long, value_enum)]
        exit_pricing: Option<ExitPricingArg>,
    },
    /// Evaluate one reading for every CSV in a directory
    Scan {
        /// Directory with one <SYMBOL>.csv per instrument
        #[arg(short, long)]
        universe: PathBuf,

        #[arg(long, value_enum, default_value = "rsi")]
        indicator: ScanIndicator,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SmoothingArg {
    Simple,
    Wilder,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExitPricingArg {
    BarClose,
    Ceiling,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScanIndicator {
    Rsi,
    Bollinger,
    Stochastic,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Rsi { data, period } => {
            let series = load_series(&data)?;
            let period = period.unwrap_or(config.strategy.rsi_period);
            let snap = rsi_snapshot(&series, period, &config.screener)?;
            emit(&cli.output, cli.pretty, &snap, || print_rsi(period, &snap))?;
        }
        Command::Bollinger { data, k, n } => {
            let series = load_series(&data)?;
            if let Some(k) = k {
                config.bollinger.k = k;
            }
            if let Some(n) = n {
                config.bollinger.n = n;
            }
            let snap = bollinger_snapshot(&series, &config.bollinger)?;
            emit(&cli.output, cli.pretty, &snap, || print_bands(&snap))?;
        }
        Command::Stochastic { data } => {
            let series = load_series(&data)?;
            let snap = stochastic_snapshot(&series, &config.stochastic, &config.screener)?;
            emit(&cli.output, cli.pretty, &snap, || print_stochastic(&snap))?;
        }
        Command::Backtest {
            data,
            entry,
            capital,
            rsi_period,
            smoothing,
            exit_pricing,
        } => {
            let series = load_series(&data)?;
            let mut params = config.strategy;
            params.signals = params.signals.with_threshold_override(entry);
            if let Some(capital) = capital {
                params = params.with_capital(capital);
            }
            if let Some(period) = rsi_period {
                params = params.with_rsi_period(period);
            }
            if let Some(smoothing) = smoothing {
                params = params.with_smoothing(match smoothing {
                    SmoothingArg::Simple => RsiSmoothing::Simple,
                    SmoothingArg::Wilder => RsiSmoothing::Wilder,
                });
            }
            if let Some(pricing) = exit_pricing {
                params.signals = params.signals.with_exit_pricing(match pricing {
                    ExitPricingArg::BarClose => ExitPricing::BarClose,
                    ExitPricingArg::Ceiling => ExitPricing::Ceiling,
                });
            }

            info!(bars = series.len(), entry = params.signals.entry_threshold, "running backtest");
            let report = BacktestEngine::new(params).run(&series)?;
            emit(&cli.output, cli.pretty, &report, || print_text_report(&report))?;
        }
        Command::Scan {
            universe,
            indicator,
        } => {
            let universe = load_universe(&universe)
                .with_context(|| format!("loading universe {}", universe.display()))?;
            info!(instruments = universe.len(), "scanning universe");

            let rows = match indicator {
                ScanIndicator::Rsi => collect_scan(scan(&universe, |s| {
                    rsi_snapshot(s, config.strategy.rsi_period, &config.screener)
                }))?,
                ScanIndicator::Bollinger => {
                    collect_scan(scan(&universe, |s| bollinger_snapshot(s, &config.bollinger)))?
                }
                ScanIndicator::Stochastic => collect_scan(scan(&universe, |s| {
                    stochastic_snapshot(s, &config.stochastic, &config.screener)
                }))?,
            };

            emit(&cli.output, cli.pretty, &rows, || {
                for (symbol, row) in &rows {
                    println!("{:<8} {}", symbol, row);
                }
            })?;
        }
    }

    Ok(())
}

fn load_series(args: &DataArgs) -> Result<PriceSeries> {
    let series = if let Some(path) = &args.data_file {
        info!(path = %path.display(), "loading price history");
        load_file(path).with_context(|| format!("loading {}", path.display()))?
    } else {
        info!(
            days = args.days,
            initial_price = args.initial_price,
            seed = args.seed,
            "generating synthetic price history"
        );
        generate_synthetic_bars(args.days, args.initial_price, args.seed)?
    };

    if series.is_empty() {
        bail!("price history is empty");
    }
    Ok(series)
}

/// Scan results keyed by symbol; failures become an error entry
fn collect_scan<T: Serialize>(
    entries: Vec<indicator_engine::ScanEntry<T>>,
) -> Result<BTreeMap<String, serde_json::Value>> {
    let mut rows = BTreeMap::new();
    for entry in entries {
        let value = match entry.outcome {
            Ok(snapshot) => serde_json::to_value(snapshot)?,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        rows.insert(entry.symbol, value);
    }
    Ok(rows)
}

fn emit<T: Serialize, F: FnOnce()>(output: &str, pretty: bool, value: &T, text: F) -> Result<()> {
    match output {
        "json" => {
            let json = if pretty {
                serde_json::to_string_pretty(value)?
            } else {
                serde_json::to_string(value)?
            };
            println!("{}", json);
        }
        "text" => text(),
        _ => {
            eprintln!("Unknown output format: {}. Using text.", output);
            text();
        }
    }
    Ok(())
}

fn print_rsi(period: usize, snap: &RsiSnapshot) {
    println!("  RSI({}):      {:>10.0}", period, snap.rsi);
    println!("  Price:       {:>10.2}", snap.price);
    println!("  Target:      {:>10.2}", snap.target);
    println!("  Upside:      {:>9.2}%", snap.upside_pct);
    println!("  Variation:   {:>9.2}%", snap.variation_pct);
    match snap.sma_rising {
        Some(up) => println!("  SMA rising:  {:>10}", up),
        None => println!("  SMA rising:  {:>10}", "n/a"),
    }
}

fn print_bands(snap: &BandSnapshot) {
    println!("  Upper band:  {:>10.2}", snap.upper);
    println!("  Middle band: {:>10.2}", snap.middle);
    println!("  Lower band:  {:>10.2}", snap.lower);
    println!("  Price:       {:>10.2}", snap.price);
    println!("  %B:          {:>10.2}", snap.percent_b);
    println!("  {}", snap.text);
}

fn print_stochastic(snap: &StochasticSnapshot) {
    println!("  Fast %K:     {:>10.0}", snap.fast_k);
    println!("  Fast %D:     {:>10.0}", snap.fast_d);
    println!("  Slow %K:     {:>10.0}", snap.slow_k);
    println!("  Slow %D:     {:>10.0}", snap.slow_d);
    println!("  Price:       {:>10.2}", snap.price);
    println!("  K rising:    {:>10}", snap.k_rising);
    println!("  K crossed ↑: {:>10}", snap.k_crossed_above);
    println!("  K crossed ↓: {:>10}", snap.k_crossed_below);
    println!("  EMA rising:  {:>10}", snap.ema_rising);
}

fn print_text_report(report: &BacktestReport) {
    let stats = &report.statistics;

    println!();
    println!("================================================================");
    println!("  BACKTEST REPORT - RSI(2) Mean Reversion");
    println!("================================================================");
    println!();
    println!("----------------------------------------------------------------");
    println!("  CAPITAL");
    println!("----------------------------------------------------------------");
    println!("  Initial Capital:  {:>12.2}", stats.initial_capital);
    println!("  Final Capital:    {:>12.2}", stats.final_capital);
    println!("  Total Return:     {:>11.2}%", stats.total_return_pct);
    println!("  Max Drawdown:     {:>11.2}%", stats.max_drawdown_pct);
    println!();
    println!("----------------------------------------------------------------");
    println!("  TRADE STATISTICS");
    println!("----------------------------------------------------------------");
    println!("  Total Trades:     {:>12}", stats.trade_count);
    println!("  Winning Trades:   {:>12}", stats.win_count);
    println!("  Losing Trades:    {:>12}", stats.loss_count);
    println!("  Win Rate:         {:>11.1}%", stats.win_rate_pct);
    println!("  Avg Return:       {:>11.2}%", stats.average_return_pct);
    println!("  Best Trade:       {:>11.2}%", stats.best_return_pct);
    println!("  Worst Trade:      {:>11.2}%", stats.worst_return_pct);
    println!("  Avg Holding:      {:>7.1} days", stats.avg_holding_days);
    println!();
    println!("================================================================");

    if !report.result.trades.is_empty() {
        println!();
        println!("  RECENT TRADES (last 5)");
        println!("----------------------------------------------------------------");
        for trade in report.result.trades.iter().rev().take(5) {
            println!(
                "  {} -> {} | {:.2} -> {:.2} | P&L: {:+.2} ({:+.1}%)",
                trade.entry_date,
                trade.exit_date,
                trade.entry_price,
                trade.exit_price,
                trade.profit,
                trade.return_pct * 100.0
            );
        }
    }

    if let Some(open) = &report.result.open_position {
        println!();
        println!(
            "  OPEN POSITION: entered {} at {:.2} (excluded from statistics)",
            open.entry_date, open.entry_price
        );
    }
    println!();
}
