//! CLI definition and dispatch.

use chrono::Duration;
use clap::{ArgAction, Parser, Subcommand};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::candle_aggregator::{CandleAggregator, DEFAULT_WINDOW};
use crate::adapters::csv_adapter::{CsvBarSource, read_ticks};
use crate::adapters::csv_report_adapter::{CsvReportAdapter, write_bars, write_indicators};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{Backtest, BacktestConfig, BacktestResult};
use crate::domain::config_validation::validate_backtest_config;
use crate::domain::error::BandtraderError;
use crate::domain::execution::SizingPolicy;
use crate::domain::indicator::{IndicatorParams, compute_snapshots};
use crate::domain::metrics::Summary;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::SignalParams;
use crate::ports::config_port::{ConfigPort, get_parsed};
use crate::ports::data_port::BarSource;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "bandtrader", about = "Bollinger Band / RSI backtester")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG wins when set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Bar CSV; overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Report directory; overrides [report] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the indicator series as CSV
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Aggregate a tick CSV (timestamp, price) into candles printed as CSV
    Candles {
        #[arg(short, long)]
        input: PathBuf,
        /// Candle length in seconds
        #[arg(short, long, default_value_t = 60)]
        seconds: i64,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Backtest {
            config,
            data,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, data.as_deref(), output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Indicators { config, data } => run_indicators(&config, data.as_deref()),
        Command::Candles { input, seconds } => run_candles(&input, seconds),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // a subscriber may already be installed when run is called more than once
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BandtraderError> {
    FileConfigAdapter::from_file(path).map_err(|e| BandtraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Map INI sections onto a typed config. Missing keys take their defaults.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, BandtraderError> {
    let defaults = BacktestConfig::default();
    let ind = &defaults.indicators;
    let sig = &defaults.signal;

    let indicators = IndicatorParams {
        bb_period: adapter.get_usize("indicators", "bb_period", ind.bb_period)?,
        bb_std_multiplier: adapter.get_double(
            "indicators",
            "bb_std_multiplier",
            ind.bb_std_multiplier,
        )?,
        rsi_period: adapter.get_usize("indicators", "rsi_period", ind.rsi_period)?,
        stddev: get_parsed(adapter, "indicators", "stddev", ind.stddev)?,
        rsi_flat: get_parsed(adapter, "indicators", "rsi_flat", ind.rsi_flat)?,
    };

    let signal = SignalParams {
        rsi_upper_threshold: adapter.get_double(
            "strategy",
            "rsi_upper_threshold",
            sig.rsi_upper_threshold,
        )?,
        rsi_lower_threshold: adapter.get_double(
            "strategy",
            "rsi_lower_threshold",
            sig.rsi_lower_threshold,
        )?,
        stop_loss_fraction: adapter.get_double(
            "strategy",
            "stop_loss_fraction",
            sig.stop_loss_fraction,
        )?,
    };

    Ok(BacktestConfig {
        indicators,
        signal,
        rule: get_parsed(adapter, "strategy", "rule", defaults.rule)?,
        initial_cash: adapter.get_double("backtest", "initial_cash", defaults.initial_cash)?,
        sizing: SizingPolicy {
            position_size: adapter.get_double(
                "strategy",
                "position_size",
                defaults.sizing.position_size,
            )?,
            whole_units: adapter.get_bool("strategy", "whole_units", defaults.sizing.whole_units)?,
        },
        exclusive_position: adapter.get_bool(
            "strategy",
            "exclusive_position",
            defaults.exclusive_position,
        )?,
    })
}

/// Command-line path first, then `[section] key` from the config.
fn resolve_path(
    cli_value: Option<&Path>,
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Option<PathBuf> {
    cli_value.map(Path::to_path_buf).or_else(|| {
        adapter
            .get_string(section, key)
            .filter(|s| !s.trim().is_empty())
            .map(|s| PathBuf::from(s.trim()))
    })
}

fn load_bars(data_override: Option<&Path>, adapter: &dyn ConfigPort) -> Result<Vec<Bar>, BandtraderError> {
    let path = resolve_path(data_override, adapter, "data", "path").ok_or_else(|| {
        BandtraderError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        }
    })?;
    let source = CsvBarSource::new(path);
    eprintln!("Loading bars from {}", source.path().display());
    source.load_bars()
}

fn load_and_build(config_path: &Path) -> Result<(FileConfigAdapter, BacktestConfig), BandtraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    let config = build_backtest_config(&adapter)?;
    validate_backtest_config(&config)?;
    Ok((adapter, config))
}

fn run_backtest(
    config_path: &Path,
    data_override: Option<&Path>,
    output_override: Option<&Path>,
) -> Result<(), BandtraderError> {
    let (adapter, config) = load_and_build(config_path)?;
    let bars = load_bars(data_override, &adapter)?;

    eprintln!(
        "Running backtest: {} bars, BB({}, {}) RSI({})",
        bars.len(),
        config.indicators.bb_period,
        config.indicators.bb_std_multiplier,
        config.indicators.rsi_period,
    );
    info!("starting backtest over {} bars", bars.len());

    let result = Backtest::run(config, &bars)?;
    print_summary(&result);

    if let Some(dir) = resolve_path(output_override, &adapter, "report", "output_dir") {
        let files = CsvReportAdapter::new().write(&result, &dir)?;
        eprintln!("\nReport written to: {}", dir.display());
        for f in files {
            eprintln!("  {}", f.display());
        }
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let summary = Summary::compute(result);

    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }

    eprintln!("\n=== Results ===");
    eprintln!("Initial Cash:     {:.2}", summary.initial_cash);
    eprintln!("Final Equity:     {:.2}", summary.final_equity);
    eprintln!("Total Return:     {:.2}%", summary.total_return * 100.0);
    eprintln!("Buy & Hold:       {:.2}%", summary.buy_and_hold_return * 100.0);
    eprintln!("Exposure:         {:.1}%", summary.exposure * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", summary.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", summary.total_trades);
    eprintln!("  Won / Lost:     {} / {}", summary.trades_won, summary.trades_lost);
    eprintln!("  Stop-loss:      {}", summary.stop_loss_exits);
    eprintln!("Win Rate:         {:.1}%", summary.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", summary.profit_factor);

    if !result.trades.is_empty() {
        eprintln!("\n=== Trades ===");
        for t in &result.trades {
            let pnl_sign = if t.pnl >= 0.0 { "+" } else { "" };
            eprintln!(
                "  {} -> {}  {:.4} -> {:.4}  {}{:.2}  ({})",
                t.entry_time, t.exit_time, t.entry_price, t.exit_price, pnl_sign, t.pnl, t.exit_reason,
            );
        }
    }
}

pub fn run_dry_run(config_path: &Path) -> Result<(), BandtraderError> {
    let (adapter, config) = load_and_build(config_path)?;
    eprintln!("Config validated successfully");
    describe_config(&config);

    match resolve_path(None, &adapter, "data", "path") {
        Some(p) => eprintln!("\nData:       {}", p.display()),
        None => eprintln!("\nData:       (pass --data)"),
    }
    if let Some(p) = resolve_path(None, &adapter, "report", "output_dir") {
        eprintln!("Report dir: {}", p.display());
    }

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BandtraderError> {
    let (_, config) = load_and_build(config_path)?;
    describe_config(&config);
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn describe_config(config: &BacktestConfig) {
    let ind = &config.indicators;
    let sig = &config.signal;
    eprintln!("\nIndicators:");
    eprintln!(
        "  bollinger:  period {}, {} x {} stddev",
        ind.bb_period, ind.bb_std_multiplier, ind.stddev
    );
    eprintln!("  rsi:        period {}, flat window {}", ind.rsi_period, ind.rsi_flat);
    eprintln!("  warm-up:    {} bars", ind.warmup_bars());
    eprintln!("\nStrategy ({}):", config.rule);
    eprintln!(
        "  rsi thresholds: < {} entry, > {} exit",
        sig.rsi_lower_threshold, sig.rsi_upper_threshold
    );
    if sig.stop_loss_fraction > 0.0 {
        eprintln!("  stop-loss:  {:.2}% below entry", sig.stop_loss_fraction * 100.0);
    } else {
        eprintln!("  stop-loss:  disabled");
    }
    eprintln!(
        "  sizing:     {:.0}% of buying power{}",
        config.sizing.position_size * 100.0,
        if config.sizing.whole_units { ", whole units" } else { "" }
    );
    eprintln!("  cash:       {:.2}", config.initial_cash);
}

fn run_indicators(config_path: &Path, data_override: Option<&Path>) -> Result<(), BandtraderError> {
    let (adapter, config) = load_and_build(config_path)?;
    let bars = load_bars(data_override, &adapter)?;
    let snapshots = compute_snapshots(&bars, &config.indicators)?;
    write_indicators(&snapshots, io::stdout().lock())
}

pub fn run_candles(input: &Path, seconds: i64) -> Result<(), BandtraderError> {
    let duration = Duration::try_seconds(seconds).ok_or_else(|| {
        BandtraderError::invalid("candles", "duration_secs", "candle duration out of range")
    })?;
    let aggregator = CandleAggregator::new(duration, DEFAULT_WINDOW)?;
    let file = File::open(input).map_err(|e| BandtraderError::Data {
        reason: format!("failed to open {}: {}", input.display(), e),
    })?;
    let ticks = read_ticks(file)?;
    let bars = aggregator.aggregate(&ticks)?;
    info!("aggregated {} ticks into {} candles", ticks.len(), bars.len());
    write_bars(&bars, io::stdout().lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::rsi::RsiFlatPolicy;
    use crate::domain::indicator::stddev::StddevMode;
    use crate::domain::signal::RuleKind;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = build_backtest_config(&adapter("")).unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn all_keys_are_read() {
        let config = build_backtest_config(&adapter(
            r#"
[backtest]
initial_cash = 5000

[indicators]
bb_period = 10
bb_std_multiplier = 2.5
rsi_period = 7
stddev = population
rsi_flat = neutral

[strategy]
rule = bollinger_rsi
rsi_upper_threshold = 80
rsi_lower_threshold = 20
stop_loss_fraction = 0
position_size = 0.5
whole_units = true
exclusive_position = true
"#,
        ))
        .unwrap();

        assert_eq!(config.initial_cash, 5000.0);
        assert_eq!(config.indicators.bb_period, 10);
        assert_eq!(config.indicators.bb_std_multiplier, 2.5);
        assert_eq!(config.indicators.rsi_period, 7);
        assert_eq!(config.indicators.stddev, StddevMode::Population);
        assert_eq!(config.indicators.rsi_flat, RsiFlatPolicy::Neutral);
        assert_eq!(config.rule, RuleKind::BollingerRsi);
        assert_eq!(config.signal.rsi_upper_threshold, 80.0);
        assert_eq!(config.signal.rsi_lower_threshold, 20.0);
        assert_eq!(config.signal.stop_loss_fraction, 0.0);
        assert_eq!(config.sizing.position_size, 0.5);
        assert!(config.sizing.whole_units);
        assert!(config.exclusive_position);
    }

    #[test]
    fn unparsable_value_is_config_invalid() {
        let err = build_backtest_config(&adapter("[indicators]\nbb_period = abc\n")).unwrap_err();
        assert!(matches!(err, BandtraderError::ConfigInvalid { ref key, .. } if key == "bb_period"));
    }

    #[test]
    fn unknown_rule_is_config_invalid() {
        let err = build_backtest_config(&adapter("[strategy]\nrule = macd_cross\n")).unwrap_err();
        assert!(matches!(err, BandtraderError::ConfigInvalid { ref key, .. } if key == "rule"));
    }

    #[test]
    fn non_exclusive_parses_but_fails_validation() {
        let config =
            build_backtest_config(&adapter("[strategy]\nexclusive_position = false\n")).unwrap();
        assert!(!config.exclusive_position);
        assert!(validate_backtest_config(&config).is_err());
    }

    #[test]
    fn cli_path_overrides_config() {
        let a = adapter("[data]\npath = from_config.csv\n");
        assert_eq!(
            resolve_path(Some(Path::new("cli.csv")), &a, "data", "path"),
            Some(PathBuf::from("cli.csv"))
        );
        assert_eq!(
            resolve_path(None, &a, "data", "path"),
            Some(PathBuf::from("from_config.csv"))
        );
        assert_eq!(resolve_path(None, &a, "report", "output_dir"), None);
    }

    #[test]
    fn missing_data_path_is_config_missing() {
        let err = load_bars(None, &adapter("")).unwrap_err();
        assert!(matches!(err, BandtraderError::ConfigMissing { ref section, .. } if section == "data"));
    }

    #[test]
    fn cli_parses_candles_command() {
        let cli = Cli::try_parse_from(["bandtrader", "candles", "-i", "ticks.csv", "-s", "5"]).unwrap();
        match cli.command {
            Command::Candles { input, seconds } => {
                assert_eq!(input, PathBuf::from("ticks.csv"));
                assert_eq!(seconds, 5);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn candles_rejects_non_positive_duration() {
        let err = run_candles(Path::new("ticks.csv"), 0).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn cli_parses_backtest_command() {
        let cli = Cli::try_parse_from([
            "bandtrader", "-vv", "backtest", "-c", "run.ini", "-d", "bars.csv", "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Backtest {
                config,
                data,
                output,
                dry_run,
            } => {
                assert_eq!(config, PathBuf::from("run.ini"));
                assert_eq!(data, Some(PathBuf::from("bars.csv")));
                assert_eq!(output, None);
                assert!(dry_run);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
