//! CSV report adapter.
//!
//! Writes `trades.csv`, `indicators.csv` and `equity.csv` into an output
//! directory, creating it if needed. Unavailable indicator values are left
//! empty.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use csv::Writer;
use tracing::info;

use crate::domain::backtest::{BacktestResult, EquityPoint};
use crate::domain::error::BandtraderError;
use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::ohlcv::Bar;
use crate::domain::position::TradeRecord;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const TRADES_FILE: &str = "trades.csv";
pub const INDICATORS_FILE: &str = "indicators.csv";
pub const EQUITY_FILE: &str = "equity.csv";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, BandtraderError> {
        fs::create_dir_all(output_dir)?;

        let trades = output_dir.join(TRADES_FILE);
        write_trades(&result.trades, fs::File::create(&trades)?)?;

        let indicators = output_dir.join(INDICATORS_FILE);
        write_indicators(&result.snapshots, fs::File::create(&indicators)?)?;

        let equity = output_dir.join(EQUITY_FILE);
        write_equity(&result.equity_curve, fs::File::create(&equity)?)?;

        info!("report written to {}", output_dir.display());
        Ok(vec![trades, indicators, equity])
    }
}

pub fn write_trades<W: std::io::Write>(
    trades: &[TradeRecord],
    out: W,
) -> Result<(), BandtraderError> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record([
        "entry_time",
        "exit_time",
        "entry_price",
        "exit_price",
        "size",
        "pnl",
        "return_pct",
        "exit_reason",
    ])
    .map_err(csv_error)?;
    for trade in trades {
        wtr.write_record([
            fmt_ts(trade.entry_time),
            fmt_ts(trade.exit_time),
            trade.entry_price.to_string(),
            trade.exit_price.to_string(),
            trade.size.to_string(),
            trade.pnl.to_string(),
            trade.return_pct().to_string(),
            trade.exit_reason.to_string(),
        ])
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_indicators<W: std::io::Write>(
    snapshots: &[IndicatorSnapshot],
    out: W,
) -> Result<(), BandtraderError> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record([
        "timestamp",
        "sma",
        "std",
        "bb_upper",
        "bb_middle",
        "bb_lower",
        "rsi",
    ])
    .map_err(csv_error)?;
    for snap in snapshots {
        wtr.write_record([
            fmt_ts(snap.timestamp),
            fmt_opt(snap.sma),
            fmt_opt(snap.std),
            fmt_opt(snap.bb_upper),
            fmt_opt(snap.bb_middle),
            fmt_opt(snap.bb_lower),
            fmt_opt(snap.rsi),
        ])
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_equity<W: std::io::Write>(
    curve: &[EquityPoint],
    out: W,
) -> Result<(), BandtraderError> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record(["timestamp", "equity"]).map_err(csv_error)?;
    for point in curve {
        wtr.write_record([fmt_ts(point.timestamp), point.equity.to_string()])
            .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_bars<W: std::io::Write>(bars: &[Bar], out: W) -> Result<(), BandtraderError> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record(["timestamp", "open", "high", "low", "close", "volume"])
        .map_err(csv_error)?;
    for bar in bars {
        wtr.write_record([
            fmt_ts(bar.timestamp),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_error(e: csv::Error) -> BandtraderError {
    BandtraderError::Data {
        reason: format!("CSV write error: {}", e),
    }
}
