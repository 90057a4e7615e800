//! CSV file bar source.
//!
//! The first column holds the bar timestamp. Price columns are found by
//! header name, case-insensitively; `volume` is optional. Rows are returned
//! in file order.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::debug;

use crate::domain::error::BandtraderError;
use crate::domain::ohlcv::{Bar, Tick};
use crate::ports::data_port::BarSource;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub struct CsvBarSource {
    path: PathBuf,
}

impl CsvBarSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BarSource for CsvBarSource {
    fn load_bars(&self) -> Result<Vec<Bar>, BandtraderError> {
        let file = File::open(&self.path).map_err(|e| BandtraderError::Data {
            reason: format!("failed to open {}: {}", self.path.display(), e),
        })?;
        let bars = read_bars(file)?;
        debug!("loaded {} bars from {}", bars.len(), self.path.display());
        Ok(bars)
    }
}

struct Columns {
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, BandtraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .skip(1)
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .map(|i| i + 1)
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| BandtraderError::Data {
                reason: format!("missing {} column", name),
            })
        };
        Ok(Columns {
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
        })
    }
}

/// Parse bars from any CSV reader with a header row.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, BandtraderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| BandtraderError::Data {
            reason: format!("CSV header error: {}", e),
        })?
        .clone();
    let columns = Columns::locate(&headers)?;

    let mut bars = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| BandtraderError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;
        // header is line 1
        let line = row + 2;

        let raw_ts = record.get(0).ok_or_else(|| BandtraderError::Data {
            reason: format!("line {}: missing timestamp column", line),
        })?;
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| BandtraderError::Data {
            reason: format!("line {}: invalid timestamp '{}'", line, raw_ts),
        })?;

        let volume = match columns.volume {
            Some(idx) => field(&record, idx, "volume", line)?,
            None => 0.0,
        };

        bars.push(Bar {
            timestamp,
            open: field(&record, columns.open, "open", line)?,
            high: field(&record, columns.high, "high", line)?,
            low: field(&record, columns.low, "low", line)?,
            close: field(&record, columns.close, "close", line)?,
            volume,
        });
    }

    Ok(bars)
}

/// Parse ticks from a CSV with a timestamp first column and a `price` column.
pub fn read_ticks<R: Read>(reader: R) -> Result<Vec<Tick>, BandtraderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| BandtraderError::Data {
            reason: format!("CSV header error: {}", e),
        })?
        .clone();
    let price_col = headers
        .iter()
        .skip(1)
        .position(|h| h.eq_ignore_ascii_case("price"))
        .map(|i| i + 1)
        .ok_or_else(|| BandtraderError::Data {
            reason: "missing price column".into(),
        })?;

    let mut ticks = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| BandtraderError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;
        let line = row + 2;
        let raw_ts = record.get(0).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| BandtraderError::Data {
            reason: format!("line {}: invalid timestamp '{}'", line, raw_ts),
        })?;
        ticks.push(Tick {
            timestamp,
            price: field(&record, price_col, "price", line)?,
        });
    }
    Ok(ticks)
}

fn field(record: &StringRecord, idx: usize, name: &str, line: usize) -> Result<f64, BandtraderError> {
    let raw = record.get(idx).ok_or_else(|| BandtraderError::Data {
        reason: format!("line {}: missing {} value", line, name),
    })?;
    let value: f64 = raw.parse().map_err(|e| BandtraderError::Data {
        reason: format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
    })?;
    if !value.is_finite() {
        return Err(BandtraderError::Data {
            reason: format!("line {}: non-finite {} value", line, name),
        });
    }
    Ok(value)
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, RFC 3339 (converted
/// to its naive UTC time) or a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
