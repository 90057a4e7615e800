#![allow(dead_code)]

use bandtrader::domain::backtest::BacktestConfig;
use bandtrader::domain::error::BandtraderError;
use bandtrader::domain::indicator::IndicatorParams;
pub use bandtrader::domain::ohlcv::Bar;
use bandtrader::ports::data_port::BarSource;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// In-memory bar source.
pub struct MockBarSource {
    pub bars: Vec<Bar>,
    pub error: Option<String>,
}

impl MockBarSource {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            bars: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl BarSource for MockBarSource {
    fn load_bars(&self) -> Result<Vec<Bar>, BandtraderError> {
        match &self.error {
            Some(reason) => Err(BandtraderError::Data {
                reason: reason.clone(),
            }),
            None => Ok(self.bars.clone()),
        }
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// One flat bar per hour.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::flat(start() + Duration::hours(i as i64), c))
        .collect()
}

/// Bars with an explicit low, for stop-loss scenarios.
pub fn bar_with_low(index: i64, close: f64, low: f64) -> Bar {
    Bar {
        timestamp: start() + Duration::hours(index),
        open: close,
        high: close,
        low,
        close,
        volume: 0.0,
    }
}

pub const CHOP: [f64; 9] = [100.0, 101.0, 100.0, 101.0, 100.0, 101.0, 100.0, 101.0, 100.0];

/// Twenty bars alternating 100/101, enough to warm BB(20) and RSI(14),
/// followed by `tail`.
pub fn long_chop_then(tail: &[f64]) -> Vec<f64> {
    let mut closes: Vec<f64> = (0..20)
        .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
        .collect();
    closes.extend_from_slice(tail);
    closes
}

/// Nine bars of chop followed by `tail`.
pub fn chop_then(tail: &[f64]) -> Vec<f64> {
    let mut closes = CHOP.to_vec();
    closes.extend_from_slice(tail);
    closes
}

/// BB(8, 2, sample) / RSI(3). A lone outlier in a sample-std window of n
/// closes sits (n - 1) / sqrt(n) deviations from the mean, so with k = 2 one
/// bar can break the bands from n = 6; 8 leaves some margin.
pub fn short_window_config() -> BacktestConfig {
    BacktestConfig {
        indicators: IndicatorParams {
            bb_period: 8,
            rsi_period: 3,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn sample_ini(data_path: &str) -> String {
    format!(
        r#"
[backtest]
initial_cash = 10000

[indicators]
bb_period = 8
bb_std_multiplier = 2.0
rsi_period = 3
stddev = sample
rsi_flat = unavailable

[strategy]
rule = bollinger_rsi
rsi_upper_threshold = 70
rsi_lower_threshold = 30
stop_loss_fraction = 0.05
position_size = 1.0
whole_units = false
exclusive_position = true

[data]
path = {}
"#,
        data_path
    )
}

pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
