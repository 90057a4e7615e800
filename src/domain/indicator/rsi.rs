//! RSI (Relative Strength Index) over a simple rolling mean.
//!
//! Average gain and average loss are plain means of the last n
//! close-to-close changes, not Wilder's exponential smoothing, so values
//! differ from most charting packages.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 and avg_gain > 0: RSI = 100
//! If both are 0 the value is decided by [`RsiFlatPolicy`].
//!
//! Warmup: first n bars are unavailable (n changes need n + 1 closes).

use std::fmt;
use std::str::FromStr;

use super::rolling::RollingWindow;

/// What RSI reports when the window has neither gains nor losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RsiFlatPolicy {
    #[default]
    Unavailable,
    /// Report 50.
    Neutral,
}

impl fmt::Display for RsiFlatPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsiFlatPolicy::Unavailable => write!(f, "unavailable"),
            RsiFlatPolicy::Neutral => write!(f, "neutral"),
        }
    }
}

impl FromStr for RsiFlatPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unavailable" => Ok(RsiFlatPolicy::Unavailable),
            "neutral" => Ok(RsiFlatPolicy::Neutral),
            other => Err(format!(
                "unknown rsi_flat policy '{}' (expected unavailable or neutral)",
                other
            )),
        }
    }
}

pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64, flat: RsiFlatPolicy) -> Option<f64> {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 {
            return Some(100.0);
        }
        return match flat {
            RsiFlatPolicy::Unavailable => None,
            RsiFlatPolicy::Neutral => Some(50.0),
        };
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[derive(Debug, Clone)]
pub struct RollingRsi {
    prev_close: Option<f64>,
    gains: RollingWindow,
    losses: RollingWindow,
    flat: RsiFlatPolicy,
}

impl RollingRsi {
    /// `period` must be non-zero.
    pub(crate) fn new(period: usize, flat: RsiFlatPolicy) -> Self {
        RollingRsi {
            prev_close: None,
            gains: RollingWindow::new(period),
            losses: RollingWindow::new(period),
            flat,
        }
    }

    /// True once `period` changes have been observed.
    pub fn is_ready(&self) -> bool {
        self.gains.is_full()
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        let prev = self.prev_close.replace(close)?;
        let change = close - prev;
        self.gains.push(change.max(0.0));
        self.losses.push((-change).max(0.0));

        if !self.is_ready() {
            return None;
        }
        rsi_from_averages(self.gains.mean()?, self.losses.mean()?, self.flat)
    }
}
