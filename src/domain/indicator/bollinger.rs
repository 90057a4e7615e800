//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev follows the configured [`StddevMode`].
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are unavailable.

use super::stddev::{RollingStddev, StddevMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    pub sma: f64,
    pub std: f64,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Debug, Clone)]
pub struct BollingerBands {
    stats: RollingStddev,
    multiplier: f64,
}

impl BollingerBands {
    /// `period` must be non-zero.
    pub(crate) fn new(period: usize, multiplier: f64, mode: StddevMode) -> Self {
        BollingerBands {
            stats: RollingStddev::new(period, mode),
            multiplier,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.stats.is_ready()
    }

    pub fn update(&mut self, close: f64) -> Option<BandPoint> {
        let s = self.stats.update(close)?;
        let width = self.multiplier * s.std;
        Some(BandPoint {
            sma: s.mean,
            std: s.std,
            upper: s.mean + width,
            lower: s.mean - width,
        })
    }
}
