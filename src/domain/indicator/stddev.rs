//! Rolling mean and standard deviation over n closing prices.
//!
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / d)
//! where d = n - 1 for the sample estimator and d = n for the population one.
//! Warmup: first (n-1) bars are unavailable.

use std::fmt;
use std::str::FromStr;

use super::rolling::RollingWindow;

/// Which estimator the rolling standard deviation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StddevMode {
    /// Divides by n - 1.
    #[default]
    Sample,
    /// Divides by n.
    Population,
}

impl StddevMode {
    pub fn ddof(self) -> usize {
        match self {
            StddevMode::Sample => 1,
            StddevMode::Population => 0,
        }
    }
}

impl fmt::Display for StddevMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StddevMode::Sample => write!(f, "sample"),
            StddevMode::Population => write!(f, "population"),
        }
    }
}

impl FromStr for StddevMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sample" => Ok(StddevMode::Sample),
            "population" => Ok(StddevMode::Population),
            other => Err(format!(
                "unknown stddev mode '{}' (expected sample or population)",
                other
            )),
        }
    }
}

/// One rolling mean/deviation pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone)]
pub struct RollingStddev {
    window: RollingWindow,
    mode: StddevMode,
}

impl RollingStddev {
    /// `period` must be non-zero.
    pub(crate) fn new(period: usize, mode: StddevMode) -> Self {
        RollingStddev {
            window: RollingWindow::new(period),
            mode,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.window.is_full()
    }

    /// Feed one close; returns the window statistics once `period` closes were seen.
    pub fn update(&mut self, close: f64) -> Option<MeanStd> {
        self.window.push(close);
        if !self.window.is_full() {
            return None;
        }

        let n = self.window.len();
        let divisor = n.checked_sub(self.mode.ddof()).filter(|&d| d > 0)?;
        let mean = self.window.mean()?;
        let std = (self.window.sum_sq_dev() / divisor as f64).sqrt();

        Some(MeanStd { mean, std })
    }
}
