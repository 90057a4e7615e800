//! Rolling indicator pipeline.
//!
//! The pipeline consumes bars one at a time and produces an
//! [`IndicatorSnapshot`] per bar:
//! - SMA and rolling standard deviation over `bb_period` closes
//! - Bollinger Bands derived from them
//! - RSI over `rsi_period` close-to-close changes
//!
//! Every window ends at and includes the current bar's close, and a snapshot
//! only depends on the bars fed so far. Each update is O(1) amortized.

pub mod bollinger;
pub mod rolling;
pub mod rsi;
pub mod stddev;

use chrono::NaiveDateTime;

use crate::domain::config_validation::validate_indicator_params;
use crate::domain::error::BandtraderError;
use crate::domain::ohlcv::Bar;

use bollinger::BollingerBands;
use rsi::{RollingRsi, RsiFlatPolicy};
use stddev::StddevMode;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub bb_period: usize,
    pub bb_std_multiplier: f64,
    pub rsi_period: usize,
    pub stddev: StddevMode,
    pub rsi_flat: RsiFlatPolicy,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            bb_period: 20,
            bb_std_multiplier: 2.0,
            rsi_period: 14,
            stddev: StddevMode::Sample,
            rsi_flat: RsiFlatPolicy::Unavailable,
        }
    }
}

impl IndicatorParams {
    /// Bars needed before every window is full: max(bb_period, rsi_period + 1).
    pub fn warmup_bars(&self) -> usize {
        self.bb_period.max(self.rsi_period + 1)
    }
}

/// Indicator values for one bar. `None` marks a value that is not yet available.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub timestamp: NaiveDateTime,
    pub sma: Option<f64>,
    pub std: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub rsi: Option<f64>,
    pub(crate) warm: bool,
}

impl IndicatorSnapshot {
    /// Both rolling windows are full. RSI may still be `None` on a flat window.
    pub fn is_warm(&self) -> bool {
        self.warm
    }

    /// All values the signal rules read are defined.
    pub fn is_tradable(&self) -> bool {
        self.rsi.is_some() && self.bb_upper.is_some() && self.bb_lower.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorPipeline {
    bands: BollingerBands,
    rsi: RollingRsi,
}

impl IndicatorPipeline {
    pub fn new(params: &IndicatorParams) -> Result<Self, BandtraderError> {
        validate_indicator_params(params)?;
        Ok(IndicatorPipeline {
            bands: BollingerBands::new(params.bb_period, params.bb_std_multiplier, params.stddev),
            rsi: RollingRsi::new(params.rsi_period, params.rsi_flat),
        })
    }

    pub fn update(&mut self, bar: &Bar) -> IndicatorSnapshot {
        let band = self.bands.update(bar.close);
        let rsi = self.rsi.update(bar.close);

        IndicatorSnapshot {
            timestamp: bar.timestamp,
            sma: band.map(|b| b.sma),
            std: band.map(|b| b.std),
            bb_upper: band.map(|b| b.upper),
            bb_middle: band.map(|b| b.sma),
            bb_lower: band.map(|b| b.lower),
            rsi,
            warm: self.bands.is_ready() && self.rsi.is_ready(),
        }
    }
}

/// Run a fresh pipeline over `bars`, one snapshot per bar.
pub fn compute_snapshots(
    bars: &[Bar],
    params: &IndicatorParams,
) -> Result<Vec<IndicatorSnapshot>, BandtraderError> {
    let mut pipeline = IndicatorPipeline::new(params)?;
    Ok(bars.iter().map(|bar| pipeline.update(bar)).collect())
}
