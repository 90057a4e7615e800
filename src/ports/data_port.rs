//! Bar source port trait.

use crate::domain::error::BandtraderError;
use crate::domain::ohlcv::Bar;

/// Supplies the full bar series for a run, in source order.
pub trait BarSource {
    fn load_bars(&self) -> Result<Vec<Bar>, BandtraderError>;
}
