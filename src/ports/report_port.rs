//! Report generation port trait.

use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BandtraderError;

/// Port for writing backtest results.
pub trait ReportPort {
    /// Write the result under `output_dir`, returning the files created.
    fn write(
        &self,
        result: &BacktestResult,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, BandtraderError>;
}
