//! Domain error and warning types.

use chrono::NaiveDateTime;
use std::fmt;

/// Top-level error type for bandtrader.
#[derive(Debug, thiserror::Error)]
pub enum BandtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("bars out of order at index {index}: {current} does not follow {previous}")]
    InputOrdering {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BandtraderError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        BandtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self,
            BandtraderError::ConfigParse { .. }
                | BandtraderError::ConfigMissing { .. }
                | BandtraderError::ConfigInvalid { .. }
        )
    }
}

impl From<&BandtraderError> for std::process::ExitCode {
    fn from(err: &BandtraderError) -> Self {
        let code: u8 = match err {
            BandtraderError::Io(_) => 1,
            BandtraderError::ConfigParse { .. }
            | BandtraderError::ConfigMissing { .. }
            | BandtraderError::ConfigInvalid { .. } => 2,
            BandtraderError::InputOrdering { .. } => 3,
            BandtraderError::Data { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Non-fatal conditions recorded on a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunWarning {
    /// The series never filled the longest indicator window.
    InsufficientData { bars: usize, required: usize },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::InsufficientData { bars, required } => write!(
                f,
                "insufficient data: have {} bars, indicators need {}",
                bars, required
            ),
        }
    }
}
