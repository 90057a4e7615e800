//! Signal evaluation.
//!
//! A rule is a pure function of the current bar, its indicator snapshot and
//! the position state. It never mutates anything; exclusivity and sizing are
//! the position manager's job. Rule sets are selected by [`RuleKind`].

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::ohlcv::Bar;
use crate::domain::position::Position;

/// A transient trade instruction, consumed on the bar it is issued.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Order {
    EnterLong { stop_loss_price: Option<f64> },
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    pub rsi_upper_threshold: f64,
    pub rsi_lower_threshold: f64,
    /// Stop distance below the entry close; 0 disables the stop.
    pub stop_loss_fraction: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        SignalParams {
            rsi_upper_threshold: 70.0,
            rsi_lower_threshold: 30.0,
            stop_loss_fraction: 0.05,
        }
    }
}

impl SignalParams {
    pub fn stop_price_for(&self, entry: f64) -> Option<f64> {
        (self.stop_loss_fraction > 0.0).then(|| entry * (1.0 - self.stop_loss_fraction))
    }
}

pub type SignalRule = fn(&Bar, &IndicatorSnapshot, &Position, &SignalParams) -> Option<Order>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleKind {
    #[default]
    BollingerRsi,
}

impl RuleKind {
    pub fn rule(self) -> SignalRule {
        match self {
            RuleKind::BollingerRsi => bollinger_rsi,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::BollingerRsi => write!(f, "bollinger_rsi"),
        }
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bollinger_rsi" => Ok(RuleKind::BollingerRsi),
            other => Err(format!("unknown rule '{}' (expected bollinger_rsi)", other)),
        }
    }
}

pub fn evaluate(
    kind: RuleKind,
    bar: &Bar,
    snapshot: &IndicatorSnapshot,
    position: &Position,
    params: &SignalParams,
) -> Option<Order> {
    (kind.rule())(bar, snapshot, position, params)
}

/// Mean-reversion entry at the lower band on oversold RSI, exit at the upper
/// band on overbought RSI.
///
/// Returns `None` while any of RSI or the outer bands is unavailable. When
/// the exit condition holds the entry condition is not consulted.
pub fn bollinger_rsi(
    bar: &Bar,
    snapshot: &IndicatorSnapshot,
    position: &Position,
    params: &SignalParams,
) -> Option<Order> {
    let (Some(rsi), Some(upper), Some(lower)) = (snapshot.rsi, snapshot.bb_upper, snapshot.bb_lower)
    else {
        return None;
    };
    let close = bar.close;

    if close >= upper && rsi > params.rsi_upper_threshold {
        return position.is_long().then_some(Order::Close);
    }

    if close <= lower && rsi < params.rsi_lower_threshold {
        return Some(Order::EnterLong {
            stop_loss_price: params.stop_price_for(close),
        });
    }

    None
}
