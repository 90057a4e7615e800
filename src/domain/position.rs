//! Position state and closed-trade records.

use chrono::NaiveDateTime;
use std::fmt;

/// An open long holding.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub stop_loss_price: Option<f64>,
    pub size: f64,
}

impl Lot {
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.size
    }
}

/// The account's single position: flat, or long one lot.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long(Lot),
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long(_))
    }

    pub fn lot(&self) -> Option<&Lot> {
        match self {
            Position::Flat => None,
            Position::Long(lot) => Some(lot),
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.lot().map_or(0.0, |lot| lot.pnl_at(price))
    }

    /// The stop price if a bar trading down to `low` reaches it.
    pub fn stop_triggered(&self, low: f64) -> Option<f64> {
        let stop = self.lot()?.stop_loss_price?;
        (low <= stop).then_some(stop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
        }
    }
}

/// Summary of a closed position.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (self.exit_price - self.entry_price) / self.entry_price * 100.0
    }
}
