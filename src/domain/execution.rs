//! Order execution and fill simulation.
//!
//! The [`PositionManager`] owns the account's single position and its
//! [`EquityState`]. Orders fill at the bar's close; stop-losses fill at the
//! stop price. Entering while already long first closes the open lot, so at
//! most one position exists at any time.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::ohlcv::Bar;
use super::position::{ExitReason, Lot, Position, TradeRecord};
use super::signal::Order;

/// Running account value.
///
/// `cash` is the capital base and is not touched by trading results;
/// closed-trade PnL accrues in `realized_pnl` and open PnL is carried in
/// `unrealized_pnl`.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityState {
    pub cash: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
}

impl EquityState {
    pub fn new(initial_cash: f64) -> Self {
        EquityState {
            cash: initial_cash,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
        }
    }

    pub fn equity(&self) -> f64 {
        self.cash + self.realized_pnl + self.unrealized_pnl
    }

    /// Settled funds available for a new entry.
    pub fn buying_power(&self) -> f64 {
        self.cash + self.realized_pnl
    }
}

/// How much to buy on entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingPolicy {
    /// Fraction of buying power committed per entry, in (0, 1].
    pub position_size: f64,
    /// Round the size down to whole units.
    pub whole_units: bool,
}

impl Default for SizingPolicy {
    fn default() -> Self {
        SizingPolicy {
            position_size: 1.0,
            whole_units: false,
        }
    }
}

impl SizingPolicy {
    pub fn size_for(&self, buying_power: f64, price: f64) -> f64 {
        if price <= 0.0 || buying_power <= 0.0 {
            return 0.0;
        }
        let raw = buying_power * self.position_size / price;
        if self.whole_units { raw.floor() } else { raw }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillKind {
    Entry,
    Exit(ExitReason),
}

/// One simulated execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub timestamp: NaiveDateTime,
    pub kind: FillKind,
    pub price: f64,
    pub size: f64,
}

#[derive(Debug, Clone)]
pub struct PositionManager {
    position: Position,
    equity: EquityState,
    sizing: SizingPolicy,
    trades: Vec<TradeRecord>,
    fills: Vec<Fill>,
}

impl PositionManager {
    pub fn new(initial_cash: f64, sizing: SizingPolicy) -> Self {
        PositionManager {
            position: Position::Flat,
            equity: EquityState::new(initial_cash),
            sizing,
            trades: Vec::new(),
            fills: Vec::new(),
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn equity(&self) -> &EquityState {
        &self.equity
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Close a long whose stop lies at or above the bar's low, at the stop price.
    pub fn check_stop_loss(&mut self, bar: &Bar) -> Option<Fill> {
        let stop = self.position.stop_triggered(bar.low)?;
        self.close_at(bar.timestamp, stop, ExitReason::StopLoss)
    }

    /// Execute an order against the bar's close. An entry while long closes
    /// the open lot first, so this may return an exit fill followed by an
    /// entry fill.
    pub fn apply(&mut self, order: Order, bar: &Bar) -> Vec<Fill> {
        let mut fills = Vec::new();
        match order {
            Order::Close => {
                fills.extend(self.close_at(bar.timestamp, bar.close, ExitReason::Signal));
            }
            Order::EnterLong { stop_loss_price } => {
                fills.extend(self.close_at(bar.timestamp, bar.close, ExitReason::Signal));
                fills.extend(self.open_long(bar, stop_loss_price));
            }
        }
        fills
    }

    pub fn force_close(&mut self, bar: &Bar, reason: ExitReason) -> Option<Fill> {
        self.close_at(bar.timestamp, bar.close, reason)
    }

    pub fn mark_to_market(&mut self, bar: &Bar) {
        self.equity.unrealized_pnl = self.position.unrealized_pnl(bar.close);
    }

    pub fn into_parts(self) -> (EquityState, Vec<TradeRecord>, Vec<Fill>) {
        (self.equity, self.trades, self.fills)
    }

    fn open_long(&mut self, bar: &Bar, stop_loss_price: Option<f64>) -> Option<Fill> {
        let size = self.sizing.size_for(self.equity.buying_power(), bar.close);
        if size <= 0.0 {
            warn!(
                "skipping entry at {}: insufficient capital ({:.2} available at price {:.4})",
                bar.timestamp,
                self.equity.buying_power(),
                bar.close
            );
            return None;
        }

        self.position = Position::Long(Lot {
            entry_time: bar.timestamp,
            entry_price: bar.close,
            stop_loss_price,
            size,
        });
        self.equity.unrealized_pnl = 0.0;

        debug!(
            "entered long at {}: {:.6} @ {:.4}, stop {:?}",
            bar.timestamp, size, bar.close, stop_loss_price
        );

        let fill = Fill {
            timestamp: bar.timestamp,
            kind: FillKind::Entry,
            price: bar.close,
            size,
        };
        self.fills.push(fill.clone());
        Some(fill)
    }

    fn close_at(
        &mut self,
        timestamp: NaiveDateTime,
        price: f64,
        reason: ExitReason,
    ) -> Option<Fill> {
        let Position::Long(lot) = std::mem::take(&mut self.position) else {
            return None;
        };

        let pnl = lot.pnl_at(price);
        self.equity.realized_pnl += pnl;
        self.equity.unrealized_pnl = 0.0;

        debug!(
            "closed long at {} ({}): {:.6} @ {:.4}, pnl {:.2}",
            timestamp, reason, lot.size, price, pnl
        );

        self.trades.push(TradeRecord {
            entry_time: lot.entry_time,
            exit_time: timestamp,
            entry_price: lot.entry_price,
            exit_price: price,
            size: lot.size,
            pnl,
            exit_reason: reason,
        });

        let fill = Fill {
            timestamp,
            kind: FillKind::Exit(reason),
            price,
            size: lot.size,
        };
        self.fills.push(fill.clone());
        Some(fill)
    }
}
