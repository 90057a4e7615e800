//! Run summary statistics.

use super::backtest::{BacktestResult, EquityPoint};
use super::position::{ExitReason, TradeRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub initial_cash: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub total_pnl: f64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent below a previous equity peak.
    pub max_drawdown_bars: usize,
    pub stop_loss_exits: usize,
    /// Return from holding the asset from the first close to the last.
    pub buy_and_hold_return: f64,
    /// Fraction of bars that ended with a lot open.
    pub exposure: f64,
}

impl Summary {
    pub fn compute(result: &BacktestResult) -> Self {
        let initial_cash = result.initial_cash;
        let final_equity = result.equity();

        let total_return = if initial_cash > 0.0 {
            (final_equity - initial_cash) / initial_cash
        } else {
            0.0
        };

        let stats = TradeStats::from_trades(&result.trades);
        let (max_drawdown, max_drawdown_bars) = compute_drawdown(&result.equity_curve);

        let win_rate = if stats.total > 0 {
            stats.won as f64 / stats.total as f64
        } else {
            0.0
        };

        let profit_factor = if stats.gross_loss > 0.0 {
            stats.gross_win / stats.gross_loss
        } else if stats.gross_win > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let buy_and_hold_return = match (result.first_close, result.last_close) {
            (Some(first), Some(last)) if first > 0.0 => (last - first) / first,
            _ => 0.0,
        };

        let exposure = if result.bars_processed > 0 {
            result.bars_in_market as f64 / result.bars_processed as f64
        } else {
            0.0
        };

        Summary {
            initial_cash,
            final_equity,
            total_return,
            total_pnl: result.total_pnl(),
            total_trades: stats.total,
            trades_won: stats.won,
            trades_lost: stats.lost,
            trades_breakeven: stats.total - stats.won - stats.lost,
            win_rate,
            profit_factor,
            largest_win: stats.largest_win,
            largest_loss: stats.largest_loss,
            max_drawdown,
            max_drawdown_bars,
            stop_loss_exits: stats.stop_losses,
            buy_and_hold_return,
            exposure,
        }
    }
}

#[derive(Default)]
struct TradeStats {
    total: usize,
    won: usize,
    lost: usize,
    stop_losses: usize,
    gross_win: f64,
    gross_loss: f64,
    largest_win: f64,
    largest_loss: f64,
}

impl TradeStats {
    fn from_trades(trades: &[TradeRecord]) -> Self {
        let mut stats = TradeStats::default();
        for trade in trades {
            stats.total += 1;
            if trade.exit_reason == ExitReason::StopLoss {
                stats.stop_losses += 1;
            }
            let pnl = trade.pnl;
            if pnl > 0.0 {
                stats.won += 1;
                stats.gross_win += pnl;
                stats.largest_win = stats.largest_win.max(pnl);
            } else if pnl < 0.0 {
                stats.lost += 1;
                stats.gross_loss += pnl.abs();
                stats.largest_loss = stats.largest_loss.max(pnl.abs());
            }
        }
        stats
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            duration += 1;
            max_duration = max_duration.max(duration);
        }
    }

    (max_dd, max_duration)
}
