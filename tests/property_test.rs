//! Property tests over random price walks.
//!
//! - Snapshots and closed trades never depend on later bars
//! - At most one position is open at any time
//! - Final equity equals initial cash plus the sum of trade PnL
//! - Indicators become warm exactly at max(bb_period, rsi_period + 1) - 1

mod common;

use bandtrader::domain::backtest::{Backtest, BacktestConfig, run_backtest};
use bandtrader::domain::execution::FillKind;
use bandtrader::domain::indicator::stddev::StddevMode;
use bandtrader::domain::indicator::{IndicatorParams, compute_snapshots};
use common::*;
use proptest::prelude::*;

fn walk(steps: Vec<f64>) -> Vec<f64> {
    let mut price = 100.0_f64;
    steps
        .into_iter()
        .map(|s| {
            price = (price + s).max(1.0);
            price
        })
        .collect()
}

fn price_walk(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-4.0f64..4.0, 1..max_len).prop_map(walk)
}

fn config_for(bb_period: usize, rsi_period: usize, stop: f64) -> BacktestConfig {
    let mut config = BacktestConfig {
        indicators: IndicatorParams {
            bb_period,
            rsi_period,
            stddev: StddevMode::Sample,
            ..Default::default()
        },
        ..Default::default()
    };
    config.signal.stop_loss_fraction = stop;
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn snapshots_ignore_future_bars(
        closes in price_walk(120),
        cut in 1usize..120,
        bb in 2usize..25,
        rsi in 1usize..20,
    ) {
        let bars = bars_from_closes(&closes);
        let cut = cut.min(bars.len());
        let params = IndicatorParams { bb_period: bb, rsi_period: rsi, ..Default::default() };

        let full = compute_snapshots(&bars, &params).unwrap();
        let prefix = compute_snapshots(&bars[..cut], &params).unwrap();
        prop_assert_eq!(&full[..cut], &prefix[..]);
    }

    #[test]
    fn trades_closed_before_cut_ignore_future_bars(
        closes in price_walk(150),
        cut in 2usize..150,
    ) {
        let bars = bars_from_closes(&closes);
        let cut = cut.min(bars.len());
        let config = config_for(8, 3, 0.05);

        let full = run_backtest(&bars, &config).unwrap();
        let prefix = run_backtest(&bars[..cut], &config).unwrap();

        let horizon = bars[cut - 1].timestamp;
        let closed_before = |r: &bandtrader::domain::backtest::BacktestResult| {
            r.trades.iter().filter(|t| t.exit_time < horizon).cloned().collect::<Vec<_>>()
        };
        prop_assert_eq!(closed_before(&full), closed_before(&prefix));
    }

    #[test]
    fn at_most_one_position_open(
        closes in price_walk(200),
        stop in prop_oneof![Just(0.0), 0.01f64..0.2],
    ) {
        let bars = bars_from_closes(&closes);
        let mut bt = Backtest::new(config_for(8, 3, stop)).unwrap();
        let mut open = 0i32;

        for bar in &bars {
            let outcome = bt.step(bar).unwrap();
            for fill in &outcome.fills {
                match fill.kind {
                    FillKind::Entry => open += 1,
                    FillKind::Exit(_) => open -= 1,
                }
                prop_assert!((0..=1).contains(&open));
            }
            prop_assert_eq!(open == 1, bt.position().is_long());
        }

        let result = bt.finish();
        for pair in result.trades.windows(2) {
            prop_assert!(pair[0].exit_time <= pair[1].entry_time);
        }
    }

    #[test]
    fn equity_is_conserved(
        closes in price_walk(200),
        stop in prop_oneof![Just(0.0), 0.01f64..0.2],
        whole_units in any::<bool>(),
    ) {
        let mut config = config_for(8, 3, stop);
        config.sizing.whole_units = whole_units;
        let result = run_backtest(&bars_from_closes(&closes), &config).unwrap();

        let eq = &result.final_equity;
        prop_assert_eq!(eq.unrealized_pnl, 0.0);
        let lhs = eq.cash + eq.realized_pnl + eq.unrealized_pnl;
        let rhs = result.initial_cash + result.total_pnl();
        prop_assert!((lhs - rhs).abs() <= 1e-9 * rhs.abs().max(1.0), "{} != {}", lhs, rhs);
    }

    #[test]
    fn warm_up_boundary(
        closes in price_walk(80),
        bb in 2usize..30,
        rsi in 1usize..30,
    ) {
        let bars = bars_from_closes(&closes);
        let config = config_for(bb, rsi, 0.05);
        let boundary = bb.max(rsi + 1) - 1;

        let mut bt = Backtest::new(config).unwrap();
        for (i, bar) in bars.iter().enumerate() {
            let outcome = bt.step(bar).unwrap();
            let snap = bt.snapshots().last().unwrap();
            prop_assert_eq!(snap.is_warm(), i >= boundary, "bar {}", i);
            if i < boundary {
                prop_assert!(outcome.fills.is_empty());
                prop_assert!(outcome.order.is_none());
            }
        }

        let result = bt.finish();
        prop_assert_eq!(result.warnings.is_empty(), bars.len() > boundary);
    }
}
