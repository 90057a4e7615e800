//! Backtest engine and event loop.
//!
//! Bars are processed strictly in timestamp order. For each bar the engine
//! updates the indicator pipeline, checks the open lot's stop against the
//! bar's low, evaluates the signal rule, executes the resulting order at the
//! close and finally marks the position to market. Any position still open
//! after the last bar is closed at that bar's close.

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::config_validation::validate_backtest_config;
use super::error::{BandtraderError, RunWarning};
use super::execution::{EquityState, Fill, FillKind, PositionManager, SizingPolicy};
use super::indicator::{IndicatorParams, IndicatorPipeline, IndicatorSnapshot};
use super::ohlcv::Bar;
use super::position::{ExitReason, Position, TradeRecord};
use super::signal::{self, Order, RuleKind, SignalParams};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub indicators: IndicatorParams,
    pub signal: SignalParams,
    pub rule: RuleKind,
    pub initial_cash: f64,
    pub sizing: SizingPolicy,
    /// Only `true` is supported: an entry while long replaces the open lot.
    pub exclusive_position: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            indicators: IndicatorParams::default(),
            signal: SignalParams::default(),
            rule: RuleKind::default(),
            initial_cash: 10_000.0,
            sizing: SizingPolicy::default(),
            exclusive_position: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No bar seen yet.
    Init,
    /// Indicator windows are still filling; no orders are issued.
    Warmup,
    Active,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// What happened on a single bar.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub phase: RunPhase,
    pub order: Option<Order>,
    pub fills: Vec<Fill>,
    pub equity: f64,
}

impl StepOutcome {
    pub fn stopped_out(&self) -> bool {
        self.fills
            .iter()
            .any(|f| f.kind == FillKind::Exit(ExitReason::StopLoss))
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub phase: RunPhase,
    pub initial_cash: f64,
    pub trades: Vec<TradeRecord>,
    pub fills: Vec<Fill>,
    pub final_equity: EquityState,
    pub snapshots: Vec<IndicatorSnapshot>,
    pub equity_curve: Vec<EquityPoint>,
    pub warnings: Vec<RunWarning>,
    pub bars_processed: usize,
    /// Bars that ended with a lot open.
    pub bars_in_market: usize,
    pub first_close: Option<f64>,
    pub last_close: Option<f64>,
}

impl BacktestResult {
    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn equity(&self) -> f64 {
        self.final_equity.equity()
    }
}

#[derive(Debug)]
pub struct Backtest {
    config: BacktestConfig,
    pipeline: IndicatorPipeline,
    manager: PositionManager,
    snapshots: Vec<IndicatorSnapshot>,
    equity_curve: Vec<EquityPoint>,
    phase: RunPhase,
    first_close: Option<f64>,
    last_bar: Option<Bar>,
    bars_in_market: usize,
}

impl Backtest {
    pub fn new(config: BacktestConfig) -> Result<Self, BandtraderError> {
        validate_backtest_config(&config)?;
        let pipeline = IndicatorPipeline::new(&config.indicators)?;
        let manager = PositionManager::new(config.initial_cash, config.sizing.clone());
        Ok(Backtest {
            config,
            pipeline,
            manager,
            snapshots: Vec::new(),
            equity_curve: Vec::new(),
            phase: RunPhase::Init,
            first_close: None,
            last_bar: None,
            bars_in_market: 0,
        })
    }

    /// Validate the config and run it over a complete series.
    pub fn run(config: BacktestConfig, bars: &[Bar]) -> Result<BacktestResult, BandtraderError> {
        let mut backtest = Backtest::new(config)?;
        for bar in bars {
            backtest.step(bar)?;
        }
        Ok(backtest.finish())
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn position(&self) -> &Position {
        self.manager.position()
    }

    pub fn equity(&self) -> &EquityState {
        self.manager.equity()
    }

    pub fn snapshots(&self) -> &[IndicatorSnapshot] {
        &self.snapshots
    }

    pub fn trades(&self) -> &[TradeRecord] {
        self.manager.trades()
    }

    /// Process one bar. A bar whose timestamp does not strictly follow the
    /// previous one is rejected and leaves the engine untouched.
    pub fn step(&mut self, bar: &Bar) -> Result<StepOutcome, BandtraderError> {
        if let Some(previous) = self.last_bar.as_ref().map(|b| b.timestamp) {
            if bar.timestamp <= previous {
                return Err(BandtraderError::InputOrdering {
                    index: self.snapshots.len(),
                    previous,
                    current: bar.timestamp,
                });
            }
        }

        let snapshot = self.pipeline.update(bar);
        self.advance_phase(&snapshot);

        let mut fills = Vec::new();
        let mut order = None;

        if let Some(fill) = self.manager.check_stop_loss(bar) {
            fills.push(fill);
        } else if self.phase == RunPhase::Active {
            order = signal::evaluate(
                self.config.rule,
                bar,
                &snapshot,
                self.manager.position(),
                &self.config.signal,
            );
            if let Some(o) = order {
                fills.extend(self.manager.apply(o, bar));
            }
        }

        self.manager.mark_to_market(bar);
        if self.manager.position().is_long() {
            self.bars_in_market += 1;
        }
        let equity = self.manager.equity().equity();
        self.equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity,
        });
        self.snapshots.push(snapshot);
        self.first_close.get_or_insert(bar.close);
        self.last_bar = Some(bar.clone());

        Ok(StepOutcome {
            phase: self.phase,
            order,
            fills,
            equity,
        })
    }

    /// Close any open lot at the last close and hand back the results.
    pub fn finish(mut self) -> BacktestResult {
        if let Some(bar) = &self.last_bar {
            if self.manager.force_close(bar, ExitReason::Signal).is_some() {
                debug!("closed open position at end of data ({})", bar.timestamp);
            }
            self.manager.mark_to_market(bar);
        }
        self.phase = RunPhase::Done;

        let bars_processed = self.snapshots.len();
        let required = self.config.indicators.warmup_bars();
        let mut warnings = Vec::new();
        if bars_processed < required {
            let warning = RunWarning::InsufficientData {
                bars: bars_processed,
                required,
            };
            warn!("{}", warning);
            warnings.push(warning);
        }

        let (final_equity, trades, fills) = self.manager.into_parts();
        info!(
            "backtest finished: {} bars, {} trades, final equity {:.2}",
            bars_processed,
            trades.len(),
            final_equity.equity()
        );

        BacktestResult {
            phase: self.phase,
            initial_cash: self.config.initial_cash,
            trades,
            fills,
            final_equity,
            snapshots: self.snapshots,
            equity_curve: self.equity_curve,
            warnings,
            bars_processed,
            bars_in_market: self.bars_in_market,
            first_close: self.first_close,
            last_close: self.last_bar.map(|b| b.close),
        }
    }

    fn advance_phase(&mut self, snapshot: &IndicatorSnapshot) {
        let next = match self.phase {
            RunPhase::Init | RunPhase::Warmup if snapshot.is_warm() => RunPhase::Active,
            RunPhase::Init => RunPhase::Warmup,
            other => other,
        };
        if next != self.phase {
            debug!("phase {:?} -> {:?} at {}", self.phase, next, snapshot.timestamp);
            self.phase = next;
        }
    }
}

/// Run a backtest over `bars` with `config`.
pub fn run_backtest(bars: &[Bar], config: &BacktestConfig) -> Result<BacktestResult, BandtraderError> {
    Backtest::run(config.clone(), bars)
}
