//! Tick-to-candle aggregation.
//!
//! Prices are folded into the newest candle until its period ends. The
//! first tick at or past the end opens a new candle starting exactly at the
//! previous candle's end, with every price set to that tick. Only the most
//! recent `window` candles are retained.

use std::collections::VecDeque;

use chrono::Duration;
use tracing::debug;

use crate::domain::error::BandtraderError;
use crate::domain::ohlcv::{Bar, Tick};

/// Candles kept in memory when no window is configured.
pub const DEFAULT_WINDOW: usize = 20;

#[derive(Debug, Clone)]
pub struct CandleAggregator {
    duration: Duration,
    window: usize,
    candles: VecDeque<Bar>,
}

impl CandleAggregator {
    pub fn new(duration: Duration, window: usize) -> Result<Self, BandtraderError> {
        if duration <= Duration::zero() {
            return Err(BandtraderError::invalid(
                "candles",
                "duration_secs",
                "candle duration must be positive",
            ));
        }
        if window == 0 {
            return Err(BandtraderError::invalid(
                "candles",
                "window",
                "candle window must be at least 1",
            ));
        }
        Ok(CandleAggregator {
            duration,
            window,
            candles: VecDeque::with_capacity(window + 1),
        })
    }

    /// Start from already completed candles, e.g. fetched history. The last
    /// one becomes the candle new ticks are folded into.
    pub fn with_history(
        duration: Duration,
        window: usize,
        history: impl IntoIterator<Item = Bar>,
    ) -> Result<Self, BandtraderError> {
        let mut aggregator = CandleAggregator::new(duration, window)?;
        for bar in history {
            aggregator.candles.push_back(bar);
            aggregator.trim();
        }
        Ok(aggregator)
    }

    /// Fold one tick in. Returns the candle that was closed by it, if any.
    pub fn push(&mut self, tick: Tick) -> Result<Option<Bar>, BandtraderError> {
        if !tick.price.is_finite() {
            return Err(BandtraderError::Data {
                reason: format!("non-finite tick price at {}", tick.timestamp),
            });
        }

        let Some(current) = self.candles.back_mut() else {
            self.candles.push_back(Bar::flat(tick.timestamp, tick.price));
            return Ok(None);
        };

        let end = current.timestamp + self.duration;
        if tick.timestamp < end {
            current.high = current.high.max(tick.price);
            current.low = current.low.min(tick.price);
            current.close = tick.price;
            return Ok(None);
        }

        let finished = current.clone();
        debug!("candle closed at {}: close {:.4}", end, finished.close);
        self.candles.push_back(Bar::flat(end, tick.price));
        self.trim();
        Ok(Some(finished))
    }

    /// The candle still receiving ticks.
    pub fn current(&self) -> Option<&Bar> {
        self.candles.back()
    }

    /// Retained candles, oldest first; the last one is still open.
    pub fn candles(&self) -> impl Iterator<Item = &Bar> {
        self.candles.iter()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Fold a whole tick series in. Returns the candles it closed followed
    /// by the one left open.
    pub fn aggregate(mut self, ticks: &[Tick]) -> Result<Vec<Bar>, BandtraderError> {
        let mut bars = Vec::new();
        for tick in ticks {
            if let Some(bar) = self.push(*tick)? {
                bars.push(bar);
            }
        }
        bars.extend(self.candles.pop_back());
        Ok(bars)
    }

    fn trim(&mut self) {
        while self.candles.len() > self.window {
            self.candles.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(secs: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + Duration::milliseconds(secs * 1000)
    }

    fn tick(secs: i64, price: f64) -> Tick {
        Tick {
            timestamp: ts(secs),
            price,
        }
    }

    fn one_minute() -> CandleAggregator {
        CandleAggregator::new(Duration::seconds(60), 3).unwrap()
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(CandleAggregator::new(Duration::zero(), 3).is_err());
        assert!(CandleAggregator::new(Duration::seconds(-5), 3).is_err());
        let err = CandleAggregator::new(Duration::seconds(60), 0).unwrap_err();
        assert!(matches!(err, BandtraderError::ConfigInvalid { ref key, .. } if key == "window"));
    }

    #[test]
    fn first_tick_opens_a_flat_candle() {
        let mut agg = one_minute();
        assert!(agg.is_empty());
        assert_eq!(agg.push(tick(0, 100.0)).unwrap(), None);
        assert_eq!(agg.current(), Some(&Bar::flat(ts(0), 100.0)));
    }

    #[test]
    fn ticks_inside_the_period_update_the_open_candle() {
        let mut agg = one_minute();
        for (secs, price) in [(0, 100.0), (10, 103.0), (20, 97.0), (59, 101.0)] {
            assert_eq!(agg.push(tick(secs, price)).unwrap(), None);
        }

        let candle = agg.current().unwrap();
        assert_eq!(candle.timestamp, ts(0));
        assert_eq!(candle.open, 100.0);
        assert_eq!(candle.high, 103.0);
        assert_eq!(candle.low, 97.0);
        assert_eq!(candle.close, 101.0);
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn tick_at_boundary_closes_the_candle() {
        let mut agg = one_minute();
        agg.push(tick(0, 100.0)).unwrap();
        agg.push(tick(30, 104.0)).unwrap();

        let closed = agg.push(tick(60, 102.0)).unwrap().unwrap();
        assert_eq!(closed.timestamp, ts(0));
        assert_eq!(closed.high, 104.0);
        assert_eq!(closed.close, 104.0);

        assert_eq!(agg.current(), Some(&Bar::flat(ts(60), 102.0)));
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn new_candle_starts_at_previous_end_after_a_gap() {
        let mut agg = one_minute();
        agg.push(tick(0, 100.0)).unwrap();
        agg.push(tick(250, 90.0)).unwrap();
        assert_eq!(agg.current().map(|c| c.timestamp), Some(ts(60)));

        // still past the new candle's end, so it rolls again
        agg.push(tick(260, 91.0)).unwrap();
        assert_eq!(agg.current().map(|c| c.timestamp), Some(ts(120)));
    }

    #[test]
    fn window_caps_retained_candles() {
        let mut agg = one_minute();
        for i in 0..6 {
            agg.push(tick(i * 60, 100.0 + i as f64)).unwrap();
        }
        assert_eq!(agg.len(), 3);
        let opens: Vec<f64> = agg.candles().map(|c| c.open).collect();
        assert_eq!(opens, vec![103.0, 104.0, 105.0]);
    }

    #[test]
    fn history_seeds_the_open_candle() {
        let history = (0..5).map(|i| Bar::flat(ts(i * 60), 50.0 + i as f64));
        let mut agg = CandleAggregator::with_history(Duration::seconds(60), 3, history).unwrap();
        assert_eq!(agg.len(), 3);

        agg.push(tick(250, 60.0)).unwrap();
        let candle = agg.current().unwrap();
        assert_eq!(candle.timestamp, ts(240));
        assert_eq!(candle.open, 54.0);
        assert_eq!(candle.high, 60.0);
        assert_eq!(candle.close, 60.0);
    }

    #[test]
    fn non_finite_price_is_a_data_error() {
        let mut agg = one_minute();
        let err = agg.push(tick(0, f64::NAN)).unwrap_err();
        assert!(matches!(err, BandtraderError::Data { .. }));
        assert!(agg.is_empty());
    }

    #[test]
    fn aggregate_includes_partial_last_candle() {
        let ticks = [
            tick(0, 10.0),
            tick(30, 12.0),
            tick(60, 11.0),
            tick(61, 9.0),
            tick(125, 13.0),
        ];
        let bars = one_minute().aggregate(&ticks).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].close, 12.0);
        assert_eq!((bars[1].timestamp, bars[1].low, bars[1].close), (ts(60), 9.0, 9.0));
        assert_eq!(bars[2], Bar::flat(ts(120), 13.0));
    }

    #[test]
    fn aggregate_of_empty_series_is_empty() {
        assert!(one_minute().aggregate(&[]).unwrap().is_empty());
    }
}
