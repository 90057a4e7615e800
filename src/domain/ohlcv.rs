//! Price bars and ticks.

use chrono::NaiveDateTime;

/// One sampled interval of price data. Bars are read-only to every component.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// A bar whose open, high, low and close all sit at `price`.
    pub fn flat(timestamp: NaiveDateTime, price: f64) -> Self {
        Bar {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
        }
    }
}

/// A single traded or quoted price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub timestamp: NaiveDateTime,
    pub price: f64,
}
