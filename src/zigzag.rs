//! Zigzag swing detection
//!
//! Reduces a candle series to alternating swing highs and lows, ignoring moves
//! smaller than a relative threshold of the running pivot price.
//!
//! The scan keeps a single pivot. While the direction is undecided the pivot is
//! the first close; once a move of `pivot * threshold` happens in either
//! direction the pivot is emitted and the engine follows that direction,
//! extending the pivot silently until a reversal of the same relative size.
//!
//! Two tail rules keep the output renderable:
//! - if nothing was ever emitted, the first and last closes form a two-point line
//! - the line always ends on the last candle's close

use tracing::trace;

use crate::{OhlcPoint, Threshold, Timestamp, ZigzagPoint};

/// Direction the engine is currently following
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingState {
    Undefined,
    SeekingHigh,
    SeekingLow,
}

/// Zigzag detector for a fixed threshold
#[derive(Debug, Clone, Copy)]
pub struct ZigzagEngine {
    threshold: Threshold,
}

impl ZigzagEngine {
    pub fn new(threshold: Threshold) -> Self {
        Self { threshold }
    }

    #[inline]
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Pivots of `candles`, strictly increasing in time.
    pub fn detect(&self, candles: &[OhlcPoint]) -> Vec<ZigzagPoint> {
        let Some(first) = candles.first() else {
            return Vec::new();
        };

        let mut tracker = PivotTracker::new(first, self.threshold.get());
        for candle in &candles[1..] {
            tracker.step(candle);
        }
        let mut points = tracker.points;

        let last = &candles[candles.len() - 1];
        if points.is_empty() && candles.len() >= 2 {
            // No swing cleared the threshold; draw first close to last close.
            points.push(ZigzagPoint {
                time: first.time,
                price: first.close,
                is_high: true,
            });
            points.push(ZigzagPoint {
                time: last.time,
                price: last.close,
                is_high: false,
            });
        }

        if let Some(&tail) = points.last() {
            if tail.time != last.time {
                // Direction of the closing segment carries no meaning.
                points.push(ZigzagPoint {
                    time: last.time,
                    price: last.close,
                    is_high: tail.is_high,
                });
            }
        }

        points
    }
}

/// Detect zigzag pivots with the given threshold.
pub fn detect(candles: &[OhlcPoint], threshold: Threshold) -> Vec<ZigzagPoint> {
    ZigzagEngine::new(threshold).detect(candles)
}

struct PivotTracker {
    threshold: f64,
    state: SwingState,
    pivot: f64,
    pivot_time: Timestamp,
    points: Vec<ZigzagPoint>,
}

impl PivotTracker {
    fn new(first: &OhlcPoint, threshold: f64) -> Self {
        Self {
            threshold,
            state: SwingState::Undefined,
            pivot: first.close,
            pivot_time: first.time,
            points: Vec::new(),
        }
    }

    #[inline]
    fn min_move(&self) -> f64 {
        self.pivot * self.threshold
    }

    fn step(&mut self, candle: &OhlcPoint) {
        match self.state {
            SwingState::Undefined => {
                if candle.high - self.pivot >= self.min_move() {
                    self.reverse(false, candle.time, candle.high, SwingState::SeekingHigh);
                } else if self.pivot - candle.low >= self.min_move() {
                    self.reverse(true, candle.time, candle.low, SwingState::SeekingLow);
                }
            }
            SwingState::SeekingHigh => {
                if candle.high > self.pivot {
                    self.pivot = candle.high;
                    self.pivot_time = candle.time;
                } else if self.pivot - candle.low >= self.min_move() {
                    self.reverse(true, candle.time, candle.low, SwingState::SeekingLow);
                }
            }
            SwingState::SeekingLow => {
                if candle.low < self.pivot {
                    self.pivot = candle.low;
                    self.pivot_time = candle.time;
                } else if candle.high - self.pivot >= self.min_move() {
                    self.reverse(false, candle.time, candle.high, SwingState::SeekingHigh);
                }
            }
        }
    }

    /// Emit the current pivot and restart from the reversing candle's extreme.
    fn reverse(&mut self, is_high: bool, time: Timestamp, price: f64, next: SwingState) {
        trace!(
            price = self.pivot,
            is_high,
            time = %self.pivot_time,
            "zigzag pivot"
        );
        self.points.push(ZigzagPoint {
            time: self.pivot_time,
            price: self.pivot,
            is_high,
        });
        self.pivot = price;
        self.pivot_time = time;
        self.state = next;
    }
}
