//! Common helper functions for candlestick pattern detection

use crate::{OHLCExt, OHLC};

/// Candles needed by a two-bar pattern ending at `index`, oldest first.
#[inline]
pub fn pair_at<T: OHLC>(bars: &[T], index: usize) -> Option<(&T, &T)> {
    if index < 1 {
        return None;
    }
    Some((bars.get(index - 1)?, bars.get(index)?))
}

/// True when a body running from `open` to `close` covers `inner`'s real body.
///
/// Containment is inclusive on both edges.
#[inline]
pub fn body_engulfs<T: OHLC>(open: f64, close: f64, inner: &T) -> bool {
    let (inner_low, inner_high) = inner.body_bounds();
    open.min(close) <= inner_low && open.max(close) >= inner_high
}
