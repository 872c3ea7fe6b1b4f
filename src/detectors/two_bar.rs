//! Two-bar candlestick pattern detectors

use super::helpers::{body_engulfs, pair_at};
use crate::{OHLCExt, PatternDetector, PatternId, PatternType, OHLC};

impl_with_defaults!(EngulfingDetector);

// ============================================================
// ENGULFING PATTERNS
// ============================================================

/// Engulfing Pattern (bullish and bearish)
///
/// The second candle's real body covers the first candle's real body and
/// closes in the opposite direction.
#[derive(Debug, Clone, Default)]
pub struct EngulfingDetector;

impl PatternDetector for EngulfingDetector {
    fn id(&self) -> PatternId {
        PatternId("ENGULFING")
    }

    fn lookback(&self) -> usize {
        2
    }

    fn detect<T: OHLC>(&self, bars: &[T], index: usize) -> PatternType {
        let Some((prev, curr)) = pair_at(bars, index) else {
            return PatternType::None;
        };

        // Red then green, green body covers red body
        if prev.is_bearish() && curr.is_bullish() && body_engulfs(curr.open(), curr.close(), prev) {
            return PatternType::BullishEngulfing;
        }

        // Green then red, red body covers green body
        if prev.is_bullish() && curr.is_bearish() && body_engulfs(curr.open(), curr.close(), prev) {
            return PatternType::BearishEngulfing;
        }

        PatternType::None
    }
}
