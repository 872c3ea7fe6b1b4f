//! Pixel layout for a chart viewport
//!
//! Everything here is viewport geometry: normalized fractions and prices go
//! in, pixel coordinates come out. The plot area is the viewport minus fixed
//! margins, and is never narrower or shorter than one pixel.
//!
//! ```rust
//! use candlechart::layout::{to_pixel_x, to_pixel_y};
//!
//! // 800 wide, default margins 60 left / 8 right
//! assert_eq!(to_pixel_x(0.0, 800.0), 60.0);
//! assert_eq!(to_pixel_x(1.0, 800.0), 792.0);
//! // Degenerate viewport keeps a one-pixel plot
//! assert_eq!(to_pixel_y(1.0, 0.0), 9.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ChartConfig, MarketHours};
use crate::{
    local_time_on_date, minutes_between, span_minutes, ChartError, Direction, LabelItem,
    OhlcPoint, PatternResult, PatternType, Period, PriceRange, Result, Timestamp, ZigzagPoint,
};

/// Vertical gap between a pattern marker and its candle's wick
const MARKER_OFFSET: f64 = 6.0;

// ============================================================
// GEOMETRY TYPES
// ============================================================

/// Space reserved around the plot area, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 60.0,
            right: 8.0,
            top: 8.0,
            bottom: 28.0,
        }
    }
}

impl Margins {
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Result<Self> {
        let margins = Self {
            left,
            right,
            top,
            bottom,
        };
        margins.validate()?;
        Ok(margins)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("margins.left", self.left),
            ("margins.right", self.right),
            ("margins.top", self.top),
            ("margins.bottom", self.bottom),
        ] {
            if !value.is_finite() {
                return Err(ChartError::InvalidValue("margins must be finite"));
            }
            if value < 0.0 {
                return Err(ChartError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: f64::MAX,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Edge-inclusive hit test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

/// Axis text anchored at a pixel position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// Drawing instructions for one candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandleGeometry {
    pub x_center: f64,
    pub body: PixelRect,
    pub wick_top: f64,
    pub wick_bottom: f64,
    /// `close >= open`; a flat candle draws as bullish
    pub bullish: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatternMarker {
    pub time: Timestamp,
    pub x: f64,
    pub y: f64,
    pub pattern_type: PatternType,
    pub direction: Direction,
}

/// Time and price under the pointer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrosshairValue {
    pub time: Timestamp,
    pub price: f64,
}

// ============================================================
// LAYOUT
// ============================================================

/// Maps chart data onto a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    viewport: Viewport,
    margins: Margins,
    market_hours: MarketHours,
    body_ratio: f64,
    min_candle_width: f64,
    min_body_height: f64,
}

impl Layout {
    /// Layout with default margins and candle sizing.
    pub fn new(viewport: Viewport) -> Self {
        Self::from_config(viewport, &ChartConfig::default())
    }

    pub fn from_config(viewport: Viewport, config: &ChartConfig) -> Self {
        Self {
            viewport,
            margins: config.margins,
            market_hours: config.market_hours,
            body_ratio: config.candle_body_ratio.get(),
            min_candle_width: config.min_candle_width,
            min_body_height: config.min_body_height,
        }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn margins(&self) -> Margins {
        self.margins
    }

    /// `max(1, width - left - right)`
    #[inline]
    pub fn inner_width(&self) -> f64 {
        (self.viewport.width - self.margins.left - self.margins.right).max(1.0)
    }

    /// `max(1, height - top - bottom)`
    #[inline]
    pub fn inner_height(&self) -> f64 {
        (self.viewport.height - self.margins.top - self.margins.bottom).max(1.0)
    }

    pub fn plot_area(&self) -> PixelRect {
        PixelRect {
            x: self.margins.left,
            y: self.margins.top,
            width: self.inner_width(),
            height: self.inner_height(),
        }
    }

    #[inline]
    pub fn to_pixel_x(&self, fraction: f64) -> f64 {
        self.margins.left + fraction * self.inner_width()
    }

    #[inline]
    pub fn to_pixel_y(&self, fraction: f64) -> f64 {
        self.margins.top + fraction * self.inner_height()
    }

    #[inline]
    pub fn price_to_y(&self, price: f64, range: PriceRange) -> f64 {
        self.to_pixel_y(range.fraction_of(price))
    }

    /// X for `time` on a time axis running from the first to the last candle.
    pub fn time_to_x(&self, time: Timestamp, candles: &[OhlcPoint]) -> f64 {
        let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
            return self.margins.left;
        };
        let fraction = minutes_between(first.time, time) / span_minutes(first.time, last.time);
        self.to_pixel_x(fraction)
    }

    /// Width of one candle slot
    #[inline]
    pub fn candle_step(&self, count: usize) -> f64 {
        self.inner_width() / count.max(1) as f64
    }

    /// Centre of the `index`-th of `count` candle slots
    #[inline]
    pub fn candle_x(&self, index: usize, count: usize) -> f64 {
        let step = self.candle_step(count);
        self.margins.left + step * index as f64 + step / 2.0
    }

    // ===========================================
    // Axes
    // ===========================================

    /// Y labels anchored at the left edge of the plot.
    pub fn y_label_positions(&self, labels: &[LabelItem]) -> Vec<PixelLabel> {
        labels
            .iter()
            .map(|label| PixelLabel {
                text: label.text.clone(),
                x: self.margins.left,
                y: self.to_pixel_y(label.fraction),
            })
            .collect()
    }

    /// X labels anchored at the bottom edge of the plot.
    pub fn x_label_positions(&self, labels: &[LabelItem]) -> Vec<PixelLabel> {
        let baseline = self.margins.top + self.inner_height();
        labels
            .iter()
            .map(|label| PixelLabel {
                text: label.text.clone(),
                x: self.to_pixel_x(label.fraction),
                y: baseline,
            })
            .collect()
    }

    /// Y of each horizontal gridline, one per Y label. Lines span the plot area.
    pub fn gridlines(&self, y_labels: &[LabelItem]) -> Vec<f64> {
        y_labels
            .iter()
            .map(|label| self.to_pixel_y(label.fraction))
            .collect()
    }

    // ===========================================
    // Series
    // ===========================================

    pub fn candles(&self, candles: &[OhlcPoint], range: PriceRange) -> Vec<CandleGeometry> {
        let n = candles.len();
        let body_width = (self.candle_step(n) * self.body_ratio).max(self.min_candle_width);

        candles
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let x_center = self.candle_x(i, n);
                let y_open = self.price_to_y(c.open, range);
                let y_close = self.price_to_y(c.close, range);
                CandleGeometry {
                    x_center,
                    body: PixelRect {
                        x: x_center - body_width / 2.0,
                        y: y_open.min(y_close),
                        width: body_width,
                        height: (y_close - y_open).abs().max(self.min_body_height),
                    },
                    wick_top: self.price_to_y(c.high, range),
                    wick_bottom: self.price_to_y(c.low, range),
                    bullish: c.close >= c.open,
                }
            })
            .collect()
    }

    /// Zigzag polyline. Pivots sit on the centre of their candle's slot.
    pub fn zigzag_path(
        &self,
        points: &[ZigzagPoint],
        candles: &[OhlcPoint],
        range: PriceRange,
    ) -> Vec<(f64, f64)> {
        points
            .iter()
            .map(|p| {
                let x = match candles.binary_search_by(|c| c.time.cmp(&p.time)) {
                    Ok(i) => self.candle_x(i, candles.len()),
                    Err(_) => self.time_to_x(p.time, candles),
                };
                (x, self.price_to_y(p.price, range))
            })
            .collect()
    }

    /// Bearish markers sit above the high, bullish ones below the low.
    pub fn pattern_markers(
        &self,
        patterns: &[PatternResult],
        candles: &[OhlcPoint],
        range: PriceRange,
    ) -> Vec<PatternMarker> {
        patterns
            .iter()
            .filter_map(|p| {
                let direction = p.pattern_type.direction()?;
                let candle = candles.get(p.index)?;
                let y = match direction {
                    Direction::Bearish => self.price_to_y(candle.high, range) - MARKER_OFFSET,
                    Direction::Bullish => self.price_to_y(candle.low, range) + MARKER_OFFSET,
                };
                Some(PatternMarker {
                    time: p.time,
                    x: self.candle_x(p.index, candles.len()),
                    y,
                    pattern_type: p.pattern_type,
                    direction,
                })
            })
            .collect()
    }

    /// Shaded rectangles for time outside market hours. Intraday charts only.
    ///
    /// Market hours are taken on the first candle's local date. When the whole
    /// window is outside them the entire plot is shaded.
    pub fn off_market_shading(&self, candles: &[OhlcPoint], period: Period) -> Vec<PixelRect> {
        if period != Period::OneDay {
            return Vec::new();
        }
        let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
            return Vec::new();
        };
        let (start, end) = (first.time, last.time);
        let total = minutes_between(start, end);
        if total <= 0.0 {
            return Vec::new();
        }
        let (Some(open), Some(close)) = (
            local_time_on_date(start, self.market_hours.open),
            local_time_on_date(start, self.market_hours.close),
        ) else {
            return Vec::new();
        };

        let plot = self.plot_area();
        if end <= open || start >= close {
            return vec![plot];
        }

        let x_at = |time: Timestamp| self.to_pixel_x(minutes_between(start, time) / total);
        let mut shading = Vec::with_capacity(2);
        if open > start {
            shading.push(PixelRect {
                width: x_at(open) - plot.x,
                ..plot
            });
        }
        if close < end {
            let x = x_at(close);
            shading.push(PixelRect {
                x,
                width: plot.right() - x,
                ..plot
            });
        }
        shading
    }

    /// Inverse mapping for a pointer. The time snaps to the candle slot under `x`.
    pub fn value_at(
        &self,
        x: f64,
        y: f64,
        candles: &[OhlcPoint],
        range: PriceRange,
    ) -> Option<CrosshairValue> {
        let plot = self.plot_area();
        if candles.is_empty() || !plot.contains(x, y) {
            return None;
        }
        let slot = ((x - plot.x) / self.candle_step(candles.len())) as usize;
        let candle = candles.get(slot.min(candles.len() - 1))?;
        Some(CrosshairValue {
            time: candle.time,
            price: range.price_at((y - plot.y) / plot.height),
        })
    }
}

/// Horizontal pixel for `fraction` with default margins.
pub fn to_pixel_x(fraction: f64, viewport_width: f64) -> f64 {
    Layout::new(Viewport::new(viewport_width, 0.0)).to_pixel_x(fraction)
}

/// Vertical pixel for `fraction` with default margins.
pub fn to_pixel_y(fraction: f64, viewport_height: f64) -> f64 {
    Layout::new(Viewport::new(0.0, viewport_height)).to_pixel_y(fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PatternId;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn at(h: u32, m: u32) -> Timestamp {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 4, h, m, 0)
            .unwrap()
    }

    fn candle(time: Timestamp, o: f64, h: f64, l: f64, c: f64) -> OhlcPoint {
        OhlcPoint {
            time,
            open: o,
            high: h,
            low: l,
            close: c,
        }
    }

    fn hourly(from: Timestamp, n: usize) -> Vec<OhlcPoint> {
        (0..n)
            .map(|i| candle(from + Duration::hours(i as i64), 10.0, 11.0, 9.0, 10.5))
            .collect()
    }

    // 800x600 -> plot 732 x 564 at (60, 8)
    fn layout() -> Layout {
        Layout::new(Viewport::new(800.0, 600.0))
    }

    #[test]
    fn test_plot_area() {
        let plot = layout().plot_area();
        assert_eq!((plot.x, plot.y, plot.width, plot.height), (60.0, 8.0, 732.0, 564.0));
    }

    #[test]
    fn test_degenerate_viewport_floors_to_one() {
        let tiny = Layout::new(Viewport::new(10.0, 0.0));
        assert_eq!(tiny.inner_width(), 1.0);
        assert_eq!(tiny.inner_height(), 1.0);
        assert_eq!(to_pixel_x(1.0, 0.0), 61.0);
    }

    #[test]
    fn test_margins_validation() {
        assert!(Margins::new(0.0, 0.0, 0.0, 0.0).is_ok());
        assert!(Margins::new(-1.0, 0.0, 0.0, 0.0).is_err());
        assert!(Margins::new(f64::NAN, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_candle_geometry() {
        let range = PriceRange { min: 0.0, max: 100.0 };
        let candles = [
            candle(at(10, 0), 50.0, 60.0, 40.0, 55.0),
            candle(at(10, 1), 55.0, 56.0, 20.0, 30.0),
        ];
        let geometry = layout().candles(&candles, range);

        // step = 366, body = 366 * 0.6
        assert_eq!(geometry[0].x_center, 60.0 + 183.0);
        assert_eq!(geometry[1].x_center, 60.0 + 366.0 + 183.0);
        assert!((geometry[0].body.width - 219.6).abs() < 1e-9);
        assert!(geometry[0].bullish);
        assert!(!geometry[1].bullish);

        // 100 -> y 8, 0 -> y 572; 5.64 px per unit
        assert!((geometry[0].wick_top - (8.0 + 40.0 * 5.64)).abs() < 1e-9);
        assert!((geometry[0].body.y - (8.0 + 45.0 * 5.64)).abs() < 1e-9);
        assert!((geometry[0].body.height - 5.0 * 5.64).abs() < 1e-9);
    }

    #[test]
    fn test_minimum_candle_sizes() {
        let range = PriceRange { min: 0.0, max: 100.0 };
        let candles: Vec<_> = (0..1000)
            .map(|i| candle(at(0, 0) + Duration::minutes(i), 50.0, 51.0, 49.0, 50.0))
            .collect();
        let geometry = layout().candles(&candles, range);
        assert_eq!(geometry[0].body.width, 2.0);
        assert_eq!(geometry[0].body.height, 1.0);
        assert!(geometry[0].bullish);
    }

    #[test]
    fn test_pattern_marker_placement() {
        let range = PriceRange { min: 0.0, max: 100.0 };
        let candles = [
            candle(at(10, 0), 50.0, 60.0, 40.0, 45.0),
            candle(at(10, 1), 44.0, 70.0, 30.0, 65.0),
        ];
        let layout = layout();
        let patterns = [
            PatternResult {
                time: at(10, 1),
                index: 1,
                pattern_id: PatternId("ENGULFING"),
                pattern_type: PatternType::BullishEngulfing,
            },
            PatternResult {
                time: at(10, 1),
                index: 1,
                pattern_id: PatternId("ENGULFING"),
                pattern_type: PatternType::BearishEngulfing,
            },
        ];
        let markers = layout.pattern_markers(&patterns, &candles, range);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].y, layout.price_to_y(30.0, range) + MARKER_OFFSET);
        assert_eq!(markers[1].y, layout.price_to_y(70.0, range) - MARKER_OFFSET);
        assert_eq!(markers[0].x, layout.candle_x(1, 2));
    }

    #[test]
    fn test_zigzag_path_uses_candle_centres() {
        let candles = hourly(at(10, 0), 4);
        let range = PriceRange { min: 9.0, max: 11.0 };
        let points = [
            ZigzagPoint {
                time: at(10, 0),
                price: 11.0,
                is_high: true,
            },
            ZigzagPoint {
                time: at(13, 0),
                price: 9.0,
                is_high: false,
            },
        ];
        let layout = layout();
        let path = layout.zigzag_path(&points, &candles, range);
        assert_eq!(path[0], (layout.candle_x(0, 4), 8.0));
        assert_eq!(path[1], (layout.candle_x(3, 4), 572.0));
    }

    #[test]
    fn test_shading_pre_and_post_market() {
        // 08:00 .. 17:00, market 09:30 .. 16:00
        let candles = hourly(at(8, 0), 10);
        let shading = layout().off_market_shading(&candles, Period::OneDay);
        assert_eq!(shading.len(), 2);

        let pre = shading[0];
        assert_eq!(pre.x, 60.0);
        assert!((pre.width - 732.0 * 90.0 / 540.0).abs() < 1e-9);
        assert_eq!((pre.y, pre.height), (8.0, 564.0));

        let post = shading[1];
        assert!((post.x - (60.0 + 732.0 * 480.0 / 540.0)).abs() < 1e-9);
        assert!((post.right() - 792.0).abs() < 1e-9);
    }

    #[test]
    fn test_shading_inside_market_hours() {
        let candles = hourly(at(10, 0), 5);
        assert!(layout().off_market_shading(&candles, Period::OneDay).is_empty());
    }

    #[test]
    fn test_shading_whole_chart_outside_hours() {
        let evening = hourly(at(17, 0), 4);
        let layout = layout();
        assert_eq!(
            layout.off_market_shading(&evening, Period::OneDay),
            vec![layout.plot_area()]
        );

        let early = hourly(at(5, 0), 4);
        assert_eq!(
            layout.off_market_shading(&early, Period::OneDay),
            vec![layout.plot_area()]
        );
    }

    #[test]
    fn test_shading_skipped_for_other_periods_and_single_candle() {
        let candles = hourly(at(8, 0), 10);
        assert!(layout().off_market_shading(&candles, Period::OneWeek).is_empty());
        assert!(layout()
            .off_market_shading(&candles[..1], Period::OneDay)
            .is_empty());
    }

    #[test]
    fn test_value_at() {
        let candles = hourly(at(10, 0), 4);
        let range = PriceRange { min: 0.0, max: 100.0 };
        let layout = layout();

        let hit = layout.value_at(60.0 + 183.0 * 1.5, 8.0 + 564.0 / 4.0, &candles, range);
        assert_eq!(
            hit,
            Some(CrosshairValue {
                time: at(11, 0),
                price: 75.0,
            })
        );

        // Right edge snaps to the last slot
        let edge = layout.value_at(792.0, 572.0, &candles, range).unwrap();
        assert_eq!(edge.time, at(13, 0));
        assert_eq!(edge.price, 0.0);

        assert!(layout.value_at(10.0, 100.0, &candles, range).is_none());
        assert!(layout.value_at(100.0, 590.0, &candles, range).is_none());
        assert!(layout.value_at(100.0, 100.0, &[], range).is_none());
    }

    #[test]
    fn test_label_positions_and_gridlines() {
        let labels = vec![
            LabelItem {
                text: "110.00".into(),
                fraction: 0.0,
            },
            LabelItem {
                text: "90.00".into(),
                fraction: 1.0,
            },
        ];
        let layout = layout();
        assert_eq!(layout.gridlines(&labels), vec![8.0, 572.0]);

        let ys = layout.y_label_positions(&labels);
        assert_eq!((ys[1].x, ys[1].y), (60.0, 572.0));

        let xs = layout.x_label_positions(&labels);
        assert_eq!((xs[1].x, xs[1].y), (792.0, 572.0));
    }

    #[test]
    fn test_time_to_x() {
        let candles = hourly(at(10, 0), 5);
        let layout = layout();
        assert_eq!(layout.time_to_x(at(10, 0), &candles), 60.0);
        assert_eq!(layout.time_to_x(at(12, 0), &candles), 60.0 + 366.0);
        assert_eq!(layout.time_to_x(at(14, 0), &candles), 792.0);
    }
}
