//! Axis label planning
//!
//! Labels are positioned by a normalized fraction so the renderer can place
//! them for any viewport. The Y axis runs from the highest high (fraction 0)
//! to the lowest low (fraction 1). The X axis runs from the first to the last
//! candle time, with tick granularity chosen per period.

use std::fmt::Write as _;

use chrono::{Datelike, Duration, Timelike};
use tracing::warn;

use crate::config::{ChartConfig, TimeLabelStyle};
use crate::{
    local_midnight, minutes_between, span_minutes, truncate_to_minute, LabelItem, OhlcPoint, Period,
    PriceRange, Timestamp,
};

/// Intraday windows up to this many minutes get 5-minute ticks
const SHORT_WINDOW_MINUTES: f64 = 120.0;

/// One X-axis tick mark. Unlabelled ticks still get a mark on the axis.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AxisTick {
    pub time: Timestamp,
    pub fraction: f64,
    pub label: Option<String>,
}

/// Plans both axes for a candle series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlanner {
    y_tick_count: usize,
    time_style: TimeLabelStyle,
}

impl Default for LabelPlanner {
    fn default() -> Self {
        Self::from_config(&ChartConfig::default())
    }
}

impl LabelPlanner {
    pub fn new(y_tick_count: usize, time_style: TimeLabelStyle) -> Self {
        Self {
            y_tick_count: y_tick_count.max(1),
            time_style,
        }
    }

    pub fn from_config(config: &ChartConfig) -> Self {
        Self::new(config.y_tick_count, config.time_label_style)
    }

    /// `y_tick_count + 1` price labels, top to bottom, two decimals.
    pub fn y_labels(&self, candles: &[OhlcPoint]) -> Vec<LabelItem> {
        if candles.is_empty() {
            return Vec::new();
        }
        let range = PriceRange::from_candles(candles);
        let ticks = self.y_tick_count;

        (0..=ticks)
            .map(|t| {
                let fraction = t as f64 / ticks as f64;
                LabelItem {
                    text: format!("{:.2}", range.price_at(fraction)),
                    fraction,
                }
            })
            .collect()
    }

    /// Every tick mark for the period, labelled or not.
    pub fn x_ticks(&self, candles: &[OhlcPoint], period: Period) -> Vec<AxisTick> {
        let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
            return Vec::new();
        };
        let start = first.time;
        let end = last.time;
        let mut ticks = TickWalk::new(start, end);

        match period {
            Period::OneDay => {
                let step = if minutes_between(start, end) <= SHORT_WINDOW_MINUTES {
                    5
                } else {
                    30
                };
                let fmt = self.time_style.format_str();
                ticks.walk(
                    floor_to_minutes(start, step),
                    Duration::minutes(i64::from(step)),
                    |tick| format_time(tick, fmt),
                );
            }
            Period::OneWeek => {
                ticks.walk(local_midnight(start), Duration::days(1), |tick| {
                    format_time(tick, "%a")
                });
            }
            Period::OneMonth => {
                ticks.walk(local_midnight(start), Duration::days(1), |tick| {
                    format_time(tick, "%m/%d")
                });
            }
            Period::OneYear => {
                let mut last_month = None;
                ticks.walk(next_monday(start), Duration::weeks(1), |tick| {
                    if last_month == Some(tick.month()) {
                        return None;
                    }
                    let label = format_time(tick, "%b")?;
                    last_month = Some(tick.month());
                    Some(label)
                });
            }
        }

        ticks.into_ticks()
    }

    /// Labelled X ticks only.
    pub fn x_labels(&self, candles: &[OhlcPoint], period: Period) -> Vec<LabelItem> {
        labels_of(&self.x_ticks(candles, period))
    }
}

/// The labelled subset of `ticks`.
pub fn labels_of(ticks: &[AxisTick]) -> Vec<LabelItem> {
    ticks
        .iter()
        .filter_map(|tick| {
            tick.label.as_ref().map(|text| LabelItem {
                text: text.clone(),
                fraction: tick.fraction,
            })
        })
        .collect()
}

/// Price labels with the default planner.
pub fn plan_y_labels(candles: &[OhlcPoint]) -> Vec<LabelItem> {
    LabelPlanner::default().y_labels(candles)
}

/// Time labels with the default planner.
pub fn plan_x_labels(candles: &[OhlcPoint], period: Period) -> Vec<LabelItem> {
    LabelPlanner::default().x_labels(candles, period)
}

/// All X ticks with the default planner.
pub fn plan_x_ticks(candles: &[OhlcPoint], period: Period) -> Vec<AxisTick> {
    LabelPlanner::default().x_ticks(candles, period)
}

// ============================================================
// Tick walking
// ============================================================

struct TickWalk {
    start: Timestamp,
    end: Timestamp,
    span: f64,
    ticks: Vec<AxisTick>,
}

impl TickWalk {
    fn new(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end,
            span: span_minutes(start, end),
            ticks: Vec::new(),
        }
    }

    /// Emit ticks from the first boundary at or after `start` through `end`.
    ///
    /// `aligned` is the truncated boundary; when it lands before `start` the walk
    /// begins one step later.
    fn walk(
        &mut self,
        aligned: Timestamp,
        step: Duration,
        mut label: impl FnMut(Timestamp) -> Option<String>,
    ) {
        let mut tick = if aligned < self.start {
            aligned + step
        } else {
            aligned
        };
        while tick <= self.end {
            self.ticks.push(AxisTick {
                time: tick,
                fraction: minutes_between(self.start, tick) / self.span,
                label: label(tick),
            });
            tick += step;
        }
    }

    fn into_ticks(self) -> Vec<AxisTick> {
        self.ticks
    }
}

/// `time` rounded down to a multiple of `step` minutes within its hour.
fn floor_to_minutes(time: Timestamp, step: u32) -> Timestamp {
    let time = truncate_to_minute(time);
    time.with_minute(time.minute() / step * step).unwrap_or(time)
}

/// Local midnight of the first Monday on or after `time`'s calendar date.
fn next_monday(time: Timestamp) -> Timestamp {
    let midnight = local_midnight(time);
    let ahead = (7 - midnight.weekday().num_days_from_monday()) % 7;
    midnight + Duration::days(i64::from(ahead))
}

/// Format a label, dropping it with a warning if the formatter fails.
pub(crate) fn format_time(time: Timestamp, fmt: &str) -> Option<String> {
    let mut text = String::new();
    match write!(text, "{}", time.format(fmt)) {
        Ok(()) => Some(text),
        Err(_) => {
            warn!(%time, fmt, "axis label failed to format, skipping");
            None
        }
    }
}
