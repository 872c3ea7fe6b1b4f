//! Chart parameters derived from the user's period and interval selection
//!
//! This module owns the policy tables of the chart:
//! - free-form interval parsing (`"5m"`, `"1h"`, `"15"`)
//! - the visible window and effective interval per period
//! - the zigzag swing threshold per period/interval
//!
//! # Example
//!
//! ```rust
//! use candlechart::params::{parse_interval_minutes, zigzag_threshold, Window};
//! use candlechart::Period;
//!
//! let interval = parse_interval_minutes("1m");
//! let window = Window::for_period(Period::OneDay, interval);
//! assert_eq!(window.minutes, 120);
//! assert_eq!(window.candle_count(), 120);
//! assert_eq!(zigzag_threshold(Period::OneDay, interval).get(), 0.0023);
//! ```

use chrono::Duration;

use crate::{
  local_midnight, truncate_to_minute, IntervalMinutes, Period, Threshold, Timestamp,
};

// ============================================================
// INTERVAL PARSING
// ============================================================

/// Interval used when the selection is missing or unparseable
pub const FALLBACK_INTERVAL: IntervalMinutes = IntervalMinutes::new_const(3);

/// Parse a free-form interval into minutes.
///
/// Trailing `m` is minutes, trailing `h` is hours, a bare integer is minutes.
/// Anything unparseable, zero or negative falls back to [`FALLBACK_INTERVAL`].
pub fn parse_interval_minutes(s: &str) -> IntervalMinutes {
  let s = s.trim().to_ascii_lowercase();
  let minutes = if let Some(m) = s.strip_suffix('m') {
    m.trim().parse::<i64>().ok()
  } else if let Some(h) = s.strip_suffix('h') {
    h.trim().parse::<i64>().ok().and_then(|h| h.checked_mul(60))
  } else {
    s.parse::<i64>().ok()
  };

  minutes
    .and_then(|m| u32::try_from(m).ok())
    .and_then(|m| IntervalMinutes::new(m).ok())
    .unwrap_or(FALLBACK_INTERVAL)
}

// ============================================================
// WINDOW POLICY
// ============================================================

const HOUR: u32 = 60;
const DAY: u32 = 24 * HOUR;

/// Where the visible window starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WindowAnchor {
  /// `now - minutes`
  Trailing,
  /// Local midnight of `now`'s calendar date
  LocalMidnight,
}

/// Visible time window and the effective candle interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Window {
  pub minutes: u32,
  pub interval: IntervalMinutes,
  pub anchor: WindowAnchor,
}

impl Window {
  /// Resolve the window for a period. Longer periods override the user's interval.
  pub fn for_period(period: Period, interval: IntervalMinutes) -> Self {
    match period {
      Period::OneDay => {
        let (minutes, anchor) = match interval.get() {
          i if i < 15 => (2 * HOUR, WindowAnchor::Trailing),
          i if i <= HOUR => (8 * HOUR, WindowAnchor::Trailing),
          _ => (DAY, WindowAnchor::LocalMidnight),
        };
        let interval = if interval.get() > minutes {
          IntervalMinutes::new_const(minutes)
        } else {
          interval
        };
        Self { minutes, interval, anchor }
      },
      Period::OneWeek => Self {
        minutes: 7 * DAY,
        interval: IntervalMinutes::new_const(HOUR),
        anchor: WindowAnchor::Trailing,
      },
      Period::OneMonth => Self {
        minutes: 30 * DAY,
        interval: IntervalMinutes::new_const(DAY),
        anchor: WindowAnchor::Trailing,
      },
      Period::OneYear => Self {
        minutes: 365 * DAY,
        interval: IntervalMinutes::new_const(7 * DAY),
        anchor: WindowAnchor::Trailing,
      },
    }
  }

  /// `max(1, minutes / interval)`
  pub fn candle_count(&self) -> usize {
    (self.minutes / self.interval.get()).max(1) as usize
  }

  /// Window start for a (minute-truncated) `now`
  pub fn start(&self, now: Timestamp) -> Timestamp {
    let now = truncate_to_minute(now);
    let trailing = now - Duration::minutes(i64::from(self.minutes));
    match self.anchor {
      WindowAnchor::Trailing => trailing,
      WindowAnchor::LocalMidnight => local_midnight(now),
    }
  }

  /// Open time of the `i`-th candle
  pub fn candle_time(&self, start: Timestamp, i: usize) -> Timestamp {
    start + Duration::minutes(i as i64 * i64::from(self.interval.get()))
  }
}

// ============================================================
// ZIGZAG THRESHOLD POLICY
// ============================================================

/// Relative swing filter for a period and (effective) interval.
pub fn zigzag_threshold(period: Period, interval: IntervalMinutes) -> Threshold {
  let value = match (period, interval.get()) {
    (Period::OneDay, 1 | 2) => 0.0023,
    (Period::OneDay, 3 | 5 | 15) => 0.0020,
    (Period::OneDay, _) => 0.010,
    (Period::OneWeek, _) => 0.10,
    (Period::OneMonth, _) => 0.060,
    (Period::OneYear, _) => 0.100,
  };
  Threshold::new_const(value)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{FixedOffset, TimeZone};

  fn minutes(s: &str) -> u32 {
    parse_interval_minutes(s).get()
  }

  #[test]
  fn test_parse_interval_suffixes() {
    assert_eq!(minutes("1m"), 1);
    assert_eq!(minutes("15M"), 15);
    assert_eq!(minutes("1h"), 60);
    assert_eq!(minutes(" 2h "), 120);
    assert_eq!(minutes("45"), 45);
  }

  #[test]
  fn test_parse_interval_defaults() {
    assert_eq!(minutes(""), 3);
    assert_eq!(minutes("abc"), 3);
    assert_eq!(minutes("0m"), 3);
    assert_eq!(minutes("-5"), 3);
    assert_eq!(minutes("m"), 3);
    assert_eq!(minutes("99999999999h"), 3);
  }

  #[test]
  fn test_one_day_windows() {
    let w = Window::for_period(Period::OneDay, parse_interval_minutes("5m"));
    assert_eq!((w.minutes, w.anchor), (120, WindowAnchor::Trailing));

    let w = Window::for_period(Period::OneDay, parse_interval_minutes("15m"));
    assert_eq!((w.minutes, w.anchor), (480, WindowAnchor::Trailing));

    let w = Window::for_period(Period::OneDay, parse_interval_minutes("1h"));
    assert_eq!((w.minutes, w.anchor), (480, WindowAnchor::Trailing));

    let w = Window::for_period(Period::OneDay, parse_interval_minutes("90"));
    assert_eq!((w.minutes, w.anchor), (1440, WindowAnchor::LocalMidnight));
    assert_eq!(w.interval.get(), 90);
    assert_eq!(w.candle_count(), 16);
  }

  #[test]
  fn test_one_day_interval_clamped_to_window() {
    let w = Window::for_period(Period::OneDay, parse_interval_minutes("48h"));
    assert_eq!(w.interval.get(), 1440);
    assert_eq!(w.candle_count(), 1);
  }

  #[test]
  fn test_long_periods_force_interval() {
    let user = parse_interval_minutes("1m");

    let w = Window::for_period(Period::OneWeek, user);
    assert_eq!((w.interval.get(), w.candle_count()), (60, 168));

    let w = Window::for_period(Period::OneMonth, user);
    assert_eq!((w.interval.get(), w.candle_count()), (1440, 30));

    let w = Window::for_period(Period::OneYear, user);
    assert_eq!((w.interval.get(), w.candle_count()), (10080, 52));
  }

  #[test]
  fn test_window_start() {
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    let now = offset.with_ymd_and_hms(2024, 3, 4, 14, 7, 31).unwrap();

    let trailing = Window::for_period(Period::OneDay, parse_interval_minutes("1m"));
    assert_eq!(
      trailing.start(now),
      offset.with_ymd_and_hms(2024, 3, 4, 12, 7, 0).unwrap()
    );

    let midnight = Window::for_period(Period::OneDay, parse_interval_minutes("2h"));
    assert_eq!(
      midnight.start(now),
      offset.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
    );
  }

  #[test]
  fn test_threshold_table() {
    let t = |p, s| zigzag_threshold(p, parse_interval_minutes(s)).get();
    assert_eq!(t(Period::OneDay, "1m"), 0.0023);
    assert_eq!(t(Period::OneDay, "2m"), 0.0023);
    assert_eq!(t(Period::OneDay, "3m"), 0.0020);
    assert_eq!(t(Period::OneDay, "15m"), 0.0020);
    assert_eq!(t(Period::OneDay, "30m"), 0.010);
    assert_eq!(t(Period::OneWeek, "1m"), 0.10);
    assert_eq!(t(Period::OneMonth, "1m"), 0.060);
    assert_eq!(t(Period::OneYear, "1m"), 0.100);
  }
}
