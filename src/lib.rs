//! # candlechart
//!
//! Synthetic candlestick chart pipeline: deterministic OHLC synthesis, zigzag swing
//! detection, engulfing pattern markers, and the axis/pixel layout a renderer needs.
//!
//! ## Quick Start
//!
//! ```rust
//! use candlechart::prelude::*;
//! use chrono::{FixedOffset, TimeZone};
//!
//! let now = FixedOffset::east_opt(0)
//!     .unwrap()
//!     .with_ymd_and_hms(2024, 3, 4, 14, 7, 0)
//!     .unwrap();
//!
//! let engine = ChartEngine::builder().build().unwrap();
//! let request = ChartRequest::new("spy", Period::OneDay, "1m").unwrap();
//! let snapshot = engine.render(&request, now);
//! assert_eq!(snapshot.candles.len(), 120);
//!
//! // Pixel geometry for an 800x600 viewport
//! let layout = engine.layout(Viewport::new(800.0, 600.0));
//! let bodies = layout.candles(&snapshot.candles, snapshot.price_range);
//! assert_eq!(bodies.len(), 120);
//! ```

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};

pub mod config;
pub mod detectors;
pub mod labels;
pub mod layout;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod session;
pub mod synth;
pub mod zigzag;

pub mod prelude {
    pub use crate::{
        // Configuration
        config::{ChartConfig, MarketHours, TimeLabelStyle},
        // Detectors
        detectors::*,
        // Labels
        labels::{labels_of, plan_x_labels, plan_x_ticks, plan_y_labels, AxisTick, LabelPlanner},
        // Layout
        layout::{
            to_pixel_x, to_pixel_y, CandleGeometry, CrosshairValue, Layout, Margins,
            PatternMarker, PixelLabel, PixelRect, Viewport,
        },
        logging::{init_logging, init_logging_at},
        // Parameters
        params::{parse_interval_minutes, zigzag_threshold, Window, WindowAnchor},
        // Pipeline
        pipeline::{
            render_parallel, ChartEngine, ChartEngineBuilder, ChartRequest, ChartSnapshot,
            RenderError, DEFAULT_INTERVAL, DEFAULT_SYMBOLS, INTERVAL_CHOICES, PERIOD_CHOICES,
        },
        session::{ChartSession, RenderTicket},
        synth::{generate, symbol_seed, synthesize},
        zigzag::{SwingState, ZigzagEngine},
        // Core types
        BuiltinDetector,
        CandleSeries,
        ChartError,
        Direction,
        DynPatternDetector,
        IntervalMinutes,
        LabelItem,
        OhlcPoint,
        PatternDetector,
        PatternId,
        PatternIterator,
        PatternResult,
        PatternScanner,
        PatternScannerBuilder,
        PatternType,
        Period,
        PriceRange,
        Ratio,
        Result,
        Threshold,
        Timestamp,
        ZigzagPoint,
        OHLC,
        OHLCExt,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ChartError>;

/// Errors raised at construction boundaries. Rendering itself never fails.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChartError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Symbol is empty")]
    EmptySymbol,

    #[error("Unknown period: {0:?}")]
    UnknownPeriod(String),

    #[error("Insufficient data: need {need} candles, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid OHLC at index {index}: {reason}")]
    InvalidOhlc { index: usize, reason: &'static str },

    #[error("Candle time at index {index} does not increase")]
    UnorderedSeries { index: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(ChartError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ChartError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Relative swing size, as a fraction of the current pivot price.
///
/// Must be finite and in `(0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(ChartError::InvalidValue("Threshold cannot be NaN or infinite"));
        }
        if value <= 0.0 || value > 1.0 {
            return Err(ChartError::OutOfRange {
                field: "Threshold",
                value,
                min: f64::EPSILON,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Threshold {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Threshold {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Threshold::new(value).map_err(serde::de::Error::custom)
    }
}

/// Candle interval in minutes (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntervalMinutes(u32);

impl IntervalMinutes {
    pub fn new(value: u32) -> Result<Self> {
        if value == 0 {
            return Err(ChartError::InvalidValue("Interval must be > 0 minutes"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl serde::Serialize for IntervalMinutes {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for IntervalMinutes {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = u32::deserialize(d)?;
        IntervalMinutes::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Core OHLC data trait
pub trait OHLC {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
}

/// Extension trait with computed properties for OHLC data
pub trait OHLCExt: OHLC {
    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Lower and upper edge of the real body
    #[inline]
    fn body_bounds(&self) -> (f64, f64) {
        (self.open().min(self.close()), self.open().max(self.close()))
    }

    /// Validate OHLC data consistency.
    ///
    /// `open` is allowed outside `[low, high]`; the synthesizer produces such candles.
    fn validate(&self) -> Result<()> {
        if self.open().is_nan() || self.high().is_nan() || self.low().is_nan() || self.close().is_nan()
        {
            return Err(ChartError::InvalidOhlc {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(ChartError::InvalidOhlc {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if self.high() < self.low() {
            return Err(ChartError::InvalidOhlc {
                index: 0,
                reason: "high < low",
            });
        }
        if self.close() < self.low() || self.close() > self.high() {
            return Err(ChartError::InvalidOhlc {
                index: 0,
                reason: "close outside [low, high]",
            });
        }
        Ok(())
    }
}

impl<T: OHLC> OHLCExt for T {}

// ============================================================
// CANDLES
// ============================================================

/// Local wall-clock time carrying its UTC offset
pub type Timestamp = DateTime<FixedOffset>;

/// One candle
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OhlcPoint {
    pub time: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OHLC for OhlcPoint {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }
}

/// Non-empty candle sequence with strictly increasing times.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct CandleSeries(Vec<OhlcPoint>);

impl CandleSeries {
    /// Validate caller-supplied candles.
    pub fn new(points: Vec<OhlcPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(ChartError::InsufficientData { need: 1, got: 0 });
        }
        for (i, point) in points.iter().enumerate() {
            point.validate().map_err(|e| match e {
                ChartError::InvalidOhlc { reason, .. } => ChartError::InvalidOhlc { index: i, reason },
                other => other,
            })?;
            if i > 0 && point.time <= points[i - 1].time {
                return Err(ChartError::UnorderedSeries { index: i });
            }
        }
        Ok(Self(points))
    }

    /// Synthesizer output is ordered and non-empty by construction.
    pub(crate) fn from_ordered(points: Vec<OhlcPoint>) -> Self {
        debug_assert!(!points.is_empty());
        Self(points)
    }

    #[inline]
    pub fn first_candle(&self) -> &OhlcPoint {
        &self.0[0]
    }

    #[inline]
    pub fn last_candle(&self) -> &OhlcPoint {
        &self.0[self.0.len() - 1]
    }

    /// Lowest low and highest high, widened when flat
    pub fn price_range(&self) -> PriceRange {
        PriceRange::from_candles(&self.0)
    }

    /// Time between first and last candle in minutes, floored to 1
    pub fn span_minutes(&self) -> f64 {
        span_minutes(self.first_candle().time, self.last_candle().time)
    }

    /// Index of the candle opening exactly at `time`
    pub fn index_of(&self, time: Timestamp) -> Option<usize> {
        self.0.binary_search_by(|c| c.time.cmp(&time)).ok()
    }
}

impl Deref for CandleSeries {
    type Target = [OhlcPoint];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> serde::Deserialize<'de> for CandleSeries {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let points = Vec::<OhlcPoint>::deserialize(d)?;
        CandleSeries::new(points).map_err(serde::de::Error::custom)
    }
}

/// Vertical price extent of a series.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn from_candles(candles: &[OhlcPoint]) -> Self {
        let (min, max) = candles
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c.low), hi.max(c.high))
            });
        if min.is_finite() && max.is_finite() {
            Self { min, max }
        } else {
            Self { min: 0.0, max: 1.0 }
        }
    }

    /// `max - min`, or 1.0 for a flat or inverted range
    #[inline]
    pub fn span(&self) -> f64 {
        let span = self.max - self.min;
        if span > 0.0 {
            span
        } else {
            1.0
        }
    }

    /// Fraction from the top: 0 at `max`, 1 at `min`
    #[inline]
    pub fn fraction_of(&self, price: f64) -> f64 {
        (self.max - price) / self.span()
    }

    #[inline]
    pub fn price_at(&self, fraction: f64) -> f64 {
        self.max - fraction * self.span()
    }
}

// ============================================================
// PERIOD
// ============================================================

/// Visible time period of a chart
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Period {
    #[default]
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "1Y")]
    OneYear,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::OneDay,
        Period::OneWeek,
        Period::OneMonth,
        Period::OneYear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::OneDay => "1D",
            Period::OneWeek => "1W",
            Period::OneMonth => "1M",
            Period::OneYear => "1Y",
        }
    }

    /// Lenient parse used for UI input; unknown text falls back to `1D`.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for Period {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1D" => Ok(Period::OneDay),
            "1W" => Ok(Period::OneWeek),
            "1M" => Ok(Period::OneMonth),
            "1Y" => Ok(Period::OneYear),
            _ => Err(ChartError::UnknownPeriod(s.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// CHART OUTPUT TYPES
// ============================================================

/// Swing pivot emitted by the zigzag engine
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ZigzagPoint {
    pub time: Timestamp,
    pub price: f64,
    pub is_high: bool,
}

/// Normalized axis position with its text. Fraction 0 is the top (Y) or earliest time (X).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LabelItem {
    pub text: String,
    pub fraction: f64,
}

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Pattern classification at one candle
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum PatternType {
    #[default]
    None,
    BullishEngulfing,
    BearishEngulfing,
}

impl PatternType {
    #[inline]
    pub fn is_none(self) -> bool {
        matches!(self, PatternType::None)
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            PatternType::None => None,
            PatternType::BullishEngulfing => Some(Direction::Bullish),
            PatternType::BearishEngulfing => Some(Direction::Bearish),
        }
    }
}

/// Unique identifier for a pattern detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct PatternId(pub &'static str);

impl PatternId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// A detected pattern, stamped with the time of its last candle.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PatternResult {
    pub time: Timestamp,
    pub index: usize,
    pub pattern_id: PatternId,
    pub pattern_type: PatternType,
}

// ============================================================
// TIME HELPERS
// ============================================================

/// Minutes between two instants, floored to 1 so fractions never divide by zero.
pub(crate) fn span_minutes(start: Timestamp, end: Timestamp) -> f64 {
    let minutes = (end - start).num_seconds() as f64 / 60.0;
    if minutes > 0.0 {
        minutes
    } else {
        1.0
    }
}

/// Minutes from `start` to `time` as a float (may be negative).
pub(crate) fn minutes_between(start: Timestamp, time: Timestamp) -> f64 {
    (time - start).num_seconds() as f64 / 60.0
}

/// `time` with seconds and sub-seconds cleared.
pub(crate) fn truncate_to_minute(time: Timestamp) -> Timestamp {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Wall-clock `at` on the local calendar date of `time`, in the same offset.
pub(crate) fn local_time_on_date(time: Timestamp, at: NaiveTime) -> Option<Timestamp> {
    time.date_naive()
        .and_time(at)
        .and_local_timezone(time.timezone())
        .single()
}

/// Start of `time`'s local calendar day.
pub(crate) fn local_midnight(time: Timestamp) -> Timestamp {
    NaiveTime::from_hms_opt(0, 0, 0)
        .and_then(|midnight| local_time_on_date(time, midnight))
        .unwrap_or(time)
}

// ============================================================
// PATTERN DETECTOR TRAITS
// ============================================================

/// Generic pattern detector trait - for concrete types
pub trait PatternDetector: Send + Sync {
    fn id(&self) -> PatternId;

    /// Number of candles the pattern spans, ending at `index`
    fn lookback(&self) -> usize;

    fn detect<T: OHLC>(&self, bars: &[T], index: usize) -> PatternType;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

/// Object-safe pattern detector trait - for custom detectors
pub trait DynPatternDetector: Send + Sync {
    fn id(&self) -> PatternId;
    fn lookback(&self) -> usize;
    fn detect(&self, bars: &[OhlcPoint], index: usize) -> PatternType;
    fn validate_config(&self) -> Result<()>;
}

impl<D: PatternDetector> DynPatternDetector for D {
    fn id(&self) -> PatternId {
        PatternDetector::id(self)
    }

    fn lookback(&self) -> usize {
        PatternDetector::lookback(self)
    }

    fn detect(&self, bars: &[OhlcPoint], index: usize) -> PatternType {
        PatternDetector::detect(self, bars, index)
    }

    fn validate_config(&self) -> Result<()> {
        PatternDetector::validate_config(self)
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - fast path via enum dispatch
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLC>(&self, bars: &[T], index: usize) -> PatternType {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, index)),*
                }
            }

            #[inline]
            pub fn id(&self) -> PatternId {
                match self {
                    $(Self::$variant(d) => PatternDetector::id(d)),*
                }
            }

            #[inline]
            pub fn lookback(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::lookback(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    // Two bar
    Engulfing(EngulfingDetector),
}

// ============================================================
// PATTERN SCANNER
// ============================================================

/// Scanner configuration
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    pub validate_data: bool,
    pub pattern_filter: Option<Vec<PatternId>>,
}

/// Runs every registered detector over each candle index.
pub struct PatternScanner {
    builtin: Vec<BuiltinDetector>,
    custom: Vec<Box<dyn DynPatternDetector>>,
    config: ScannerConfig,
}

impl fmt::Debug for PatternScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternScanner")
            .field("builtin", &self.builtin)
            .field("custom", &self.custom.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for PatternScanner {
    /// Scanner with every builtin detector
    fn default() -> Self {
        Self {
            builtin: vec![BuiltinDetector::Engulfing(EngulfingDetector::default())],
            custom: Vec::new(),
            config: ScannerConfig::default(),
        }
    }
}

impl PatternScanner {
    pub fn builder() -> PatternScannerBuilder {
        PatternScannerBuilder::new()
    }

    /// Detect patterns ending at a single candle index.
    pub fn scan_at(&self, bars: &[OhlcPoint], index: usize) -> Vec<PatternResult> {
        let mut results = Vec::new();
        self.scan_at_into(bars, index, &mut results);
        results
    }

    /// Scan all candles and return a flat list of patterns.
    pub fn scan(&self, bars: &[OhlcPoint]) -> Result<Vec<PatternResult>> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }
        Ok(self.iter(bars).collect())
    }

    /// Lazy pattern sequence over the candles.
    pub fn iter<'a>(&'a self, bars: &'a [OhlcPoint]) -> PatternIterator<'a> {
        PatternIterator::new(self, bars)
    }

    /// Smallest index at which any detector can fire
    pub fn first_index(&self) -> usize {
        self.builtin
            .iter()
            .map(|d| d.lookback())
            .chain(self.custom.iter().map(|d| d.lookback()))
            .min()
            .unwrap_or(1)
            .saturating_sub(1)
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn scan_at_into(&self, bars: &[OhlcPoint], index: usize, out: &mut Vec<PatternResult>) {
        let Some(bar) = bars.get(index) else {
            return;
        };

        // Fast path: builtin detectors (enum dispatch, no vtable)
        for detector in &self.builtin {
            if index + 1 >= detector.lookback() {
                let pattern_type = detector.detect(bars, index);
                self.push_match(out, bar, index, detector.id(), pattern_type);
            }
        }

        // Slow path: custom detectors (vtable)
        for detector in &self.custom {
            if index + 1 >= detector.lookback() {
                let pattern_type = detector.detect(bars, index);
                self.push_match(out, bar, index, detector.id(), pattern_type);
            }
        }
    }

    fn push_match(
        &self,
        out: &mut Vec<PatternResult>,
        bar: &OhlcPoint,
        index: usize,
        pattern_id: PatternId,
        pattern_type: PatternType,
    ) {
        if pattern_type.is_none() {
            return;
        }
        if let Some(ref filter) = self.config.pattern_filter {
            if !filter.contains(&pattern_id) {
                return;
            }
        }
        out.push(PatternResult {
            time: bar.time,
            index,
            pattern_id,
            pattern_type,
        });
    }

    fn validate_bars(&self, bars: &[OhlcPoint]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                ChartError::InvalidOhlc { reason, .. } => ChartError::InvalidOhlc { index: i, reason },
                other => other,
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for d in &self.builtin {
            d.validate_config()?;
        }
        for d in &self.custom {
            d.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// PATTERN ITERATOR
// ============================================================

/// Lazy iterator over detected patterns, in candle order
pub struct PatternIterator<'a> {
    scanner: &'a PatternScanner,
    bars: &'a [OhlcPoint],
    current: usize,
    pending: std::vec::IntoIter<PatternResult>,
}

impl<'a> PatternIterator<'a> {
    fn new(scanner: &'a PatternScanner, bars: &'a [OhlcPoint]) -> Self {
        Self {
            scanner,
            bars,
            current: scanner.first_index(),
            pending: Vec::new().into_iter(),
        }
    }
}

impl<'a> Iterator for PatternIterator<'a> {
    type Item = PatternResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(found) = self.pending.next() {
                return Some(found);
            }
            if self.current >= self.bars.len() {
                return None;
            }

            let mut found = Vec::new();
            self.scanner
                .scan_at_into(self.bars, self.current, &mut found);
            self.current += 1;
            self.pending = found.into_iter();
        }
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternScanner instances
pub struct PatternScannerBuilder {
    builtin: Vec<BuiltinDetector>,
    custom: Vec<Box<dyn DynPatternDetector>>,
    config: ScannerConfig,
}

impl Default for PatternScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternScannerBuilder {
    pub fn new() -> Self {
        Self {
            builtin: Vec::new(),
            custom: Vec::new(),
            config: ScannerConfig::default(),
        }
    }

    /// Add all builtin patterns with default configurations
    pub fn with_all_defaults(self) -> Self {
        self.with_two_bar_defaults()
    }

    /// Add two-bar patterns with defaults
    pub fn with_two_bar_defaults(mut self) -> Self {
        self.builtin
            .push(BuiltinDetector::Engulfing(EngulfingDetector::with_defaults()));
        self
    }

    /// Add a builtin detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.builtin.push(detector);
        self
    }

    /// Add a custom detector (slow path)
    pub fn add_custom<D: DynPatternDetector + 'static>(mut self, detector: D) -> Self {
        self.custom.push(Box::new(detector));
        self
    }

    /// Enable/disable data validation in [`PatternScanner::scan`]
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Filter to specific patterns only
    pub fn only_patterns(mut self, ids: impl IntoIterator<Item = PatternId>) -> Self {
        self.config.pattern_filter = Some(ids.into_iter().collect());
        self
    }

    /// Build the scanner
    pub fn build(self) -> Result<PatternScanner> {
        let scanner = PatternScanner {
            builtin: self.builtin,
            custom: self.custom,
            config: self.config,
        };
        scanner.validate()?;
        Ok(scanner)
    }
}

// ============================================================
// TESTS
// ============================================================
