//! Chart pipeline: synthesize, detect swings and patterns, plan labels.
//!
//! [`ChartEngine::render`] is one atomic unit of work. It returns a complete
//! [`ChartSnapshot`] and has no failure path; validation happens once, when the
//! engine and the request are built.

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::config::{ChartConfig, MarketHours, TimeLabelStyle};
use crate::labels::{labels_of, AxisTick, LabelPlanner};
use crate::layout::{Layout, Margins, Viewport};
use crate::params::{parse_interval_minutes, zigzag_threshold, Window};
use crate::synth::{symbol_seed, synthesize};
use crate::zigzag::ZigzagEngine;
use crate::{
    truncate_to_minute, CandleSeries, ChartError, IntervalMinutes, LabelItem, PatternResult,
    PatternScanner, Period, PriceRange, Result, Threshold, Timestamp, ZigzagPoint,
};

// ============================================================
// CHOICES
// ============================================================

/// Watchlist offered to a fresh session
pub const DEFAULT_SYMBOLS: [&str; 11] = [
    "SPY", "QQQ", "AMZN", "AAPL", "NVDA", "GOOGL", "HOOD", "MSFT", "META", "NFLX", "TSLA",
];

pub const INTERVAL_CHOICES: [&str; 7] = ["1m", "2m", "3m", "5m", "15m", "30m", "1h"];

pub const PERIOD_CHOICES: [Period; 4] = Period::ALL;

pub const DEFAULT_INTERVAL: &str = "3m";

// ============================================================
// REQUEST
// ============================================================

/// What to chart. The symbol is trimmed and upper-cased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChartRequest {
    symbol: String,
    period: Period,
    interval: String,
}

impl ChartRequest {
    pub fn new(symbol: &str, period: Period, interval: impl Into<String>) -> Result<Self> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(ChartError::EmptySymbol);
        }
        Ok(Self {
            symbol: symbol.to_ascii_uppercase(),
            period,
            interval: interval.into(),
        })
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn period(&self) -> Period {
        self.period
    }

    /// Interval text as the user typed it
    #[inline]
    pub fn interval(&self) -> &str {
        &self.interval
    }

    /// Parsed interval, before the period's window policy is applied
    pub fn interval_minutes(&self) -> IntervalMinutes {
        parse_interval_minutes(&self.interval)
    }

    pub fn window(&self) -> Window {
        Window::for_period(self.period, self.interval_minutes())
    }
}

// ============================================================
// SNAPSHOT
// ============================================================

/// Everything a renderer needs for one chart, computed against one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSnapshot {
    pub request: ChartRequest,
    /// `now`, truncated to the minute
    pub generated_at: Timestamp,
    pub window: Window,
    pub threshold: Threshold,
    pub candles: CandleSeries,
    pub price_range: PriceRange,
    pub zigzag: Vec<ZigzagPoint>,
    pub patterns: Vec<PatternResult>,
    pub x_ticks: Vec<AxisTick>,
    pub x_labels: Vec<LabelItem>,
    pub y_labels: Vec<LabelItem>,
}

impl ChartSnapshot {
    /// Close of the last candle
    pub fn current_price(&self) -> f64 {
        self.candles.last_candle().close
    }

    /// `"SPY: 123.45"`
    pub fn price_display(&self) -> String {
        format!("{}: {:.2}", self.request.symbol(), self.current_price())
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Renders chart snapshots with a fixed configuration and pattern scanner.
#[derive(Debug)]
pub struct ChartEngine {
    config: ChartConfig,
    scanner: PatternScanner,
    planner: LabelPlanner,
}

impl ChartEngine {
    pub fn builder() -> ChartEngineBuilder {
        ChartEngineBuilder::new()
    }

    #[inline]
    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    #[inline]
    pub fn scanner(&self) -> &PatternScanner {
        &self.scanner
    }

    /// Run the whole pipeline for `request` at wall-clock `now`.
    pub fn render(&self, request: &ChartRequest, now: Timestamp) -> ChartSnapshot {
        let now = truncate_to_minute(now);
        let window = request.window();
        let candles = synthesize(&window, now, symbol_seed(request.symbol()));
        let threshold = zigzag_threshold(request.period(), window.interval);

        let zigzag = ZigzagEngine::new(threshold).detect(&candles);
        let patterns: Vec<_> = self.scanner.iter(&candles).collect();
        let x_ticks = self.planner.x_ticks(&candles, request.period());
        let x_labels = labels_of(&x_ticks);
        let y_labels = self.planner.y_labels(&candles);

        debug!(
            symbol = request.symbol(),
            period = %request.period(),
            interval = window.interval.get(),
            candles = candles.len(),
            threshold = threshold.get(),
            pivots = zigzag.len(),
            patterns = patterns.len(),
            "rendered chart"
        );

        ChartSnapshot {
            request: request.clone(),
            generated_at: now,
            window,
            threshold,
            price_range: candles.price_range(),
            candles,
            zigzag,
            patterns,
            x_ticks,
            x_labels,
            y_labels,
        }
    }

    /// Validate a raw selection and render it.
    pub fn render_symbol(
        &self,
        symbol: &str,
        period: Period,
        interval: &str,
        now: Timestamp,
    ) -> Result<ChartSnapshot> {
        let request = ChartRequest::new(symbol, period, interval)?;
        Ok(self.render(&request, now))
    }

    /// Pixel layout for `viewport` using this engine's config.
    pub fn layout(&self, viewport: Viewport) -> Layout {
        Layout::from_config(viewport, &self.config)
    }
}

/// Builder for [`ChartEngine`]
#[derive(Debug, Default)]
pub struct ChartEngineBuilder {
    config: ChartConfig,
    scanner: Option<PatternScanner>,
}

impl ChartEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ChartConfig) -> Self {
        self.config = config;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.config.margins = margins;
        self
    }

    pub fn market_hours(mut self, hours: MarketHours) -> Self {
        self.config.market_hours = hours;
        self
    }

    pub fn time_label_style(mut self, style: TimeLabelStyle) -> Self {
        self.config.time_label_style = style;
        self
    }

    /// Use a custom pattern scanner instead of the builtin set
    pub fn pattern_scanner(mut self, scanner: PatternScanner) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn build(self) -> Result<ChartEngine> {
        self.config.validate()?;
        Ok(ChartEngine {
            planner: LabelPlanner::from_config(&self.config),
            scanner: self.scanner.unwrap_or_default(),
            config: self.config,
        })
    }
}

// ============================================================
// PARALLEL RENDERING
// ============================================================

/// A symbol that could not be rendered
#[derive(Debug, Clone, PartialEq)]
pub struct RenderError {
    pub symbol: String,
    pub error: ChartError,
}

/// Render a watchlist in parallel. Snapshots keep the input order.
pub fn render_parallel<'a, I>(
    engine: &ChartEngine,
    symbols: I,
    period: Period,
    interval: &str,
    now: Timestamp,
) -> (Vec<ChartSnapshot>, Vec<RenderError>)
where
    I: IntoParallelIterator<Item = &'a str>,
{
    let results: Vec<_> = symbols
        .into_par_iter()
        .map(|symbol| {
            engine
                .render_symbol(symbol, period, interval, now)
                .map_err(|error| RenderError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut snapshots = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(s) => snapshots.push(s),
            Err(e) => errors.push(e),
        }
    }

    (snapshots, errors)
}
