//! Chart configuration
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```rust
//! use candlechart::config::{ChartConfig, TimeLabelStyle};
//!
//! let config = ChartConfig::from_json_str(r#"{ "time_label_style": "Compact" }"#).unwrap();
//! assert_eq!(config.time_label_style, TimeLabelStyle::Compact);
//! assert_eq!(config.margins.left, 60.0);
//! ```

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::layout::Margins;
use crate::{ChartError, Ratio, Result};

/// Regular session hours, in local wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
        }
    }
}

impl MarketHours {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self> {
        let hours = Self { open, close };
        hours.validate()?;
        Ok(hours)
    }

    pub fn validate(&self) -> Result<()> {
        if self.open >= self.close {
            return Err(ChartError::InvalidConfig(format!(
                "market open {} must be before close {}",
                self.open, self.close
            )));
        }
        Ok(())
    }
}

/// Intraday time label format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeLabelStyle {
    /// `HH:mm`
    #[default]
    Colon,
    /// `HHmm`
    Compact,
}

impl TimeLabelStyle {
    pub fn format_str(self) -> &'static str {
        match self {
            TimeLabelStyle::Colon => "%H:%M",
            TimeLabelStyle::Compact => "%H%M",
        }
    }
}

/// Layout and labelling settings shared by the planner and the pixel mapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub margins: Margins,
    pub market_hours: MarketHours,
    /// Number of price intervals; the Y axis gets one more label than this
    pub y_tick_count: usize,
    pub time_label_style: TimeLabelStyle,
    /// Candle body width as a share of the per-candle step
    pub candle_body_ratio: Ratio,
    pub min_candle_width: f64,
    pub min_body_height: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            margins: Margins::default(),
            market_hours: MarketHours::default(),
            y_tick_count: 5,
            time_label_style: TimeLabelStyle::default(),
            candle_body_ratio: Ratio::new_const(0.6),
            min_candle_width: 2.0,
            min_body_height: 1.0,
        }
    }
}

impl ChartConfig {
    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ChartError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ChartError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.margins.validate()?;
        self.market_hours.validate()?;
        if self.y_tick_count == 0 {
            return Err(ChartError::InvalidValue("y_tick_count must be > 0"));
        }
        if self.candle_body_ratio.get() <= 0.0 {
            return Err(ChartError::InvalidValue("candle_body_ratio must be > 0"));
        }
        for (field, value) in [
            ("min_candle_width", self.min_candle_width),
            ("min_body_height", self.min_body_height),
        ] {
            if !value.is_finite() || value < 0.0 {
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
