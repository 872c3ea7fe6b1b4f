//! Candlestick pattern detectors
//!
//! # Pattern Categories
//!
//! - **Two-bar**: Engulfing (bullish and bearish)
//!
//! New patterns implement [`PatternDetector`](crate::PatternDetector) and are either
//! added to the builtin enum or registered as custom detectors on the scanner.

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod two_bar;

// Re-export all detectors for convenience
pub use helpers::*;
pub use two_bar::*;
