//! Deterministic synthetic candle generation
//!
//! A run is a pure function of `(window, now, seed)`: the seed comes from the
//! symbol via [`symbol_seed`] and `now` is truncated to the minute, so repeated
//! runs inside the same minute produce identical series.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::params::{parse_interval_minutes, Window};
use crate::{CandleSeries, OhlcPoint, Period, Timestamp};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Stable 64-bit FNV-1a hash of the symbol text.
pub fn symbol_seed(symbol: &str) -> u64 {
    symbol.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Generate the series for a symbol/period/interval selection.
pub fn generate(symbol: &str, period: Period, interval: &str, now: Timestamp) -> CandleSeries {
    let window = Window::for_period(period, parse_interval_minutes(interval));
    synthesize(&window, now, symbol_seed(symbol))
}

/// Random-walk candles over `window`, seeded explicitly.
///
/// Each candle opens at the previous close; high and low are drawn around the
/// open and the close is drawn between them. `open` is not clamped into
/// `[low, high]`.
pub fn synthesize(window: &Window, now: Timestamp, seed: u64) -> CandleSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let count = window.candle_count();
    let start = window.start(now);
    let volatility = (f64::from(window.interval.get()) / 3.0).max(0.1);

    let base_price = 100.0 + rng.random::<f64>() * 400.0;
    let mut prev_close = base_price;

    let mut candles = Vec::with_capacity(count);
    for i in 0..count {
        let open = prev_close;
        let high = open + rng.random::<f64>() * volatility;
        let low = open - rng.random::<f64>() * volatility;
        let close = low + rng.random::<f64>() * (high - low);

        candles.push(OhlcPoint {
            time: window.candle_time(start, i),
            open,
            high,
            low,
            close,
        });
        prev_close = close;
    }

    CandleSeries::from_ordered(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn now() -> Timestamp {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 4, 14, 7, 0)
            .unwrap()
    }

    #[test]
    fn test_symbol_seed_is_stable() {
        assert_eq!(symbol_seed(""), FNV_OFFSET_BASIS);
        assert_eq!(symbol_seed("SPY"), symbol_seed("SPY"));
        assert_ne!(symbol_seed("SPY"), symbol_seed("QQQ"));
    }

    #[test]
    fn test_one_minute_day() {
        let series = generate("SPY", Period::OneDay, "1m", now());
        assert_eq!(series.len(), 120);
        assert_eq!(
            series.first_candle().time,
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 3, 4, 12, 7, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_year_is_weekly() {
        let series = generate("SPY", Period::OneYear, "1m", now());
        assert_eq!(series.len(), 52);
        let step = series[1].time - series[0].time;
        assert_eq!(step.num_days(), 7);
    }

    #[test]
    fn test_base_price_range() {
        for symbol in ["SPY", "QQQ", "AMZN", "AAPL", "NVDA", "X"] {
            let series = generate(symbol, Period::OneDay, "3m", now());
            let base = series.first_candle().open;
            assert!((100.0..500.0).contains(&base), "{symbol}: {base}");
        }
    }

    #[test]
    fn test_open_follows_previous_close() {
        let series = generate("TSLA", Period::OneMonth, "", now());
        for pair in series.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
    }

    #[test]
    fn test_close_within_high_low() {
        let series = generate("NFLX", Period::OneWeek, "1h", now());
        for c in series.iter() {
            assert!(c.low <= c.close && c.close <= c.high);
            assert!(c.low <= c.high);
        }
    }

    #[test]
    fn test_seed_determinism() {
        let window = Window::for_period(Period::OneDay, parse_interval_minutes("5m"));
        assert_eq!(
            synthesize(&window, now(), 42),
            synthesize(&window, now(), 42)
        );
        assert_ne!(
            synthesize(&window, now(), 42),
            synthesize(&window, now(), 43)
        );
    }
}
