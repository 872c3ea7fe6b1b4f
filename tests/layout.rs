//! Integration tests for pixel layout.

use candlechart::prelude::*;
use chrono::{Duration, FixedOffset, NaiveTime, TimeZone};

fn at(h: u32, m: u32) -> Timestamp {
    FixedOffset::east_opt(-4 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 3, h, m, 0)
        .unwrap()
}

fn flat_series(start: Timestamp, step: Duration, n: usize) -> Vec<OhlcPoint> {
    (0..n)
        .map(|i| OhlcPoint {
            time: start + step * i as i32,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
        })
        .collect()
}

#[test]
fn test_free_pixel_mappers() {
    assert_eq!(to_pixel_x(0.5, 800.0), 60.0 + 366.0);
    assert_eq!(to_pixel_y(0.5, 600.0), 8.0 + 282.0);
    assert_eq!(to_pixel_x(0.5, 10.0), 60.5);
    assert_eq!(to_pixel_y(0.0, -50.0), 8.0);
}

#[test]
fn test_custom_margins_through_engine() {
    let engine = ChartEngine::builder()
        .margins(Margins::new(40.0, 10.0, 10.0, 20.0).unwrap())
        .build()
        .unwrap();
    let layout = engine.layout(Viewport::new(450.0, 330.0));
    let plot = layout.plot_area();
    assert_eq!((plot.x, plot.y, plot.width, plot.height), (40.0, 10.0, 400.0, 300.0));
    assert_eq!(layout.to_pixel_x(1.0), 440.0);
    assert_eq!(layout.to_pixel_y(1.0), 310.0);
}

#[test]
fn test_body_ratio_and_minimums_from_config() {
    let config = ChartConfig::from_json_str(
        r#"{ "candle_body_ratio": 0.5, "min_candle_width": 3.0, "min_body_height": 2.0 }"#,
    )
    .unwrap();
    let candles = flat_series(at(10, 0), Duration::minutes(1), 4);
    let range = PriceRange::from_candles(&candles);

    // plot width 732 -> step 183, body 91.5
    let wide = Layout::from_config(Viewport::new(800.0, 600.0), &config);
    assert_eq!(wide.candles(&candles, range)[0].body.width, 91.5);

    // plot width 1 -> minimum width
    let narrow = Layout::from_config(Viewport::new(0.0, 600.0), &config);
    let body = narrow.candles(&candles, range)[0].body;
    assert_eq!(body.width, 3.0);
    assert!(body.height >= 2.0);
}

#[test]
fn test_market_hours_from_builder() {
    let hours = MarketHours::new(
        NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
        NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
    )
    .unwrap();
    let engine = ChartEngine::builder().market_hours(hours).build().unwrap();
    let layout = engine.layout(Viewport::new(800.0, 600.0));

    // 08:00 .. 16:00; 30 minutes pre-market, 60 minutes post-market
    let candles = flat_series(at(8, 0), Duration::minutes(30), 17);
    let shading = layout.off_market_shading(&candles, Period::OneDay);
    assert_eq!(shading.len(), 2);
    assert!((shading[0].width - 732.0 / 16.0).abs() < 1e-9);
    assert!((shading[1].width - 732.0 / 8.0).abs() < 1e-9);
}

#[test]
fn test_shading_after_close_covers_plot() {
    let layout = Layout::new(Viewport::new(800.0, 600.0));
    let candles = flat_series(at(16, 30), Duration::minutes(1), 120);
    assert_eq!(
        layout.off_market_shading(&candles, Period::OneDay),
        vec![layout.plot_area()]
    );
}

#[test]
fn test_crosshair_roundtrip_on_snapshot() {
    let engine = ChartEngine::builder().build().unwrap();
    let request = ChartRequest::new("SPY", Period::OneDay, "5m").unwrap();
    let snapshot = engine.render(&request, at(14, 7));
    let layout = engine.layout(Viewport::new(800.0, 600.0));
    let bodies = layout.candles(&snapshot.candles, snapshot.price_range);

    let i = 7;
    let y = layout.price_to_y(snapshot.candles[i].close, snapshot.price_range);
    let value = layout
        .value_at(bodies[i].x_center, y, &snapshot.candles, snapshot.price_range)
        .unwrap();
    assert_eq!(value.time, snapshot.candles[i].time);
    assert!((value.price - snapshot.candles[i].close).abs() < 1e-9);

    assert!(layout
        .value_at(0.0, 0.0, &snapshot.candles, snapshot.price_range)
        .is_none());
}

#[test]
fn test_label_pixels_follow_fractions() {
    let engine = ChartEngine::builder().build().unwrap();
    let request = ChartRequest::new("SPY", Period::OneDay, "1m").unwrap();
    let snapshot = engine.render(&request, at(14, 7));
    let layout = engine.layout(Viewport::new(800.0, 600.0));

    let ys = layout.y_label_positions(&snapshot.y_labels);
    assert_eq!(ys.first().map(|l| l.y), Some(8.0));
    assert_eq!(ys.last().map(|l| l.y), Some(572.0));
    assert_eq!(layout.gridlines(&snapshot.y_labels).len(), 6);

    let xs = layout.x_label_positions(&snapshot.x_labels);
    assert_eq!(xs.len(), snapshot.x_labels.len());
    assert!(xs.iter().all(|l| (60.0..=792.0).contains(&l.x) && l.y == 572.0));
}
