//! Indicators: pure functions from candle history to a numeric series.
//!
//! Only the moving averages needed by the market-structure fallback live here.

pub mod sma;

pub use sma::Sma;

use crate::domain::Candle;

/// Trait for indicators.
///
/// Indicators take a full candle series and produce an output series of the
/// same length. The first `lookback()` values are `f64::NAN` (warmup).
/// No value at index t may depend on candles after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20").
    fn name(&self) -> &str;

    /// Number of candles needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Base timestamp used by test candle builders (2024-01-02 00:00 UTC).
#[cfg(test)]
pub fn test_epoch() -> chrono::DateTime<chrono::Utc> {
    use chrono::TimeZone;
    chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
}

/// Single candle `i` minutes after the test epoch.
#[cfg(test)]
pub fn candle_at(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle::new(
        test_epoch() + chrono::Duration::minutes(i as i64),
        open,
        high,
        low,
        close,
        1000.0,
    )
}

/// Create synthetic candles from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            candle_at(i, open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
