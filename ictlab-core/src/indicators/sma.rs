//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// Callers validate `period >= 1` (see `StructureConfig`).
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Value at the last candle, if enough history exists.
    pub fn last(&self, candles: &[Candle]) -> Option<f64> {
        self.at(candles, candles.len().checked_sub(1)?)
    }

    /// Value at index `i` computed from `candles[..=i]` only.
    pub fn at(&self, candles: &[Candle], i: usize) -> Option<f64> {
        if i >= candles.len() || i + 1 < self.period {
            return None;
        }
        let window = &candles[i + 1 - self.period..=i];
        let sum: f64 = window.iter().map(|c| c.close).sum();
        Some(sum / self.period as f64)
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        let mut sum: f64 = candles.iter().take(self.period).map(|c| c.close).sum();
        result[self.period - 1] = sum / self.period as f64;

        // Roll the window forward
        for i in self.period..n {
            sum = sum - candles[i - self.period].close + candles[i].close;
            result[i] = sum / self.period as f64;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let sma = Sma::new(5);
        let result = sma.compute(&candles);

        assert_eq!(result.len(), 7);
        for (i, v) in result.iter().enumerate().take(4) {
            assert!(v.is_nan(), "expected NaN at index {i}");
        }
        // SMA[4] = mean(10,11,12,13,14) = 12.0
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[5], 13.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn point_value_matches_series() {
        let candles = make_candles(&[3.0, 5.0, 7.0, 9.0, 11.0, 4.0]);
        let sma = Sma::new(3);
        let series = sma.compute(&candles);
        for (i, expected) in series.iter().enumerate() {
            match sma.at(&candles, i) {
                Some(v) => assert_approx(v, *expected, DEFAULT_EPSILON),
                None => assert!(expected.is_nan()),
            }
        }
        assert_approx(sma.last(&candles).unwrap(), 8.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_lookback() {
        assert_eq!(Sma::new(20).lookback(), 19);
        assert_eq!(Sma::new(1).lookback(), 0);
        assert_eq!(Sma::new(20).name(), "sma_20");
    }

    #[test]
    fn sma_too_few_candles() {
        let candles = make_candles(&[10.0, 11.0]);
        let sma = Sma::new(5);
        assert!(sma.compute(&candles).iter().all(|v| v.is_nan()));
        assert_eq!(sma.last(&candles), None);
    }
}
