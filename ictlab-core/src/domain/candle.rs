//! Candle: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed or out-of-sequence candle data.
///
/// A rejected candle is skipped: the engine keeps its last-known state and
/// the error is handed back to the caller for logging.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandleError {
    #[error("candle at {timestamp}: {field} is not finite")]
    NonFinite {
        timestamp: DateTime<Utc>,
        field: &'static str,
    },

    #[error("candle at {timestamp}: high {high} is below low {low}")]
    HighBelowLow {
        timestamp: DateTime<Utc>,
        high: f64,
        low: f64,
    },

    #[error("candle at {timestamp}: {field} {value} lies outside [{low}, {high}]")]
    OutsideRange {
        timestamp: DateTime<Utc>,
        field: &'static str,
        value: f64,
        low: f64,
        high: f64,
    },

    #[error("candle at {timestamp}: negative volume {volume}")]
    NegativeVolume {
        timestamp: DateTime<Utc>,
        volume: f64,
    },

    #[error("timeframe {0} is not tracked by this engine")]
    UnknownTimeframe(String),
}

/// Closed OHLCV candle. Immutable once closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time of the candle.
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Check OHLCV sanity: finite values, `low <= open/close <= high`, volume >= 0.
    pub fn validate(&self) -> Result<(), CandleError> {
        let timestamp = self.timestamp;
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ] {
            if !value.is_finite() {
                return Err(CandleError::NonFinite { timestamp, field });
            }
        }

        if self.high < self.low {
            return Err(CandleError::HighBelowLow {
                timestamp,
                high: self.high,
                low: self.low,
            });
        }

        for (field, value) in [("open", self.open), ("close", self.close)] {
            if value < self.low || value > self.high {
                return Err(CandleError::OutsideRange {
                    timestamp,
                    field,
                    value,
                    low: self.low,
                    high: self.high,
                });
            }
        }

        if self.volume < 0.0 {
            return Err(CandleError::NegativeVolume {
                timestamp,
                volume: self.volume,
            });
        }

        Ok(())
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Absolute body size (|close - open|).
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Body as a fraction of the open price. Zero when open is zero.
    pub fn body_ratio(&self) -> f64 {
        if self.open == 0.0 {
            return 0.0;
        }
        self.body() / self.open
    }

    /// True when the candle's range `[low, high]` intersects `[bottom, top]`.
    pub fn overlaps(&self, bottom: f64, top: f64) -> bool {
        self.low <= top && self.high >= bottom
    }
}
