//! Swing point detection.
//!
//! A swing high at index i is a candle whose high is the strict maximum of
//! `[i - window, i + window]`; a swing low is the strict minimum of lows over
//! the same range. Only fully-formed windows qualify, so the last `window`
//! candles of a series never carry a swing.

use crate::domain::Candle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub kind: SwingKind,
    /// Index into the analysed candle slice.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Find swing highs and lows, ordered by index (a high precedes a low on the same candle).
///
/// A series shorter than `2 * window + 1` yields no swings. O(n·window).
pub fn detect_swings(candles: &[Candle], window: usize) -> Vec<SwingPoint> {
    let window = window.max(1);
    let n = candles.len();
    let mut swings = Vec::new();
    if n < 2 * window + 1 {
        return swings;
    }

    for i in window..n - window {
        let range = i - window..=i + window;
        let candle = &candles[i];

        let is_high = range
            .clone()
            .filter(|&j| j != i)
            .all(|j| candle.high > candles[j].high);
        if is_high {
            swings.push(SwingPoint {
                kind: SwingKind::High,
                index: i,
                timestamp: candle.timestamp,
                price: candle.high,
            });
        }

        let is_low = range
            .filter(|&j| j != i)
            .all(|j| candle.low < candles[j].low);
        if is_low {
            swings.push(SwingPoint {
                kind: SwingKind::Low,
                index: i,
                timestamp: candle.timestamp,
                price: candle.low,
            });
        }
    }

    swings
}

/// Prices of swings of one kind, oldest first.
pub fn prices_of(swings: &[SwingPoint], kind: SwingKind) -> Vec<f64> {
    swings
        .iter()
        .filter(|s| s.kind == kind)
        .map(|s| s.price)
        .collect()
}
