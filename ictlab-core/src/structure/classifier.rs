//! Market structure classification: bias, Break-of-Structure and Change-of-Character.
//!
//! The bias compares the last two swing highs and lows inside the recent
//! lookback. When there are not enough swings it falls back to a fast/slow
//! SMA pair on closes. BOS and CHoCH are reported as separate events and never
//! overwrite the bias.

use super::swing::{detect_swings, prices_of, SwingKind, SwingPoint};
use super::StructureConfig;
use crate::domain::{Candle, Direction};
use crate::indicators::Sma;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional classification of a timeframe's structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MarketBias {
    Bullish,
    Bearish,
    #[default]
    Neutral,
    /// Lower high and higher low.
    Consolidation,
    /// Higher high and lower low.
    Expansion,
}

impl MarketBias {
    pub fn is_directional(self) -> bool {
        self.direction().is_some()
    }

    /// Trading direction for Bullish/Bearish, `None` otherwise.
    pub fn direction(self) -> Option<Direction> {
        match self {
            MarketBias::Bullish => Some(Direction::Bullish),
            MarketBias::Bearish => Some(Direction::Bearish),
            _ => None,
        }
    }
}

impl fmt::Display for MarketBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketBias::Bullish => "Bullish",
            MarketBias::Bearish => "Bearish",
            MarketBias::Neutral => "Neutral",
            MarketBias::Consolidation => "Consolidation",
            MarketBias::Expansion => "Expansion",
        };
        f.write_str(s)
    }
}

/// Where the bias came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasSource {
    Swings,
    MovingAverages,
    /// Not enough history for either method.
    Insufficient,
}

/// Structure break reported alongside the bias.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StructureEvent {
    /// Latest close beyond the most recent swing point, agreeing with the bias.
    BreakOfStructure {
        direction: Direction,
        level: f64,
        close: f64,
    },
    /// An established trend printed a lower high together with a higher low.
    ChangeOfCharacter {
        direction: Direction,
        last_high: f64,
        last_low: f64,
    },
}

impl StructureEvent {
    /// Same break at the same level, ignoring the close that confirmed it.
    pub fn same_break(&self, other: &StructureEvent) -> bool {
        match (self, other) {
            (
                StructureEvent::BreakOfStructure {
                    direction: d1,
                    level: l1,
                    ..
                },
                StructureEvent::BreakOfStructure {
                    direction: d2,
                    level: l2,
                    ..
                },
            ) => d1 == d2 && l1 == l2,
            (a @ StructureEvent::ChangeOfCharacter { .. }, b) => a == b,
            _ => false,
        }
    }
}

/// Result of classifying one candle series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    pub bias: MarketBias,
    pub source: BiasSource,
    pub bos: Option<StructureEvent>,
    pub choch: Option<StructureEvent>,
    /// Every swing of the analysed series.
    pub swings: Vec<SwingPoint>,
}

impl StructureAnalysis {
    pub fn neutral() -> Self {
        Self {
            bias: MarketBias::Neutral,
            source: BiasSource::Insufficient,
            bos: None,
            choch: None,
            swings: Vec::new(),
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &StructureEvent> {
        self.bos.iter().chain(self.choch.iter())
    }
}

/// Classify the structure of a closed candle series from scratch.
pub fn classify_structure(candles: &[Candle], config: &StructureConfig) -> StructureAnalysis {
    let Some(last) = candles.last() else {
        return StructureAnalysis::neutral();
    };

    let swings = detect_swings(candles, config.swing_window);
    let recent_start = candles.len().saturating_sub(config.lookback_bars);
    let recent: Vec<SwingPoint> = swings
        .iter()
        .filter(|s| s.index >= recent_start)
        .copied()
        .collect();

    let (bias, source) = match bias_from_swings(&recent) {
        Some(bias) => (bias, BiasSource::Swings),
        None => match bias_from_moving_averages(candles, config) {
            Some(bias) => (bias, BiasSource::MovingAverages),
            None => (MarketBias::Neutral, BiasSource::Insufficient),
        },
    };

    let bos = break_of_structure(&swings, last.close, bias);
    let choch = change_of_character(&swings);

    StructureAnalysis {
        bias,
        source,
        bos,
        choch,
        swings,
    }
}

/// Bias from the last two swing highs and lows; `None` with fewer than two of either.
pub fn bias_from_swings(swings: &[SwingPoint]) -> Option<MarketBias> {
    let highs = prices_of(swings, SwingKind::High);
    let lows = prices_of(swings, SwingKind::Low);
    if highs.len() < 2 || lows.len() < 2 {
        return None;
    }

    let (prev_high, last_high) = (highs[highs.len() - 2], highs[highs.len() - 1]);
    let (prev_low, last_low) = (lows[lows.len() - 2], lows[lows.len() - 1]);

    Some(pattern(prev_high, last_high, prev_low, last_low))
}

fn pattern(prev_high: f64, last_high: f64, prev_low: f64, last_low: f64) -> MarketBias {
    let higher_high = last_high > prev_high;
    let lower_high = last_high < prev_high;
    let higher_low = last_low > prev_low;
    let lower_low = last_low < prev_low;

    if higher_high && higher_low {
        MarketBias::Bullish
    } else if lower_high && lower_low {
        MarketBias::Bearish
    } else if lower_high && higher_low {
        MarketBias::Consolidation
    } else if higher_high && lower_low {
        MarketBias::Expansion
    } else {
        MarketBias::Neutral
    }
}

/// SMA fallback: Bullish when fast > slow and fast rising, Bearish on the mirror.
pub fn bias_from_moving_averages(
    candles: &[Candle],
    config: &StructureConfig,
) -> Option<MarketBias> {
    let fast = Sma::new(config.fast_ma);
    let slow = Sma::new(config.slow_ma);
    let n = candles.len();
    if n < 2 {
        return None;
    }

    let fast_now = fast.at(candles, n - 1)?;
    let fast_prev = fast.at(candles, n - 2)?;
    let slow_now = slow.at(candles, n - 1)?;

    let bias = if fast_now > slow_now && fast_now > fast_prev {
        MarketBias::Bullish
    } else if fast_now < slow_now && fast_now < fast_prev {
        MarketBias::Bearish
    } else {
        MarketBias::Neutral
    };
    Some(bias)
}

/// BOS: close beyond the most recent swing high (low), only when the bias agrees.
fn break_of_structure(swings: &[SwingPoint], close: f64, bias: MarketBias) -> Option<StructureEvent> {
    let last_of = |kind: SwingKind| swings.iter().rev().find(|s| s.kind == kind).map(|s| s.price);

    match bias {
        MarketBias::Bullish => {
            let level = last_of(SwingKind::High)?;
            (close > level).then_some(StructureEvent::BreakOfStructure {
                direction: Direction::Bullish,
                level,
                close,
            })
        }
        MarketBias::Bearish => {
            let level = last_of(SwingKind::Low)?;
            (close < level).then_some(StructureEvent::BreakOfStructure {
                direction: Direction::Bearish,
                level,
                close,
            })
        }
        _ => None,
    }
}

/// CHoCH: the latest swings form a lower high and a higher low while the
/// preceding pair established a trend. A prior uptrend yields a bearish
/// CHoCH, a prior downtrend a bullish one. Needs three highs and three lows.
fn change_of_character(swings: &[SwingPoint]) -> Option<StructureEvent> {
    let highs = prices_of(swings, SwingKind::High);
    let lows = prices_of(swings, SwingKind::Low);
    if highs.len() < 3 || lows.len() < 3 {
        return None;
    }

    let h = &highs[highs.len() - 3..];
    let l = &lows[lows.len() - 3..];

    let compressing = h[2] < h[1] && l[2] > l[1];
    if !compressing {
        return None;
    }

    let direction = match pattern(h[0], h[1], l[0], l[1]) {
        MarketBias::Bullish => Direction::Bearish,
        MarketBias::Bearish => Direction::Bullish,
        _ => return None,
    };

    Some(StructureEvent::ChangeOfCharacter {
        direction,
        last_high: h[2],
        last_low: l[2],
    })
}
