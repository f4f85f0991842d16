//! Liquidity sweep detection.
//!
//! A sweep is a stop-hunt excursion beyond the extreme of a reference window
//! (`[-lookback, -recent_window)`) by one of the last `recent_window` candles,
//! confirmed by the latest candle closing in the reversal direction. Only
//! sweeps agreeing with the prevailing bias are reported.

use crate::domain::{Candle, Direction};
use crate::structure::MarketBias;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Total bars inspected (reference window + recent window).
    pub lookback: usize,
    /// Most recent bars searched for the excursion.
    pub recent_window: usize,
    /// Fraction beyond the reference extreme the excursion must reach.
    pub tolerance: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            recent_window: 5,
            tolerance: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquiditySweep {
    /// Bullish sweeps take out sell-side liquidity below a low, bearish ones
    /// buy-side liquidity above a high.
    pub direction: Direction,
    /// Reference extreme that was swept.
    pub swept_level: f64,
    /// Furthest price reached beyond the level.
    pub extreme: f64,
    /// Absolute index of the confirming candle.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    /// Set once a fair value gap has been evaluated from this sweep.
    pub consumed: bool,
}

impl LiquiditySweep {
    /// Same direction and level: a re-detection of an already known sweep.
    pub fn same_sweep(&self, other: &LiquiditySweep) -> bool {
        self.direction == other.direction && self.swept_level == other.swept_level
    }
}

/// Detects sweeps and retains the most recent one.
#[derive(Debug, Clone)]
pub struct SweepDetector {
    config: SweepConfig,
    last: Option<LiquiditySweep>,
}

impl SweepDetector {
    pub fn new(config: SweepConfig) -> Self {
        Self { config, last: None }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Stateless detection on the tail of `candles`.
    ///
    /// `first_index` is the absolute index of `candles[0]`; the returned
    /// sweep carries the absolute index of the last candle. Fewer than
    /// `lookback` candles, or a non-directional bias, yields `None`.
    pub fn detect(
        &self,
        candles: &[Candle],
        first_index: usize,
        bias: MarketBias,
    ) -> Option<LiquiditySweep> {
        let cfg = &self.config;
        let n = candles.len();
        if cfg.recent_window == 0 || cfg.recent_window >= cfg.lookback || n < cfg.lookback {
            return None;
        }

        let reference = &candles[n - cfg.lookback..n - cfg.recent_window];
        let recent = &candles[n - cfg.recent_window..];
        let last = candles[n - 1];

        let direction = bias.direction()?;
        let (swept_level, extreme) = match direction {
            Direction::Bullish => {
                if !last.is_bullish() {
                    return None;
                }
                let level = reference.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
                let extreme = recent.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
                if extreme >= level * (1.0 - cfg.tolerance) {
                    return None;
                }
                (level, extreme)
            }
            Direction::Bearish => {
                if !last.is_bearish() {
                    return None;
                }
                let level = reference
                    .iter()
                    .map(|c| c.high)
                    .fold(f64::NEG_INFINITY, f64::max);
                let extreme = recent
                    .iter()
                    .map(|c| c.high)
                    .fold(f64::NEG_INFINITY, f64::max);
                if extreme <= level * (1.0 + cfg.tolerance) {
                    return None;
                }
                (level, extreme)
            }
        };

        Some(LiquiditySweep {
            direction,
            swept_level,
            extreme,
            index: first_index + n - 1,
            timestamp: last.timestamp,
            consumed: false,
        })
    }

    /// Detect and retain. Returns the sweep only when it is new; a
    /// re-detection of the retained sweep is ignored so the same excursion
    /// is never counted twice. A different sweep replaces the retained one.
    pub fn observe(
        &mut self,
        candles: &[Candle],
        first_index: usize,
        bias: MarketBias,
    ) -> Option<LiquiditySweep> {
        let sweep = self.detect(candles, first_index, bias)?;
        if self.last.as_ref().is_some_and(|prev| prev.same_sweep(&sweep)) {
            return None;
        }
        self.last = Some(sweep);
        Some(sweep)
    }

    pub fn last(&self) -> Option<&LiquiditySweep> {
        self.last.as_ref()
    }

    /// Retained sweep that has not yet produced a gap evaluation.
    pub fn pending(&self) -> Option<&LiquiditySweep> {
        self.last.as_ref().filter(|s| !s.consumed)
    }

    pub fn consume(&mut self) {
        if let Some(sweep) = self.last.as_mut() {
            sweep.consumed = true;
        }
    }
}
