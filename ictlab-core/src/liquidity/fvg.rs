//! Fair value gap lifecycle: creation after a sweep, ageing, fill and pruning.

use super::LiquiditySweep;
use crate::domain::{Candle, Direction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// When a gap counts as filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRule {
    /// Price trades through the gap's midpoint in the adverse direction.
    #[default]
    Midpoint,
    /// Price trades through the gap's far edge.
    FullRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FvgConfig {
    /// Minimum gap width relative to the reference price.
    pub min_size: f64,
    /// Gaps older than this many bars are pruned.
    pub max_age: usize,
    /// Minimum displacement body as a fraction of its open.
    pub displacement_body: f64,
    pub fill_rule: FillRule,
}

impl Default for FvgConfig {
    fn default() -> Self {
        Self {
            min_size: 0.0005,
            max_age: 20,
            displacement_body: 0.001,
            fill_rule: FillRule::Midpoint,
        }
    }
}

/// A three-candle price imbalance. `top > bottom` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
    pub direction: Direction,
    pub top: f64,
    pub bottom: f64,
    pub mid: f64,
    pub size_ratio: f64,
    /// Timestamp of the third candle; also the collection key.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the sweep that triggered the gap search.
    pub sweep_at: DateTime<Utc>,
    pub age_in_bars: usize,
    pub filled: bool,
    pub retested: bool,
}

impl FairValueGap {
    /// Build a gap from the sweep candle, the displacement candle and the
    /// candle after it. `None` when the displacement is too weak, the
    /// candles leave no gap, or the gap is narrower than `min_size`.
    pub fn from_candles(
        direction: Direction,
        sweep: &Candle,
        displacement: &Candle,
        next: &Candle,
        config: &FvgConfig,
    ) -> Option<Self> {
        if displacement.body_ratio() < config.displacement_body {
            return None;
        }

        let (bottom, top, reference) = match direction {
            Direction::Bullish => {
                if !displacement.is_bullish() || next.low <= sweep.high {
                    return None;
                }
                (sweep.high, next.low, sweep.high)
            }
            Direction::Bearish => {
                if !displacement.is_bearish() || next.high >= sweep.low {
                    return None;
                }
                (next.high, sweep.low, sweep.low)
            }
        };

        if reference <= 0.0 {
            return None;
        }
        let size_ratio = (top - bottom) / reference;
        if size_ratio < config.min_size {
            return None;
        }

        Some(Self {
            direction,
            top,
            bottom,
            mid: (top + bottom) / 2.0,
            size_ratio,
            created_at: next.timestamp,
            sweep_at: sweep.timestamp,
            age_in_bars: 0,
            filled: false,
            retested: false,
        })
    }

    pub fn width(&self) -> f64 {
        self.top - self.bottom
    }

    /// Eligible for an entry: neither filled nor already traded.
    pub fn is_tradable(&self) -> bool {
        !self.filled && !self.retested
    }

    fn is_filled_by(&self, candle: &Candle, rule: FillRule) -> bool {
        match (self.direction, rule) {
            (Direction::Bullish, FillRule::Midpoint) => candle.low <= self.mid,
            (Direction::Bullish, FillRule::FullRange) => candle.low <= self.bottom,
            (Direction::Bearish, FillRule::Midpoint) => candle.high >= self.mid,
            (Direction::Bearish, FillRule::FullRange) => candle.high >= self.top,
        }
    }
}

/// Active gaps of one timeframe, keyed by creation time.
#[derive(Debug, Clone)]
pub struct FvgTracker {
    config: FvgConfig,
    gaps: BTreeMap<DateTime<Utc>, FairValueGap>,
}

impl FvgTracker {
    pub fn new(config: FvgConfig) -> Self {
        Self {
            config,
            gaps: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &FvgConfig {
        &self.config
    }

    /// Evaluate the three candles following `sweep` and store the gap if one
    /// qualifies. A gap already stored under the same creation time is left
    /// untouched and `None` is returned.
    pub fn try_create(
        &mut self,
        sweep: &LiquiditySweep,
        candles: &[Candle; 3],
    ) -> Option<FairValueGap> {
        let [first, displacement, next] = candles;
        let gap =
            FairValueGap::from_candles(sweep.direction, first, displacement, next, &self.config)?;
        if self.gaps.contains_key(&gap.created_at) {
            return None;
        }
        self.gaps.insert(gap.created_at, gap);
        Some(gap)
    }

    /// Age and fill-check every gap created before `candle`, then prune.
    /// Returns the gaps removed by this pass.
    pub fn update(&mut self, candle: &Candle) -> Vec<FairValueGap> {
        let rule = self.config.fill_rule;
        for gap in self.gaps.values_mut() {
            if gap.created_at >= candle.timestamp {
                continue;
            }
            gap.age_in_bars += 1;
            if !gap.filled && gap.is_filled_by(candle, rule) {
                gap.filled = true;
            }
        }
        self.prune()
    }

    /// Drop filled gaps and gaps older than `max_age`.
    pub fn prune(&mut self) -> Vec<FairValueGap> {
        let max_age = self.config.max_age;
        let mut removed = Vec::new();
        self.gaps.retain(|_, gap| {
            let keep = !gap.filled && gap.age_in_bars <= max_age;
            if !keep {
                removed.push(*gap);
            }
            keep
        });
        removed
    }

    /// Active gaps, oldest first.
    pub fn active(&self) -> impl Iterator<Item = &FairValueGap> {
        self.gaps.values()
    }

    pub fn get(&self, created_at: DateTime<Utc>) -> Option<&FairValueGap> {
        self.gaps.get(&created_at)
    }

    /// Flag a gap as traded. Returns false when no such gap is active.
    pub fn mark_retested(&mut self, created_at: DateTime<Utc>) -> bool {
        match self.gaps.get_mut(&created_at) {
            Some(gap) => {
                gap.retested = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }
}
