//! Entry synthesis from a bias-aligned fair value gap retest.

use crate::domain::{Candle, PositionSide};
use crate::liquidity::FairValueGap;
use crate::structure::MarketBias;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slack for comparing reward-to-risk ratios computed in floating point.
const RR_EPSILON: f64 = 1e-9;

/// How the take-profit is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    /// `entry ± risk · rr_ratio`.
    #[default]
    Fixed,
    /// Fixed target capped at the nearest opposing extreme of recent bars.
    Structural,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    /// Required reward-to-risk, at least 1.
    pub rr_ratio: f64,
    /// Stop distance beyond the gap's far edge, as a fraction of that edge.
    pub stop_margin: f64,
    /// Share of the gap width, measured from the far side, the close must
    /// clear. Zero demands a close beyond the near edge.
    pub confirm_fraction: f64,
    pub target: TargetMode,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            rr_ratio: 2.0,
            stop_margin: 0.004,
            confirm_fraction: 0.5,
            target: TargetMode::Fixed,
        }
    }
}

/// A trade proposal; becomes a position only after a confirmed fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryCandidate {
    pub side: PositionSide,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_amount: f64,
    pub reward_to_risk: f64,
    /// Gap being retested.
    pub fvg_created_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EntrySignalGenerator {
    config: EntryConfig,
}

impl EntrySignalGenerator {
    pub fn new(config: EntryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EntryConfig {
        &self.config
    }

    /// Best candidate for `candle` among `fvgs`, or `None`.
    ///
    /// Only tradable gaps whose direction matches `bias` are considered.
    /// `history` holds the bars before `candle` and is only read for
    /// structural targets. The highest reward-to-risk wins; ties go to the
    /// newest gap.
    pub fn evaluate<'a>(
        &self,
        candle: &Candle,
        fvgs: impl IntoIterator<Item = &'a FairValueGap>,
        bias: MarketBias,
        history: &[Candle],
    ) -> Option<EntryCandidate> {
        let direction = bias.direction()?;

        let mut best: Option<EntryCandidate> = None;
        for gap in fvgs {
            if gap.direction != direction || !gap.is_tradable() {
                continue;
            }
            let Some(candidate) = self.candidate(candle, gap, history) else {
                continue;
            };
            let replace = match &best {
                None => true,
                Some(current) => {
                    candidate.reward_to_risk + RR_EPSILON >= current.reward_to_risk
                        && (candidate.reward_to_risk > current.reward_to_risk + RR_EPSILON
                            || candidate.fvg_created_at >= current.fvg_created_at)
                }
            };
            if replace {
                best = Some(candidate);
            }
        }
        best
    }

    /// Candidate for a single gap, if the candle retests and confirms it.
    pub fn candidate(
        &self,
        candle: &Candle,
        gap: &FairValueGap,
        history: &[Candle],
    ) -> Option<EntryCandidate> {
        let cfg = &self.config;
        if !candle.overlaps(gap.bottom, gap.top) {
            return None;
        }

        let side = gap.direction.side();
        let band = cfg.confirm_fraction * gap.width();
        let entry = candle.close;

        let (stop, fixed_target) = match side {
            PositionSide::Long => {
                if entry <= gap.top - band {
                    return None;
                }
                let stop = gap.bottom * (1.0 - cfg.stop_margin);
                (stop, entry + (entry - stop) * cfg.rr_ratio)
            }
            PositionSide::Short => {
                if entry >= gap.bottom + band {
                    return None;
                }
                let stop = gap.top * (1.0 + cfg.stop_margin);
                (stop, entry - (stop - entry) * cfg.rr_ratio)
            }
        };

        let risk = (entry - stop) * side.sign();
        if risk <= 0.0 || !risk.is_finite() {
            return None;
        }

        let target = match cfg.target {
            TargetMode::Fixed => fixed_target,
            TargetMode::Structural => structural_target(side, entry, fixed_target, history),
        };
        let reward = (target - entry) * side.sign();
        let reward_to_risk = reward / risk;
        if reward_to_risk + RR_EPSILON < cfg.rr_ratio {
            return None;
        }

        Some(EntryCandidate {
            side,
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
            risk_amount: risk,
            reward_to_risk,
            fvg_created_at: gap.created_at,
            timestamp: candle.timestamp,
        })
    }
}

/// Cap `fixed` at the nearest opposing extreme in `history` lying beyond `entry`.
fn structural_target(side: PositionSide, entry: f64, fixed: f64, history: &[Candle]) -> f64 {
    match side {
        PositionSide::Long => history
            .iter()
            .map(|c| c.high)
            .filter(|&h| h > entry)
            .fold(fixed, f64::min),
        PositionSide::Short => history
            .iter()
            .map(|c| c.low)
            .filter(|&l| l < entry)
            .fold(fixed, f64::max),
    }
}
