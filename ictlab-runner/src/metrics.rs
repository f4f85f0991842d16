//! Performance metrics: pure functions over the closed-trade list.
//!
//! Every metric takes trades in close order and returns a scalar. The
//! equity curve compounds each trade's percent return on a unit stake.

use ictlab_core::domain::{TradeOutcome, TradeRecord};
use serde::{Deserialize, Serialize};

/// Aggregate performance of one pair's backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub flats: usize,
    /// Wins ÷ trades, 0 with no trades.
    pub win_rate: f64,
    pub avg_pnl_pct: f64,
    /// Simple sum of per-trade percent returns.
    pub total_pnl_pct: f64,
    /// Gross profit ÷ gross loss, capped at [`PROFIT_FACTOR_CAP`].
    pub profit_factor: f64,
    pub compounded_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub avg_bars_held: f64,
    pub avg_r_multiple: f64,
}

impl PerformanceSummary {
    pub fn compute(trades: &[TradeRecord]) -> Self {
        let curve = equity_curve(trades);
        Self {
            trade_count: trades.len(),
            wins: count_outcome(trades, TradeOutcome::Win),
            losses: count_outcome(trades, TradeOutcome::Loss),
            flats: count_outcome(trades, TradeOutcome::Flat),
            win_rate: win_rate(trades),
            avg_pnl_pct: mean(trades.iter().map(|t| t.pnl_percent)),
            total_pnl_pct: trades.iter().map(|t| t.pnl_percent).sum(),
            profit_factor: profit_factor(trades),
            compounded_return_pct: compounded_return_pct(&curve),
            max_drawdown_pct: max_drawdown_pct(&curve),
            max_consecutive_wins: max_consecutive(trades, TradeOutcome::Win),
            max_consecutive_losses: max_consecutive(trades, TradeOutcome::Loss),
            avg_bars_held: mean(trades.iter().map(|t| t.bars_held as f64)),
            avg_r_multiple: mean(trades.iter().map(|t| t.r_multiple())),
        }
    }
}

/// Profit factor reported when there are winners and no losers.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

// ─── Individual metric functions ────────────────────────────────────

pub fn count_outcome(trades: &[TradeRecord], outcome: TradeOutcome) -> usize {
    trades.iter().filter(|t| t.outcome == outcome).count()
}

pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    count_outcome(trades, TradeOutcome::Win) as f64 / trades.len() as f64
}

/// Gross profit ÷ gross loss (in percent points).
///
/// Capped at [`PROFIT_FACTOR_CAP`] so the value stays finite in JSON.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let gross_profit: f64 = trades
        .iter()
        .map(|t| t.pnl_percent)
        .filter(|p| *p > 0.0)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .map(|t| t.pnl_percent)
        .filter(|p| *p < 0.0)
        .map(f64::abs)
        .sum();

    if gross_loss < 1e-12 {
        return if gross_profit > 0.0 { PROFIT_FACTOR_CAP } else { 0.0 };
    }
    (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
}

/// Compounded equity after each trade, starting at 1.0.
pub fn equity_curve(trades: &[TradeRecord]) -> Vec<f64> {
    let mut equity = 1.0;
    let mut curve = Vec::with_capacity(trades.len() + 1);
    curve.push(equity);
    for t in trades {
        equity *= 1.0 + t.pnl_percent / 100.0;
        curve.push(equity);
    }
    curve
}

pub fn compounded_return_pct(curve: &[f64]) -> f64 {
    match (curve.first(), curve.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => (last / first - 1.0) * 100.0,
        _ => 0.0,
    }
}

/// Largest peak-to-trough decline, in percent of the peak (positive number).
pub fn max_drawdown_pct(curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak);
        }
    }
    max_dd * 100.0
}

pub fn max_consecutive(trades: &[TradeRecord], outcome: TradeOutcome) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if trade.outcome == outcome {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ictlab_core::domain::{ExitReason, PositionSide};

    fn make_trade(pnl_pct: f64) -> TradeRecord {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        TradeRecord {
            side: PositionSide::Long,
            entry_time: t,
            entry_price: 100.0,
            initial_stop: 98.0,
            take_profit: 104.0,
            exit_time: t,
            exit_price: 100.0 + pnl_pct,
            exit_reason: if pnl_pct > 0.0 {
                ExitReason::TakeProfit
            } else {
                ExitReason::StopLoss
            },
            pnl_percent: pnl_pct,
            outcome: TradeOutcome::from_pnl_pct(pnl_pct),
            bars_held: 4,
        }
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn empty_trades_yield_zeroes() {
        let s = PerformanceSummary::compute(&[]);
        assert_eq!(s.trade_count, 0);
        assert_eq!(s.win_rate, 0.0);
        assert_eq!(s.profit_factor, 0.0);
        assert_eq!(s.max_drawdown_pct, 0.0);
        assert_eq!(s.compounded_return_pct, 0.0);
    }

    #[test]
    fn mixed_trades() {
        let trades: Vec<TradeRecord> = [4.0, -2.0, -2.0, 4.0, 0.0]
            .iter()
            .map(|&p| make_trade(p))
            .collect();
        let s = PerformanceSummary::compute(&trades);
        assert_eq!((s.wins, s.losses, s.flats), (2, 2, 1));
        approx(s.win_rate, 0.4);
        approx(s.total_pnl_pct, 4.0);
        approx(s.avg_pnl_pct, 0.8);
        approx(s.profit_factor, 2.0);
        assert_eq!(s.max_consecutive_losses, 2);
        assert_eq!(s.max_consecutive_wins, 1);
        approx(s.avg_bars_held, 4.0);

        // 1.04 → 1.0192 → 0.998816: drawdown from the 1.04 peak.
        approx(s.max_drawdown_pct, (1.04 - 0.998816) / 1.04 * 100.0);
        approx(s.compounded_return_pct, (0.998816 * 1.04 - 1.0) * 100.0);
    }

    #[test]
    fn all_winners_hit_profit_factor_cap() {
        let trades = vec![make_trade(1.0), make_trade(2.0)];
        assert_eq!(profit_factor(&trades), PROFIT_FACTOR_CAP);
        approx(max_drawdown_pct(&equity_curve(&trades)), 0.0);
    }
}
