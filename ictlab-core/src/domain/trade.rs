//! TradeRecord: a completed round-trip trade.

use super::position::{pnl_percent, Position, PositionSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Realized PnL tolerance (in percent) under which a trade counts as flat.
pub const FLAT_EPSILON_PCT: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeOutcome {
    Win,
    Loss,
    Flat,
}

impl TradeOutcome {
    pub fn from_pnl_pct(pnl_pct: f64) -> Self {
        if pnl_pct > FLAT_EPSILON_PCT {
            TradeOutcome::Win
        } else if pnl_pct < -FLAT_EPSILON_PCT {
            TradeOutcome::Loss
        } else {
            TradeOutcome::Flat
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    /// Stop exit after trailing had tightened the stop.
    TrailingStop,
}

/// A complete round-trip trade record: entry → exit. Append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: PositionSide,

    // ── Entry ──
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub initial_stop: f64,
    pub take_profit: f64,

    // ── Exit ──
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Result ──
    pub pnl_percent: f64,
    pub outcome: TradeOutcome,
    pub bars_held: usize,
}

impl TradeRecord {
    /// Convert a closing position into its record.
    pub fn from_position(
        position: &Position,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        exit_reason: ExitReason,
    ) -> Self {
        let pnl = pnl_percent(position.side, position.entry_price, exit_price);
        Self {
            side: position.side,
            entry_time: position.opened_at,
            entry_price: position.entry_price,
            initial_stop: position.initial_stop,
            take_profit: position.take_profit,
            exit_time,
            exit_price,
            exit_reason,
            pnl_percent: pnl,
            outcome: TradeOutcome::from_pnl_pct(pnl),
            bars_held: position.bars_held,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.outcome == TradeOutcome::Win
    }

    /// Realized return in R multiples (PnL ÷ initial risk).
    pub fn r_multiple(&self) -> f64 {
        let risk = (self.entry_price - self.initial_stop).abs();
        if risk == 0.0 {
            return 0.0;
        }
        self.side.sign() * (self.exit_price - self.entry_price) / risk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade() -> TradeRecord {
        TradeRecord {
            side: PositionSide::Long,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap(),
            entry_price: 100.0,
            initial_stop: 98.0,
            take_profit: 104.0,
            exit_time: Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap(),
            exit_price: 104.0,
            exit_reason: ExitReason::TakeProfit,
            pnl_percent: 4.0,
            outcome: TradeOutcome::Win,
            bars_held: 24,
        }
    }

    #[test]
    fn outcome_from_pnl() {
        assert_eq!(TradeOutcome::from_pnl_pct(0.5), TradeOutcome::Win);
        assert_eq!(TradeOutcome::from_pnl_pct(-0.5), TradeOutcome::Loss);
        assert_eq!(TradeOutcome::from_pnl_pct(0.0), TradeOutcome::Flat);
    }

    #[test]
    fn r_multiple_calculation() {
        let trade = sample_trade();
        assert!((trade.r_multiple() - 2.0).abs() < 1e-12);
        assert!(trade.is_winner());
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let deser: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
