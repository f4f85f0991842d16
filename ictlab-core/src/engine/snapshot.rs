//! Read-only view of an engine's state for reporting.

use crate::domain::{Pair, Position, Timeframe, TradeRecord};
use crate::liquidity::{FairValueGap, LiquiditySweep};
use crate::structure::MarketBias;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeBias {
    pub timeframe: Timeframe,
    pub bias: MarketBias,
}

/// Immutable copy of the engine state; safe to send to another thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub pair: Pair,
    /// Timestamp of the latest processed entry-timeframe candle.
    pub as_of: Option<DateTime<Utc>>,
    /// Bias used to gate entries.
    pub bias: MarketBias,
    pub timeframes: Vec<TimeframeBias>,
    pub last_sweep: Option<LiquiditySweep>,
    pub active_fvgs: Vec<FairValueGap>,
    pub position: Option<Position>,
    pub trade_count: usize,
    pub last_trade: Option<TradeRecord>,
    pub bars_processed: usize,
}

impl EngineSnapshot {
    pub fn is_in_position(&self) -> bool {
        self.position.is_some()
    }
}
