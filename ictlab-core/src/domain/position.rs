use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for longs, -1 for shorts.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

/// The single live position slot of an engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: f64,
    pub stop_loss: f64,
    /// Stop level at entry; `stop_loss` diverges from it once trailing tightens.
    pub initial_stop: f64,
    pub take_profit: f64,
    /// |entry_price - initial stop|, fixed at entry.
    pub risk_amount: f64,
    pub opened_at: DateTime<Utc>,
    pub trail_enabled: bool,
    pub trail_ratio: f64,
    pub bars_held: usize,
    /// Creation time of the fair value gap that produced the entry.
    pub source_fvg: Option<DateTime<Utc>>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == PositionSide::Short
    }

    /// Unrealized return in percent at `price`.
    pub fn unrealized_pct(&self, price: f64) -> f64 {
        pnl_percent(self.side, self.entry_price, price)
    }

    /// True once trailing has moved the stop away from its entry level.
    pub fn stop_trailed(&self) -> bool {
        self.stop_loss != self.initial_stop
    }
}

/// Signed percent return of a round trip.
pub fn pnl_percent(side: PositionSide, entry: f64, exit: f64) -> f64 {
    if entry == 0.0 {
        return 0.0;
    }
    side.sign() * (exit - entry) / entry * 100.0
}
