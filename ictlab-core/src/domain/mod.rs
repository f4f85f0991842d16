//! Domain types for ictlab

pub mod candle;
pub mod direction;
pub mod position;
pub mod timeframe;
pub mod trade;

pub use candle::{Candle, CandleError};
pub use direction::Direction;
pub use position::{pnl_percent, Position, PositionSide};
pub use timeframe::Timeframe;
pub use trade::{ExitReason, TradeOutcome, TradeRecord};

/// Trading pair symbol (e.g. "BTCUSDT").
pub type Pair = String;
