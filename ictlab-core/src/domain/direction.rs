use super::PositionSide;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bullish or bearish orientation of a sweep, gap or structure event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    /// Position side that trades with this direction.
    pub fn side(self) -> PositionSide {
        match self {
            Direction::Bullish => PositionSide::Long,
            Direction::Bearish => PositionSide::Short,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => f.write_str("bullish"),
            Direction::Bearish => f.write_str("bearish"),
        }
    }
}
