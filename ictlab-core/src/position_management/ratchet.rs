//! One-way stop level: longs only move up, shorts only move down.
use crate::domain::PositionSide;

/// Stop level that only ever tightens for its side.
///
/// ```
/// use ictlab_core::domain::PositionSide;
/// use ictlab_core::position_management::StopRatchet;
///
/// let mut stop = StopRatchet::new(PositionSide::Short, 102.0);
/// assert_eq!(stop.tighten(101.0), Some((102.0, 101.0)));
/// assert_eq!(stop.tighten(101.5), None);
/// assert_eq!(stop.level(), 101.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopRatchet {
    side: PositionSide,
    level: f64,
}

impl StopRatchet {
    pub fn new(side: PositionSide, level: f64) -> Self {
        Self { side, level }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Move to `proposed` if it is strictly tighter. Returns `(from, to)`
    /// on a move; a looser or equal proposal leaves the level untouched.
    pub fn tighten(&mut self, proposed: f64) -> Option<(f64, f64)> {
        let tighter = match self.side {
            PositionSide::Long => proposed > self.level,
            PositionSide::Short => proposed < self.level,
        };
        if !tighter {
            return None;
        }
        let from = std::mem::replace(&mut self.level, proposed);
        Some((from, proposed))
    }
}
