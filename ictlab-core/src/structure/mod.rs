//! Market structure: swing points and bias classification.

pub mod classifier;
pub mod swing;

pub use classifier::{
    bias_from_moving_averages, bias_from_swings, classify_structure, BiasSource, MarketBias,
    StructureAnalysis, StructureEvent,
};
pub use swing::{detect_swings, prices_of, SwingKind, SwingPoint};

use serde::{Deserialize, Serialize};

/// Parameters for swing detection and bias classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Candles on each side a swing must dominate.
    pub swing_window: usize,
    /// Only swings inside the last `lookback_bars` candles feed the bias.
    pub lookback_bars: usize,
    pub fast_ma: usize,
    pub slow_ma: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            swing_window: 5,
            lookback_bars: 20,
            fast_ma: 20,
            slow_ma: 50,
        }
    }
}
