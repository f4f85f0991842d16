//! Liquidity concepts: sweeps of resting stops and the fair value gaps they leave.

pub mod fvg;
pub mod sweep;

pub use fvg::{FairValueGap, FillRule, FvgConfig, FvgTracker};
pub use sweep::{LiquiditySweep, SweepConfig, SweepDetector};
