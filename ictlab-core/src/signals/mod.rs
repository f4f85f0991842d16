//! Entry signals.
//!
//! Signals only read market state (bias, gaps, candles). Whether a position
//! is already open is the caller's concern.

pub mod entry;

pub use entry::{EntryCandidate, EntryConfig, EntrySignalGenerator, TargetMode};
