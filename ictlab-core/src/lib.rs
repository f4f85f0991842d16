//! ictlab core: market-structure trading engine.
//!
//! This crate contains the pure, synchronous part of the system:
//! - Domain types (candles, timeframes, positions, trade records)
//! - Swing detection and market-structure bias (BOS / CHoCH)
//! - Liquidity sweeps and the fair value gaps they leave
//! - Entry signals and the single-slot position lifecycle with a ratcheting stop
//! - The per-pair strategy engine and its multi-timeframe orchestrator
//!
//! Nothing here performs I/O. Candles come in through `CandleSource`, fills
//! through `ExecutionHandler`.

pub mod domain;
pub mod engine;
pub mod execution;
pub mod indicators;
pub mod liquidity;
pub mod position_management;
pub mod signals;
pub mod structure;
