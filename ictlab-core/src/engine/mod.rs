//! Strategy engine: per-pair state over several timeframes.
//!
//! - `config`: validated engine configuration
//! - `session`: optional kill-zone filter for new entries
//! - `context`: bounded per-timeframe history and structure
//! - `strategy`: the engine itself
//! - `source` / `orchestrator`: candle delivery and the drive loop

pub mod config;
pub mod context;
pub mod events;
pub mod orchestrator;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod strategy;

pub use config::{ConfigError, EngineConfig, HistoryConfig, TimeframeConfig};
pub use context::TimeframeContext;
pub use events::{BarOutcome, EngineEvent};
pub use orchestrator::{Orchestrator, OrchestratorReport};
pub use session::{KillZoneWindow, SessionConfig, SessionFilter};
pub use snapshot::{EngineSnapshot, TimeframeBias};
pub use source::{CandleSource, ChannelSource, ReplaySource};
pub use strategy::StrategyEngine;
