//! ictlab runner: historical replay and multi-pair backtests on top of
//! `ictlab-core`.
//!
//! - Candle CSV loading and deterministic synthetic candles
//! - Single-pair replay through the core orchestrator
//! - Performance summary over closed trades
//! - Multi-pair runs on rayon with a status aggregator thread
//! - CSV/JSON artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod multi;
pub mod runner;
pub mod status;
pub mod synthetic;

pub use config::{BacktestConfig, ConfigError, PairRun, RunId};
pub use data_loader::{load_candles_csv, load_pair_series, write_candles_csv, LoadError};
pub use metrics::PerformanceSummary;
pub use multi::{run_from_files, run_multi, run_synthetic, MultiRunReport, PairOutcome, Series};
pub use runner::{run_pair, PairResult, RunError, SCHEMA_VERSION};
pub use status::{PairEvent, PairState, PairStatus, StatusAggregator, StatusBoard};
pub use synthetic::{generate_candles, generate_series};
