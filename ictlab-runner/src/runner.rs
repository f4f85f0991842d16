//! Single-pair backtest: replays historical candles through one engine.
//!
//! The replay goes through the same [`Orchestrator`] a live feed would use,
//! with [`PaperExecution`] filling every intent at its requested price.

use std::collections::BTreeMap;
use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use ictlab_core::domain::{Candle, Timeframe, TradeRecord};
use ictlab_core::engine::{
    ConfigError as EngineConfigError, EngineConfig, EngineSnapshot, Orchestrator, ReplaySource,
    StrategyEngine,
};
use ictlab_core::execution::PaperExecution;

use crate::data_loader::LoadError;
use crate::metrics::PerformanceSummary;
use crate::status::PairEvent;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("engine config error: {0}")]
    Config(#[from] EngineConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one pair's backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub pair: String,
    pub summary: PerformanceSummary,
    pub trades: Vec<TradeRecord>,
    pub final_snapshot: EngineSnapshot,
    /// Candles accepted by the engine, all timeframes.
    pub candles_processed: usize,
    pub duplicates: usize,
    /// Candles the engine refused as malformed or untracked.
    pub rejected: usize,
    /// Event count per [`EngineEvent::kind`](ictlab_core::engine::EngineEvent::kind).
    pub event_counts: BTreeMap<String, usize>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Replay `series` through a fresh engine built from `config`.
///
/// With a `status` channel, every engine event and every rejected candle is
/// published as it happens, with a snapshot at the end of each bar that
/// produced events and a final snapshot. A closed channel is not an error.
pub fn run_pair(
    config: &EngineConfig,
    series: Vec<(Timeframe, Vec<Candle>)>,
    status: Option<&Sender<PairEvent>>,
) -> Result<PairResult, RunError> {
    let mut engine = StrategyEngine::new(config.clone(), Box::new(PaperExecution::new()))?;
    let pair = config.pair.clone();
    let publish = |event: PairEvent| {
        if let Some(tx) = status {
            let _ = tx.send(event);
        }
    };

    let mut event_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut orchestrator = Orchestrator::new(ReplaySource::new(series));
    let report = orchestrator.run_observed(
        &mut engine,
        |engine, outcome| {
            let events = outcome.events();
            for event in events {
                *event_counts.entry(event.kind().to_string()).or_default() += 1;
                publish(PairEvent::Engine {
                    pair: pair.clone(),
                    event: event.clone(),
                });
            }
            if !events.is_empty() {
                publish(PairEvent::Snapshot(Box::new(engine.snapshot())));
            }
        },
        |error| {
            publish(PairEvent::Rejected {
                pair: pair.clone(),
                error: error.to_string(),
            })
        },
    );

    let final_snapshot = engine.snapshot();
    publish(PairEvent::Snapshot(Box::new(final_snapshot.clone())));

    let trades = engine.trades().to_vec();
    let summary = PerformanceSummary::compute(&trades);
    info!(
        %pair,
        candles = report.processed,
        trades = summary.trade_count,
        win_rate = summary.win_rate,
        "backtest complete"
    );

    Ok(PairResult {
        schema_version: SCHEMA_VERSION,
        pair,
        summary,
        trades,
        final_snapshot,
        candles_processed: report.processed,
        duplicates: report.duplicates,
        rejected: report.errors.len(),
        event_counts,
    })
}
