//! Multi-pair backtests: one engine per pair on the rayon pool.
//!
//! Engines share nothing. Each publishes [`PairEvent`]s through its own
//! clone of the sender; the [`StatusAggregator`] thread is the only owner of
//! the [`StatusBoard`].

use std::sync::mpsc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::info;

use ictlab_core::domain::{Candle, Timeframe};

use crate::config::{BacktestConfig, PairRun, RunId};
use crate::data_loader::{load_pair_series, LoadError};
use crate::runner::{run_pair, PairResult, RunError};
use crate::status::{PairEvent, StatusAggregator, StatusBoard};
use crate::synthetic::generate_series;

/// Candle series of every timeframe one pair consumes.
pub type Series = Vec<(Timeframe, Vec<Candle>)>;

#[derive(Debug)]
pub struct PairOutcome {
    pub pair: String,
    pub result: Result<PairResult, RunError>,
}

#[derive(Debug)]
pub struct MultiRunReport {
    pub run_id: RunId,
    /// In config order.
    pub results: Vec<PairOutcome>,
    pub board: StatusBoard,
}

impl MultiRunReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &PairResult> {
        self.results.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &RunError)> {
        self.results
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.pair.as_str(), e)))
    }
}

/// Run every pair of `config` in parallel, fetching candles with `load`.
///
/// A pair whose data fails to load or whose engine config is invalid is
/// reported in its [`PairOutcome`]; other pairs are unaffected. Only a
/// failure to start the aggregator thread is an error.
pub fn run_multi<F>(config: &BacktestConfig, load: F) -> std::io::Result<MultiRunReport>
where
    F: Fn(&PairRun) -> Result<Series, LoadError> + Sync,
{
    let run_id = config.run_id();
    info!(run_id = %run_id, pairs = config.pairs.len(), "starting multi-pair run");

    let (tx, rx) = mpsc::channel();
    let aggregator = StatusAggregator::spawn(rx)?;

    let results: Vec<PairOutcome> = config
        .pairs
        .par_iter()
        .map_with(tx, |tx, pair_run| {
            let pair = pair_run.pair().to_string();
            let _ = tx.send(PairEvent::Started { pair: pair.clone() });

            let result = load(pair_run)
                .map_err(RunError::from)
                .and_then(|series| run_pair(&pair_run.engine, series, Some(&*tx)));

            let _ = match &result {
                Ok(r) => tx.send(PairEvent::Finished {
                    pair: pair.clone(),
                    trades: r.trades.len(),
                }),
                Err(e) => tx.send(PairEvent::Failed {
                    pair: pair.clone(),
                    error: e.to_string(),
                }),
            };
            PairOutcome { pair, result }
        })
        .collect();

    // Every sender clone was dropped with the parallel iterator.
    let board = aggregator.join();
    Ok(MultiRunReport {
        run_id,
        results,
        board,
    })
}

/// Run with candles read from each pair's configured CSV files.
pub fn run_from_files(config: &BacktestConfig) -> std::io::Result<MultiRunReport> {
    run_multi(config, load_pair_series)
}

/// Run with deterministic synthetic candles, `entry_bars` per pair.
pub fn run_synthetic(
    config: &BacktestConfig,
    start: DateTime<Utc>,
    entry_bars: usize,
) -> std::io::Result<MultiRunReport> {
    run_multi(config, |pair_run| {
        Ok(generate_series(&pair_run.engine, start, entry_bars))
    })
}
