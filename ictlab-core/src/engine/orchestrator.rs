//! Multi-timeframe orchestration: drains a candle source into one engine.

use super::events::{BarOutcome, EngineEvent};
use super::source::CandleSource;
use super::strategy::StrategyEngine;
use crate::domain::CandleError;
use tracing::{debug, warn};

/// What a drained source produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrchestratorReport {
    /// Candles accepted by the engine.
    pub processed: usize,
    pub duplicates: usize,
    /// Rejected candles, in delivery order.
    pub errors: Vec<CandleError>,
    pub events: Vec<EngineEvent>,
}

pub struct Orchestrator<S: CandleSource> {
    source: S,
}

impl<S: CandleSource> Orchestrator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Feed every candle and collect all events. A malformed candle is
    /// recorded and skipped; it never stops the run.
    pub fn run(&mut self, engine: &mut StrategyEngine) -> OrchestratorReport {
        let mut events = Vec::new();
        let mut report = self.run_with(engine, |_, outcome| {
            events.extend_from_slice(outcome.events());
        });
        report.events = events;
        report
    }

    /// Like [`run`](Self::run) but hands each outcome to `on_bar` together
    /// with the engine, instead of collecting events.
    pub fn run_with<F>(&mut self, engine: &mut StrategyEngine, on_bar: F) -> OrchestratorReport
    where
        F: FnMut(&StrategyEngine, &BarOutcome),
    {
        self.run_observed(engine, on_bar, |_| {})
    }

    /// [`run_with`](Self::run_with) plus `on_error`, called for each
    /// rejected candle at the point the source delivered it.
    pub fn run_observed<F, E>(
        &mut self,
        engine: &mut StrategyEngine,
        mut on_bar: F,
        mut on_error: E,
    ) -> OrchestratorReport
    where
        F: FnMut(&StrategyEngine, &BarOutcome),
        E: FnMut(&CandleError),
    {
        let mut report = OrchestratorReport::default();
        while let Some((timeframe, candle)) = self.source.next_candle() {
            match engine.on_candle(timeframe, candle) {
                Ok(outcome) => {
                    if outcome.is_duplicate() {
                        report.duplicates += 1;
                    } else {
                        report.processed += 1;
                    }
                    on_bar(engine, &outcome);
                }
                Err(err) => {
                    warn!(%timeframe, error = %err, "candle skipped");
                    on_error(&err);
                    report.errors.push(err);
                }
            }
        }
        debug!(
            processed = report.processed,
            duplicates = report.duplicates,
            errors = report.errors.len(),
            "source drained"
        );
        report
    }

    pub fn into_source(self) -> S {
        self.source
    }
}
