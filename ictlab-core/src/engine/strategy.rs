//! The strategy engine: one instance per pair, fed one closed candle at a time.
//!
//! Higher-timeframe candles refresh structure and bias. Each entry-timeframe
//! candle runs, in order:
//!
//! 1. position management (trail, then target/stop on the close)
//! 2. gap creation for a sweep whose third candle just closed
//! 3. sweep detection, gated by bias
//! 4. entry evaluation, only with no position and none closed this bar
//! 5. gap ageing, fill checks and pruning
//!
//! Entries therefore see gaps before this bar's fill check, and a gap created
//! on this bar is first tradable on the next one.

use super::config::{ConfigError, EngineConfig};
use super::context::TimeframeContext;
use super::events::{BarOutcome, EngineEvent};
use super::session::SessionFilter;
use super::snapshot::{EngineSnapshot, TimeframeBias};
use crate::domain::{Candle, CandleError, Position, Timeframe, TradeRecord};
use crate::execution::ExecutionHandler;
use crate::liquidity::{FairValueGap, FvgTracker, LiquiditySweep, SweepDetector};
use crate::position_management::{PositionState, PositionStateMachine, TradeIntent};
use crate::signals::EntrySignalGenerator;
use crate::structure::{MarketBias, StructureAnalysis};
use chrono::{DateTime, Utc};
use std::iter;
use tracing::{debug, info, info_span, warn, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Bias,
    Confirm,
    Entry,
}

pub struct StrategyEngine {
    config: EngineConfig,
    span: Span,
    bias_ctx: TimeframeContext,
    confirm_ctx: Option<TimeframeContext>,
    entry_ctx: TimeframeContext,
    session: Option<SessionFilter>,
    sweeps: SweepDetector,
    fvgs: FvgTracker,
    signals: EntrySignalGenerator,
    positions: PositionStateMachine,
    executor: Box<dyn ExecutionHandler>,
    bars_processed: usize,
}

impl StrategyEngine {
    /// Validate `config` and build an idle engine.
    pub fn new(
        config: EngineConfig,
        executor: Box<dyn ExecutionHandler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let session = config
            .session
            .as_ref()
            .map(SessionFilter::from_config)
            .transpose()?;
        let max_bars = config.history.max_bars;
        let tfs = &config.timeframes;

        Ok(Self {
            span: info_span!("engine", pair = %config.pair),
            bias_ctx: TimeframeContext::new(tfs.bias, max_bars),
            confirm_ctx: tfs.confirm.map(|tf| TimeframeContext::new(tf, max_bars)),
            entry_ctx: TimeframeContext::new(tfs.entry, max_bars),
            session,
            sweeps: SweepDetector::new(config.sweep.clone()),
            fvgs: FvgTracker::new(config.fvg.clone()),
            signals: EntrySignalGenerator::new(config.entry.clone()),
            positions: PositionStateMachine::new(config.position.clone()),
            executor,
            bars_processed: 0,
            config,
        })
    }

    /// Emit all events inside `span` instead of the default `engine{pair}` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Feed one closed candle.
    ///
    /// A candle not newer than the last one of its timeframe is a no-op
    /// (`BarOutcome::Duplicate`). A malformed candle is rejected and leaves
    /// every piece of state untouched.
    pub fn on_candle(
        &mut self,
        timeframe: Timeframe,
        candle: Candle,
    ) -> Result<BarOutcome, CandleError> {
        let span = self.span.clone();
        let _guard = span.enter();

        let Some(role) = self.role_of(timeframe) else {
            warn!(%timeframe, "candle for untracked timeframe");
            return Err(CandleError::UnknownTimeframe(timeframe.to_string()));
        };
        if let Err(err) = candle.validate() {
            warn!(%timeframe, error = %err, "rejected malformed candle");
            return Err(err);
        }

        let stale = match role {
            Role::Bias => self.bias_ctx.is_stale(&candle),
            Role::Confirm => self
                .confirm_ctx
                .as_ref()
                .is_some_and(|ctx| ctx.is_stale(&candle)),
            Role::Entry => self.entry_ctx.is_stale(&candle),
        };
        if stale {
            debug!(%timeframe, timestamp = %candle.timestamp, "duplicate candle ignored");
            return Ok(BarOutcome::Duplicate);
        }

        self.bars_processed += 1;
        let events = match role {
            Role::Bias | Role::Confirm => self.on_structure_candle(role, candle),
            Role::Entry => self.on_entry_candle(candle),
        };
        Ok(BarOutcome::Processed(events))
    }

    fn role_of(&self, timeframe: Timeframe) -> Option<Role> {
        let tfs = &self.config.timeframes;
        if timeframe == tfs.entry {
            Some(Role::Entry)
        } else if timeframe == tfs.bias {
            Some(Role::Bias)
        } else if tfs.confirm == Some(timeframe) {
            Some(Role::Confirm)
        } else {
            None
        }
    }

    // ── Higher timeframes ──

    fn on_structure_candle(&mut self, role: Role, candle: Candle) -> Vec<EngineEvent> {
        let ctx = match role {
            Role::Confirm => match self.confirm_ctx.as_mut() {
                Some(ctx) => ctx,
                None => return Vec::new(),
            },
            _ => &mut self.bias_ctx,
        };
        ctx.push(candle);
        let previous = ctx.reclassify(&self.config.structure);
        let current = ctx.analysis();
        let timeframe = ctx.timeframe();

        let mut events = Vec::new();
        if previous.bias != current.bias {
            info!(%timeframe, from = %previous.bias, to = %current.bias, "bias changed");
            events.push(EngineEvent::BiasChanged {
                timeframe,
                from: previous.bias,
                to: current.bias,
            });
        }
        for event in current.events() {
            if !previous.events().any(|prev| prev.same_break(event)) {
                info!(%timeframe, ?event, "structure event");
                events.push(EngineEvent::Structure {
                    timeframe,
                    event: *event,
                });
            }
        }
        events
    }

    // ── Entry timeframe ──

    fn on_entry_candle(&mut self, candle: Candle) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let index = self.entry_ctx.push(candle);
        self.entry_ctx.reclassify(&self.config.structure);
        debug!(index, close = candle.close, "entry candle");

        let closed = self.manage_position(&candle, &mut events);
        self.complete_pending_gap(index, &mut events);

        let bias = self.bias();
        let ctx = &self.entry_ctx;
        if let Some(sweep) = self.sweeps.observe(ctx.candles(), ctx.base_index(), bias) {
            info!(
                direction = %sweep.direction,
                level = sweep.swept_level,
                extreme = sweep.extreme,
                "liquidity sweep"
            );
            events.push(EngineEvent::SweepDetected(sweep));
        }

        if !closed && !self.positions.is_open() && self.session_allows(candle.timestamp) {
            self.try_enter(&candle, bias, &mut events);
        }

        for gap in self.fvgs.update(&candle) {
            debug!(
                direction = %gap.direction,
                filled = gap.filled,
                age = gap.age_in_bars,
                "fvg removed"
            );
            events.push(EngineEvent::FvgRemoved(gap));
        }
        events
    }

    /// Returns true when the position was closed on this bar.
    fn manage_position(&mut self, candle: &Candle, events: &mut Vec<EngineEvent>) -> bool {
        if !self.positions.is_open() {
            return false;
        }

        let update = self.positions.on_bar(candle);
        if let Some((from, to)) = update.stop_moved {
            debug!(from, to, "stop trailed");
            events.push(EngineEvent::StopTrailed { from, to });
        }
        let Some(exit) = update.exit else {
            return false;
        };

        let intent = TradeIntent::ClosePosition {
            side: exit.side,
            price: exit.price,
            reason: exit.reason,
        };
        let fill = match self.executor.execute(&intent, candle.timestamp) {
            Ok(fill) => fill,
            Err(err) => {
                warn!(
                    executor = self.executor.name(),
                    error = %err,
                    reason = ?exit.reason,
                    "exit not filled, position stays open"
                );
                events.push(EngineEvent::ExitFailed {
                    price: exit.price,
                    reason: exit.reason,
                    error: err.to_string(),
                });
                return false;
            }
        };

        match self.positions.close(fill.timestamp, fill.price, exit.reason) {
            Ok(trade) => {
                info!(
                    side = ?trade.side,
                    exit = trade.exit_price,
                    reason = ?trade.exit_reason,
                    pnl_pct = trade.pnl_percent,
                    outcome = ?trade.outcome,
                    "position closed"
                );
                events.push(EngineEvent::PositionClosed(trade));
                true
            }
            Err(err) => {
                warn!(error = %err, "exit fill without open position");
                false
            }
        }
    }

    /// Build the gap for the retained sweep once its third candle has closed.
    fn complete_pending_gap(&mut self, index: usize, events: &mut Vec<EngineEvent>) {
        let Some(sweep) = self.sweeps.pending().copied() else {
            return;
        };
        if index < sweep.index + 2 {
            return;
        }
        self.sweeps.consume();
        if index > sweep.index + 2 {
            return;
        }

        let ctx = &self.entry_ctx;
        let triple = match (
            ctx.get(sweep.index),
            ctx.get(sweep.index + 1),
            ctx.get(sweep.index + 2),
        ) {
            (Some(a), Some(b), Some(c)) => [*a, *b, *c],
            _ => return,
        };

        match self.fvgs.try_create(&sweep, &triple) {
            Some(gap) => {
                info!(
                    direction = %gap.direction,
                    top = gap.top,
                    bottom = gap.bottom,
                    size_ratio = gap.size_ratio,
                    "fvg created"
                );
                events.push(EngineEvent::FvgCreated(gap));
            }
            None => debug!(direction = %sweep.direction, "no qualifying fvg after sweep"),
        }
    }

    fn try_enter(&mut self, candle: &Candle, bias: MarketBias, events: &mut Vec<EngineEvent>) {
        let ts = candle.timestamp;
        let candles = self.entry_ctx.candles();
        let prior = &candles[..candles.len().saturating_sub(1)];
        let history = &prior[prior.len().saturating_sub(self.config.sweep.lookback)..];

        let eligible = self.fvgs.active().filter(|gap| gap.created_at < ts);
        let Some(candidate) = self.signals.evaluate(candle, eligible, bias, history) else {
            return;
        };
        info!(
            side = ?candidate.side,
            entry = candidate.entry_price,
            stop = candidate.stop_loss,
            target = candidate.take_profit,
            rr = candidate.reward_to_risk,
            "entry signal"
        );
        events.push(EngineEvent::EntrySignal(candidate));

        let intent = TradeIntent::open(&candidate);
        let fill = match self.executor.execute(&intent, ts) {
            Ok(fill) => fill,
            Err(err) => {
                warn!(executor = self.executor.name(), error = %err, "entry not filled");
                events.push(EngineEvent::EntryFailed {
                    candidate,
                    error: err.to_string(),
                });
                return;
            }
        };

        match self.positions.open(&candidate, fill.price, fill.timestamp) {
            Ok(position) => {
                let position = position.clone();
                self.fvgs.mark_retested(candidate.fvg_created_at);
                info!(side = ?position.side, price = position.entry_price, "position opened");
                events.push(EngineEvent::PositionOpened(position));
            }
            Err(err) => warn!(error = %err, "entry fill rejected by position state"),
        }
    }

    fn session_allows(&self, at: DateTime<Utc>) -> bool {
        self.session.as_ref().map_or(true, |s| s.allows(at))
    }

    // ── Read-only state ──

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pair(&self) -> &str {
        &self.config.pair
    }

    /// Bias that gates sweeps and entries. With a confirmation timeframe the
    /// two higher timeframes must agree, otherwise it is `Neutral`.
    pub fn bias(&self) -> MarketBias {
        let bias = self.bias_ctx.bias();
        match &self.confirm_ctx {
            Some(confirm) if confirm.bias() != bias => MarketBias::Neutral,
            _ => bias,
        }
    }

    fn contexts(&self) -> impl Iterator<Item = &TimeframeContext> {
        iter::once(&self.bias_ctx)
            .chain(self.confirm_ctx.iter())
            .chain(iter::once(&self.entry_ctx))
    }

    /// Latest structure analysis of a tracked timeframe.
    pub fn analysis(&self, timeframe: Timeframe) -> Option<&StructureAnalysis> {
        self.contexts()
            .find(|ctx| ctx.timeframe() == timeframe)
            .map(|ctx| ctx.analysis())
    }

    pub fn position(&self) -> Option<&Position> {
        self.positions.position()
    }

    pub fn position_state(&self) -> PositionState {
        self.positions.state()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        self.positions.trades()
    }

    pub fn active_fvgs(&self) -> impl Iterator<Item = &FairValueGap> {
        self.fvgs.active()
    }

    pub fn last_sweep(&self) -> Option<&LiquiditySweep> {
        self.sweeps.last()
    }

    /// Candles accepted so far, all timeframes.
    pub fn bars_processed(&self) -> usize {
        self.bars_processed
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            pair: self.config.pair.clone(),
            as_of: self.entry_ctx.last_timestamp(),
            bias: self.bias(),
            timeframes: self
                .contexts()
                .map(|ctx| TimeframeBias {
                    timeframe: ctx.timeframe(),
                    bias: ctx.bias(),
                })
                .collect(),
            last_sweep: self.sweeps.last().copied(),
            active_fvgs: self.fvgs.active().copied().collect(),
            position: self.positions.position().cloned(),
            trade_count: self.positions.trades().len(),
            last_trade: self.positions.trades().last().cloned(),
            bars_processed: self.bars_processed,
        }
    }
}
