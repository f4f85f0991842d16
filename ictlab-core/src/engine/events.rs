//! Events emitted by the engine for each processed candle.

use crate::domain::{ExitReason, Position, Timeframe, TradeRecord};
use crate::liquidity::{FairValueGap, LiquiditySweep};
use crate::signals::EntryCandidate;
use crate::structure::{MarketBias, StructureEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    BiasChanged {
        timeframe: Timeframe,
        from: MarketBias,
        to: MarketBias,
    },
    /// A BOS or CHoCH that was not present on the previous candle.
    Structure {
        timeframe: Timeframe,
        event: StructureEvent,
    },
    SweepDetected(LiquiditySweep),
    FvgCreated(FairValueGap),
    /// Pruned as filled or expired.
    FvgRemoved(FairValueGap),
    EntrySignal(EntryCandidate),
    PositionOpened(Position),
    /// The execution collaborator refused the entry; state is unchanged.
    EntryFailed {
        candidate: EntryCandidate,
        error: String,
    },
    StopTrailed {
        from: f64,
        to: f64,
    },
    PositionClosed(TradeRecord),
    /// The exit could not be executed; the position stays open.
    ExitFailed {
        price: f64,
        reason: ExitReason,
        error: String,
    },
}

impl EngineEvent {
    /// Short kind label for logs and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::BiasChanged { .. } => "bias_changed",
            EngineEvent::Structure { .. } => "structure",
            EngineEvent::SweepDetected(_) => "sweep_detected",
            EngineEvent::FvgCreated(_) => "fvg_created",
            EngineEvent::FvgRemoved(_) => "fvg_removed",
            EngineEvent::EntrySignal(_) => "entry_signal",
            EngineEvent::PositionOpened(_) => "position_opened",
            EngineEvent::EntryFailed { .. } => "entry_failed",
            EngineEvent::StopTrailed { .. } => "stop_trailed",
            EngineEvent::PositionClosed(_) => "position_closed",
            EngineEvent::ExitFailed { .. } => "exit_failed",
        }
    }
}

/// Result of feeding one candle to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum BarOutcome {
    Processed(Vec<EngineEvent>),
    /// Timestamp not newer than the last processed candle of its timeframe.
    Duplicate,
}

impl BarOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, BarOutcome::Duplicate)
    }

    pub fn events(&self) -> &[EngineEvent] {
        match self {
            BarOutcome::Processed(events) => events,
            BarOutcome::Duplicate => &[],
        }
    }

    pub fn into_events(self) -> Vec<EngineEvent> {
        match self {
            BarOutcome::Processed(events) => events,
            BarOutcome::Duplicate => Vec::new(),
        }
    }
}
