//! Status aggregation for multi-pair runs.
//!
//! Each engine publishes [`PairEvent`]s over an `mpsc` channel. A single
//! aggregator thread owns the [`StatusBoard`]; engines never share state.

use ictlab_core::engine::{EngineEvent, EngineSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Messages from a pair's backtest to the aggregator.
#[derive(Debug, Clone)]
pub enum PairEvent {
    Started {
        pair: String,
    },
    Engine {
        pair: String,
        event: EngineEvent,
    },
    /// End-of-bar state after a bar that produced events.
    Snapshot(Box<EngineSnapshot>),
    /// A candle the engine refused.
    Rejected {
        pair: String,
        error: String,
    },
    Finished {
        pair: String,
        trades: usize,
    },
    Failed {
        pair: String,
        error: String,
    },
}

impl PairEvent {
    pub fn pair(&self) -> &str {
        match self {
            PairEvent::Started { pair }
            | PairEvent::Engine { pair, .. }
            | PairEvent::Rejected { pair, .. }
            | PairEvent::Finished { pair, .. }
            | PairEvent::Failed { pair, .. } => pair,
            PairEvent::Snapshot(snapshot) => &snapshot.pair,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum PairState {
    #[default]
    Running,
    Finished,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PairStatus {
    pub state: PairState,
    pub latest: Option<EngineSnapshot>,
    pub events: usize,
    pub trades: usize,
    pub errors: usize,
}

/// Latest known state of every pair in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusBoard {
    pairs: BTreeMap<String, PairStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: PairEvent) {
        let status = self.pairs.entry(event.pair().to_string()).or_default();
        match event {
            PairEvent::Started { .. } => status.state = PairState::Running,
            PairEvent::Engine { event, .. } => {
                status.events += 1;
                if matches!(event, EngineEvent::PositionClosed(_)) {
                    status.trades += 1;
                }
                if matches!(
                    event,
                    EngineEvent::EntryFailed { .. } | EngineEvent::ExitFailed { .. }
                ) {
                    status.errors += 1;
                }
            }
            PairEvent::Snapshot(snapshot) => status.latest = Some(*snapshot),
            PairEvent::Rejected { .. } => status.errors += 1,
            PairEvent::Finished { trades, .. } => {
                status.state = PairState::Finished;
                status.trades = trades;
            }
            PairEvent::Failed { error, .. } => {
                status.errors += 1;
                status.state = PairState::Failed(error);
            }
        }
    }

    pub fn get(&self, pair: &str) -> Option<&PairStatus> {
        self.pairs.get(pair)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &PairStatus)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Background thread folding [`PairEvent`]s into a [`StatusBoard`].
///
/// The thread exits once every sender is dropped.
pub struct StatusAggregator {
    handle: JoinHandle<StatusBoard>,
}

impl StatusAggregator {
    pub fn spawn(rx: Receiver<PairEvent>) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("ictlab-status".into())
            .spawn(move || aggregate(rx))?;
        Ok(Self { handle })
    }

    /// Wait for all senders to hang up and return the final board.
    pub fn join(self) -> StatusBoard {
        match self.handle.join() {
            Ok(board) => board,
            Err(_) => {
                warn!("status aggregator panicked; returning empty board");
                StatusBoard::default()
            }
        }
    }
}

fn aggregate(rx: Receiver<PairEvent>) -> StatusBoard {
    let mut board = StatusBoard::new();
    for event in rx {
        match &event {
            PairEvent::Finished { pair, trades } => info!(%pair, trades, "pair finished"),
            PairEvent::Failed { pair, error } => warn!(%pair, %error, "pair failed"),
            other => debug!(pair = other.pair(), "pair event"),
        }
        board.apply(event);
    }
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn board_tracks_lifecycle() {
        let mut board = StatusBoard::new();
        board.apply(PairEvent::Started {
            pair: "BTCUSDT".into(),
        });
        board.apply(PairEvent::Rejected {
            pair: "BTCUSDT".into(),
            error: "bad candle".into(),
        });
        board.apply(PairEvent::Finished {
            pair: "BTCUSDT".into(),
            trades: 3,
        });
        board.apply(PairEvent::Failed {
            pair: "ETHUSDT".into(),
            error: "missing file".into(),
        });

        let btc = board.get("BTCUSDT").unwrap();
        assert_eq!(btc.state, PairState::Finished);
        assert_eq!(btc.trades, 3);
        assert_eq!(btc.errors, 1);

        let eth = board.get("ETHUSDT").unwrap();
        assert_eq!(eth.state, PairState::Failed("missing file".into()));
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn aggregator_drains_until_senders_drop() {
        let (tx, rx) = mpsc::channel();
        let aggregator = StatusAggregator::spawn(rx).unwrap();

        let workers: Vec<_> = ["A", "B"]
            .into_iter()
            .map(|pair| {
                let tx = tx.clone();
                thread::spawn(move || {
                    let _ = tx.send(PairEvent::Started { pair: pair.into() });
                    let _ = tx.send(PairEvent::Finished {
                        pair: pair.into(),
                        trades: 1,
                    });
                })
            })
            .collect();
        drop(tx);
        for w in workers {
            w.join().unwrap();
        }

        let board = aggregator.join();
        assert_eq!(board.len(), 2);
        assert!(board.pairs().all(|(_, s)| s.state == PairState::Finished));
    }
}
