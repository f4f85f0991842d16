/// Trade intents handed to the execution collaborator
///
/// The position state machine never assumes a fill: it emits an intent and
/// only transitions once the collaborator confirms.
use crate::domain::{ExitReason, PositionSide};
use crate::signals::EntryCandidate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TradeIntent {
    OpenLong {
        entry: f64,
        stop_loss: f64,
        take_profit: f64,
    },
    OpenShort {
        entry: f64,
        stop_loss: f64,
        take_profit: f64,
    },
    /// Flatten the open position at `price`.
    ClosePosition {
        side: PositionSide,
        price: f64,
        reason: ExitReason,
    },
}

impl TradeIntent {
    pub fn open(candidate: &EntryCandidate) -> Self {
        match candidate.side {
            PositionSide::Long => TradeIntent::OpenLong {
                entry: candidate.entry_price,
                stop_loss: candidate.stop_loss,
                take_profit: candidate.take_profit,
            },
            PositionSide::Short => TradeIntent::OpenShort {
                entry: candidate.entry_price,
                stop_loss: candidate.stop_loss,
                take_profit: candidate.take_profit,
            },
        }
    }

    /// Requested execution price.
    pub fn price(&self) -> f64 {
        match *self {
            TradeIntent::OpenLong { entry, .. } | TradeIntent::OpenShort { entry, .. } => entry,
            TradeIntent::ClosePosition { price, .. } => price,
        }
    }

    pub fn is_entry(&self) -> bool {
        !matches!(self, TradeIntent::ClosePosition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_epoch;

    #[test]
    fn open_intent_follows_candidate_side() {
        let candidate = EntryCandidate {
            side: PositionSide::Short,
            entry_price: 99.2,
            stop_loss: 101.4,
            take_profit: 94.8,
            risk_amount: 2.2,
            reward_to_risk: 2.0,
            fvg_created_at: test_epoch(),
            timestamp: test_epoch(),
        };
        let intent = TradeIntent::open(&candidate);
        assert!(matches!(intent, TradeIntent::OpenShort { entry, .. } if entry == 99.2));
        assert!(intent.is_entry());
        assert_eq!(intent.price(), 99.2);
    }

    #[test]
    fn close_intent_price() {
        let intent = TradeIntent::ClosePosition {
            side: PositionSide::Long,
            price: 104.0,
            reason: ExitReason::TakeProfit,
        };
        assert!(!intent.is_entry());
        assert_eq!(intent.price(), 104.0);
    }
}
