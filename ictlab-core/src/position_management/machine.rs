/// Position lifecycle state machine
///
/// `NoPosition → Open(Long|Short) → NoPosition`. The machine owns the single
/// position slot, trails the stop through a [`StopRatchet`], detects exits
/// on closing prices and appends a [`TradeRecord`] once an exit is filled.
use crate::domain::{Candle, ExitReason, Position, PositionSide, TradeRecord};
use crate::position_management::StopRatchet;
use crate::signals::EntryCandidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub trail_enabled: bool,
    /// Share of the initial risk, relative to the entry, kept between close and trailed stop.
    pub trail_ratio: f64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            trail_enabled: true,
            trail_ratio: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    NoPosition,
    Open(PositionSide),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("a {0:?} position is already open")]
    AlreadyOpen(PositionSide),

    #[error("no position is open")]
    NotOpen,
}

/// Exit level reached on a bar; executed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitSignal {
    pub side: PositionSide,
    pub price: f64,
    pub reason: ExitReason,
}

/// What happened to the open position on one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BarUpdate {
    /// `(previous, new)` stop when trailing tightened it.
    pub stop_moved: Option<(f64, f64)>,
    pub exit: Option<ExitSignal>,
}

#[derive(Debug, Clone)]
pub struct PositionStateMachine {
    config: PositionConfig,
    position: Option<Position>,
    ratchet: Option<StopRatchet>,
    trades: Vec<TradeRecord>,
}

impl PositionStateMachine {
    pub fn new(config: PositionConfig) -> Self {
        Self {
            config,
            position: None,
            ratchet: None,
            trades: Vec::new(),
        }
    }

    pub fn state(&self) -> PositionState {
        match &self.position {
            Some(p) => PositionState::Open(p.side),
            None => PositionState::NoPosition,
        }
    }

    pub fn is_open(&self) -> bool {
        self.position.is_some()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Open from a candidate after the entry fill is confirmed.
    ///
    /// The fill price becomes the entry; stop and target come from the
    /// candidate and the risk is re-measured from the fill.
    pub fn open(
        &mut self,
        candidate: &EntryCandidate,
        fill_price: f64,
        opened_at: DateTime<Utc>,
    ) -> Result<&Position, PositionError> {
        if let Some(p) = &self.position {
            return Err(PositionError::AlreadyOpen(p.side));
        }

        let side = candidate.side;
        self.ratchet = Some(StopRatchet::new(side, candidate.stop_loss));
        let position = self.position.insert(Position {
            side,
            entry_price: fill_price,
            stop_loss: candidate.stop_loss,
            initial_stop: candidate.stop_loss,
            take_profit: candidate.take_profit,
            risk_amount: (fill_price - candidate.stop_loss).abs(),
            opened_at,
            trail_enabled: self.config.trail_enabled,
            trail_ratio: self.config.trail_ratio,
            bars_held: 0,
            source_fvg: Some(candidate.fvg_created_at),
        });
        Ok(&*position)
    }

    /// Trail the stop, then check target and stop against the close.
    ///
    /// The position is not closed here: the caller executes the returned
    /// exit and confirms it with [`close`](Self::close).
    pub fn on_bar(&mut self, candle: &Candle) -> BarUpdate {
        let mut update = BarUpdate::default();
        let (Some(position), Some(ratchet)) = (self.position.as_mut(), self.ratchet.as_mut())
        else {
            return update;
        };
        position.bars_held += 1;

        let close = candle.close;
        if position.trail_enabled {
            if let Some(proposed) = trailing_proposal(position, close) {
                if let Some((from, to)) = ratchet.tighten(proposed) {
                    position.stop_loss = to;
                    update.stop_moved = Some((from, to));
                }
            }
        }

        let stop_reason = if position.stop_trailed() {
            ExitReason::TrailingStop
        } else {
            ExitReason::StopLoss
        };
        let exit = match position.side {
            PositionSide::Long if close >= position.take_profit => {
                Some((position.take_profit, ExitReason::TakeProfit))
            }
            PositionSide::Long if close <= position.stop_loss => {
                Some((position.stop_loss, stop_reason))
            }
            PositionSide::Short if close <= position.take_profit => {
                Some((position.take_profit, ExitReason::TakeProfit))
            }
            PositionSide::Short if close >= position.stop_loss => {
                Some((position.stop_loss, stop_reason))
            }
            _ => None,
        };

        update.exit = exit.map(|(price, reason)| ExitSignal {
            side: position.side,
            price,
            reason,
        });
        update
    }

    /// Record the confirmed exit and return to `NoPosition`.
    pub fn close(
        &mut self,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        reason: ExitReason,
    ) -> Result<TradeRecord, PositionError> {
        let position = self.position.take().ok_or(PositionError::NotOpen)?;
        self.ratchet = None;
        let record = TradeRecord::from_position(&position, exit_time, exit_price, reason);
        self.trades.push(record.clone());
        Ok(record)
    }
}

/// Tighter stop for a position in profit at `close`, if any.
fn trailing_proposal(position: &Position, close: f64) -> Option<f64> {
    if position.entry_price <= 0.0 {
        return None;
    }
    let distance = position.trail_ratio * position.risk_amount / position.entry_price;
    match position.side {
        PositionSide::Long if close > position.entry_price => Some(close * (1.0 - distance)),
        PositionSide::Short if close < position.entry_price => Some(close * (1.0 + distance)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TradeOutcome;
    use crate::indicators::{assert_approx, candle_at, test_epoch};

    fn candidate(side: PositionSide, entry: f64, stop: f64, target: f64) -> EntryCandidate {
        EntryCandidate {
            side,
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
            risk_amount: (entry - stop).abs(),
            reward_to_risk: (target - entry).abs() / (entry - stop).abs(),
            fvg_created_at: test_epoch(),
            timestamp: test_epoch(),
        }
    }

    fn bar(i: usize, close: f64) -> Candle {
        candle_at(i, close, close + 0.5, close - 0.5, close)
    }

    #[test]
    fn open_only_from_no_position() {
        let mut machine = PositionStateMachine::new(PositionConfig::default());
        assert_eq!(machine.state(), PositionState::NoPosition);

        let c = candidate(PositionSide::Long, 100.0, 98.0, 104.0);
        machine.open(&c, 100.0, test_epoch()).unwrap();
        assert_eq!(machine.state(), PositionState::Open(PositionSide::Long));
        assert_eq!(
            machine.open(&c, 100.0, test_epoch()).unwrap_err(),
            PositionError::AlreadyOpen(PositionSide::Long)
        );
    }

    #[test]
    fn long_take_profit_is_a_win() {
        let mut machine = PositionStateMachine::new(PositionConfig {
            trail_enabled: false,
            ..PositionConfig::default()
        });
        machine
            .open(&candidate(PositionSide::Long, 100.0, 98.0, 104.0), 100.0, test_epoch())
            .unwrap();

        assert!(machine.on_bar(&bar(1, 102.0)).exit.is_none());
        let exit = machine.on_bar(&bar(2, 104.5)).exit.unwrap();
        assert_eq!(exit.reason, ExitReason::TakeProfit);
        assert_eq!(exit.price, 104.0);

        let record = machine.close(bar(2, 104.5).timestamp, exit.price, exit.reason).unwrap();
        assert_eq!(record.outcome, TradeOutcome::Win);
        assert_approx(record.pnl_percent, 4.0, 1e-9);
        assert_eq!(record.bars_held, 2);
        assert_eq!(machine.state(), PositionState::NoPosition);
        assert_eq!(machine.trades().len(), 1);
    }

    #[test]
    fn short_stop_loss_is_a_loss() {
        let mut machine = PositionStateMachine::new(PositionConfig::default());
        machine
            .open(&candidate(PositionSide::Short, 100.0, 102.0, 96.0), 100.0, test_epoch())
            .unwrap();

        let exit = machine.on_bar(&bar(1, 102.5)).exit.unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
        assert_eq!(exit.price, 102.0);
        let record = machine.close(test_epoch(), exit.price, exit.reason).unwrap();
        assert_eq!(record.outcome, TradeOutcome::Loss);
        assert_approx(record.pnl_percent, -2.0, 1e-9);
    }

    #[test]
    fn trailing_tightens_long_stop_and_never_loosens() {
        let mut machine = PositionStateMachine::new(PositionConfig::default());
        machine
            .open(&candidate(PositionSide::Long, 100.0, 98.0, 110.0), 100.0, test_epoch())
            .unwrap();

        // 101 * (1 - 0.8 * 2 / 100) = 99.384
        let update = machine.on_bar(&bar(1, 101.0));
        let (previous, stop) = update.stop_moved.unwrap();
        assert_eq!(previous, 98.0);
        assert_approx(stop, 99.384, 1e-9);

        // Pullback to 100.5 proposes 98.892: blocked.
        let update = machine.on_bar(&bar(2, 100.5));
        assert!(update.stop_moved.is_none());
        assert_approx(machine.position().unwrap().stop_loss, 99.384, 1e-9);

        // Close below the trailed stop exits as a trailing stop.
        let exit = machine.on_bar(&bar(3, 99.3)).exit.unwrap();
        assert_eq!(exit.reason, ExitReason::TrailingStop);
        assert_approx(exit.price, 99.384, 1e-9);
        let record = machine.close(test_epoch(), exit.price, exit.reason).unwrap();
        assert_eq!(record.outcome, TradeOutcome::Loss);
    }

    #[test]
    fn trailing_short_moves_stop_down() {
        let mut machine = PositionStateMachine::new(PositionConfig::default());
        machine
            .open(&candidate(PositionSide::Short, 100.0, 102.0, 90.0), 100.0, test_epoch())
            .unwrap();
        machine.on_bar(&bar(1, 98.0));
        // 98 * (1 + 0.016) = 99.568
        assert_approx(machine.position().unwrap().stop_loss, 99.568, 1e-9);
    }

    #[test]
    fn flat_exit_at_breakeven() {
        let mut machine = PositionStateMachine::new(PositionConfig::default());
        machine
            .open(&candidate(PositionSide::Long, 100.0, 98.0, 104.0), 100.0, test_epoch())
            .unwrap();
        let record = machine
            .close(test_epoch(), 100.0, ExitReason::TrailingStop)
            .unwrap();
        assert_eq!(record.outcome, TradeOutcome::Flat);
    }

    #[test]
    fn close_without_position_errors() {
        let mut machine = PositionStateMachine::new(PositionConfig::default());
        assert_eq!(
            machine
                .close(test_epoch(), 100.0, ExitReason::StopLoss)
                .unwrap_err(),
            PositionError::NotOpen
        );
        assert_eq!(machine.on_bar(&bar(1, 100.0)), BarUpdate::default());
    }
}
