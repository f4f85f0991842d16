//! Candle delivery capability.

use crate::domain::{Candle, Timeframe};
use std::cmp::Reverse;
use std::collections::VecDeque;
use std::sync::mpsc::Receiver;

/// Yields closed candles, one at a time, in the order the engine should see them.
pub trait CandleSource {
    fn next_candle(&mut self) -> Option<(Timeframe, Candle)>;
}

/// Historical replay over several timeframes.
///
/// Candles are merged by close time (`open + duration`). When a higher and a
/// lower timeframe close at the same instant the higher one is delivered
/// first, so the entry timeframe always sees the freshest bias.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    queue: VecDeque<(Timeframe, Candle)>,
}

impl ReplaySource {
    pub fn new(series: Vec<(Timeframe, Vec<Candle>)>) -> Self {
        let mut all: Vec<(Timeframe, Candle)> = series
            .into_iter()
            .flat_map(|(tf, candles)| candles.into_iter().map(move |c| (tf, c)))
            .collect();
        all.sort_by_key(|(tf, c)| (c.timestamp + tf.duration(), Reverse(*tf)));
        Self { queue: all.into() }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl CandleSource for ReplaySource {
    fn next_candle(&mut self) -> Option<(Timeframe, Candle)> {
        self.queue.pop_front()
    }
}

/// Push-style delivery from another thread. Ends when every sender is dropped.
pub struct ChannelSource {
    rx: Receiver<(Timeframe, Candle)>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<(Timeframe, Candle)>) -> Self {
        Self { rx }
    }
}

impl CandleSource for ChannelSource {
    fn next_candle(&mut self) -> Option<(Timeframe, Candle)> {
        self.rx.recv().ok()
    }
}
