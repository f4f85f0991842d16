//! Candle CSV loading and writing.
//!
//! Files carry one closed candle per row with a header:
//! `timestamp,open,high,low,close,volume`, where `timestamp` is the candle
//! open time in milliseconds since the Unix epoch (the exchange kline
//! convention). Rows must be strictly increasing in time and every candle
//! must pass [`Candle::validate`].

use chrono::{TimeZone, Utc};
use ictlab_core::domain::{Candle, CandleError, Timeframe};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, PairRun};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: timestamp {millis} is out of range")]
    InvalidTimestamp { row: usize, millis: i64 },

    #[error("row {row}: {source}")]
    Malformed {
        row: usize,
        #[source]
        source: CandleError,
    },

    #[error("row {row}: timestamp not after the previous row")]
    OutOfOrder { row: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Wire form of one CSV row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CandleRow {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl From<&Candle> for CandleRow {
    fn from(c: &Candle) -> Self {
        Self {
            timestamp: c.timestamp.timestamp_millis(),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        }
    }
}

/// Parse candles from any CSV reader. Row numbers in errors are 1-based
/// data rows (the header is not counted).
pub fn read_candles<R: Read>(reader: R) -> Result<Vec<Candle>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles: Vec<Candle> = Vec::new();

    for (i, record) in rdr.deserialize::<CandleRow>().enumerate() {
        let row = i + 1;
        let r = record?;
        let timestamp = Utc
            .timestamp_millis_opt(r.timestamp)
            .single()
            .ok_or(LoadError::InvalidTimestamp {
                row,
                millis: r.timestamp,
            })?;
        let candle = Candle::new(timestamp, r.open, r.high, r.low, r.close, r.volume);
        candle
            .validate()
            .map_err(|source| LoadError::Malformed { row, source })?;
        if candles.last().is_some_and(|prev| prev.timestamp >= timestamp) {
            return Err(LoadError::OutOfOrder { row });
        }
        candles.push(candle);
    }
    Ok(candles)
}

pub fn load_candles_csv(path: &Path) -> Result<Vec<Candle>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let candles = read_candles(file)?;
    debug!(path = %path.display(), count = candles.len(), "loaded candles");
    Ok(candles)
}

/// Write candles in the same format [`read_candles`] accepts.
pub fn write_candles<W: Write>(writer: W, candles: &[Candle]) -> Result<(), LoadError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for c in candles {
        wtr.serialize(CandleRow::from(c))?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: PathBuf::new(),
        source,
    })?;
    Ok(())
}

pub fn write_candles_csv(path: &Path, candles: &[Candle]) -> Result<(), LoadError> {
    let file = std::fs::File::create(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_candles(file, candles)
}

/// Load every configured timeframe of one pair.
pub fn load_pair_series(pair: &PairRun) -> Result<Vec<(Timeframe, Vec<Candle>)>, LoadError> {
    pair.data_paths()?
        .into_iter()
        .map(|(tf, path)| Ok((tf, load_candles_csv(path)?)))
        .collect()
}
