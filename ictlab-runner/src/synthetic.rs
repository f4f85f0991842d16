//! Deterministic synthetic candles for demos and tests.
//!
//! The base series is a random walk seeded from BLAKE3 of the pair and
//! timeframe, so the same request always yields the same candles. Higher
//! timeframes are aggregated from the base series, keeping every timeframe
//! of one pair consistent with the others.

use chrono::{DateTime, Utc};
use ictlab_core::domain::{Candle, Timeframe};
use ictlab_core::engine::EngineConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed for a (pair, timeframe) series.
pub fn seed_for(pair: &str, timeframe: Timeframe) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(pair.as_bytes());
    hasher.update(b":");
    hasher.update(timeframe.label().as_bytes());
    *hasher.finalize().as_bytes()
}

/// Random-walk candles starting at `start`, one per `timeframe` step.
///
/// Per-bar volatility scales with the square root of the bar length, and
/// the walk occasionally switches drift so trends and ranges both appear.
pub fn generate_candles(
    pair: &str,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    count: usize,
) -> Vec<Candle> {
    let mut rng = StdRng::from_seed(seed_for(pair, timeframe));
    let vol = 0.0015 * (timeframe.minutes() as f64).sqrt();
    let mut drift = 0.0_f64;
    let mut price = 100.0_f64;
    let mut candles = Vec::with_capacity(count);

    for i in 0..count {
        if rng.gen_bool(0.02) {
            drift = rng.gen_range(-0.3..0.3) * vol;
        }
        let ret: f64 = drift + rng.gen_range(-1.0..1.0) * vol;
        let open = price;
        let close = (open * (1.0 + ret)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..vol));
        let volume = rng.gen_range(100.0..10_000.0);

        candles.push(Candle::new(
            start + timeframe.duration() * i as i32,
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }
    candles
}

/// Aggregate `candles` of timeframe `from` into `to` buckets.
///
/// Buckets are aligned to multiples of `to` since the Unix epoch. Only
/// complete buckets are emitted, so every output candle is closed.
pub fn aggregate(candles: &[Candle], from: Timeframe, to: Timeframe) -> Vec<Candle> {
    if to <= from || to.minutes() % from.minutes() != 0 {
        return Vec::new();
    }
    let per_bucket = (to.minutes() / from.minutes()) as usize;
    let bucket_ms = to.duration().num_milliseconds();

    let mut out = Vec::new();
    let mut bucket: Option<(i64, Candle, usize)> = None;
    for c in candles {
        let key = c.timestamp.timestamp_millis().div_euclid(bucket_ms);
        match bucket.as_mut() {
            Some((k, agg, n)) if *k == key => {
                agg.high = agg.high.max(c.high);
                agg.low = agg.low.min(c.low);
                agg.close = c.close;
                agg.volume += c.volume;
                *n += 1;
            }
            _ => {
                if let Some((_, agg, n)) = bucket.take() {
                    if n == per_bucket {
                        out.push(agg);
                    }
                }
                let mut first = *c;
                if let Some(open_time) = DateTime::from_timestamp_millis(key * bucket_ms) {
                    first.timestamp = open_time;
                }
                bucket = Some((key, first, 1));
            }
        }
    }
    if let Some((_, agg, n)) = bucket {
        if n == per_bucket {
            out.push(agg);
        }
    }
    out
}

/// Every timeframe `config` consumes, `entry_bars` entry candles long.
pub fn generate_series(
    config: &EngineConfig,
    start: DateTime<Utc>,
    entry_bars: usize,
) -> Vec<(Timeframe, Vec<Candle>)> {
    let entry_tf = config.timeframes.entry;
    let base = generate_candles(&config.pair, entry_tf, start, entry_bars);
    config
        .timeframes()
        .into_iter()
        .map(|tf| {
            if tf == entry_tf {
                (tf, base.clone())
            } else {
                (tf, aggregate(&base, entry_tf, tf))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn same_seed_same_candles() {
        let a = generate_candles("BTCUSDT", Timeframe::M5, start(), 200);
        let b = generate_candles("BTCUSDT", Timeframe::M5, start(), 200);
        assert_eq!(a, b);

        let other = generate_candles("ETHUSDT", Timeframe::M5, start(), 200);
        assert_ne!(a, other);
    }

    #[test]
    fn generated_candles_are_valid_and_ordered() {
        let candles = generate_candles("BTCUSDT", Timeframe::M15, start(), 500);
        assert_eq!(candles.len(), 500);
        for w in candles.windows(2) {
            assert!(w[0].timestamp < w[1].timestamp);
        }
        assert!(candles.iter().all(|c| c.validate().is_ok()));
    }

    #[test]
    fn aggregation_keeps_complete_buckets_only() {
        let base = generate_candles("BTCUSDT", Timeframe::M5, start(), 30);
        let hourly = aggregate(&base, Timeframe::M5, Timeframe::H1);
        // 30 five-minute bars: two full hours, the third hour is incomplete.
        assert_eq!(hourly.len(), 2);

        let first = hourly[0];
        assert_eq!(first.timestamp, start());
        assert_eq!(first.open, base[0].open);
        assert_eq!(first.close, base[11].close);
        let max_high = base[..12].iter().map(|c| c.high).fold(f64::MIN, f64::max);
        assert_eq!(first.high, max_high);
        assert!(hourly.iter().all(|c| c.validate().is_ok()));
    }

    #[test]
    fn aggregation_rejects_non_multiple_timeframes() {
        let base = generate_candles("BTCUSDT", Timeframe::H1, start(), 10);
        assert!(aggregate(&base, Timeframe::H1, Timeframe::M5).is_empty());
    }

    #[test]
    fn series_covers_every_configured_timeframe() {
        let config = EngineConfig::for_pair("BTCUSDT");
        let series = generate_series(&config, start(), 240);
        let tfs: Vec<Timeframe> = series.iter().map(|(tf, _)| *tf).collect();
        assert_eq!(tfs, vec![Timeframe::H1, Timeframe::M5]);
        assert_eq!(series[0].1.len(), 20);
        assert_eq!(series[1].1.len(), 240);
    }
}
