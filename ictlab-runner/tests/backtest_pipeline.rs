use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;

use ictlab_core::engine::EngineConfig;
use ictlab_runner::data_loader::{load_candles_csv, write_candles_csv};
use ictlab_runner::export::{load_artifacts, save_run};
use ictlab_runner::{
    generate_series, run_from_files, run_synthetic, BacktestConfig, LoadError, PairState,
    RunError,
};

const BARS: usize = 1200;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
}

/// Write synthetic CSVs for `pair` and return its `[[pairs]]` TOML block.
fn write_pair_data(dir: &Path, pair: &str) -> String {
    let engine = EngineConfig::for_pair(pair);
    let mut data = Vec::new();
    for (tf, candles) in generate_series(&engine, start(), BARS) {
        let path = dir.join(format!("{}_{}.csv", pair, tf.label()));
        write_candles_csv(&path, &candles).unwrap();
        data.push(format!("\"{}\" = \"{}\"", tf.label(), path.display()));
    }
    format!(
        "[[pairs]]\ndata = {{ {} }}\n\n[pairs.engine]\npair = \"{}\"\n\n",
        data.join(", "),
        pair
    )
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("backtest.toml");
    let text = format!("output_dir = \"{}\"\n\n{}", dir.join("out").display(), body);
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn csv_files_round_trip_candles() {
    let dir = tempfile::tempdir().unwrap();
    let engine = EngineConfig::for_pair("BTCUSDT");
    let (_, candles) = generate_series(&engine, start(), 300).pop().unwrap();

    let path = dir.path().join("btc_5m.csv");
    write_candles_csv(&path, &candles).unwrap();
    assert_eq!(load_candles_csv(&path).unwrap(), candles);
}

#[test]
fn file_backtest_matches_synthetic_backtest() {
    let dir = tempfile::tempdir().unwrap();
    let body = write_pair_data(dir.path(), "BTCUSDT") + &write_pair_data(dir.path(), "ETHUSDT");
    let config = BacktestConfig::load(&write_config(dir.path(), &body)).unwrap();
    assert_eq!(config.pairs.len(), 2);

    let from_files = run_from_files(&config).unwrap();
    let synthetic = run_synthetic(&config, start(), BARS).unwrap();
    assert_eq!(from_files.run_id, config.run_id());

    for (a, b) in from_files.results.iter().zip(&synthetic.results) {
        assert_eq!(a.pair, b.pair);
        let (a, b) = (a.result.as_ref().unwrap(), b.result.as_ref().unwrap());
        assert_eq!(a, b);
        assert_eq!(a.rejected, 0);
    }

    assert_eq!(from_files.board.len(), 2);
    for (_, status) in from_files.board.pairs() {
        assert_eq!(status.state, PairState::Finished);
        assert!(status.latest.is_some());
    }
}

#[test]
fn missing_candle_file_fails_only_that_pair() {
    let dir = tempfile::tempdir().unwrap();
    let broken = "[[pairs]]\ndata = { \"1h\" = \"/nonexistent/eth_1h.csv\", \"5m\" = \"/nonexistent/eth_5m.csv\" }\n\n[pairs.engine]\npair = \"ETHUSDT\"\n\n";
    let body = write_pair_data(dir.path(), "BTCUSDT") + broken;
    let config = BacktestConfig::load(&write_config(dir.path(), &body)).unwrap();

    let report = run_from_files(&config).unwrap();
    assert_eq!(report.succeeded().count(), 1);

    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "ETHUSDT");
    assert!(matches!(failed[0].1, RunError::Data(LoadError::Io { .. })));

    let eth = report.board.get("ETHUSDT").unwrap();
    assert!(matches!(eth.state, PairState::Failed(_)));
    assert_eq!(
        report.board.get("BTCUSDT").unwrap().state,
        PairState::Finished
    );
}

#[test]
fn run_artifacts_are_written_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let body = write_pair_data(dir.path(), "BTCUSDT");
    let config = BacktestConfig::load(&write_config(dir.path(), &body)).unwrap();
    let report = run_from_files(&config).unwrap();

    let run_dir = save_run(&report, &config.output_dir).unwrap();
    assert!(run_dir.starts_with(dir.path().join("out")));
    assert!(run_dir.join("run.json").exists());

    let pair_dir = run_dir.join("BTCUSDT");
    for file in ["result.json", "summary.json", "trades.csv", "trades.json"] {
        assert!(pair_dir.join(file).exists(), "missing {file}");
    }

    let original = report.succeeded().next().unwrap();
    let loaded = load_artifacts(&pair_dir).unwrap();
    assert_eq!(loaded.pair, original.pair);
    assert_eq!(loaded.trades.len(), original.trades.len());
    assert_eq!(loaded.summary.trade_count, original.summary.trade_count);

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(run_dir.join("run.json")).unwrap()).unwrap();
    assert_eq!(manifest["run_id"], serde_json::json!(report.run_id));
    assert_eq!(manifest["pairs"][0]["pair"], "BTCUSDT");
}

#[test]
fn load_rejects_config_without_candle_files() {
    let dir = tempfile::tempdir().unwrap();
    let body = "[[pairs]]\n\n[pairs.engine]\npair = \"BTCUSDT\"\n";
    let err = BacktestConfig::load(&write_config(dir.path(), body)).unwrap_err();
    assert!(matches!(err, ictlab_runner::ConfigError::MissingData { .. }));
}
