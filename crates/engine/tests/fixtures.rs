//! End-to-end runs over the tapes in `tests/data`.
//!
//! `small.tape`: eleven 100-lot trades one second apart, a sell at 100.0 and
//! then ten buys at 200.0.
//! `incremental.tape`: eleven buys at 100.0 with volumes 100, 200, ... 1100.

use approx::assert_relative_eq;
use std::fs;
use std::path::{Path, PathBuf};
use streambar_core::config::{MarkerFormat, TapeLayout};
use streambar_core::{Bar, Config, ErrorKind, PolicyKind};
use streambar_engine::{
    change, dollar, run, run_with_config, run_with_policy, tick, time, volume, SamplingPolicy,
};
use tempfile::TempDir;

fn tape(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn read_bars(path: &Path) -> Vec<Bar> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(header, ["volume", "buys", "vwap", "trades"]);
    reader.deserialize::<Bar>().collect::<Result<_, _>>().unwrap()
}

fn volumes(bars: &[Bar]) -> Vec<u64> {
    bars.iter().map(|b| b.volume).collect()
}

fn buys(bars: &[Bar]) -> Vec<u64> {
    bars.iter().map(|b| b.buys).collect()
}

fn trades(bars: &[Bar]) -> Vec<u64> {
    bars.iter().map(|b| b.trades).collect()
}

fn vwaps(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.vwap).collect()
}

struct Output {
    _dir: TempDir,
    path: PathBuf,
}

fn output() -> Output {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bars.csv");
    Output { _dir: dir, path }
}

#[test]
fn test_tick_small() {
    let out = output();
    assert_eq!(tick(tape("small.tape"), &out.path, 2).unwrap(), 6);

    let bars = read_bars(&out.path);
    assert_eq!(volumes(&bars), vec![200, 200, 200, 200, 200, 100]);
    assert_eq!(buys(&bars), vec![1, 2, 2, 2, 2, 1]);
    assert_eq!(vwaps(&bars), vec![150.0, 200.0, 200.0, 200.0, 200.0, 200.0]);
    assert_eq!(trades(&bars), vec![2, 2, 2, 2, 2, 1]);
}

#[test]
fn test_tick_incremental() {
    let out = output();
    assert_eq!(tick(tape("incremental.tape"), &out.path, 2).unwrap(), 6);
    assert_eq!(
        volumes(&read_bars(&out.path)),
        vec![300, 700, 1100, 1500, 1900, 1100]
    );
}

#[test]
fn test_volume_small() {
    let out = output();
    assert_eq!(volume(tape("small.tape"), &out.path, 500).unwrap(), 3);

    let bars = read_bars(&out.path);
    assert_eq!(volumes(&bars), vec![500, 500, 100]);
    assert_eq!(buys(&bars), vec![4, 5, 1]);
    assert_eq!(vwaps(&bars), vec![180.0, 200.0, 200.0]);
    assert_eq!(trades(&bars), vec![5, 5, 1]);
}

#[test]
fn test_volume_incremental() {
    let out = output();
    assert_eq!(volume(tape("incremental.tape"), &out.path, 500).unwrap(), 8);
    assert_eq!(
        volumes(&read_bars(&out.path)),
        vec![600, 900, 600, 700, 800, 900, 1000, 1100]
    );
}

#[test]
fn test_dollar_incremental() {
    let out = output();
    assert_eq!(dollar(tape("incremental.tape"), &out.path, 35_000.0).unwrap(), 9);
    assert_eq!(
        volumes(&read_bars(&out.path)),
        vec![600, 400, 500, 600, 700, 800, 900, 1000, 1100]
    );
}

#[test]
fn test_change_small() {
    let out = output();
    assert_eq!(change(tape("small.tape"), &out.path, 100.0).unwrap(), 2);

    let bars = read_bars(&out.path);
    assert_eq!(volumes(&bars), vec![100, 1000]);
    assert_eq!(buys(&bars), vec![0, 10]);
    assert_eq!(vwaps(&bars), vec![100.0, 200.0]);
    assert_eq!(trades(&bars), vec![1, 10]);
}

#[test]
fn test_change_below_any_move_is_one_bar() {
    let out = output();
    assert_eq!(change(tape("small.tape"), &out.path, 100.5).unwrap(), 1);
    assert_eq!(volumes(&read_bars(&out.path)), vec![1100]);
}

#[test]
fn test_time_small() {
    let out = output();
    assert_eq!(time(tape("small.tape"), &out.path, 4000).unwrap(), 3);

    let bars = read_bars(&out.path);
    assert_eq!(volumes(&bars), vec![400, 400, 300]);
    assert_eq!(buys(&bars), vec![3, 4, 3]);
    assert_relative_eq!(bars[0].vwap, 175.0);
    assert_eq!(trades(&bars), vec![4, 4, 3]);
}

#[test]
fn test_time_incremental() {
    let out = output();
    assert_eq!(time(tape("incremental.tape"), &out.path, 4000).unwrap(), 3);
    assert_eq!(volumes(&read_bars(&out.path)), vec![1000, 2600, 3000]);
}

#[test]
fn test_conservation_across_policies() {
    for (kind, size) in [
        (PolicyKind::Tick, 3.0),
        (PolicyKind::Volume, 750.0),
        (PolicyKind::Dollar, 52_500.5),
        (PolicyKind::Change, 0.5),
        (PolicyKind::Time, 2500.0),
    ] {
        let out = output();
        run(tape("incremental.tape"), &out.path, kind, size, &Config::default()).unwrap();
        let bars = read_bars(&out.path);
        assert_eq!(bars.iter().map(|b| b.volume).sum::<u64>(), 6600, "{kind}");
        assert_eq!(bars.iter().map(|b| b.trades).sum::<u64>(), 11, "{kind}");
    }
}

#[test]
fn test_tagged_tape_matches_sided() {
    let mut config = Config::default();
    config.tape.layout = TapeLayout::Tagged;

    let out = output();
    assert_eq!(
        run(tape("small_tagged.tape"), &out.path, PolicyKind::Tick, 2.0, &config).unwrap(),
        6
    );
    let bars = read_bars(&out.path);
    assert_eq!(volumes(&bars), vec![200, 200, 200, 200, 200, 100]);
    assert_eq!(buys(&bars), vec![1, 2, 2, 2, 2, 1]);

    let out = output();
    run(tape("small_tagged.tape"), &out.path, PolicyKind::Change, 100.0, &config).unwrap();
    assert_eq!(buys(&read_bars(&out.path)), vec![0, 10]);
}

#[test]
fn test_config_driven_time_of_day_run() {
    let config = Config::from_json(
        r#"{"tape": {"marker_format": "time_of_day"},
            "bars": {"policy": "time", "size": 4000}}"#,
    )
    .unwrap();
    assert_eq!(config.tape.marker_format, MarkerFormat::TimeOfDay);

    let out = output();
    assert_eq!(run_with_config(tape("small_clock.tape"), &out.path, &config).unwrap(), 3);
    assert_eq!(volumes(&read_bars(&out.path)), vec![400, 400, 300]);
}

#[test]
fn test_deterministic_output() {
    let first = output();
    let second = output();
    dollar(tape("incremental.tape"), &first.path, 12_345.6).unwrap();
    dollar(tape("incremental.tape"), &second.path, 12_345.6).unwrap();
    assert_eq!(fs::read(&first.path).unwrap(), fs::read(&second.path).unwrap());
}

#[test]
fn test_empty_tape_yields_header_only() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty.tape");
    fs::write(&empty, "marker,price,volume,side\n").unwrap();
    let out = dir.path().join("bars.csv");

    for kind in PolicyKind::ALL {
        assert_eq!(run(&empty, &out, kind, 10.0, &Config::default()).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "volume,buys,vwap,trades\n");
    }
}

#[test]
fn test_invalid_file() {
    let err = tick("nx", "", 123).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Source);
}

#[test]
fn test_directory_as_tape_is_source_error() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("bars.csv");
    let err = tick(dir.path(), &out, 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Source);
    assert!(!out.exists());
}

#[test]
fn test_parse_error_leaves_no_output() {
    let out = output();
    let err = tick(tape("bad_price.tape"), &out.path, 1).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("line 4"));
    assert!(!out.path.exists());
    assert!(!out.path.with_extension("csv.partial").exists());
}

#[test]
fn test_parse_error_can_keep_partial_output() {
    let mut config = Config::default();
    config.output.discard_partial = false;

    let out = output();
    let err = run(tape("bad_price.tape"), &out.path, PolicyKind::Tick, 1.0, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(!out.path.exists());

    let partial = read_bars(&out.path.with_extension("csv.partial"));
    assert_eq!(volumes(&partial), vec![100, 100]);
}

#[test]
fn test_unwritable_output_is_sink_error() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("no_such_dir").join("bars.csv");
    let err = tick(tape("small.tape"), &out, 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sink);
}

#[test]
fn test_bars_section_ignored_by_explicit_run() {
    let config = Config::parse_json(r#"{"bars": {"size": 0}, "output": {"delimiter": ";"}}"#).unwrap();

    let out = output();
    assert_eq!(run(tape("small.tape"), &out.path, PolicyKind::Tick, 2.0, &config).unwrap(), 6);
    let text = fs::read_to_string(&out.path).unwrap();
    assert!(text.starts_with("volume;buys;vwap;trades\n200;1;150.0;2\n"));
}

#[test]
fn test_whole_size_policies() {
    let out = output();
    let policy = SamplingPolicy::from_whole(PolicyKind::Volume, 500).unwrap();
    assert_eq!(run_with_policy(tape("small.tape"), &out.path, policy, &Config::default()).unwrap(), 3);
    assert_eq!(volumes(&read_bars(&out.path)), vec![500, 500, 100]);

    let err = SamplingPolicy::from_whole(PolicyKind::Tick, -1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_tape_volume_overflow_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let huge = dir.path().join("huge.tape");
    let half = u64::MAX / 2 + 1;
    fs::write(&huge, format!("marker,price,volume,side\n0,1.0,{half},buy\n1,1.0,{half},buy\n")).unwrap();
    let out = dir.path().join("bars.csv");

    let err = tick(&huge, &out, 5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("line 3"));
    assert!(!out.exists());
}
