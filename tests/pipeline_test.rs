// tests/pipeline_test.rs
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;

use data_version::cli::{run_pipeline, Stage};
use data_version::config::Config;
use data_version::dataset::Table;
use tempfile::TempDir;

const RAW: &str = "\
color,size,label
Red,1,yes
Red,1,yes
 blue ,,no
GREEN,3,
,5,yes
red,7,no
blue,2,yes
green,4,no
red,6,yes
blue,8,no
green,9,yes
red,10,no
";

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    let split = &mut config.data_split;
    split.raw_data_save_path = dir.join("raw.csv");
    split.cleansed_data_save_path = dir.join("out/cleansed.csv");
    split.train_data_save_path = dir.join("out/train.csv");
    split.val_data_save_path = dir.join("out/val.csv");
    split.test_data_save_path = dir.join("out/test.csv");
    split.label_col = "label".to_string();
    split.categorical_cols = vec!["color".to_string()];
    split.numeric_cols = vec!["size".to_string()];
    config
}

/// Serve one HTTP response on a loopback port and return its URL
fn serve_once(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 {
            if line == "\r\n" {
                break;
            }
            line.clear();
        }
        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .unwrap();
    });

    format!("http://{}/data.csv", addr)
}

#[test]
fn test_cleanse_then_split() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("raw.csv"), RAW).unwrap();
    let config = config_in(dir.path());

    let report = run_pipeline(&[Stage::Split, Stage::Cleanse], &config).unwrap();

    assert_eq!(report.stages, vec![Stage::Cleanse, Stage::Split]);
    let cleanse = report.cleanse.unwrap();
    assert_eq!(cleanse.rows_in, 12);
    assert_eq!(cleanse.duplicates_removed, 1);
    assert_eq!(cleanse.unlabeled_removed, 1);
    assert_eq!(cleanse.rows_out, 10);

    let cleansed = Table::read_csv(&config.data_split.cleansed_data_save_path).unwrap();
    assert_eq!(cleansed.columns, vec!["color", "size", "label"]);
    assert!(cleansed
        .rows
        .iter()
        .all(|r| !r[0].is_empty() && !r[1].is_empty()));
    assert!(cleansed.rows.iter().all(|r| r[0] == r[0].trim().to_lowercase()));

    // 10 rows: test = ceil(0.2 * 10) = 2, val = ceil(0.25 * 8) = 2
    assert_eq!(report.split, Some((6, 2, 2)));
    let train = Table::read_csv(&config.data_split.train_data_save_path).unwrap();
    assert_eq!(train.columns.last().map(String::as_str), Some("label"));
}

#[test]
fn test_split_is_reproducible_across_runs() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("raw.csv"), RAW).unwrap();
    let config = config_in(dir.path());

    run_pipeline(&[Stage::Cleanse, Stage::Split], &config).unwrap();
    let first = fs::read_to_string(&config.data_split.test_data_save_path).unwrap();
    run_pipeline(&[Stage::Split], &config).unwrap();
    let second = fs::read_to_string(&config.data_split.test_data_save_path).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_gather_downloads_to_raw_path() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    config.data_split.raw_data_save_path = dir.path().join("nested/raw.csv");
    config.data_url = serve_once("200 OK", RAW);

    let report = run_pipeline(&[Stage::Gather], &config).unwrap();

    assert_eq!(report.downloaded_bytes, Some(RAW.len() as u64));
    assert_eq!(
        fs::read_to_string(&config.data_split.raw_data_save_path).unwrap(),
        RAW
    );
}

#[test]
fn test_gather_rejects_error_status() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    config.data_url = serve_once("404 Not Found", "missing");

    let err = run_pipeline(&[Stage::Gather, Stage::Cleanse], &config).unwrap_err();

    assert_eq!(err.operation(), Some("gather"));
    assert!(!config.data_split.raw_data_save_path.exists());
    assert!(!config.data_split.cleansed_data_save_path.exists());
}

#[test]
fn test_cleanse_without_raw_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());

    let err = run_pipeline(&[Stage::Cleanse], &config).unwrap_err();
    assert_eq!(err.operation(), Some("cleanse"));
}
