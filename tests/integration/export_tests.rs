//! End-to-end runs through `run_app`, checking the written lists.

use clap::Parser;
use find_dupes::cli::Cli;
use find_dupes::error::ExitCode;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

struct Fixture {
    _root: TempDir,
    src: PathBuf,
    lists: PathBuf,
    config: PathBuf,
}

fn fixture() -> Fixture {
    let root = tempdir().unwrap();
    let src = root.path().join("src");
    let lists = root.path().join("lists");
    let config = root.path().join("config.toml");
    fs::create_dir(&src).unwrap();
    fs::write(&config, "").unwrap();

    fs::write(src.join("a"), b"0123456789").unwrap();
    fs::write(src.join("b"), b"0123456789").unwrap();
    fs::write(src.join("c"), b"abcdefghij").unwrap();
    fs::write(src.join("d"), b"").unwrap();

    Fixture {
        _root: root,
        src,
        lists,
        config,
    }
}

fn cli(f: &Fixture, extra: &[&str]) -> Cli {
    let mut args = vec![
        "find-dupes".to_string(),
        "-q".to_string(),
        "--config".to_string(),
        f.config.to_string_lossy().into_owned(),
        "-l".to_string(),
        f.lists.to_string_lossy().into_owned(),
        "-j".to_string(),
        "2".to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    args.push(f.src.to_string_lossy().into_owned());
    Cli::try_parse_from(args).unwrap()
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

/// List body after the four header lines.
fn body(text: &str) -> Vec<&str> {
    text.lines().skip(4).collect()
}

#[test]
fn test_run_writes_all_lists() {
    let f = fixture();

    let code = find_dupes::run_app(cli(&f, &[])).unwrap();

    assert_eq!(code, ExitCode::Success);
    for name in ["unique.lst", "dupes.lst", "empty.lst"] {
        assert!(f.lists.join(name).is_file(), "{} missing", name);
    }
    assert!(!f.lists.join("files.lst").exists());
}

#[test]
fn test_list_headers() {
    let f = fixture();
    find_dupes::run_app(cli(&f, &[])).unwrap();

    let unique = read(&f.lists, "unique.lst");
    let lines: Vec<_> = unique.lines().collect();
    assert!(lines[0].starts_with("# find-dupes (find-dupes) "));
    assert!(lines[1].starts_with("# "));
    assert_eq!(lines[2], "# Unique List");
    assert_eq!(lines[3], "");

    let empty = read(&f.lists, "empty.lst");
    assert_eq!(empty.lines().nth(2), Some("# Empty List - 1 files."));

    let dupes = read(&f.lists, "dupes.lst");
    assert_eq!(dupes.lines().nth(2), Some("# Dupes List"));
}

#[test]
fn test_list_bodies() {
    let f = fixture();
    find_dupes::run_app(cli(&f, &[])).unwrap();

    let unique = read(&f.lists, "unique.lst");
    assert_eq!(body(&unique), vec![f.src.join("c").to_string_lossy().into_owned()]);

    let empty = read(&f.lists, "empty.lst");
    assert_eq!(body(&empty), vec![f.src.join("d").to_string_lossy().into_owned()]);

    let dupes = read(&f.lists, "dupes.lst");
    let group = body(&dupes);
    assert_eq!(group.len(), 3);
    assert!(group[0].starts_with("[1] "));
    assert!(group[1].starts_with("[2] "));
    assert_eq!(group[2], "");
    let mut members: Vec<_> = group[..2].iter().map(|l| l[4..].to_string()).collect();
    members.sort();
    assert_eq!(
        members,
        vec![
            f.src.join("a").to_string_lossy().into_owned(),
            f.src.join("b").to_string_lossy().into_owned(),
        ]
    );
}

#[test]
fn test_file_list_puts_empty_files_first() {
    let f = fixture();
    find_dupes::run_app(cli(&f, &["-f"])).unwrap();

    let files = read(&f.lists, "files.lst");
    assert_eq!(files.lines().nth(2), Some("# Files List"));
    let entries = body(&files);
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0], format!("0 {}", f.src.join("d").display()));
    assert!(entries[1..].iter().all(|l| l.starts_with("10 ")));
}

#[test]
fn test_list_dir_created_when_missing() {
    let f = fixture();
    let nested = f.lists.join("deeper").join("still");
    let args = [
        "find-dupes",
        "-q",
        "--config",
        f.config.to_str().unwrap(),
        "-l",
        nested.to_str().unwrap(),
        f.src.to_str().unwrap(),
    ];

    let code = find_dupes::run_app(Cli::try_parse_from(args).unwrap()).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(nested.join("dupes.lst").is_file());
}

#[test]
fn test_missing_source_is_an_error() {
    let f = fixture();
    let missing = f.src.join("nope");
    let args = [
        "find-dupes",
        "-q",
        "--config",
        f.config.to_str().unwrap(),
        "-l",
        f.lists.to_str().unwrap(),
        missing.to_str().unwrap(),
    ];

    let err = find_dupes::run_app(Cli::try_parse_from(args).unwrap()).unwrap_err();

    assert!(format!("{:#}", err).contains("Path not found"));
}

#[test]
fn test_invalid_buckets_rejected() {
    let f = fixture();
    let err = find_dupes::run_app(cli(&f, &["-b", "3"])).unwrap_err();
    assert!(format!("{:#}", err).contains("power of two"));
}

#[test]
fn test_larger_table_same_result() {
    let f = fixture();
    find_dupes::run_app(cli(&f, &["-b", "4"])).unwrap();

    let dupes = read(&f.lists, "dupes.lst");
    assert_eq!(body(&dupes).len(), 3);
}
