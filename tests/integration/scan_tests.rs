use find_dupes::duplicates::{DuplicateFinder, FinderConfig};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tempfile::tempdir;

fn finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_jobs(4).with_table_size(128))
}

fn write(path: PathBuf, content: &[u8]) -> PathBuf {
    File::create(&path).unwrap().write_all(content).unwrap();
    path
}

fn sorted(paths: impl Iterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut v: Vec<_> = paths.collect();
    v.sort();
    v
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert!(report.groups.is_empty());
    assert!(report.unique.is_empty());
    assert!(report.empty.is_empty());
    assert_eq!(report.totals.files_found, 0);
    assert!(!report.interrupted);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();

    write(dir.path().join("a.txt"), b"content a");
    write(dir.path().join("b.txt"), b"content b");
    write(dir.path().join("c.txt"), b"content c");

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert!(report.groups.is_empty());
    assert_eq!(report.unique.len(), 3);
    assert_eq!(report.totals.examined, 3);
    assert_eq!(report.totals.unique, 3);
    assert_eq!(report.totals.duplicate, 0);
}

#[test]
fn test_scan_duplicate_files() {
    let dir = tempdir().unwrap();

    let a = write(dir.path().join("a.txt"), b"same content");
    let b = write(dir.path().join("b.txt"), b"same content");
    let c = write(dir.path().join("c.txt"), b"diff content");

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(sorted(report.groups[0].paths().cloned()), vec![a, b]);
    assert_eq!(report.unique, vec![c]);
    assert_eq!(report.totals.duplicate_bytes, 12);
}

#[test]
fn test_empty_files_go_to_empty_list() {
    let dir = tempdir().unwrap();

    let e1 = write(dir.path().join("empty1"), b"");
    let e2 = write(dir.path().join("empty2"), b"");
    write(dir.path().join("full"), b"x");

    let report = finder().find_duplicates(dir.path()).unwrap();

    // Empty files are never grouped, even though they are byte-identical.
    assert!(report.groups.is_empty());
    assert_eq!(sorted(report.empty.iter().cloned()), vec![e1, e2]);
    assert_eq!(report.totals.empty, 2);
    assert_eq!(report.totals.examined, 1);
    assert_eq!(report.totals.files_found, 3);
}

#[test]
fn test_same_size_different_content() {
    let dir = tempdir().unwrap();

    write(dir.path().join("a"), b"aaaa");
    write(dir.path().join("b"), b"bbbb");
    write(dir.path().join("c"), b"cccc");

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert!(report.groups.is_empty());
    assert_eq!(report.totals.unique, 3);
    assert_eq!(report.totals.digests, 3);
}

#[test]
fn test_two_groups_in_one_bucket() {
    let dir = tempdir().unwrap();

    // Both sizes land in bucket 4 of a 128-bucket table.
    write(dir.path().join("a1"), b"aaaa");
    write(dir.path().join("a2"), b"aaaa");
    write(dir.path().join("b1"), &[b'b'; 132]);
    write(dir.path().join("b2"), &[b'b'; 132]);

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.groups.len(), 2);
    let mut sizes: Vec<_> = report.groups.iter().map(|g| g.size).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![4, 132]);
    assert!(report.unique.is_empty());
}

#[test]
fn test_counts_add_up() {
    let dir = tempdir().unwrap();

    for i in 0..10 {
        write(dir.path().join(format!("dup{}", i)), b"repeated");
    }
    for i in 0..5 {
        write(dir.path().join(format!("uniq{}", i)), format!("unique-{}", i).as_bytes());
    }
    write(dir.path().join("nothing"), b"");

    let report = finder().find_duplicates(dir.path()).unwrap();
    let t = report.totals;

    assert_eq!(t.duplicate, 9);
    assert_eq!(t.unique, 5);
    assert_eq!(t.examined, t.unique + t.duplicate + report.groups.len());
    assert_eq!(t.files_found, t.examined + t.empty);
}

#[test]
fn test_deep_nesting() {
    let dir = tempdir().unwrap();
    let mut current = dir.path().to_path_buf();
    for i in 0..20 {
        current.push(format!("d{}", i));
    }
    fs::create_dir_all(&current).unwrap();

    write(dir.path().join("top"), b"deep");
    write(current.join("bottom"), b"deep");

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].len(), 2);
}

#[test]
fn test_single_worker() {
    let dir = tempdir().unwrap();
    for sub in ["x", "y", "z"] {
        fs::create_dir(dir.path().join(sub)).unwrap();
        write(dir.path().join(sub).join("f"), b"one worker");
    }

    let finder = DuplicateFinder::new(FinderConfig::default().with_jobs(1).with_table_size(8));
    let report = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].len(), 3);
}

#[test]
fn test_every_file_reported_once() {
    let dir = tempdir().unwrap();
    let mut created = Vec::new();
    for i in 0..40 {
        let sub = dir.path().join(format!("s{}", i % 4));
        fs::create_dir_all(&sub).unwrap();
        let content = format!("{}", i % 7).repeat(i % 5);
        created.push(write(sub.join(format!("f{}", i)), content.as_bytes()));
    }

    let report = finder().find_duplicates(dir.path()).unwrap();

    let reported = sorted(
        report
            .unique
            .iter()
            .chain(report.empty.iter())
            .chain(report.groups.iter().flat_map(|g| g.paths()))
            .cloned(),
    );
    created.sort();
    assert_eq!(reported, created);
}

#[test]
fn test_anchor_is_a_group_member() {
    let dir = tempdir().unwrap();
    write(dir.path().join("one"), b"anchor");
    write(dir.path().join("two"), b"anchor");

    let report = finder().find_duplicates(dir.path()).unwrap();
    let group = &report.groups[0];

    assert!(group.anchor.starts_with(dir.path()));
    assert_eq!(group.matches.len(), 1);
    assert_ne!(group.anchor, group.matches[0]);
}
