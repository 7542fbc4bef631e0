use find_dupes::duplicates::{DuplicateFinder, FinderConfig};
use std::fs::{self, File};
use std::io::Write;
use tempfile::tempdir;

fn finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_jobs(2).with_table_size(32))
}

#[test]
fn test_paths_with_spaces() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("my documents");
    fs::create_dir(&sub).unwrap();

    File::create(sub.join("file one.txt"))
        .unwrap()
        .write_all(b"spaced")
        .unwrap();
    File::create(dir.path().join("file two.txt"))
        .unwrap()
        .write_all(b"spaced")
        .unwrap();

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.groups.len(), 1);
    assert!(report.groups[0]
        .paths()
        .any(|p| p.to_string_lossy().contains("my documents")));
}

#[test]
fn test_unicode_names() {
    let dir = tempdir().unwrap();

    fs::write(dir.path().join("café.txt"), b"unicode").unwrap();
    fs::write(dir.path().join("日本語.txt"), b"unicode").unwrap();
    fs::write(dir.path().join("emoji_🎉.txt"), b"other").unwrap();

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].len(), 2);
    assert_eq!(report.unique.len(), 1);
}

#[test]
fn test_paths_with_quotes() {
    // Windows does not allow double quotes in filenames.
    if cfg!(windows) {
        return;
    }
    let dir = tempdir().unwrap();

    fs::write(dir.path().join("file_with_\"quote\".txt"), b"content").unwrap();
    fs::write(dir.path().join("duplicate.txt"), b"content").unwrap();

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.groups.len(), 1);
    assert!(report.groups[0]
        .paths()
        .any(|p| p.to_string_lossy().contains('"')));
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_ignored() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("target.txt");
    fs::write(&target, b"linked").unwrap();
    std::os::unix::fs::symlink(&target, dir.path().join("link.txt")).unwrap();

    let sub = dir.path().join("real");
    fs::create_dir(&sub).unwrap();
    std::os::unix::fs::symlink(&sub, dir.path().join("dirlink")).unwrap();

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert!(report.groups.is_empty());
    assert_eq!(report.unique, vec![target]);
    assert_eq!(report.totals.files_found, 1);
}

#[cfg(unix)]
#[test]
fn test_hardlinks_are_reported_as_duplicates() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("original");
    fs::write(&original, b"hard linked").unwrap();
    fs::hard_link(&original, dir.path().join("link")).unwrap();

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].len(), 2);
}
