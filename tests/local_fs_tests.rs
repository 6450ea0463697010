#![allow(clippy::unwrap_used, missing_docs)]

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use media_scan::fs::{FsProvider, local::LocalFs};

#[test]
fn list_entries_reports_children_in_path_order() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("b.mkv"), b"bb").unwrap();
    fs::write(tmp.path().join("a.mkv"), b"a").unwrap();
    fs::create_dir(tmp.path().join("shows")).unwrap();

    let entries = LocalFs.list_entries(tmp.path()).unwrap();

    let names: Vec<_> = entries
        .iter()
        .map(|entry| entry.name.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.mkv", "b.mkv", "shows"]);
    assert!(!entries[0].is_dir);
    assert_eq!(entries[0].len, 1);
    assert!(entries[2].is_dir);
    assert_eq!(entries[2].len, 0);
}

#[test]
fn list_entries_of_a_missing_directory_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("not-here");

    assert!(LocalFs.list_entries(&missing).unwrap().is_empty());
}

#[test]
fn stat_reports_files_and_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("a.mkv");
    fs::write(&file, b"hello").unwrap();

    let file_meta = LocalFs.stat(&file).unwrap().unwrap();
    assert!(!file_meta.is_dir);
    assert_eq!(file_meta.len, 5);
    assert_eq!(file_meta.path, file);

    let dir_meta = LocalFs.stat(tmp.path()).unwrap().unwrap();
    assert!(dir_meta.is_dir);
    assert_eq!(dir_meta.len, 0);
}

#[test]
fn stat_of_a_missing_path_is_none() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(LocalFs.stat(&tmp.path().join("nope")).unwrap().is_none());
}

#[test]
fn list_file_paths_recurses_into_subdirectories() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("shows/s01")).unwrap();
    fs::write(tmp.path().join("cover.jpg"), b"x").unwrap();
    fs::write(tmp.path().join("shows/s01/e01.mkv"), b"x").unwrap();
    fs::write(tmp.path().join("shows/s01/e02.mkv"), b"x").unwrap();

    let found: BTreeSet<PathBuf> = LocalFs
        .list_file_paths(tmp.path())
        .unwrap()
        .into_iter()
        .collect();

    let expected: BTreeSet<PathBuf> = [
        tmp.path().join("cover.jpg"),
        tmp.path().join("shows/s01/e01.mkv"),
        tmp.path().join("shows/s01/e02.mkv"),
    ]
    .into_iter()
    .collect();
    assert_eq!(found, expected);
}

#[test]
fn list_file_paths_skips_directories_themselves() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir(tmp.path().join("empty")).unwrap();

    assert!(LocalFs.list_file_paths(tmp.path()).unwrap().is_empty());
}

#[test]
fn list_entry_paths_reflects_occupancy() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(LocalFs.list_entry_paths(tmp.path()).unwrap().is_empty());

    fs::write(tmp.path().join("a.mkv"), b"x").unwrap();
    let paths = LocalFs.list_entry_paths(tmp.path()).unwrap();
    assert_eq!(paths, vec![tmp.path().join("a.mkv")]);
}
