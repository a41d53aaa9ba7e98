// File management workflows against a scratch directory

use qdesk::core::ops::files::{self, SearchCriteria};
use qdesk::core::ops::Status;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn test_search_then_organize() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Holiday.JPG", b"img");
    write(dir.path(), "notes.txt", b"text");
    write(dir.path(), "song.mp3", b"audio");
    write(dir.path(), "setup", b"bin");

    let hits = files::quick_search(dir.path(), "*.jpg").detail.unwrap();
    assert_eq!(hits.len(), 1);

    let outcome = files::auto_organize(dir.path());
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.detail.unwrap().moved_count, 4);

    assert!(dir.path().join("Images").join("Holiday.JPG").exists());
    assert!(dir.path().join("Documents").join("notes.txt").exists());
    assert!(dir.path().join("Audio").join("song.mp3").exists());
    assert!(dir.path().join("Other").join("setup").exists());
}

#[test]
fn test_advanced_search_filters() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "small.log", &[b'a'; 10]);
    write(dir.path(), "big.log", &[b'a'; 5000]);
    write(dir.path(), "big.txt", &[b'a'; 5000]);

    let criteria = SearchCriteria {
        extensions: vec!["log".into()],
        min_size: Some(1024),
        ..Default::default()
    };
    let hits = files::advanced_search(dir.path(), &criteria).detail.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].path.ends_with("big.log"));
}

#[test]
fn test_dedupe_keeps_one_copy() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.bin", b"same bytes");
    write(dir.path(), "nested/b.bin", b"same bytes");
    write(dir.path(), "c.bin", b"other byte");

    let groups = files::find_duplicates(dir.path()).detail.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files.len(), 2);
    assert_eq!(groups[0].waste_size, 10);

    let report = files::dedupe(dir.path()).detail.unwrap();
    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.kept_count, 1);

    let remaining = [dir.path().join("a.bin"), dir.path().join("nested/b.bin")]
        .iter()
        .filter(|p| p.exists())
        .count();
    assert_eq!(remaining, 1);
    assert!(dir.path().join("c.bin").exists());
}

#[test]
fn test_move_collision_gets_suffix() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "report.pdf", b"new");
    write(dest.path(), "report.pdf", b"old");

    let moved = files::move_to(&src.path().join("report.pdf"), dest.path())
        .detail
        .unwrap();
    assert_eq!(moved, dest.path().join("report (1).pdf"));
    assert_eq!(fs::read(dest.path().join("report.pdf")).unwrap(), b"old");
    assert!(!src.path().join("report.pdf").exists());
}

#[test]
fn test_rename_preview_matches_result() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "b.png", b"2");
    write(dir.path(), "a.png", b"1");
    write(dir.path(), "skip.txt", b"3");

    let plan = files::preview_rename(dir.path(), "photo_{n}.{ext}", Some("png"))
        .detail
        .unwrap();
    assert_eq!(plan.len(), 2);

    let report = files::bulk_rename(dir.path(), "photo_{n}.{ext}", Some("png"))
        .detail
        .unwrap();
    assert_eq!(report.renamed_count, 2);
    for (_, new_name) in plan {
        assert!(dir.path().join(new_name).exists());
    }
    assert!(dir.path().join("skip.txt").exists());
}

#[test]
fn test_missing_paths_are_error_records() {
    let outcome = files::disk_usage(Path::new("/definitely/not/here"));
    assert_eq!(outcome.status, Status::Error);

    let outcome = files::quick_search(Path::new(""), "x");
    assert_eq!(outcome.status, Status::Error);
}

#[test]
fn test_analysis_report_sections() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "one.rs", b"fn main() {}");
    write(dir.path(), "copy/one.rs", b"fn main() {}");
    write(dir.path(), "readme.md", b"# hi");

    let report = files::analysis_report(dir.path()).detail.unwrap();
    assert_eq!(report.usage.total_files, 3);
    assert_eq!(report.duplicate_groups, 1);
    assert!(report.largest_files.is_empty());
    assert!(report.file_types.iter().any(|t| t.extension == "rs" && t.count == 2));
}

#[test]
fn test_copy_into_own_subtree_is_rejected() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("a");
    write(&src, "sub/keep.txt", b"x");

    // Spelled through a sibling so the typed paths share no prefix
    let dest = dir.path().join("b").join("..").join("a").join("sub");
    let outcome = files::copy(&src, &dest);
    assert_eq!(outcome.status, Status::Error);

    let moved = files::move_to(&src, &src.join("fresh"));
    assert_eq!(moved.status, Status::Error);

    // Nothing was created by the rejected calls
    assert!(!dir.path().join("a/sub/a").exists());
    assert!(!src.join("fresh").exists());
    assert!(src.join("sub/keep.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_copy_guard_with_relative_destination() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("a");
    write(&src, "sub/keep.txt", b"x");

    // Relative spelling of `a/sub`, starting with `./`
    let cwd = std::env::current_dir().unwrap();
    let mut relative = std::path::PathBuf::from(".");
    for _ in 1..cwd.components().count() {
        relative.push("..");
    }
    relative.push(src.join("sub").strip_prefix("/").unwrap());

    let outcome = files::copy(&src, &relative);
    assert_eq!(outcome.status, Status::Error);
    assert!(!src.join("sub/a").exists());

    // A sibling destination is still fine
    let ok = files::copy(&src, &dir.path().join("backup"));
    assert_eq!(ok.status, Status::Success);
    assert!(dir.path().join("backup/a/sub/keep.txt").exists());
}
