use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Every regular file under `root`, hidden and ignored files included.
///
/// Unreadable entries are skipped. `max_depth` of 1 lists only direct children.
pub fn files_under(root: &Path, max_depth: Option<usize>) -> impl Iterator<Item = PathBuf> {
    WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .max_depth(max_depth)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
}

/// Every directory strictly below `root`
pub fn dirs_under(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.depth() > 0 && entry.file_type().is_some_and(|t| t.is_dir()))
        .map(|entry| entry.into_path())
}

/// Lower-cased file name, or an empty string for paths without one
pub fn lower_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Lower-cased extension without the dot
pub fn lower_ext(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_includes_hidden_and_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();
        fs::write(dir.path().join("sub").join("a.txt"), b"x").unwrap();

        let mut all: Vec<_> = files_under(dir.path(), None).collect();
        all.sort();
        assert_eq!(all.len(), 2);

        let top: Vec<_> = files_under(dir.path(), Some(1)).collect();
        assert_eq!(top.len(), 1);

        assert_eq!(dirs_under(dir.path()).count(), 1);
    }

    #[test]
    fn test_lower_helpers() {
        let path = Path::new("/x/Report.PDF");
        assert_eq!(lower_name(path), "report.pdf");
        assert_eq!(lower_ext(path).as_deref(), Some("pdf"));
    }
}
