//! File search, duplicate detection, organization, renaming and analysis.
//!
//! Every operation takes a root path supplied by the user. An empty or
//! missing path produces an error record rather than a panic.

use chrono::{DateTime, Local, Utc};
use humansize::{format_size, BINARY};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, Metadata};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::outcome::{guard, OpOutcome};
use super::security::{move_file, sha256_file, shred_file};
use super::walk::{self, lower_ext};
use crate::error::{QdError, Result};

/// Files above this size are skipped by content search
pub const MAX_CONTENT_SEARCH_BYTES: u64 = 10 * 1024 * 1024;

fn require_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(QdError::invalid_input("no path specified"));
    }
    if !path.exists() {
        return Err(QdError::invalid_path(format!("{} does not exist", path.display())));
    }
    Ok(())
}

fn require_dir(path: &Path) -> Result<()> {
    require_path(path)?;
    if !path.is_dir() {
        return Err(QdError::invalid_path(format!("{} is not a directory", path.display())));
    }
    Ok(())
}

fn modified_utc(meta: &Metadata) -> Option<DateTime<Utc>> {
    meta.modified().ok().map(DateTime::<Utc>::from)
}

/// Direct child files of `dir`, sorted by name
fn child_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    files.sort();
    Ok(files)
}

/// `name.ext`, `name (1).ext`, `name (2).ext`, ... whichever is free in `dir`
pub fn unique_target(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{} ({}){}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| QdError::invalid_path(format!("{} has no file name", path.display())))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileHit {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl FileHit {
    fn from_path(path: PathBuf) -> Option<Self> {
        let meta = fs::metadata(&path).ok()?;
        Some(Self {
            size: meta.len(),
            modified: modified_utc(&meta),
            path,
        })
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.path.display(), format_size(self.size, BINARY))
    }
}

/// Name matcher: `*`/`?` globs are anchored, anything else is a substring.
/// Both are case-insensitive.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    regex: Option<Regex>,
    needle: String,
}

impl NameMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() || pattern == "*" {
            return Ok(Self {
                regex: None,
                needle: String::new(),
            });
        }

        if pattern.contains('*') || pattern.contains('?') {
            let mut expr = String::from("^");
            for c in pattern.chars() {
                match c {
                    '*' => expr.push_str(".*"),
                    '?' => expr.push('.'),
                    other => expr.push_str(&regex::escape(&other.to_string())),
                }
            }
            expr.push('$');
            let regex = RegexBuilder::new(&expr).case_insensitive(true).build()?;
            return Ok(Self {
                regex: Some(regex),
                needle: String::new(),
            });
        }

        Ok(Self {
            regex: None,
            needle: pattern.to_lowercase(),
        })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(file_name),
            None => file_name.to_lowercase().contains(&self.needle),
        }
    }
}

fn hits_outcome(label: &str, hits: Vec<FileHit>) -> OpOutcome<Vec<FileHit>> {
    let items: Vec<String> = hits.iter().take(20).map(FileHit::label).collect();
    OpOutcome::success(format!("{}: {} files found", label, hits.len()))
        .with_items(items)
        .with_detail(hits)
}

pub fn quick_search(root: &Path, pattern: &str) -> OpOutcome<Vec<FileHit>> {
    guard("quick_search", || {
        require_dir(root)?;
        let matcher = NameMatcher::new(pattern)?;

        let hits: Vec<FileHit> = walk::files_under(root, None)
            .filter(|p| {
                p.file_name()
                    .map(|n| matcher.matches(&n.to_string_lossy()))
                    .unwrap_or(false)
            })
            .filter_map(FileHit::from_path)
            .collect();
        Ok(hits_outcome("Quick search", hits))
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchCriteria {
    pub name: Option<String>,
    /// Extensions without the dot, any case
    pub extensions: Vec<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub modified_within_days: Option<u32>,
}

impl SearchCriteria {
    fn accepts(&self, path: &Path, meta: &Metadata, matcher: &NameMatcher, now: SystemTime) -> bool {
        if let Some(name) = path.file_name() {
            if !matcher.matches(&name.to_string_lossy()) {
                return false;
            }
        }

        if !self.extensions.is_empty() {
            let ext = lower_ext(path).unwrap_or_default();
            if !self
                .extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
            {
                return false;
            }
        }

        let size = meta.len();
        if self.min_size.is_some_and(|min| size < min) || self.max_size.is_some_and(|max| size > max) {
            return false;
        }

        if let Some(days) = self.modified_within_days {
            let window = Duration::from_secs(u64::from(days) * 24 * 60 * 60);
            let recent = meta
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .map(|age| age <= window)
                // Timestamps in the future count as recent
                .unwrap_or(true);
            if !recent {
                return false;
            }
        }
        true
    }
}

pub fn advanced_search(root: &Path, criteria: &SearchCriteria) -> OpOutcome<Vec<FileHit>> {
    guard("advanced_search", || {
        require_dir(root)?;
        if let (Some(min), Some(max)) = (criteria.min_size, criteria.max_size) {
            if min > max {
                return Err(QdError::invalid_input("minimum size is larger than maximum size"));
            }
        }

        let matcher = NameMatcher::new(criteria.name.as_deref().unwrap_or("*"))?;
        let now = SystemTime::now();

        let hits: Vec<FileHit> = walk::files_under(root, None)
            .filter_map(|path| {
                let meta = fs::metadata(&path).ok()?;
                criteria
                    .accepts(&path, &meta, &matcher, now)
                    .then(|| FileHit {
                        size: meta.len(),
                        modified: modified_utc(&meta),
                        path,
                    })
            })
            .collect();
        Ok(hits_outcome("Advanced search", hits))
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentMatch {
    pub file: PathBuf,
    pub line: usize,
    pub content: String,
}

/// Regex search through UTF-8 text files; binary and oversized files are skipped
pub fn search_content(root: &Path, pattern: &str) -> OpOutcome<Vec<ContentMatch>> {
    guard("search_content", || {
        require_dir(root)?;
        if pattern.is_empty() {
            return Err(QdError::invalid_input("no search pattern specified"));
        }
        let regex = Regex::new(pattern)?;

        let mut matches = Vec::new();
        let mut files_searched = 0usize;
        for path in walk::files_under(root, None) {
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            if meta.len() > MAX_CONTENT_SEARCH_BYTES {
                continue;
            }
            let Ok(bytes) = fs::read(&path) else {
                continue;
            };
            if bytes.contains(&0) {
                continue;
            }
            let Ok(text) = String::from_utf8(bytes) else {
                continue;
            };

            files_searched += 1;
            for (i, line) in text.lines().enumerate() {
                if regex.is_match(line) {
                    matches.push(ContentMatch {
                        file: path.clone(),
                        line: i + 1,
                        content: line.trim().chars().take(200).collect(),
                    });
                }
            }
        }

        let items: Vec<String> = matches
            .iter()
            .take(20)
            .map(|m| format!("{}:{}: {}", m.file.display(), m.line, m.content))
            .collect();
        Ok(OpOutcome::success(format!(
            "Content search: {} matches in {} text files",
            matches.len(),
            files_searched
        ))
        .with_items(items)
        .with_detail(matches))
    })
}

// ---------------------------------------------------------------------------
// Copy, move, delete, analyze
// ---------------------------------------------------------------------------

fn copy_recursive(src: &Path, dest: &Path) -> Result<u64> {
    if src.is_dir() {
        fs::create_dir_all(dest)?;
        let mut copied = 0;
        for entry in fs::read_dir(src)?.flatten() {
            copied += copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
        }
        Ok(copied)
    } else {
        fs::copy(src, dest)?;
        Ok(1)
    }
}

/// Absolute, symlink-free form of a path that may not exist yet: `.` and
/// `..` are folded, the deepest existing ancestor is canonicalized and the
/// rest appended
fn resolve(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut absolute = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                absolute.pop();
            }
            other => absolute.push(other),
        }
    }

    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in rest.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// Fails when `dest_dir` is `src` or lies anywhere below it
fn ensure_outside(src: &Path, dest_dir: &Path, verb: &str) -> Result<()> {
    if src.is_dir() && resolve(dest_dir)?.starts_with(resolve(src)?) {
        return Err(QdError::invalid_path(format!(
            "cannot {} a directory into itself",
            verb
        )));
    }
    Ok(())
}

/// Copy a file or directory into `dest_dir`
pub fn copy(src: &Path, dest_dir: &Path) -> OpOutcome<PathBuf> {
    guard("copy", || {
        require_path(src)?;
        ensure_outside(src, dest_dir, "copy")?;
        fs::create_dir_all(dest_dir)?;
        let target = unique_target(dest_dir, &file_name_of(src)?);

        let copied = copy_recursive(src, &target)?;
        Ok(OpOutcome::success(format!(
            "Copied {} file(s) to {}",
            copied,
            target.display()
        ))
        .with_detail(target))
    })
}

/// Move a file or directory into `dest_dir`
pub fn move_to(src: &Path, dest_dir: &Path) -> OpOutcome<PathBuf> {
    guard("move_to", || {
        require_path(src)?;
        ensure_outside(src, dest_dir, "move")?;
        fs::create_dir_all(dest_dir)?;
        let target = unique_target(dest_dir, &file_name_of(src)?);

        if fs::rename(src, &target).is_err() {
            copy_recursive(src, &target)?;
            if src.is_dir() {
                fs::remove_dir_all(src)?;
            } else {
                fs::remove_file(src)?;
            }
        }
        Ok(OpOutcome::success(format!("Moved to {}", target.display())).with_detail(target))
    })
}

/// Delete a file or directory; `secure` overwrites file contents first
pub fn delete(path: &Path, secure: bool) -> OpOutcome {
    guard("delete", || {
        require_path(path)?;

        if path.is_dir() {
            if secure {
                for file in walk::files_under(path, None) {
                    shred_file(&file)?;
                }
            }
            fs::remove_dir_all(path)?;
        } else if secure {
            shred_file(path)?;
        } else {
            fs::remove_file(path)?;
        }

        let how = if secure { "Securely deleted" } else { "Deleted" };
        Ok(OpOutcome::success(format!("{} {}", how, path.display())))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileAnalysis {
    pub path: PathBuf,
    pub size: u64,
    pub kind: String,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub readonly: bool,
    pub sha256: Option<String>,
}

pub fn analyze_file(path: &Path) -> OpOutcome<FileAnalysis> {
    guard("analyze_file", || {
        require_path(path)?;
        let meta = fs::metadata(path)?;

        let kind = if meta.is_dir() {
            "Directory".to_string()
        } else {
            match lower_ext(path) {
                Some(ext) => format!("{} file ({})", category_for(&ext), ext),
                None => "File".to_string(),
            }
        };

        let analysis = FileAnalysis {
            path: path.to_path_buf(),
            size: meta.len(),
            kind,
            created: meta.created().ok().map(DateTime::<Utc>::from),
            modified: modified_utc(&meta),
            readonly: meta.permissions().readonly(),
            sha256: if meta.is_file() {
                Some(sha256_file(path)?)
            } else {
                None
            },
        };

        let mut items = vec![
            format!("Size: {}", format_size(analysis.size, BINARY)),
            format!("Type: {}", analysis.kind),
        ];
        if let Some(modified) = analysis.modified {
            items.push(format!("Modified: {}", modified.format("%Y-%m-%d %H:%M:%S")));
        }
        if let Some(digest) = &analysis.sha256 {
            items.push(format!("SHA-256: {}", digest));
        }

        Ok(OpOutcome::success(format!("Analyzed {}", path.display()))
            .with_items(items)
            .with_detail(analysis))
    })
}

// ---------------------------------------------------------------------------
// Duplicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Oldest first
    pub files: Vec<PathBuf>,
    pub size: u64,
    /// Bytes taken by every copy but one
    pub waste_size: u64,
}

/// Same-size files confirmed by SHA-256; empty files are ignored
pub fn duplicate_groups(root: &Path) -> Vec<DuplicateGroup> {
    let mut by_size: HashMap<u64, Vec<PathBuf>> = HashMap::new();
    for path in walk::files_under(root, None) {
        if let Ok(meta) = fs::metadata(&path) {
            if meta.len() > 0 {
                by_size.entry(meta.len()).or_default().push(path);
            }
        }
    }

    let mut groups = Vec::new();
    for (size, paths) in by_size.into_iter().filter(|(_, p)| p.len() > 1) {
        let mut by_hash: HashMap<String, Vec<PathBuf>> = HashMap::new();
        for path in paths {
            match sha256_file(&path) {
                Ok(digest) => by_hash.entry(digest).or_default().push(path),
                Err(e) => log::debug!("Could not hash {:?}: {}", path, e),
            }
        }

        for (_, mut files) in by_hash.into_iter().filter(|(_, f)| f.len() > 1) {
            files.sort_by_key(|p| {
                (
                    fs::metadata(p)
                        .and_then(|m| m.modified())
                        .unwrap_or(SystemTime::UNIX_EPOCH),
                    p.clone(),
                )
            });
            groups.push(DuplicateGroup {
                waste_size: size * (files.len() as u64 - 1),
                files,
                size,
            });
        }
    }

    groups.sort_by(|a, b| b.waste_size.cmp(&a.waste_size).then(a.files.cmp(&b.files)));
    groups
}

pub fn find_duplicates(root: &Path) -> OpOutcome<Vec<DuplicateGroup>> {
    guard("find_duplicates", || {
        require_dir(root)?;
        let groups = duplicate_groups(root);
        let waste: u64 = groups.iter().map(|g| g.waste_size).sum();

        let items: Vec<String> = groups
            .iter()
            .take(10)
            .map(|g| {
                format!(
                    "{} copies of {} ({} each)",
                    g.files.len(),
                    g.files[0].display(),
                    format_size(g.size, BINARY)
                )
            })
            .collect();
        Ok(OpOutcome::success(format!(
            "Found {} duplicate groups, {} wasted",
            groups.len(),
            format_size(waste, BINARY)
        ))
        .with_items(items)
        .with_detail(groups))
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupeReport {
    pub deleted_count: usize,
    pub freed_space: u64,
    pub kept_count: usize,
}

/// Keep the oldest file of each duplicate group and delete the others
pub fn dedupe(root: &Path) -> OpOutcome<DedupeReport> {
    guard("dedupe", || {
        require_dir(root)?;
        let mut report = DedupeReport::default();

        for group in duplicate_groups(root) {
            report.kept_count += 1;
            for extra in group.files.iter().skip(1) {
                match fs::remove_file(extra) {
                    Ok(()) => {
                        report.deleted_count += 1;
                        report.freed_space += group.size;
                    }
                    Err(e) => log::warn!("Could not delete duplicate {:?}: {}", extra, e),
                }
            }
        }

        Ok(OpOutcome::success(format!(
            "Deleted {} duplicates, freed {}, kept {} originals",
            report.deleted_count,
            format_size(report.freed_space, BINARY),
            report.kept_count
        ))
        .with_detail(report))
    })
}

// ---------------------------------------------------------------------------
// Organize
// ---------------------------------------------------------------------------

pub fn category_for(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "tiff" | "ico" | "heic" => "Images",
        "pdf" | "doc" | "docx" | "txt" | "rtf" | "odt" | "xls" | "xlsx" | "ppt" | "pptx" | "csv"
        | "md" => "Documents",
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" => "Audio",
        "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" | "webm" => "Video",
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" => "Archives",
        "py" | "js" | "ts" | "html" | "css" | "rs" | "c" | "cpp" | "h" | "java" | "go" | "json"
        | "xml" | "yaml" | "yml" | "sh" | "ps1" => "Code",
        _ => "Other",
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeReport {
    pub moved_count: usize,
    pub failed: usize,
}

/// Move each direct child file of `root` into `root/<folder_for(file)>`
fn organize_by<F>(name: &str, root: &Path, folder_for: F) -> OpOutcome<OrganizeReport>
where
    F: Fn(&Path) -> String,
{
    guard(name, || {
        require_dir(root)?;
        let mut report = OrganizeReport::default();

        for file in child_files(root)? {
            let folder = root.join(folder_for(&file));
            let result = fs::create_dir_all(&folder)
                .map_err(QdError::from)
                .and_then(|_| {
                    let target = unique_target(&folder, &file_name_of(&file)?);
                    move_file(&file, &target).map_err(QdError::from)
                });
            match result {
                Ok(()) => report.moved_count += 1,
                Err(e) => {
                    log::warn!("Could not move {:?}: {}", file, e);
                    report.failed += 1;
                }
            }
        }

        Ok(OpOutcome::success(format!(
            "Moved {} files ({} failed)",
            report.moved_count, report.failed
        ))
        .with_detail(report))
    })
}

/// Images, Documents, Audio, Video, Archives, Code, Other
pub fn auto_organize(root: &Path) -> OpOutcome<OrganizeReport> {
    organize_by("auto_organize", root, |file| {
        category_for(&lower_ext(file).unwrap_or_default()).to_string()
    })
}

/// `YYYY-MM` folders from the local modification time
pub fn sort_by_date(root: &Path) -> OpOutcome<OrganizeReport> {
    organize_by("sort_by_date", root, |file| {
        fs::metadata(file)
            .and_then(|m| m.modified())
            .map(|t| DateTime::<Local>::from(t).format("%Y-%m").to_string())
            .unwrap_or_else(|_| "Unknown".to_string())
    })
}

/// One folder per lower-cased extension
pub fn sort_by_type(root: &Path) -> OpOutcome<OrganizeReport> {
    organize_by("sort_by_type", root, |file| {
        lower_ext(file).unwrap_or_else(|| "no_extension".to_string())
    })
}

// ---------------------------------------------------------------------------
// Rename
// ---------------------------------------------------------------------------

fn parse_filter(filter: Option<&str>) -> Vec<String> {
    filter
        .unwrap_or_default()
        .split(',')
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Expand `{name}`, `{n}` (1-based, `{number}` also accepted) and `{ext}`
pub fn render_name(template: &str, path: &Path, index: usize) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = (index + 1).to_string();

    template
        .replace("{name}", &stem)
        .replace("{number}", &n)
        .replace("{n}", &n)
        .replace("{ext}", &ext)
}

/// `(old name, new name)` for every matching child file of `dir`
pub fn rename_plan(dir: &Path, template: &str, filter: Option<&str>) -> Result<Vec<(String, String)>> {
    require_dir(dir)?;
    if template.trim().is_empty() {
        return Err(QdError::invalid_input("no rename template specified"));
    }

    let extensions = parse_filter(filter);
    let files: Vec<PathBuf> = child_files(dir)?
        .into_iter()
        .filter(|p| extensions.is_empty() || lower_ext(p).is_some_and(|e| extensions.contains(&e)))
        .collect();

    let mut plan = Vec::with_capacity(files.len());
    let mut seen = std::collections::HashSet::new();
    for (index, file) in files.iter().enumerate() {
        let new_name = render_name(template, file, index);
        if new_name.is_empty() || new_name.contains('/') || new_name.contains('\\') {
            return Err(QdError::invalid_input(format!(
                "template produces an invalid name: {:?}",
                new_name
            )));
        }
        if !seen.insert(new_name.clone()) {
            return Err(QdError::invalid_input(format!(
                "template produces duplicate name {:?}; include {{n}}",
                new_name
            )));
        }
        plan.push((file_name_of(file)?, new_name));
    }
    Ok(plan)
}

pub fn preview_rename(dir: &Path, template: &str, filter: Option<&str>) -> OpOutcome<Vec<(String, String)>> {
    guard("preview_rename", || {
        let plan = rename_plan(dir, template, filter)?;
        let items: Vec<String> = plan
            .iter()
            .take(20)
            .map(|(old, new)| format!("{} -> {}", old, new))
            .collect();
        Ok(OpOutcome::success(format!("Preview for {} files", plan.len()))
            .with_items(items)
            .with_detail(plan))
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub renamed_count: usize,
    pub skipped: usize,
}

pub fn bulk_rename(dir: &Path, template: &str, filter: Option<&str>) -> OpOutcome<RenameReport> {
    guard("bulk_rename", || {
        let plan = rename_plan(dir, template, filter)?;
        let mut report = RenameReport::default();

        // Stage through temporary names so renames within the set cannot collide
        let mut staged = Vec::with_capacity(plan.len());
        for (index, (old, new)) in plan.iter().enumerate() {
            if old == new {
                continue;
            }
            let temp = dir.join(format!(".qdesk_rename_{}_{}", std::process::id(), index));
            match fs::rename(dir.join(old), &temp) {
                Ok(()) => staged.push((temp, old, new)),
                Err(e) => {
                    log::warn!("Could not rename {}: {}", old, e);
                    report.skipped += 1;
                }
            }
        }

        for (temp, old, new) in staged {
            let target = dir.join(new);
            let destination = if target.exists() {
                log::warn!("{} already exists, keeping {}", new, old);
                report.skipped += 1;
                dir.join(old)
            } else {
                report.renamed_count += 1;
                target
            };
            fs::rename(&temp, &destination)?;
        }

        Ok(OpOutcome::success(format!(
            "Renamed {} files ({} skipped)",
            report.renamed_count, report.skipped
        ))
        .with_detail(report))
    })
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizedEntry {
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    pub total_files: usize,
    pub total_dirs: usize,
    pub total_size: u64,
    /// Top-level children, largest first
    pub largest: Vec<SizedEntry>,
}

fn tree_size(path: &Path) -> u64 {
    if path.is_dir() {
        walk::files_under(path, None)
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    } else {
        fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }
}

pub fn compute_disk_usage(root: &Path) -> Result<DiskUsage> {
    require_dir(root)?;

    let mut usage = DiskUsage {
        total_dirs: walk::dirs_under(root).count(),
        ..Default::default()
    };
    for path in walk::files_under(root, None) {
        if let Ok(meta) = fs::metadata(&path) {
            usage.total_files += 1;
            usage.total_size += meta.len();
        }
    }

    let mut largest: Vec<SizedEntry> = fs::read_dir(root)?
        .flatten()
        .map(|e| {
            let path = e.path();
            SizedEntry {
                size: tree_size(&path),
                path,
            }
        })
        .collect();
    largest.sort_by(|a, b| b.size.cmp(&a.size).then(a.path.cmp(&b.path)));
    usage.largest = largest;
    Ok(usage)
}

pub fn disk_usage(root: &Path) -> OpOutcome<DiskUsage> {
    guard("disk_usage", || {
        let usage = compute_disk_usage(root)?;
        let items: Vec<String> = usage
            .largest
            .iter()
            .take(10)
            .map(|e| format!("{}: {}", e.path.display(), format_size(e.size, BINARY)))
            .collect();
        Ok(OpOutcome::success(format!(
            "{} files in {} directories, {} total",
            usage.total_files,
            usage.total_dirs,
            format_size(usage.total_size, BINARY)
        ))
        .with_items(items)
        .with_detail(usage))
    })
}

fn large_files(root: &Path, min_size: u64) -> Vec<FileHit> {
    let mut hits: Vec<FileHit> = walk::files_under(root, None)
        .filter_map(FileHit::from_path)
        .filter(|h| h.size >= min_size)
        .collect();
    hits.sort_by(|a, b| b.size.cmp(&a.size).then(a.path.cmp(&b.path)));
    hits
}

pub fn find_large_files(root: &Path, min_size: u64) -> OpOutcome<Vec<FileHit>> {
    guard("find_large_files", || {
        require_dir(root)?;
        let hits = large_files(root, min_size);
        Ok(hits_outcome(
            &format!("Files of {} or more", format_size(min_size, BINARY)),
            hits,
        ))
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeStat {
    /// Lower-cased, empty for files without an extension
    pub extension: String,
    pub count: usize,
    pub size: u64,
}

fn type_stats(root: &Path) -> Vec<TypeStat> {
    let mut stats: BTreeMap<String, (usize, u64)> = BTreeMap::new();
    for path in walk::files_under(root, None) {
        if let Ok(meta) = fs::metadata(&path) {
            let entry = stats.entry(lower_ext(&path).unwrap_or_default()).or_default();
            entry.0 += 1;
            entry.1 += meta.len();
        }
    }

    let mut stats: Vec<TypeStat> = stats
        .into_iter()
        .map(|(extension, (count, size))| TypeStat {
            extension,
            count,
            size,
        })
        .collect();
    stats.sort_by(|a, b| b.size.cmp(&a.size).then(a.extension.cmp(&b.extension)));
    stats
}

pub fn file_types(root: &Path) -> OpOutcome<Vec<TypeStat>> {
    guard("file_types", || {
        require_dir(root)?;
        let stats = type_stats(root);
        let total: u64 = stats.iter().map(|s| s.size).sum();

        let items: Vec<String> = stats
            .iter()
            .take(15)
            .map(|s| {
                let share = if total > 0 {
                    s.size as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                let ext = if s.extension.is_empty() {
                    "No extension"
                } else {
                    s.extension.as_str()
                };
                format!(
                    "{}: {} files, {} ({:.1}%)",
                    ext,
                    s.count,
                    format_size(s.size, BINARY),
                    share
                )
            })
            .collect();
        Ok(OpOutcome::success(format!("{} file types", stats.len()))
            .with_items(items)
            .with_detail(stats))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub path: PathBuf,
    pub analysis_date: DateTime<Utc>,
    pub usage: DiskUsage,
    pub largest_files: Vec<FileHit>,
    pub file_types: Vec<TypeStat>,
    pub duplicate_groups: usize,
    pub duplicate_waste: u64,
}

const LARGE_FILE_BYTES: u64 = 100 * 1024 * 1024;

/// Usage, large files (100 MiB and up), type breakdown and duplicates in one record
pub fn analysis_report(root: &Path) -> OpOutcome<AnalysisReport> {
    guard("analysis_report", || {
        let usage = compute_disk_usage(root)?;
        let duplicates = duplicate_groups(root);

        let report = AnalysisReport {
            path: root.to_path_buf(),
            analysis_date: Utc::now(),
            largest_files: large_files(root, LARGE_FILE_BYTES).into_iter().take(20).collect(),
            file_types: type_stats(root).into_iter().take(15).collect(),
            duplicate_groups: duplicates.len(),
            duplicate_waste: duplicates.iter().map(|g| g.waste_size).sum(),
            usage,
        };

        Ok(OpOutcome::success(format!(
            "Analysis of {}: {} files, {} directories, {}",
            root.display(),
            report.usage.total_files,
            report.usage.total_dirs,
            format_size(report.usage.total_size, BINARY)
        ))
        .with_detail(report))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("Photo.JPG"), vec![1u8; 300]).unwrap();
        fs::write(dir.path().join("notes.txt"), "alpha\nneedle here\nomega\n").unwrap();
        fs::write(dir.path().join("docs").join("report.pdf"), vec![2u8; 1000]).unwrap();
        dir
    }

    #[test]
    fn test_name_matcher() {
        let glob = NameMatcher::new("*.jpg").unwrap();
        assert!(glob.matches("Photo.JPG"));
        assert!(!glob.matches("photo.jpg.txt"));

        let single = NameMatcher::new("file?.txt").unwrap();
        assert!(single.matches("file1.txt"));
        assert!(!single.matches("file10.txt"));

        let sub = NameMatcher::new("Port").unwrap();
        assert!(sub.matches("report.pdf"));
        assert!(NameMatcher::new("*").unwrap().matches("anything"));
    }

    #[test]
    fn test_quick_search_recurses() {
        let dir = tree();
        let outcome = quick_search(dir.path(), "*.pdf");
        assert_eq!(outcome.detail.unwrap().len(), 1);

        let all = quick_search(dir.path(), "*");
        assert_eq!(all.detail.unwrap().len(), 3);
    }

    #[test]
    fn test_missing_or_empty_path_is_error() {
        assert!(quick_search(Path::new(""), "*").is_error());
        assert!(find_duplicates(Path::new("/no/such/dir/here")).is_error());
        assert!(delete(Path::new(""), false).is_error());
        assert!(analyze_file(Path::new("/no/such/file")).is_error());
    }

    #[test]
    fn test_advanced_search_by_size_and_extension() {
        let dir = tree();
        let criteria = SearchCriteria {
            min_size: Some(200),
            ..Default::default()
        };
        assert_eq!(advanced_search(dir.path(), &criteria).detail.unwrap().len(), 2);

        let criteria = SearchCriteria {
            extensions: vec![".JPG".into()],
            modified_within_days: Some(1),
            ..Default::default()
        };
        assert_eq!(advanced_search(dir.path(), &criteria).detail.unwrap().len(), 1);

        let bad = SearchCriteria {
            min_size: Some(10),
            max_size: Some(1),
            ..Default::default()
        };
        assert!(advanced_search(dir.path(), &bad).is_error());
    }

    #[test]
    fn test_search_content_reports_line_numbers() {
        let dir = tree();
        let matches = search_content(dir.path(), "need+le").detail.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line, 2);
        assert_eq!(matches[0].content, "needle here");
    }

    #[test]
    fn test_move_collision_gets_suffix() {
        let dir = tree();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("notes.txt"), "existing").unwrap();

        let outcome = move_to(&dir.path().join("notes.txt"), &dest);
        assert!(outcome.is_success());
        assert_eq!(outcome.detail.unwrap(), dest.join("notes (1).txt"));
        assert!(!dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_resolve_folds_dots_for_missing_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        let base = dir.path().canonicalize().unwrap();

        let spelled = dir.path().join("missing").join("..").join(".").join("a").join("new");
        assert_eq!(resolve(&spelled).unwrap(), base.join("a").join("new"));
    }

    #[test]
    fn test_copy_directory() {
        let dir = tree();
        let dest = TempDir::new().unwrap();
        let outcome = copy(&dir.path().join("docs"), dest.path());
        assert!(outcome.is_success());
        assert!(dest.path().join("docs").join("report.pdf").exists());
        assert!(dir.path().join("docs").join("report.pdf").exists());
    }

    #[test]
    fn test_duplicates_and_dedupe_keep_one() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), b"same bytes").unwrap();
        fs::write(dir.path().join("b.bin"), b"same bytes").unwrap();
        fs::write(dir.path().join("c.bin"), b"diff bytes").unwrap();
        fs::write(dir.path().join("empty1"), b"").unwrap();
        fs::write(dir.path().join("empty2"), b"").unwrap();

        let groups = find_duplicates(dir.path()).detail.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].files.len(), 2);
        assert_eq!(groups[0].waste_size, 10);

        let report = dedupe(dir.path()).detail.unwrap();
        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.kept_count, 1);
        assert_eq!(report.freed_space, 10);
        assert_eq!(
            ["a.bin", "b.bin"]
                .iter()
                .filter(|n| dir.path().join(n).exists())
                .count(),
            1
        );
    }

    #[test]
    fn test_auto_organize_categories() {
        let dir = tree();
        let report = auto_organize(dir.path()).detail.unwrap();
        assert_eq!(report.moved_count, 2);
        assert!(dir.path().join("Images").join("Photo.JPG").exists());
        assert!(dir.path().join("Documents").join("notes.txt").exists());
        // Subdirectories are left alone
        assert!(dir.path().join("docs").join("report.pdf").exists());
    }

    #[test]
    fn test_sort_by_type_and_date() {
        let dir = tree();
        sort_by_type(dir.path());
        assert!(dir.path().join("jpg").join("Photo.JPG").exists());

        let dated = TempDir::new().unwrap();
        fs::write(dated.path().join("x.txt"), b"x").unwrap();
        sort_by_date(dated.path());
        let folder = Local::now().format("%Y-%m").to_string();
        assert!(dated.path().join(folder).join("x.txt").exists());
    }

    #[test]
    fn test_rename_template_and_filter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.jpg"), b"1").unwrap();
        fs::write(dir.path().join("a.jpg"), b"2").unwrap();
        fs::write(dir.path().join("keep.txt"), b"3").unwrap();

        let plan = preview_rename(dir.path(), "holiday_{n}.{ext}", Some(".jpg"))
            .detail
            .unwrap();
        assert_eq!(
            plan,
            vec![
                ("a.jpg".to_string(), "holiday_1.jpg".to_string()),
                ("b.jpg".to_string(), "holiday_2.jpg".to_string()),
            ]
        );

        let report = bulk_rename(dir.path(), "holiday_{n}.{ext}", Some("jpg"))
            .detail
            .unwrap();
        assert_eq!(report.renamed_count, 2);
        assert!(dir.path().join("holiday_1.jpg").exists());
        assert!(dir.path().join("keep.txt").exists());
    }

    #[test]
    fn test_rename_swap_does_not_collide() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("0.txt"), b"zero").unwrap();
        fs::write(dir.path().join("1.txt"), b"one").unwrap();

        // 0.txt -> 1.txt while 1.txt -> 2.txt
        let report = bulk_rename(dir.path(), "{n}.{ext}", None).detail.unwrap();
        assert_eq!(report.renamed_count, 2);
        assert_eq!(fs::read(dir.path().join("1.txt")).unwrap(), b"zero");
        assert_eq!(fs::read(dir.path().join("2.txt")).unwrap(), b"one");
        assert!(!dir.path().join("0.txt").exists());
    }

    #[test]
    fn test_rename_rejects_constant_template() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"1").unwrap();
        fs::write(dir.path().join("b.txt"), b"2").unwrap();
        assert!(bulk_rename(dir.path(), "same.txt", None).is_error());
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_usage_and_types() {
        let dir = tree();
        let usage = disk_usage(dir.path()).detail.unwrap();
        assert_eq!(usage.total_files, 3);
        assert_eq!(usage.total_dirs, 1);
        assert_eq!(usage.largest[0].path, dir.path().join("docs"));

        let types = file_types(dir.path()).detail.unwrap();
        assert_eq!(types[0].extension, "pdf");
        assert_eq!(types.len(), 3);

        let large = find_large_files(dir.path(), 500).detail.unwrap();
        assert_eq!(large.len(), 1);
    }

    #[test]
    fn test_analyze_file_hashes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();
        let analysis = analyze_file(&path).detail.unwrap();
        assert_eq!(analysis.size, 3);
        assert!(analysis.kind.starts_with("Documents"));
        assert_eq!(
            analysis.sha256.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_secure_delete_directory() {
        let dir = tree();
        let docs = dir.path().join("docs");
        assert!(delete(&docs, true).is_success());
        assert!(!docs.exists());
    }
}
