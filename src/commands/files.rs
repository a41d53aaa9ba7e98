use anyhow::{Context as _, Result};
use clap::ArgMatches;
use std::fs;
use std::path::{Path, PathBuf};

use super::{show, Context};
use crate::core::ops::files::{self, SearchCriteria};
use crate::core::ops::Status;

const MIB: u64 = 1024 * 1024;

fn path_arg(matches: &ArgMatches, id: &str) -> Result<PathBuf> {
    matches
        .get_one::<String>(id)
        .map(PathBuf::from)
        .with_context(|| format!("{} argument is required", id))
}

fn text_arg<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("{} argument is required", id))
}

fn criteria(matches: &ArgMatches) -> SearchCriteria {
    SearchCriteria {
        name: matches.get_one::<String>("name").cloned(),
        extensions: matches
            .get_many::<String>("ext")
            .map(|v| v.map(|e| e.trim_start_matches('.').to_string()).collect())
            .unwrap_or_default(),
        min_size: matches.get_one::<u64>("min-kb").map(|kb| kb * 1024),
        max_size: matches.get_one::<u64>("max-kb").map(|kb| kb * 1024),
        modified_within_days: matches.get_one::<u32>("days").copied(),
    }
}

pub fn execute(matches: &ArgMatches, ctx: &Context) -> Result<Status> {
    let Some((op, sub)) = matches.subcommand() else {
        println!("Use 'qdesk files --help' for more information.");
        return Ok(Status::Success);
    };

    let status = match op {
        "search" => show(files::quick_search(
            &path_arg(sub, "path")?,
            text_arg(sub, "pattern")?,
        )),
        "find" => show(files::advanced_search(&path_arg(sub, "path")?, &criteria(sub))),
        "grep" => show(files::search_content(
            &path_arg(sub, "path")?,
            text_arg(sub, "regex")?,
        )),
        "copy" => show(files::copy(&path_arg(sub, "src")?, &path_arg(sub, "dest")?)),
        "move" => show(files::move_to(&path_arg(sub, "src")?, &path_arg(sub, "dest")?)),
        "delete" => {
            let path = path_arg(sub, "path")?;
            let secure = sub.get_flag("secure");
            let prompt = if secure {
                format!("Overwrite and delete {}?", path.display())
            } else {
                format!("Delete {}?", path.display())
            };
            if !ctx.confirm(&prompt)? {
                return super::cancelled();
            }
            show(files::delete(&path, secure))
        }
        "info" => show(files::analyze_file(&path_arg(sub, "path")?)),
        "duplicates" => {
            let root = path_arg(sub, "path")?;
            if sub.get_flag("delete") {
                if !ctx.confirm("Delete every duplicate except the oldest copy?")? {
                    return super::cancelled();
                }
                show(files::dedupe(&root))
            } else {
                show(files::find_duplicates(&root))
            }
        }
        "organize" => {
            let root = path_arg(sub, "path")?;
            let by = sub.get_one::<String>("by").map(String::as_str).unwrap_or("category");
            if !ctx.confirm(&format!("Move the files in {} into {} folders?", root.display(), by))? {
                return super::cancelled();
            }
            match by {
                "date" => show(files::sort_by_date(&root)),
                "type" => show(files::sort_by_type(&root)),
                _ => show(files::auto_organize(&root)),
            }
        }
        "rename" => {
            let dir = path_arg(sub, "path")?;
            let template = text_arg(sub, "template")?;
            let filter = sub.get_one::<String>("filter").map(String::as_str);
            if sub.get_flag("dry-run") {
                show(files::preview_rename(&dir, template, filter))
            } else {
                let preview = files::preview_rename(&dir, template, filter);
                if preview.is_error() || preview.detail.as_ref().is_some_and(|p| p.is_empty()) {
                    return Ok(show(preview));
                }
                crate::ui::print_outcome(&preview);
                if !ctx.confirm("Apply these renames?")? {
                    return super::cancelled();
                }
                show(files::bulk_rename(&dir, template, filter))
            }
        }
        "usage" => show(files::disk_usage(&path_arg(sub, "path")?)),
        "large" => {
            let min_mb = sub.get_one::<u64>("min-mb").copied().unwrap_or(100);
            show(files::find_large_files(&path_arg(sub, "path")?, min_mb * MIB))
        }
        "types" => show(files::file_types(&path_arg(sub, "path")?)),
        "analyze" => {
            let outcome = files::analysis_report(&path_arg(sub, "path")?);
            if let (Some(out), Some(report)) = (sub.get_one::<String>("output"), &outcome.detail) {
                write_json(Path::new(out), report)?;
                println!("Analysis written to {}", out);
            }
            show(outcome)
        }
        other => {
            println!("Unknown files operation: {}", other);
            Status::Error
        }
    };
    Ok(status)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};

    #[test]
    fn test_criteria_from_flags() {
        let cmd = Command::new("find")
            .arg(Arg::new("name").long("name"))
            .arg(Arg::new("ext").long("ext").action(ArgAction::Append))
            .arg(
                Arg::new("min-kb")
                    .long("min-kb")
                    .value_parser(clap::value_parser!(u64)),
            )
            .arg(
                Arg::new("max-kb")
                    .long("max-kb")
                    .value_parser(clap::value_parser!(u64)),
            )
            .arg(
                Arg::new("days")
                    .long("days")
                    .value_parser(clap::value_parser!(u32)),
            );
        let matches = cmd
            .try_get_matches_from(["find", "--ext", ".txt", "--ext", "md", "--min-kb", "2"])
            .unwrap();

        let c = criteria(&matches);
        assert_eq!(c.extensions, vec!["txt", "md"]);
        assert_eq!(c.min_size, Some(2048));
        assert_eq!(c.max_size, None);
        assert_eq!(c.name, None);
    }
}
