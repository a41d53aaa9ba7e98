use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;

use qdesk::commands::{self, Context};
use qdesk::core::ops::Status;
use qdesk::Config;

fn path_arg(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id).help(help).required(true)
}

fn root_cmd(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .arg(path_arg("path", "Directory to work in"))
}

fn build_cli() -> Command {
    Command::new("qdesk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("QuantumDesk: live system metrics plus optimizer, security, file and automation tools")
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .help("Answer yes to every confirmation")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log more (-v info, -vv debug)")
                .global(true)
                .action(ArgAction::Count),
        )
        .subcommand(
            Command::new("monitor")
                .about("Live dashboard with gauges, sparklines and one-key operations")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print one JSON line per sampler tick instead of the dashboard")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("ticks")
                        .long("ticks")
                        .value_name("N")
                        .help("Stop after N lines (with --json)")
                        .value_parser(clap::value_parser!(u64))
                        .requires("json"),
                ),
        )
        .subcommand(Command::new("health").about("CPU, memory, disk and process summary"))
        .subcommand(
            Command::new("diagnose")
                .about("Sample CPU, then grade memory, disks, network and stability")
                .arg(
                    Arg::new("cpu-seconds")
                        .long("cpu-seconds")
                        .value_name("SECS")
                        .help("How long to sample CPU usage")
                        .default_value("10")
                        .value_parser(clap::value_parser!(u64).range(0..=120)),
                ),
        )
        .subcommand(
            Command::new("services")
                .about("List system services")
                .arg(
                    Arg::new("running")
                        .long("running")
                        .help("Only show running services")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Export a system report as JSON")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Output file (default: qdesk_report_<timestamp>.json)"),
                ),
        )
        .subcommand(
            Command::new("optimize")
                .about("Memory, process, cleanup and power-plan operations")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("free-ram").about("Trim process working sets"))
                .subcommand(Command::new("clear-cache").about("Delete user temp files"))
                .subcommand(Command::new("memory").about("Trim memory and report availability"))
                .subcommand(Command::new("kill-heavy").about("End unprotected memory-heavy processes"))
                .subcommand(Command::new("idle-apps").about("End idle applications"))
                .subcommand(Command::new("chrome").about("Close Chrome"))
                .subcommand(Command::new("startup").about("List autostart entries"))
                .subcommand(Command::new("disable-startup").about("Disable heavy autostart entries"))
                .subcommand(Command::new("boot").about("Boot optimization"))
                .subcommand(Command::new("temp").about("Clean temporary directories"))
                .subcommand(Command::new("recycle").about("Empty the recycle bin"))
                .subcommand(Command::new("prefetch").about("Clear the prefetch folder"))
                .subcommand(Command::new("registry").about("Registry cleaning"))
                .subcommand(Command::new("disk-cleanup").about("Start the system disk cleanup tool"))
                .subcommand(
                    Command::new("game-mode")
                        .about("Raise a running process (name or pid) to high priority")
                        .arg(Arg::new("process").required(true).help("Process name or pid")),
                )
                .subcommand(Command::new("high-performance").about("Switch to the high performance power plan"))
                .subcommand(Command::new("priority").about("Foreground priority boost"))
                .subcommand(Command::new("full-clean").about("Temp, cache, recycle bin and prefetch"))
                .subcommand(Command::new("auto").about("Pick steps from the current system health"))
                .subcommand(Command::new("elite").about("Memory, idle apps, temp, cache, prefetch, registry")),
        )
        .subcommand(
            Command::new("security")
                .about("Malware scans, quarantine, hardening and network checks")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("quick-scan")
                        .about("Scan the first files of the configured folders")
                        .arg(
                            Arg::new("quarantine")
                                .long("quarantine")
                                .help("Quarantine what the scan finds")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("deep-scan")
                        .about("Scan every file, including known-hash checks")
                        .arg(
                            Arg::new("quarantine")
                                .long("quarantine")
                                .help("Quarantine what the scan finds")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("shred")
                        .about("Overwrite files three times, then delete them")
                        .arg(
                            Arg::new("paths")
                                .help("Files to destroy")
                                .required(true)
                                .num_args(1..),
                        ),
                )
                .subcommand(Command::new("registry").about("Review autostart registry entries"))
                .subcommand(Command::new("harden").about("Disable remote services and autorun"))
                .subcommand(Command::new("protect").about("Defender, UAC, SmartScreen and DEP"))
                .subcommand(Command::new("audit").about("Score updates, antivirus, firewall, accounts, integrity"))
                .subcommand(
                    Command::new("network")
                        .about("Flag suspicious established connections")
                        .arg(
                            Arg::new("block")
                                .long("block")
                                .help("Add outbound block rules for what is flagged")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(Command::new("firewall").about("Check that every firewall profile is on"))
                .subcommand(Command::new("network-analysis").about("Connection scan and firewall status"))
                .subcommand(Command::new("full-protection").about("Hardening, protection, traces and network"))
                .subcommand(Command::new("comprehensive").about("Malware, registry, network and audit")),
        )
        .subcommand(
            Command::new("privacy")
                .about("Clear browser data and usage traces")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("browsers").about("Chrome, Edge and Firefox history, cookies and caches"))
                .subcommand(Command::new("traces").about("Recent documents, jump lists and event logs")),
        )
        .subcommand(
            Command::new("files")
                .about("Search, organize, deduplicate and analyze files")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    root_cmd("search", "Find files by name or glob")
                        .arg(path_arg("pattern", "Name fragment or glob (*, ?)")),
                )
                .subcommand(
                    root_cmd("find", "Find files by name, extension, size and age")
                        .arg(Arg::new("name").long("name").help("Name fragment or glob"))
                        .arg(
                            Arg::new("ext")
                                .long("ext")
                                .help("Extension to include (repeatable)")
                                .action(ArgAction::Append),
                        )
                        .arg(
                            Arg::new("min-kb")
                                .long("min-kb")
                                .help("Minimum size in KiB")
                                .value_parser(clap::value_parser!(u64)),
                        )
                        .arg(
                            Arg::new("max-kb")
                                .long("max-kb")
                                .help("Maximum size in KiB")
                                .value_parser(clap::value_parser!(u64)),
                        )
                        .arg(
                            Arg::new("days")
                                .long("days")
                                .help("Modified within this many days")
                                .value_parser(clap::value_parser!(u32)),
                        ),
                )
                .subcommand(
                    root_cmd("grep", "Search text file contents with a regex")
                        .arg(path_arg("regex", "Regular expression")),
                )
                .subcommand(
                    Command::new("copy")
                        .about("Copy a file or folder into a directory")
                        .arg(path_arg("src", "Source"))
                        .arg(path_arg("dest", "Destination directory")),
                )
                .subcommand(
                    Command::new("move")
                        .about("Move a file or folder into a directory")
                        .arg(path_arg("src", "Source"))
                        .arg(path_arg("dest", "Destination directory")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a file or folder")
                        .arg(path_arg("path", "File or folder"))
                        .arg(
                            Arg::new("secure")
                                .long("secure")
                                .help("Overwrite files before deleting them")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("info")
                        .about("Size, type, timestamps and SHA-256 of a file")
                        .arg(path_arg("path", "File")),
                )
                .subcommand(
                    root_cmd("duplicates", "Group identical files").arg(
                        Arg::new("delete")
                            .long("delete")
                            .help("Keep the oldest copy and delete the rest")
                            .action(ArgAction::SetTrue),
                    ),
                )
                .subcommand(
                    root_cmd("organize", "Move files into folders").arg(
                        Arg::new("by")
                            .long("by")
                            .value_parser(["category", "date", "type"])
                            .default_value("category"),
                    ),
                )
                .subcommand(
                    root_cmd("rename", "Rename files from a template ({name}, {n}, {ext})")
                        .arg(path_arg("template", "Name template"))
                        .arg(Arg::new("filter").long("filter").help("Only files with this extension"))
                        .arg(
                            Arg::new("dry-run")
                                .long("dry-run")
                                .help("Show the new names without renaming")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(root_cmd("usage", "Sizes of the top-level entries"))
                .subcommand(
                    root_cmd("large", "Files above a size").arg(
                        Arg::new("min-mb")
                            .long("min-mb")
                            .value_parser(clap::value_parser!(u64))
                            .default_value("100"),
                    ),
                )
                .subcommand(root_cmd("types", "Counts and sizes per extension"))
                .subcommand(
                    root_cmd("analyze", "Usage, large files, types and duplicates").arg(
                        Arg::new("output")
                            .short('o')
                            .long("output")
                            .value_name("FILE")
                            .help("Also write the analysis as JSON"),
                    ),
                ),
        )
        .subcommand(
            Command::new("power")
                .about("Scheduled shutdown/restart and application control")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("shutdown").about("Shut down after a delay").arg(
                        Arg::new("minutes")
                            .required(true)
                            .value_parser(clap::value_parser!(u32)),
                    ),
                )
                .subcommand(
                    Command::new("restart").about("Restart after a delay").arg(
                        Arg::new("minutes")
                            .required(true)
                            .value_parser(clap::value_parser!(u32)),
                    ),
                )
                .subcommand(Command::new("cancel").about("Cancel a scheduled shutdown or restart"))
                .subcommand(
                    Command::new("launch")
                        .about("Start applications")
                        .arg(Arg::new("apps").required(true).num_args(1..)),
                )
                .subcommand(
                    Command::new("close-all")
                        .about("Close running applications")
                        .arg(
                            Arg::new("exclude")
                                .long("exclude")
                                .help("Executable to leave running (repeatable)")
                                .action(ArgAction::Append),
                        ),
                ),
        )
        .subcommand(
            Command::new("task")
                .about("Scheduled commands")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("create")
                        .about("Add a task")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("command").long("command").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .required(true)
                                .value_parser(["once", "hourly", "daily", "weekly"]),
                        )
                        .arg(
                            Arg::new("value")
                                .long("value")
                                .help("HH:MM, 'YYYY-MM-DD HH:MM' (once) or day:HH:MM (weekly)"),
                        ),
                )
                .subcommand(Command::new("list").about("List tasks with their next run"))
                .subcommand(Command::new("delete").about("Remove a task").arg(id_arg()))
                .subcommand(Command::new("enable").about("Enable a task").arg(id_arg()))
                .subcommand(Command::new("disable").about("Disable a task").arg(id_arg()))
                .subcommand(Command::new("daemon").about("Run due tasks until Ctrl+C")),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change the configuration")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("path").about("Print the configuration file path"))
                .subcommand(Command::new("reset").about("Restore the defaults"))
                .subcommand(
                    Command::new("add-scan-dir")
                        .about("Add a folder to the malware scan list")
                        .arg(path_arg("dir", "Folder to scan")),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .help("bash, zsh, fish, powershell or elvish")
                        .required(true),
                ),
        )
        .subcommand(Command::new("version").about("Shows version information"))
}

fn id_arg() -> Arg {
    Arg::new("id")
        .required(true)
        .value_parser(clap::value_parser!(u32))
}

/// The dashboard owns the terminal, so log lines stay off unless RUST_LOG asks
fn log_level(matches: &ArgMatches) -> log::LevelFilter {
    let dashboard = matches
        .subcommand_matches("monitor")
        .is_some_and(|m| !m.get_flag("json"));
    if dashboard {
        return log::LevelFilter::Off;
    }
    match matches.get_count("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

fn run(matches: &ArgMatches) -> Result<Status> {
    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Could not load configuration ({}), using defaults", e);
        Config::default()
    });
    let ctx = Context::new(config, matches.get_flag("yes"));

    match matches.subcommand() {
        Some(("monitor", sub)) => commands::monitor::execute(sub, &ctx),
        Some(("health", _)) => commands::health::execute_health(),
        Some(("report", sub)) => commands::health::execute_report(sub),
        Some(("diagnose", sub)) => commands::health::execute_diagnose(sub),
        Some(("services", sub)) => commands::health::execute_services(sub),
        Some(("optimize", sub)) => commands::optimize::execute(sub, &ctx),
        Some(("security", sub)) => commands::security::execute(sub, &ctx),
        Some(("privacy", sub)) => commands::privacy::execute(sub, &ctx),
        Some(("files", sub)) => commands::files::execute(sub, &ctx),
        Some(("power", sub)) => commands::power::execute(sub, &ctx),
        Some(("task", sub)) => commands::task::execute(sub, &ctx),
        Some(("config", sub)) => commands::config::execute(sub, &ctx),
        Some(("completions", sub)) => commands::completions::execute(sub, &mut build_cli()),
        Some(("version", _)) => commands::version::execute(),
        _ => {
            println!("Welcome to QuantumDesk!");
            println!("Use 'qdesk --help' for more information.");
            Ok(Status::Success)
        }
    }
}

fn main() {
    let matches = build_cli().get_matches();
    qdesk::init_logging_with(log_level(&matches));

    match run(&matches) {
        Ok(Status::Error) => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_dashboard_silences_logging() {
        let matches = build_cli().try_get_matches_from(["qdesk", "monitor"]).unwrap();
        assert_eq!(log_level(&matches), log::LevelFilter::Off);

        let matches = build_cli()
            .try_get_matches_from(["qdesk", "-vv", "monitor", "--json", "--ticks", "3"])
            .unwrap();
        assert_eq!(log_level(&matches), log::LevelFilter::Debug);
    }
}
