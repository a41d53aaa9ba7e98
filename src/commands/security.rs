//! Malware scans, quarantine, registry review, hardening and network checks.
//!
//! Scan results are kept in a [`Session`] so `--quarantine` and `--block`
//! act on exactly what was just reported.

use anyhow::Result;
use clap::ArgMatches;
use colored::Colorize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::{run_bulk, show, Context};
use crate::core::ops::{netguard, security, Status};
use crate::core::session::Session;

pub fn execute(matches: &ArgMatches, ctx: &Context) -> Result<Status> {
    let session = Session::new(ctx.config.clone());

    let status = match matches.subcommand() {
        Some(("quick-scan", sub)) => {
            let status = show(session.quick_scan());
            offer_quarantine(&session, ctx, sub.get_flag("quarantine"))?.unwrap_or(status)
        }
        Some(("deep-scan", sub)) => deep_scan(&session, ctx, sub.get_flag("quarantine"))?,
        Some(("shred", sub)) => {
            let paths: Vec<PathBuf> = sub
                .get_many::<String>("paths")
                .map(|v| v.map(PathBuf::from).collect())
                .unwrap_or_default();
            let prompt = format!("Overwrite and delete {} file(s)? This cannot be undone.", paths.len());
            if !ctx.confirm(&prompt)? {
                return super::cancelled();
            }
            show(security::secure_delete_files(&paths))
        }
        Some(("registry", _)) => show(security::scan_registry_threats()),
        Some(("harden", _)) => {
            if !ctx.confirm("Disable remote services and change security settings?")? {
                return super::cancelled();
            }
            show(security::harden_settings())
        }
        Some(("protect", _)) => {
            if !ctx.confirm("Enable Defender, UAC and SmartScreen protections?")? {
                return super::cancelled();
            }
            show(security::enable_advanced_protection())
        }
        Some(("audit", _)) => audit()?,
        Some(("network", sub)) => {
            let status = show(session.scan_network());
            if sub.get_flag("block") && session.connection_count() > 0 {
                let prompt = format!(
                    "Add outbound block rules for {} connection(s)?",
                    session.connection_count()
                );
                if ctx.confirm(&prompt)? {
                    show(session.block_last())
                } else {
                    status
                }
            } else {
                status
            }
        }
        Some(("firewall", _)) => show(netguard::firewall_status()),
        Some(("network-analysis", _)) => {
            run_bulk("network-analysis", netguard::network_analysis())?
        }
        Some(("full-protection", _)) => {
            if !ctx.confirm("Apply hardening, protections and clear system traces?")? {
                return super::cancelled();
            }
            run_bulk("full-protection", security::full_protection())?
        }
        Some(("comprehensive", _)) => {
            run_bulk("comprehensive-scan", security::comprehensive(&ctx.config))?
        }
        _ => {
            println!("Use 'qdesk security --help' for more information.");
            Status::Success
        }
    };

    session.shutdown()?;
    Ok(status)
}

/// Quarantine the stashed threats when asked to and when there are any
fn offer_quarantine(session: &Session, ctx: &Context, wanted: bool) -> Result<Option<Status>> {
    let count = session.threat_count();
    if !wanted || count == 0 {
        return Ok(None);
    }
    let target = ctx.config.quarantine_dir();
    let prompt = format!("Move {} file(s) to {}?", count, target.display());
    if !ctx.confirm(&prompt)? {
        return Ok(Some(Status::Warning));
    }
    Ok(Some(show(session.quarantine_last())))
}

fn deep_scan(session: &Session, ctx: &Context, quarantine: bool) -> Result<Status> {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("{}", "Cancellation requested, finishing the current file...".yellow().bold());
        cancel_clone.cancel();
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    println!("{}", "Deep scan started. Press Ctrl+C to stop early.".dimmed());
    let outcome = security::deep_malware_scan(&ctx.config, &cancel);
    if let Some(report) = &outcome.detail {
        session.remember_threats(report.threats.clone());
    }
    let status = show(outcome);
    Ok(offer_quarantine(session, ctx, quarantine)?.unwrap_or(status))
}

fn audit() -> Result<Status> {
    let outcome = security::security_audit();
    if let Some(results) = &outcome.detail {
        for (name, check) in [
            ("Updates", &results.windows_updates),
            ("Antivirus", &results.antivirus),
            ("Firewall", &results.firewall),
            ("Accounts", &results.user_accounts),
            ("Integrity", &results.system_integrity),
        ] {
            println!("  {:<10} {:<12} {:>3}", name.white().bold(), check.status, check.score);
        }
        println!();
    }
    Ok(show(outcome))
}
