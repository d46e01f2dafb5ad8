// audit.rs — Audit subcommands: tail, verify, query.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use bmod_audit::{AuditEntry, AuditError, AuditFilter, AuditKind, AuditRecord, JsonlSink};
use bmod_runtime::RuntimeConfig;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the audit log hash chain integrity.
    Verify {
        /// Path to audit log (defaults to .bmod/audit.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Show recent audit entries.
    Tail {
        /// Path to audit log (defaults to .bmod/audit.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Number of entries to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
    /// Show entries matching a filter.
    Query {
        #[arg(long)]
        log: Option<PathBuf>,
        /// Only denied decisions.
        #[arg(long, conflicts_with = "allowed")]
        denied: bool,
        /// Only allowed decisions.
        #[arg(long)]
        allowed: bool,
        /// Only entries for this actor or operator.
        #[arg(long)]
        actor: Option<String>,
        /// Only policy mutations (added, removed, rejected).
        #[arg(long, conflicts_with_all = ["denied", "allowed"])]
        mutations: bool,
        /// Show only the last N matching entries.
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn execute(cmd: &AuditCommands, config: &RuntimeConfig) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Verify { log } => {
            let path = log.clone().unwrap_or_else(|| config.audit_log.clone());
            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            match JsonlSink::verify_chain(&path) {
                Ok(count) => {
                    println!("Audit log verified: {} entry(ies), hash chain intact.", count);
                }
                Err(AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {}:", line);
                    println!("  Expected previous_hash: {}", expected);
                    println!("  Actual previous_hash:   {}", actual);
                    println!();
                    println!("The audit log may have been tampered with.");
                    anyhow::bail!("Audit log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { log, n } => {
            let Some(entries) = read(log.as_deref(), config)? else {
                return Ok(());
            };
            let start = entries.len().saturating_sub(*n);
            print_entries(&entries[start..]);
        }

        AuditCommands::Query {
            log,
            denied,
            allowed,
            actor,
            mutations,
            limit,
        } => {
            let Some(entries) = read(log.as_deref(), config)? else {
                return Ok(());
            };
            let mut filter = if *denied {
                AuditFilter::denied_only()
            } else if *allowed {
                AuditFilter::allowed_only()
            } else {
                AuditFilter::all()
            };
            if *mutations {
                filter = filter
                    .kind(AuditKind::PolicyAdded)
                    .kind(AuditKind::PolicyRemoved)
                    .kind(AuditKind::ModificationRejected);
            }
            if let Some(actor) = actor {
                filter = filter.actor(actor);
            }
            if let Some(n) = limit {
                filter = filter.limit(*n);
            }
            print_entries(&filter.apply(&entries));
        }
    }

    Ok(())
}

/// Entries from the log, or None (after saying so) when there is no log yet.
fn read(log: Option<&Path>, config: &RuntimeConfig) -> anyhow::Result<Option<Vec<AuditEntry>>> {
    let path = log.unwrap_or(&config.audit_log);
    if !path.exists() {
        println!("No audit log found at {}", path.display());
        return Ok(None);
    }
    Ok(Some(JsonlSink::read_all(path)?))
}

fn print_entries(entries: &[AuditEntry]) {
    if entries.is_empty() {
        println!("No audit entries.");
        return;
    }

    println!(
        "{:<6} {:<20} {:<22} {:<24} DETAIL",
        "SEQ", "TIMESTAMP", "KIND", "ACTOR"
    );
    println!("{}", "-".repeat(100));

    for entry in entries {
        println!(
            "{:<6} {:<20} {:<22} {:<24} {}",
            entry.sequence,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.kind.to_string(),
            entry.actor().unwrap_or("-"),
            detail(entry),
        );
    }
}

fn detail(entry: &AuditEntry) -> String {
    match &entry.record {
        AuditRecord::Decision { request, decision } => {
            let verdict = if decision.allowed { "allowed" } else { "denied" };
            match decision.reasons.first() {
                Some(reason) if !decision.allowed => {
                    format!("{} {} ({})", request.action, verdict, reason)
                }
                _ => format!("{} {}", request.action, verdict),
            }
        }
        AuditRecord::Mutation { policy, outcome } => {
            format!("{} {}: {}", outcome, policy.rule_kind, policy.description)
        }
    }
}
