// policy.rs — Policy subcommands: add, list, remove, history.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use uuid::Uuid;

use bmod_policy::PolicyRule;
use bmod_runtime::{Modification, Operator, RuntimeConfig, RuntimeController};

/// Who is asking for the change.
#[derive(Args)]
pub struct OperatorArgs {
    /// Operator id recorded in the audit log.
    #[arg(long, default_value = "operator")]
    admin: String,
    /// Operator role; must be one of the configured admin roles. Without
    /// it the operator has no role and every change is refused.
    #[arg(long)]
    role: Option<String>,
}

impl OperatorArgs {
    fn operator(&self) -> Operator {
        let operator = Operator::new(&self.admin);
        match &self.role {
            Some(role) => operator.role(role),
            None => operator,
        }
    }
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Add a policy from a YAML rule file or from plain language.
    Add {
        /// YAML rule spec (e.g. `kind: action_restriction`).
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        file: Option<PathBuf>,
        /// Plain-language request, e.g. "Block user spam@example.com".
        #[arg(long)]
        text: Option<String>,
        /// Description for a rule loaded from --file.
        #[arg(long, requires = "file")]
        description: Option<String>,
        #[command(flatten)]
        operator: OperatorArgs,
    },
    /// List policies in evaluation order.
    List {
        /// Include removed policies.
        #[arg(long)]
        all: bool,
    },
    /// Remove (deactivate) a policy.
    Remove {
        /// Policy id as printed by `bmod policy list`.
        id: Uuid,
        #[command(flatten)]
        operator: OperatorArgs,
    },
    /// Show accepted modifications, oldest first.
    History {
        /// Show only the last N modifications.
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn execute(cmd: &PolicyCommands, config: &RuntimeConfig) -> anyhow::Result<()> {
    let controller = RuntimeController::open(config)?;

    match cmd {
        PolicyCommands::Add {
            file,
            text,
            description,
            operator,
        } => {
            let modification = match (file, text) {
                (Some(path), _) => {
                    let yaml = std::fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    Modification::Rule {
                        rule: PolicyRule::from_yaml(&yaml)?,
                        description: description.clone().unwrap_or_default(),
                    }
                }
                (None, Some(text)) => Modification::Text(text.clone()),
                (None, None) => anyhow::bail!("either --file or --text is required"),
            };
            let id = controller.record_modification(&operator.operator(), modification)?;
            let policy = controller
                .engine()
                .get_policy(id)?
                .context("policy vanished after being added")?;
            println!("Added policy {} ({})", id, policy.rule.kind_name());
            println!("  {}", policy.description);
        }

        PolicyCommands::List { all } => {
            let policies = if *all {
                controller.engine().all_policies()?
            } else {
                controller.list_policies()?
            };

            if policies.is_empty() {
                println!("No policies.");
                return Ok(());
            }

            println!("{:<38} {:<20} {:<8} DESCRIPTION", "ID", "KIND", "ACTIVE");
            println!("{}", "-".repeat(90));
            for p in &policies {
                println!(
                    "{:<38} {:<20} {:<8} {}",
                    p.id,
                    p.rule.kind_name(),
                    if p.active { "yes" } else { "no" },
                    p.description,
                );
            }
        }

        PolicyCommands::Remove { id, operator } => {
            controller.remove_policy(&operator.operator(), *id)?;
            println!("Removed policy {}", id);
        }

        PolicyCommands::History { limit } => {
            let history = controller.modification_history(*limit)?;
            if history.is_empty() {
                println!("No modifications.");
                return Ok(());
            }

            println!(
                "{:<20} {:<8} {:<38} {:<16} REQUEST",
                "TIMESTAMP", "CHANGE", "POLICY", "BY"
            );
            println!("{}", "-".repeat(100));
            for record in &history {
                println!(
                    "{:<20} {:<8} {:<38} {:<16} {}",
                    record.at.format("%Y-%m-%d %H:%M:%S"),
                    record.change.to_string(),
                    record.policy_id,
                    record.requester,
                    record.text,
                );
            }
        }
    }

    Ok(())
}
