// check.rs — Evaluate one action request the way an agent would before acting.

use chrono::{DateTime, Utc};
use clap::Args;

use bmod_policy::{ActionRequest, SecurityLevel};
use bmod_runtime::{RuntimeConfig, RuntimeController};

#[derive(Args)]
pub struct CheckArgs {
    /// User id or email the agent acts for.
    #[arg(long)]
    actor: String,
    /// Action verb or tool name (e.g. send_email).
    #[arg(long)]
    action: String,
    #[arg(long)]
    role: Option<String>,
    /// Text content the action carries.
    #[arg(long)]
    payload: Option<String>,
    /// Security level: low, normal, high, critical.
    #[arg(long, default_value = "normal")]
    level: SecurityLevel,
    /// Request time (RFC 3339); defaults to now.
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

impl CheckArgs {
    fn request(&self) -> ActionRequest {
        let mut request =
            ActionRequest::new(&self.actor, &self.action).security_level(self.level);
        if let Some(role) = &self.role {
            request = request.role(role);
        }
        if let Some(payload) = &self.payload {
            request = request.payload(payload);
        }
        if let Some(at) = self.at {
            request = request.at(at);
        }
        request
    }
}

pub fn execute(args: &CheckArgs, config: &RuntimeConfig) -> anyhow::Result<()> {
    let controller = RuntimeController::open(config)?;
    let decision = controller.before_action(&args.request())?;

    println!("{}", if decision.allowed { "ALLOWED" } else { "DENIED" });
    for reason in &decision.reasons {
        println!("  - {}", reason);
    }

    if !decision.allowed {
        anyhow::bail!("action denied by {} policy(ies)", decision.matched_policy_ids.len());
    }
    Ok(())
}
