// controller.rs — RuntimeController: the interception point between an
// agent choosing an action and executing it.
//
// Agents call `before_action()` and proceed only if the Decision allows.
// Operators change behavior through `record_modification()`; only operators
// holding a configured admin role may do so, and refused attempts are
// audited like accepted ones. The modification history is read back from
// the audit log, so it lasts exactly as long as the log does.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bmod_audit::{AuditEntry, AuditFilter, AuditKind, AuditLog, AuditRecord, PolicySummary};
use bmod_policy::{
    ActionRequest, Decision, FilePolicyStore, NewPolicy, Policy, PolicyEngine, PolicyId,
    PolicyRule,
};
use bmod_translate::{Translation, Translator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{RuntimeConfig, RuntimeSettings};
use crate::error::RuntimeError;

/// Someone asking to change the agent's behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operator {
    pub id: String,
    pub role: Option<String>,
}

impl Operator {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: None,
        }
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Shorthand for an operator with the default admin role.
    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id).role("admin")
    }
}

/// A requested behavior change.
#[derive(Debug, Clone)]
pub enum Modification {
    /// Plain-language request, translated before it is applied.
    Text(String),
    /// A structured rule, applied as given.
    Rule {
        rule: PolicyRule,
        description: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Activated,
    Removed,
}

impl ChangeKind {
    /// The change an accepted mutation entry records, by its outcome.
    fn from_outcome(outcome: &str) -> Option<Self> {
        match outcome {
            "added" => Some(ChangeKind::Added),
            "activated" => Some(ChangeKind::Activated),
            "removed" => Some(ChangeKind::Removed),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::Added => "added",
            ChangeKind::Activated => "activated",
            ChangeKind::Removed => "removed",
        })
    }
}

/// One accepted modification, as the operator-facing history shows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModificationRecord {
    /// Sequence number of the audit entry that recorded the change.
    pub sequence: u64,
    /// "unknown" for changes made without a named operator.
    pub requester: String,
    pub change: ChangeKind,
    /// The plain-language request, or the description of a structured rule.
    pub text: String,
    pub policy_id: PolicyId,
    pub at: DateTime<Utc>,
}

pub struct RuntimeController {
    engine: PolicyEngine,
    translator: Translator,
    admin_roles: Vec<String>,
}

impl RuntimeController {
    pub fn new(engine: PolicyEngine, settings: &RuntimeSettings) -> Result<Self, RuntimeError> {
        Ok(Self {
            engine,
            translator: Translator::new()?,
            admin_roles: settings.admin_roles.clone(),
        })
    }

    /// Everything in memory: no policy store, ephemeral audit log.
    pub fn in_memory() -> Result<Self, RuntimeError> {
        let engine = PolicyEngine::new(Arc::new(AuditLog::in_memory()));
        Self::new(engine, &RuntimeSettings::default())
    }

    /// Open the on-disk state described by `config`. Fails if the policy
    /// store is corrupt or the audit log cannot be opened.
    pub fn open(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let audit = match config.settings.audit_timeout_ms {
            0 => AuditLog::open_jsonl(&config.audit_log)?,
            ms => AuditLog::open_jsonl_with_timeout(&config.audit_log, Duration::from_millis(ms))?,
        };
        let store = FilePolicyStore::open(&config.policies_dir)?;
        let engine = PolicyEngine::open(store, Arc::new(audit))?;
        tracing::info!(root = %config.root.display(), "runtime controller opened");
        Self::new(engine, &config.settings)
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Evaluate an action the agent is about to take. The decision is
    /// already in the audit log when this returns.
    pub fn before_action(&self, request: &ActionRequest) -> Result<Decision, RuntimeError> {
        let decision = self.engine.evaluate(request)?;
        tracing::info!(
            actor = %request.actor,
            action = %request.action,
            allowed = decision.allowed,
            "before_action"
        );
        Ok(decision)
    }

    /// Apply a behavior change on behalf of an admin operator.
    pub fn record_modification(
        &self,
        admin: &Operator,
        modification: Modification,
    ) -> Result<PolicyId, RuntimeError> {
        if !self.is_admin(admin) {
            let (kind, text) = match &modification {
                Modification::Text(text) => ("unknown", text.clone()),
                Modification::Rule { rule, description } => {
                    (rule.kind_name(), description.clone())
                }
            };
            return Err(self.reject(admin, PolicySummary::new(None, kind, text)));
        }

        let new = match modification {
            Modification::Text(text) => {
                let Translation {
                    rule, description, ..
                } = self.translator.translate(&text)?;
                NewPolicy::new(rule, description).source_text(text.trim())
            }
            Modification::Rule { rule, description } => NewPolicy::new(rule, description),
        };

        let id = self.engine.add_policy_with(new.created_by(admin.id.clone()))?;
        tracing::info!(operator = %admin.id, policy_id = %id, "modification applied");
        Ok(id)
    }

    /// Translate plain text and add the resulting policy.
    pub fn translate_and_add(&self, admin: &Operator, text: &str) -> Result<PolicyId, RuntimeError> {
        self.record_modification(admin, Modification::Text(text.to_string()))
    }

    /// Deactivate a policy on behalf of an admin operator.
    pub fn remove_policy(&self, admin: &Operator, id: PolicyId) -> Result<(), RuntimeError> {
        if !self.is_admin(admin) {
            let summary = match self.engine.get_policy(id)? {
                Some(policy) => policy.summary(),
                None => PolicySummary::new(Some(id), "unknown", "remove policy"),
            };
            return Err(self.reject(admin, summary));
        }

        self.engine.remove_policy_as(id, &admin.id)?;
        tracing::info!(operator = %admin.id, policy_id = %id, "policy removed");
        Ok(())
    }

    pub fn list_policies(&self) -> Result<Vec<Policy>, RuntimeError> {
        Ok(self.engine.list_policies()?)
    }

    pub fn get_audit_log(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        self.engine.audit().query(filter)
    }

    /// Accepted modifications, oldest first. With `limit`, only the last N.
    ///
    /// Built from the audit log's add/activate/remove entries, so a runtime
    /// reopened over the same JSONL log sees the same history.
    pub fn modification_history(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<ModificationRecord>, RuntimeError> {
        let filter = AuditFilter::all()
            .kind(AuditKind::PolicyAdded)
            .kind(AuditKind::PolicyRemoved);
        let entries = self.engine.audit().query(&filter);

        // Translated policies show the operator's own words.
        let source_text: HashMap<PolicyId, String> = self
            .engine
            .all_policies()?
            .into_iter()
            .filter_map(|p| Some((p.id, p.source_text?)))
            .collect();

        let mut history: Vec<ModificationRecord> = entries
            .iter()
            .filter_map(|entry| history_record(entry, &source_text))
            .collect();
        if let Some(n) = limit {
            let start = history.len().saturating_sub(n);
            history.drain(..start);
        }
        Ok(history)
    }

    fn is_admin(&self, operator: &Operator) -> bool {
        operator.role.as_deref().is_some_and(|role| {
            self.admin_roles
                .iter()
                .any(|admin| admin.eq_ignore_ascii_case(role.trim()))
        })
    }

    /// Audit a refused modification and build the error for the caller.
    /// If the refusal cannot be audited, that failure is what the caller sees.
    fn reject(&self, operator: &Operator, summary: PolicySummary) -> RuntimeError {
        tracing::warn!(
            operator = %operator.id,
            role = ?operator.role,
            "modification rejected: operator lacks an admin role"
        );
        let record = AuditRecord::mutation(
            summary.requested_by(operator.id.clone()),
            "rejected: operator lacks an admin role",
        );
        match self
            .engine
            .audit()
            .record(AuditKind::ModificationRejected, record)
        {
            Ok(_) => RuntimeError::UnauthorizedModification {
                operator: operator.id.clone(),
                role: operator.role.clone(),
            },
            Err(e) => e.into(),
        }
    }

}

fn history_record(
    entry: &AuditEntry,
    source_text: &HashMap<PolicyId, String>,
) -> Option<ModificationRecord> {
    let AuditRecord::Mutation { policy, outcome } = &entry.record else {
        return None;
    };
    let change = ChangeKind::from_outcome(outcome)?;
    let policy_id = policy.policy_id?;
    let text = match change {
        ChangeKind::Added => source_text.get(&policy_id).cloned(),
        ChangeKind::Activated | ChangeKind::Removed => None,
    }
    .unwrap_or_else(|| policy.description.clone());

    Some(ModificationRecord {
        sequence: entry.sequence,
        requester: policy
            .requested_by
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        change,
        text,
        policy_id,
        at: entry.timestamp,
    })
}
