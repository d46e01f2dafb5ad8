// entry.rs — Audit entry data model.
//
// An entry is either a decision (request summary + resulting decision) or a
// policy mutation (policy summary + outcome). Summaries are plain strings and
// ids so this crate stays independent of the policy types that produce them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of event an entry records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// An action request was evaluated.
    Decision,
    /// A policy was added (or re-activated).
    PolicyAdded,
    /// A policy was removed (deactivated).
    PolicyRemoved,
    /// A non-admin attempted a policy change and was refused.
    ModificationRejected,
}

impl AuditKind {
    /// True for the kinds produced by policy mutations (accepted or refused).
    pub fn is_mutation(self) -> bool {
        !matches!(self, AuditKind::Decision)
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuditKind::Decision => "decision",
            AuditKind::PolicyAdded => "policy_added",
            AuditKind::PolicyRemoved => "policy_removed",
            AuditKind::ModificationRejected => "modification_rejected",
        };
        f.write_str(name)
    }
}

/// Who asked for what. The raw payload is never stored, only its hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestSummary {
    pub actor: String,
    pub role: Option<String>,
    pub action: String,
    pub security_level: String,
    pub requested_at: DateTime<Utc>,
    /// SHA-256 of the request payload, if one was present.
    pub payload_hash: Option<String>,
}

/// The outcome of one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionSummary {
    pub allowed: bool,
    pub reasons: Vec<String>,
    pub matched_policy_ids: Vec<Uuid>,
}

/// The policy a mutation touched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicySummary {
    /// None when the mutation was refused before an id was assigned.
    pub policy_id: Option<Uuid>,
    /// Rule variant name (e.g. "time_window") or "unknown".
    pub rule_kind: String,
    pub description: String,
    /// Operator that requested the change, when known.
    pub requested_by: Option<String>,
}

impl PolicySummary {
    pub fn new(
        policy_id: Option<Uuid>,
        rule_kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            policy_id,
            rule_kind: rule_kind.into(),
            description: description.into(),
            requested_by: None,
        }
    }

    pub fn requested_by(mut self, operator: impl Into<String>) -> Self {
        self.requested_by = Some(operator.into());
        self
    }
}

/// The payload of an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum AuditRecord {
    Decision {
        request: RequestSummary,
        decision: DecisionSummary,
    },
    Mutation {
        policy: PolicySummary,
        outcome: String,
    },
}

impl AuditRecord {
    pub fn decision(request: RequestSummary, decision: DecisionSummary) -> Self {
        AuditRecord::Decision { request, decision }
    }

    pub fn mutation(policy: PolicySummary, outcome: impl Into<String>) -> Self {
        AuditRecord::Mutation {
            policy,
            outcome: outcome.into(),
        }
    }
}

/// A single audit entry: one line in the JSONL audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    /// Position in the total order, starting at 1 with no gaps.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: AuditKind,
    #[serde(flatten)]
    pub record: AuditRecord,
    /// Hash of the previous line (JSONL backend only). None for the first entry.
    #[serde(default)]
    pub previous_hash: Option<String>,
}

impl AuditEntry {
    pub fn new(sequence: u64, kind: AuditKind, record: AuditRecord) -> Self {
        Self {
            sequence,
            timestamp: Utc::now(),
            kind,
            record,
            previous_hash: None,
        }
    }

    /// The decision outcome, for decision entries.
    pub fn allowed(&self) -> Option<bool> {
        match &self.record {
            AuditRecord::Decision { decision, .. } => Some(decision.allowed),
            AuditRecord::Mutation { .. } => None,
        }
    }

    /// The acting principal: the request actor or the requesting operator.
    pub fn actor(&self) -> Option<&str> {
        match &self.record {
            AuditRecord::Decision { request, .. } => Some(request.actor.as_str()),
            AuditRecord::Mutation { policy, .. } => policy.requested_by.as_deref(),
        }
    }

    /// Every policy id this entry refers to.
    pub fn policy_ids(&self) -> Vec<Uuid> {
        match &self.record {
            AuditRecord::Decision { decision, .. } => decision.matched_policy_ids.clone(),
            AuditRecord::Mutation { policy, .. } => policy.policy_id.into_iter().collect(),
        }
    }
}
