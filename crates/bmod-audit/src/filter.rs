// filter.rs — Read-only predicates over audit entries.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entry::{AuditEntry, AuditKind};

/// Restricts decision entries by outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeFilter {
    AllowedOnly,
    DeniedOnly,
}

/// A conjunction of optional predicates. The default matches everything.
///
/// `limit` keeps only the most recent N matches (applied after filtering).
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub kinds: Option<Vec<AuditKind>>,
    pub outcome: Option<OutcomeFilter>,
    pub actor: Option<String>,
    pub policy_id: Option<Uuid>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub after_sequence: Option<u64>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Decision entries that allowed the action.
    pub fn allowed_only() -> Self {
        Self {
            outcome: Some(OutcomeFilter::AllowedOnly),
            ..Self::default()
        }
    }

    /// Decision entries that denied the action.
    pub fn denied_only() -> Self {
        Self {
            outcome: Some(OutcomeFilter::DeniedOnly),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: AuditKind) -> Self {
        self.kinds.get_or_insert_with(Vec::new).push(kind);
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn policy(mut self, policy_id: Uuid) -> Self {
        self.policy_id = Some(policy_id);
        self
    }

    /// Half-open time range `[since, until)`; either bound may be omitted.
    pub fn between(mut self, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn after_sequence(mut self, sequence: u64) -> Self {
        self.after_sequence = Some(sequence);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// True if the entry satisfies every predicate (ignores `limit`).
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&entry.kind) {
                return false;
            }
        }
        if let Some(outcome) = self.outcome {
            let wanted = outcome == OutcomeFilter::AllowedOnly;
            if entry.allowed() != Some(wanted) {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            match entry.actor() {
                Some(a) if a.eq_ignore_ascii_case(actor) => {}
                _ => return false,
            }
        }
        if let Some(policy_id) = self.policy_id {
            if !entry.policy_ids().contains(&policy_id) {
                return false;
            }
        }
        if self.since.is_some_and(|since| entry.timestamp < since) {
            return false;
        }
        if self.until.is_some_and(|until| entry.timestamp >= until) {
            return false;
        }
        if self.after_sequence.is_some_and(|seq| entry.sequence <= seq) {
            return false;
        }
        true
    }

    /// Apply the filter to an ordered slice, preserving order.
    pub fn apply(&self, entries: &[AuditEntry]) -> Vec<AuditEntry> {
        let matched: Vec<&AuditEntry> = entries.iter().filter(|e| self.matches(e)).collect();
        let start = match self.limit {
            Some(n) => matched.len().saturating_sub(n),
            None => 0,
        };
        matched[start..].iter().map(|e| (*e).clone()).collect()
    }
}
