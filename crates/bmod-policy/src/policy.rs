// policy.rs — A stored behavior policy and the builder for new ones.

use bmod_audit::PolicySummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rule::PolicyRule;

pub type PolicyId = Uuid;

/// A rule plus the metadata the engine tracks for it.
///
/// Policies are never edited in place; the only change after creation is
/// the `active` flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    pub id: PolicyId,
    /// Insertion position. Evaluation and listing follow this order, and it
    /// survives a reload from the store.
    pub ordinal: u64,
    pub rule: PolicyRule,
    pub description: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Informational only; never consulted when resolving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// The plain-language request this policy was translated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

impl Policy {
    pub fn summary(&self) -> PolicySummary {
        PolicySummary::new(Some(self.id), self.rule.kind_name(), &self.description)
    }
}

/// Everything a caller supplies when adding a policy.
#[derive(Debug, Clone)]
pub struct NewPolicy {
    pub rule: PolicyRule,
    pub description: String,
    pub priority: Option<i32>,
    pub created_by: Option<String>,
    pub source_text: Option<String>,
}

impl NewPolicy {
    pub fn new(rule: PolicyRule, description: impl Into<String>) -> Self {
        Self {
            rule,
            description: description.into(),
            priority: None,
            created_by: None,
            source_text: None,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn created_by(mut self, operator: impl Into<String>) -> Self {
        self.created_by = Some(operator.into());
        self
    }

    pub fn source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = Some(text.into());
        self
    }
}
