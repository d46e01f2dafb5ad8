// engine.rs — The policy engine: sole owner of the rule set.
//
// The rule set is an immutable snapshot behind `RwLock<Arc<PolicySet>>`.
// Evaluations share the read side and hold it until their decision is in
// the audit log; mutations take the write side, persist, audit, and then
// publish a new snapshot. So:
//
//   - evaluations never block one another,
//   - an evaluation sees the rule set entirely before or entirely after any
//     mutation, and
//   - the audit log order matches the rule set each decision was made under.
//
// Every state change is recorded in the audit log before it becomes
// visible. If the audit write fails, the store change is rolled back and
// the old snapshot stays published.

use std::sync::{Arc, RwLock, RwLockWriteGuard};

use bmod_audit::{AuditKind, AuditLog, AuditRecord};
use chrono::{Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PolicyError;
use crate::policy::{NewPolicy, Policy, PolicyId};
use crate::request::{ActionRequest, EvaluationContext};
use crate::resolver::{self, Decision, RuleVerdict};
use crate::rule::{CompiledRule, PolicyRule};
use crate::store::PolicyStore;

#[derive(Clone)]
struct PolicyEntry {
    policy: Policy,
    compiled: CompiledRule,
}

/// One published version of the rule set. Holds inactive policies too, so
/// they can be looked up and re-activated.
#[derive(Clone)]
struct PolicySet {
    entries: Vec<PolicyEntry>,
    next_ordinal: u64,
}

impl PolicySet {
    fn active(&self) -> impl Iterator<Item = &PolicyEntry> {
        self.entries.iter().filter(|e| e.policy.active)
    }

    fn position(&self, id: PolicyId) -> Option<usize> {
        self.entries.iter().position(|e| e.policy.id == id)
    }
}

/// Two active time rules that can never both be satisfied on some day.
/// Advisory only; evaluation simply denies in that case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyConflict {
    pub first: PolicyId,
    pub second: PolicyId,
    pub reason: String,
}

/// Evaluates action requests against the active policies and manages the
/// policy lifecycle.
pub struct PolicyEngine {
    snapshot: RwLock<Arc<PolicySet>>,
    store: Option<Box<dyn PolicyStore>>,
    audit: Arc<AuditLog>,
}

impl PolicyEngine {
    /// An engine with no persistent store. Policies live for the process.
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(PolicySet {
                entries: Vec::new(),
                next_ordinal: 1,
            })),
            store: None,
            audit,
        }
    }

    /// Load every persisted policy and attach the store for later writes.
    ///
    /// Fails with `CorruptStore` if any record is unreadable; no engine is
    /// built from a partial rule set.
    pub fn open(store: impl PolicyStore + 'static, audit: Arc<AuditLog>) -> Result<Self, PolicyError> {
        let policies = store.load_all()?;
        let mut entries = Vec::with_capacity(policies.len());
        for policy in policies {
            let compiled = policy.rule.compile().map_err(|e| PolicyError::CorruptStore {
                path: format!("policy {}", policy.id).into(),
                reason: e.to_string(),
            })?;
            entries.push(PolicyEntry { policy, compiled });
        }
        let next_ordinal = entries.iter().map(|e| e.policy.ordinal).max().unwrap_or(0) + 1;

        tracing::info!(
            loaded = entries.len(),
            active = entries.iter().filter(|e| e.policy.active).count(),
            "policy engine opened"
        );
        Ok(Self {
            snapshot: RwLock::new(Arc::new(PolicySet {
                entries,
                next_ordinal,
            })),
            store: Some(Box::new(store)),
            audit,
        })
    }

    /// The audit log this engine writes to.
    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    fn current(&self) -> Result<Arc<PolicySet>, PolicyError> {
        let guard = self.snapshot.read().map_err(|_| PolicyError::LockPoisoned)?;
        Ok(Arc::clone(&guard))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, Arc<PolicySet>>, PolicyError> {
        self.snapshot.write().map_err(|_| PolicyError::LockPoisoned)
    }

    // ── Evaluation ───────────────────────────────────────────────

    /// Evaluate a request against every active policy.
    ///
    /// The decision is appended to the audit log before it is returned. If
    /// that append fails the caller gets `AuditFailure` and no decision.
    pub fn evaluate(&self, request: &ActionRequest) -> Result<Decision, PolicyError> {
        let guard = self.snapshot.read().map_err(|_| PolicyError::LockPoisoned)?;
        let ctx = EvaluationContext::for_request(request);

        let verdicts: Vec<RuleVerdict> = guard
            .active()
            .map(|entry| RuleVerdict {
                policy_id: entry.policy.id,
                description: entry.policy.description.clone(),
                verdict: entry.compiled.evaluate(request, &ctx),
            })
            .collect();
        let decision = resolver::resolve(&verdicts);

        let entry = self.audit.record(
            AuditKind::Decision,
            AuditRecord::decision(request.summary(), decision.summary()),
        )?;
        drop(guard);

        if decision.allowed {
            tracing::debug!(
                sequence = entry.sequence,
                actor = %request.actor,
                action = %request.action,
                evaluated = decision.policies_evaluated,
                "action allowed"
            );
        } else {
            tracing::warn!(
                sequence = entry.sequence,
                actor = %request.actor,
                action = %request.action,
                reasons = ?decision.reasons,
                "action denied"
            );
        }
        Ok(decision)
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Add a policy with no extra metadata.
    pub fn add_policy(
        &self,
        rule: PolicyRule,
        description: impl Into<String>,
    ) -> Result<PolicyId, PolicyError> {
        self.add_policy_with(NewPolicy::new(rule, description))
    }

    /// Validate, persist, audit, and publish a new policy.
    ///
    /// An invalid rule is rejected before anything is written.
    pub fn add_policy_with(&self, new: NewPolicy) -> Result<PolicyId, PolicyError> {
        let compiled = new.rule.compile()?;
        let description = match new.description.trim() {
            "" => new.rule.kind_name().to_string(),
            d => d.to_string(),
        };

        let mut guard = self.write_lock()?;
        let policy = Policy {
            id: Uuid::new_v4(),
            ordinal: guard.next_ordinal,
            rule: new.rule,
            description,
            active: true,
            created_at: Utc::now(),
            priority: new.priority,
            created_by: new.created_by,
            source_text: new.source_text,
        };

        if let Some(store) = &self.store {
            store.save(&policy)?;
        }
        let mut summary = policy.summary();
        summary.requested_by = policy.created_by.clone();
        if let Err(e) = self
            .audit
            .record(AuditKind::PolicyAdded, AuditRecord::mutation(summary, "added"))
        {
            self.rollback(|store| store.delete(policy.id));
            return Err(e.into());
        }

        let mut next = PolicySet::clone(&guard);
        next.next_ordinal += 1;
        let id = policy.id;
        tracing::info!(
            policy_id = %id,
            kind = policy.rule.kind_name(),
            description = %policy.description,
            "policy added"
        );
        next.entries.push(PolicyEntry { policy, compiled });
        *guard = Arc::new(next);
        Ok(id)
    }

    /// Deactivate an active policy. `PolicyNotFound` if the id is unknown or
    /// the policy is already inactive.
    pub fn remove_policy(&self, id: PolicyId) -> Result<(), PolicyError> {
        self.set_active(id, false, None)
    }

    /// `remove_policy`, recording which operator asked for it.
    pub fn remove_policy_as(&self, id: PolicyId, operator: &str) -> Result<(), PolicyError> {
        self.set_active(id, false, Some(operator))
    }

    /// Same as `remove_policy`.
    pub fn deactivate_policy(&self, id: PolicyId) -> Result<(), PolicyError> {
        self.set_active(id, false, None)
    }

    /// Re-enable an inactive policy. Activating an already-active policy is
    /// a no-op and writes no audit entry.
    pub fn activate_policy(&self, id: PolicyId) -> Result<(), PolicyError> {
        self.set_active(id, true, None)
    }

    fn set_active(
        &self,
        id: PolicyId,
        active: bool,
        operator: Option<&str>,
    ) -> Result<(), PolicyError> {
        let mut guard = self.write_lock()?;
        let index = guard.position(id).ok_or(PolicyError::PolicyNotFound(id))?;
        let original = guard.entries[index].policy.clone();

        if original.active == active {
            return if active {
                Ok(())
            } else {
                Err(PolicyError::PolicyNotFound(id))
            };
        }

        let mut updated = original.clone();
        updated.active = active;
        if let Some(store) = &self.store {
            store.save(&updated)?;
        }

        let (kind, outcome) = if active {
            (AuditKind::PolicyAdded, "activated")
        } else {
            (AuditKind::PolicyRemoved, "removed")
        };
        let mut summary = updated.summary();
        summary.requested_by = operator.map(str::to_string);
        if let Err(e) = self.audit.record(kind, AuditRecord::mutation(summary, outcome)) {
            self.rollback(|store| store.save(&original));
            return Err(e.into());
        }

        let mut next = PolicySet::clone(&guard);
        next.entries[index].policy = updated;
        *guard = Arc::new(next);
        tracing::info!(policy_id = %id, outcome, "policy state changed");
        Ok(())
    }

    fn rollback(&self, undo: impl FnOnce(&dyn PolicyStore) -> Result<(), PolicyError>) {
        if let Some(store) = &self.store {
            if let Err(e) = undo(store.as_ref()) {
                tracing::error!(error = %e, "failed to roll back policy store after audit failure");
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Active policies in insertion order.
    pub fn list_policies(&self) -> Result<Vec<Policy>, PolicyError> {
        let set = self.current()?;
        Ok(set.active().map(|e| e.policy.clone()).collect())
    }

    /// Every policy, inactive ones included, in insertion order.
    pub fn all_policies(&self) -> Result<Vec<Policy>, PolicyError> {
        let set = self.current()?;
        Ok(set.entries.iter().map(|e| e.policy.clone()).collect())
    }

    /// Any policy by id, including inactive ones.
    pub fn get_policy(&self, id: PolicyId) -> Result<Option<Policy>, PolicyError> {
        let set = self.current()?;
        Ok(set
            .entries
            .iter()
            .find(|e| e.policy.id == id)
            .map(|e| e.policy.clone()))
    }

    /// Pairs of active time rules whose day constraints exclude each other.
    pub fn detect_conflicts(&self) -> Result<Vec<PolicyConflict>, PolicyError> {
        let set = self.current()?;
        let time_rules: Vec<_> = set
            .active()
            .filter_map(|e| match &e.policy.rule {
                PolicyRule::TimeWindow(r) => Some((e.policy.id, r)),
                _ => None,
            })
            .collect();

        let mut conflicts = Vec::new();
        for (i, (a_id, a)) in time_rules.iter().enumerate() {
            for (b_id, b) in &time_rules[i + 1..] {
                let reason = if !a.allowed_days.is_empty()
                    && !b.allowed_days.is_empty()
                    && !a.allowed_days.iter().any(|d| b.allowed_days.contains(d))
                {
                    Some("allowed days never overlap".to_string())
                } else if covers(&b.blocked_days, &a.allowed_days) {
                    Some("the first policy's allowed days are all blocked by the second".to_string())
                } else if covers(&a.blocked_days, &b.allowed_days) {
                    Some("the second policy's allowed days are all blocked by the first".to_string())
                } else {
                    None
                };
                if let Some(reason) = reason {
                    conflicts.push(PolicyConflict {
                        first: *a_id,
                        second: *b_id,
                        reason,
                    });
                }
            }
        }
        Ok(conflicts)
    }
}

/// True when `days` is non-empty and every entry is in `blocked`.
fn covers(blocked: &[Weekday], days: &[Weekday]) -> bool {
    !days.is_empty() && days.iter().all(|d| blocked.contains(d))
}
