// resolver.rs — Combine per-rule verdicts into one Decision.
//
// Deny wins. Every denying rule contributes its reason, in evaluation order,
// so the caller can see all of them at once. There are no priorities: two
// rules that cannot both be satisfied simply deny together.

use bmod_audit::DecisionSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rule::Verdict;

/// One active policy's verdict, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdict {
    pub policy_id: Uuid,
    pub description: String,
    pub verdict: Verdict,
}

/// The final answer for one action request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// One reason per denying policy, or a single affirming note.
    pub reasons: Vec<String>,
    /// The denying policies, in evaluation order. Empty when allowed.
    pub matched_policy_ids: Vec<Uuid>,
    pub policies_evaluated: usize,
}

impl Decision {
    pub fn summary(&self) -> DecisionSummary {
        DecisionSummary {
            allowed: self.allowed,
            reasons: self.reasons.clone(),
            matched_policy_ids: self.matched_policy_ids.clone(),
        }
    }
}

pub fn resolve(verdicts: &[RuleVerdict]) -> Decision {
    let mut reasons = Vec::new();
    let mut matched = Vec::new();

    for v in verdicts {
        if let Verdict::Deny { reason } = &v.verdict {
            reasons.push(format!("{}: {}", v.description, reason));
            matched.push(v.policy_id);
        }
    }

    if !matched.is_empty() {
        return Decision {
            allowed: false,
            reasons,
            matched_policy_ids: matched,
            policies_evaluated: verdicts.len(),
        };
    }

    let note = match verdicts.len() {
        0 => "no active policies restrict this action".to_string(),
        1 => "the active policy permits this action".to_string(),
        n => format!("all {} active policies permit this action", n),
    };
    Decision {
        allowed: true,
        reasons: vec![note],
        matched_policy_ids: Vec::new(),
        policies_evaluated: verdicts.len(),
    }
}
