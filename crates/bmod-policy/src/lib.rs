//! # bmod-policy
//!
//! Behavior policies for autonomous agents.
//!
//! A [`Policy`] wraps one [`PolicyRule`]: a time window, a user/role access
//! list, an action restriction, a content filter, or a security-level
//! requirement. The [`PolicyEngine`] owns the rule set, evaluates each
//! [`ActionRequest`] against every active policy, and returns a
//! [`Decision`].
//!
//! ## Key invariants
//!
//! - **Deny wins**: one denying policy denies the request. Every denying
//!   policy is listed with its reason.
//! - **Audited first**: a decision or policy change is appended to the audit
//!   log before the caller sees it. If the append fails, so does the call.
//! - **No partial state**: invalid rules are rejected before anything is
//!   written, and a corrupt policy store stops the engine from opening.

pub mod content;
pub mod engine;
pub mod error;
pub mod policy;
pub mod request;
pub mod resolver;
pub mod rule;
pub mod store;

pub use content::ContentFilterRule;
pub use engine::{PolicyConflict, PolicyEngine};
pub use error::PolicyError;
pub use policy::{NewPolicy, Policy, PolicyId};
pub use request::{ActionRequest, EvaluationContext, SecurityLevel};
pub use resolver::{Decision, RuleVerdict};
pub use rule::{
    ActionRestrictionRule, ClockWindow, ParameterLimit, PolicyRule, SecurityLevelRule,
    TimeWindowRule, UserAccessRule, Verdict,
};
pub use store::{FilePolicyStore, PolicyStore};
