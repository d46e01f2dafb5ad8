// rule.rs — The closed set of behavior rules.
//
// PolicyRule is a sum type: each variant carries its own constraint data and
// evaluates a request to Permit or Deny(reason). Adding a rule kind means
// adding a variant here; every `match` over PolicyRule is exhaustive, so the
// compiler points at each place that must learn about it.
//
// Rules are validated before they reach the engine: a rule that constrains
// nothing (all sets empty) is rejected rather than silently permitting.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::content::{CompiledContentFilter, ContentFilterRule};
use crate::error::PolicyError;
use crate::request::{ActionRequest, EvaluationContext, SecurityLevel};

/// One rule's verdict on one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Permit,
    Deny { reason: String },
}

impl Verdict {
    pub fn deny(reason: impl Into<String>) -> Self {
        Verdict::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Verdict::Deny { .. })
    }
}

/// A behavior rule. Serialized with a `kind` tag, e.g. `kind: time_window`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyRule {
    TimeWindow(TimeWindowRule),
    UserAccess(UserAccessRule),
    ActionRestriction(ActionRestrictionRule),
    ContentFilter(ContentFilterRule),
    SecurityLevel(SecurityLevelRule),
}

impl PolicyRule {
    /// Stable snake_case name of the variant (used in audit summaries).
    pub fn kind_name(&self) -> &'static str {
        match self {
            PolicyRule::TimeWindow(_) => "time_window",
            PolicyRule::UserAccess(_) => "user_access",
            PolicyRule::ActionRestriction(_) => "action_restriction",
            PolicyRule::ContentFilter(_) => "content_filter",
            PolicyRule::SecurityLevel(_) => "security_level",
        }
    }

    /// Check the rule is well-formed without compiling it.
    pub fn validate(&self) -> Result<(), PolicyError> {
        match self {
            PolicyRule::TimeWindow(r) => r.validate(),
            PolicyRule::UserAccess(r) => r.validate(),
            PolicyRule::ActionRestriction(r) => r.validate(),
            PolicyRule::ContentFilter(r) => r.compile().map(|_| ()),
            PolicyRule::SecurityLevel(r) => r.validate(),
        }
    }

    /// Validate and prepare the rule for repeated evaluation.
    pub fn compile(&self) -> Result<CompiledRule, PolicyError> {
        let content = match self {
            PolicyRule::ContentFilter(r) => Some(r.compile()?),
            other => {
                other.validate()?;
                None
            }
        };
        Ok(CompiledRule {
            rule: self.clone(),
            content,
        })
    }

    /// Parse a YAML rule spec (the tagged representation).
    pub fn from_yaml(text: &str) -> Result<Self, PolicyError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, PolicyError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// A rule ready for evaluation: regexes compiled, constraints validated.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: PolicyRule,
    content: Option<CompiledContentFilter>,
}

impl CompiledRule {
    pub fn rule(&self) -> &PolicyRule {
        &self.rule
    }

    pub fn evaluate(&self, request: &ActionRequest, ctx: &EvaluationContext) -> Verdict {
        match &self.rule {
            PolicyRule::TimeWindow(r) => r.evaluate(ctx),
            PolicyRule::UserAccess(r) => r.evaluate(request),
            PolicyRule::ActionRestriction(r) => r.evaluate(request),
            PolicyRule::SecurityLevel(r) => r.evaluate(request),
            PolicyRule::ContentFilter(_) => match &self.content {
                Some(compiled) => compiled.evaluate(request),
                // Unreachable through compile(); fail closed regardless.
                None => Verdict::deny("content filter was not compiled"),
            },
        }
    }
}

// ── Time window ──────────────────────────────────────────────────

/// A clock-time window `[start, end)`. When `start > end` the window wraps
/// past midnight (e.g. 22:00–06:00).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClockWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ClockWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// 09:00–17:00.
    pub fn business_hours() -> Self {
        Self {
            start: hm(9, 0),
            end: hm(17, 0),
        }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start < self.end {
            self.start <= t && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }
}

impl fmt::Display for ClockWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Monday through Friday.
pub fn weekdays() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

/// Saturday and Sunday.
pub fn weekend() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}

/// Restricts when actions may happen. Absent constraints do not restrict.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindowRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_days: Vec<Weekday>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_days: Vec<Weekday>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<ClockWindow>,
    /// Offset of the operator's clock from UTC; days and times are judged
    /// on that clock.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl TimeWindowRule {
    /// Monday–Friday, 09:00–17:00.
    pub fn business_hours() -> Self {
        Self {
            allowed_days: weekdays(),
            window: Some(ClockWindow::business_hours()),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.allowed_days.is_empty() && self.blocked_days.is_empty() && self.window.is_none() {
            return Err(PolicyError::invalid(
                "time rule needs allowed_days, blocked_days, or a window",
            ));
        }
        for (name, days) in [("allowed_days", &self.allowed_days), ("blocked_days", &self.blocked_days)] {
            let unique: BTreeSet<u32> = days.iter().map(|d| d.num_days_from_monday()).collect();
            if unique.len() != days.len() {
                return Err(PolicyError::invalid(format!("{} contains duplicates", name)));
            }
        }
        if let Some(window) = &self.window {
            if window.start == window.end {
                return Err(PolicyError::invalid(format!(
                    "time window {} is empty",
                    window
                )));
            }
        }
        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(PolicyError::invalid(format!(
                "utc offset {} minutes is out of range",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Verdict {
        let local = ctx.now.naive_utc() + Duration::minutes(i64::from(self.utc_offset_minutes));
        let day = local.weekday();
        let time = local.time();

        if !self.allowed_days.is_empty() && !self.allowed_days.contains(&day) {
            return Verdict::deny(format!(
                "actions are not allowed on {}; allowed days: {}",
                day,
                day_list(&self.allowed_days)
            ));
        }
        if self.blocked_days.contains(&day) {
            return Verdict::deny(format!("actions are blocked on {}", day));
        }
        if let Some(window) = &self.window {
            if !window.contains(time) {
                return Verdict::deny(format!(
                    "{} is outside the allowed window {}",
                    time.format("%H:%M"),
                    window
                ));
            }
        }
        Verdict::Permit
    }
}

fn day_list(days: &[Weekday]) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── User access ──────────────────────────────────────────────────

/// Restricts which principals the agent may act for.
///
/// Block-lists deny their members; allow-lists deny everyone else.
/// Comparisons ignore ASCII case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAccessRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_roles: Vec<String>,
}

impl UserAccessRule {
    pub fn block_users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked_users: users.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), PolicyError> {
        let lists = [
            ("blocked_users", &self.blocked_users),
            ("blocked_roles", &self.blocked_roles),
            ("allowed_users", &self.allowed_users),
            ("allowed_roles", &self.allowed_roles),
        ];
        if lists.iter().all(|(_, l)| l.is_empty()) {
            return Err(PolicyError::invalid(
                "user rule needs at least one blocked or allowed user/role",
            ));
        }
        for (name, list) in lists {
            if list.iter().any(|v| v.trim().is_empty()) {
                return Err(PolicyError::invalid(format!("{} contains a blank entry", name)));
            }
        }
        Ok(())
    }

    fn evaluate(&self, request: &ActionRequest) -> Verdict {
        let actor = request.actor.as_str();
        let role = request.role.as_deref();

        if contains_ci(&self.blocked_users, actor) {
            return Verdict::deny(format!("user '{}' is blocked", actor));
        }
        if let Some(role) = role {
            if contains_ci(&self.blocked_roles, role) {
                return Verdict::deny(format!("role '{}' is blocked", role));
            }
        }
        if !self.allowed_users.is_empty() && !contains_ci(&self.allowed_users, actor) {
            return Verdict::deny(format!("user '{}' is not in the allowed users", actor));
        }
        if !self.allowed_roles.is_empty() {
            match role {
                Some(role) if contains_ci(&self.allowed_roles, role) => {}
                Some(role) => {
                    return Verdict::deny(format!("role '{}' is not in the allowed roles", role))
                }
                None => return Verdict::deny("request has no role; an allowed role is required"),
            }
        }
        Verdict::Permit
    }
}

fn contains_ci(list: &[String], value: &str) -> bool {
    list.iter().any(|v| v.trim().eq_ignore_ascii_case(value.trim()))
}

// ── Action restriction ───────────────────────────────────────────

/// Restricts action verbs by case-insensitive keyword (substring) match,
/// and numeric request parameters by range.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionRestrictionRule {
    /// Deny when the action contains any of these keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricted_actions: Vec<String>,
    /// When non-empty, deny actions that contain none of these keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_actions: Vec<String>,
    /// Bounds on named request parameters, checked for every action.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameter_limits: BTreeMap<String, ParameterLimit>,
}

/// Inclusive bounds on one numeric request parameter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ParameterLimit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

impl ParameterLimit {
    pub fn at_most(max: f64) -> Self {
        Self {
            min_value: None,
            max_value: Some(max),
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min_value: Some(min),
            max_value: Some(max),
        }
    }
}

impl ActionRestrictionRule {
    pub fn restrict<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            restricted_actions: actions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add a bound on `name`.
    pub fn limit(mut self, name: impl Into<String>, limit: ParameterLimit) -> Self {
        self.parameter_limits.insert(name.into(), limit);
        self
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.restricted_actions.is_empty()
            && self.allowed_actions.is_empty()
            && self.parameter_limits.is_empty()
        {
            return Err(PolicyError::invalid(
                "action rule needs restricted_actions, allowed_actions or parameter_limits",
            ));
        }
        for (name, limit) in &self.parameter_limits {
            if name.trim().is_empty() {
                return Err(PolicyError::invalid("parameter limit names must not be blank"));
            }
            let bounds = [limit.min_value, limit.max_value];
            if bounds.iter().all(Option::is_none) {
                return Err(PolicyError::invalid(format!(
                    "parameter limit '{}' needs min_value or max_value",
                    name
                )));
            }
            if bounds.iter().flatten().any(|b| !b.is_finite()) {
                return Err(PolicyError::invalid(format!(
                    "parameter limit '{}' has a non-finite bound",
                    name
                )));
            }
            if let (Some(min), Some(max)) = (limit.min_value, limit.max_value) {
                if min > max {
                    return Err(PolicyError::invalid(format!(
                        "parameter limit '{}' has min_value {} above max_value {}",
                        name, min, max
                    )));
                }
            }
        }
        // A blank keyword is a substring of every action.
        if self
            .restricted_actions
            .iter()
            .chain(&self.allowed_actions)
            .any(|k| k.trim().is_empty())
        {
            return Err(PolicyError::invalid("action keywords must not be blank"));
        }
        Ok(())
    }

    fn evaluate(&self, request: &ActionRequest) -> Verdict {
        let action = request.action.to_lowercase();

        if let Some(keyword) = self
            .restricted_actions
            .iter()
            .find(|k| action.contains(&k.trim().to_lowercase()))
        {
            return Verdict::deny(format!(
                "action '{}' matches restricted keyword '{}'",
                request.action, keyword
            ));
        }
        if !self.allowed_actions.is_empty()
            && !self
                .allowed_actions
                .iter()
                .any(|k| action.contains(&k.trim().to_lowercase()))
        {
            return Verdict::deny(format!(
                "action '{}' is not among the allowed actions: {}",
                request.action,
                self.allowed_actions.join(", ")
            ));
        }
        for (name, limit) in &self.parameter_limits {
            let Some(value) = request.parameters.get(name) else {
                continue;
            };
            // A value that cannot be compared is outside every range.
            let Some(n) = value.as_f64() else {
                return Verdict::deny(format!("parameter '{}' is not a number: {}", name, value));
            };
            if let Some(max) = limit.max_value {
                if n > max {
                    return Verdict::deny(format!(
                        "parameter '{}' = {} exceeds maximum value {}",
                        name, n, max
                    ));
                }
            }
            if let Some(min) = limit.min_value {
                if n < min {
                    return Verdict::deny(format!(
                        "parameter '{}' = {} is below minimum value {}",
                        name, n, min
                    ));
                }
            }
        }
        Verdict::Permit
    }
}

// ── Security level ───────────────────────────────────────────────

/// Restricts the security level an action must carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityLevelRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<SecurityLevel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricted_levels: Vec<SecurityLevel>,
}

impl SecurityLevelRule {
    pub fn minimum(level: SecurityLevel) -> Self {
        Self {
            minimum: Some(level),
            restricted_levels: Vec::new(),
        }
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.minimum.is_none() && self.restricted_levels.is_empty() {
            return Err(PolicyError::invalid(
                "security rule needs a minimum or restricted_levels",
            ));
        }
        Ok(())
    }

    fn evaluate(&self, request: &ActionRequest) -> Verdict {
        let level = request.security_level;
        if self.restricted_levels.contains(&level) {
            return Verdict::deny(format!("actions at security level {} are not allowed", level));
        }
        if let Some(minimum) = self.minimum {
            if level < minimum {
                return Verdict::deny(format!(
                    "security level {} is below the required {}",
                    level, minimum
                ));
            }
        }
        Verdict::Permit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// 2024-01-01 is a Monday.
    fn at(day: u32, hour: u32, minute: u32) -> EvaluationContext {
        EvaluationContext {
            now: Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap(),
        }
    }

    fn request() -> ActionRequest {
        ActionRequest::new("alice@example.com", "read_file")
    }

    fn eval(rule: PolicyRule, req: &ActionRequest, ctx: &EvaluationContext) -> Verdict {
        rule.compile().unwrap().evaluate(req, ctx)
    }

    #[test]
    fn business_hours_permit_monday_morning() {
        let rule = PolicyRule::TimeWindow(TimeWindowRule::business_hours());
        assert_eq!(eval(rule, &request(), &at(1, 10, 0)), Verdict::Permit);
    }

    #[test]
    fn business_hours_deny_saturday() {
        let rule = PolicyRule::TimeWindow(TimeWindowRule::business_hours());
        match eval(rule, &request(), &at(6, 10, 0)) {
            Verdict::Deny { reason } => assert!(reason.contains("Sat")),
            other => panic!("expected Deny, got {:?}", other),
        }
    }

    #[test]
    fn window_end_is_exclusive() {
        let rule = PolicyRule::TimeWindow(TimeWindowRule::business_hours());
        assert!(eval(rule.clone(), &request(), &at(1, 17, 0)).is_deny());
        assert_eq!(eval(rule.clone(), &request(), &at(1, 16, 59)), Verdict::Permit);
        assert_eq!(eval(rule, &request(), &at(1, 9, 0)), Verdict::Permit);
    }

    #[test]
    fn overnight_window_wraps() {
        let rule = PolicyRule::TimeWindow(TimeWindowRule {
            window: Some(ClockWindow::new(hm(22, 0), hm(6, 0))),
            ..TimeWindowRule::default()
        });
        assert_eq!(eval(rule.clone(), &request(), &at(2, 23, 30)), Verdict::Permit);
        assert_eq!(eval(rule.clone(), &request(), &at(2, 5, 59)), Verdict::Permit);
        assert!(eval(rule, &request(), &at(2, 12, 0)).is_deny());
    }

    #[test]
    fn utc_offset_shifts_the_clock() {
        // Monday 20:00 UTC is Tuesday 05:00 at UTC+9.
        let rule = PolicyRule::TimeWindow(TimeWindowRule {
            blocked_days: vec![Weekday::Tue],
            utc_offset_minutes: 9 * 60,
            ..TimeWindowRule::default()
        });
        assert!(eval(rule, &request(), &at(1, 20, 0)).is_deny());
    }

    #[test]
    fn blocked_days_deny() {
        let rule = PolicyRule::TimeWindow(TimeWindowRule {
            blocked_days: weekend(),
            ..TimeWindowRule::default()
        });
        assert!(eval(rule.clone(), &request(), &at(7, 12, 0)).is_deny());
        assert_eq!(eval(rule, &request(), &at(5, 12, 0)), Verdict::Permit);
    }

    #[test]
    fn time_rule_validation() {
        assert!(PolicyRule::TimeWindow(TimeWindowRule::default()).validate().is_err());
        let empty_window = TimeWindowRule {
            window: Some(ClockWindow::new(hm(9, 0), hm(9, 0))),
            ..TimeWindowRule::default()
        };
        assert!(PolicyRule::TimeWindow(empty_window).validate().is_err());
        let duplicate = TimeWindowRule {
            allowed_days: vec![Weekday::Mon, Weekday::Mon],
            ..TimeWindowRule::default()
        };
        assert!(PolicyRule::TimeWindow(duplicate).validate().is_err());
    }

    #[test]
    fn blocked_user_denied_case_insensitively() {
        let rule = PolicyRule::UserAccess(UserAccessRule::block_users(["spam@example.com"]));
        let spam = ActionRequest::new("SPAM@example.com", "anything");
        match eval(rule.clone(), &spam, &at(1, 10, 0)) {
            Verdict::Deny { reason } => assert!(reason.contains("blocked")),
            other => panic!("expected Deny, got {:?}", other),
        }
        assert_eq!(eval(rule, &request(), &at(1, 10, 0)), Verdict::Permit);
    }

    #[test]
    fn allow_lists_deny_everyone_else() {
        let rule = PolicyRule::UserAccess(UserAccessRule {
            allowed_roles: vec!["admin".to_string()],
            ..UserAccessRule::default()
        });
        let ctx = at(1, 10, 0);
        assert_eq!(
            eval(rule.clone(), &request().role("Admin"), &ctx),
            Verdict::Permit
        );
        assert!(eval(rule.clone(), &request().role("guest"), &ctx).is_deny());
        assert!(eval(rule, &request(), &ctx).is_deny());
    }

    #[test]
    fn blocked_role_denied() {
        let rule = PolicyRule::UserAccess(UserAccessRule {
            blocked_roles: vec!["contractor".to_string()],
            ..UserAccessRule::default()
        });
        assert!(eval(rule, &request().role("contractor"), &at(1, 10, 0)).is_deny());
    }

    #[test]
    fn user_rule_validation() {
        assert!(PolicyRule::UserAccess(UserAccessRule::default()).validate().is_err());
        assert!(PolicyRule::UserAccess(UserAccessRule::block_users(["  "]))
            .validate()
            .is_err());
    }

    #[test]
    fn restricted_action_matches_substring_ignoring_case() {
        let rule = PolicyRule::ActionRestriction(ActionRestrictionRule::restrict(["delete"]));
        let ctx = at(1, 10, 0);
        assert!(eval(rule.clone(), &ActionRequest::new("a", "Delete_File"), &ctx).is_deny());
        assert_eq!(
            eval(rule, &ActionRequest::new("a", "read_file"), &ctx),
            Verdict::Permit
        );
    }

    #[test]
    fn allowed_actions_deny_unlisted_verbs() {
        let rule = PolicyRule::ActionRestriction(ActionRestrictionRule {
            allowed_actions: vec!["read".to_string()],
            ..ActionRestrictionRule::default()
        });
        let ctx = at(1, 10, 0);
        assert_eq!(
            eval(rule.clone(), &ActionRequest::new("a", "read_file"), &ctx),
            Verdict::Permit
        );
        assert!(eval(rule, &ActionRequest::new("a", "write_file"), &ctx).is_deny());
    }

    #[test]
    fn action_rule_rejects_blank_keywords() {
        assert!(PolicyRule::ActionRestriction(ActionRestrictionRule::restrict([""]))
            .validate()
            .is_err());
        assert!(PolicyRule::ActionRestriction(ActionRestrictionRule::default())
            .validate()
            .is_err());
    }

    #[test]
    fn parameter_limits_bound_numeric_parameters() {
        let rule = PolicyRule::ActionRestriction(
            ActionRestrictionRule::default()
                .limit("amount", ParameterLimit::at_most(500.0))
                .limit("quantity", ParameterLimit::between(1.0, 10.0)),
        );
        let ctx = at(1, 10, 0);
        let pay = |amount: serde_json::Value| {
            ActionRequest::new("a", "make_payment").parameter("amount", amount)
        };

        assert_eq!(eval(rule.clone(), &pay(serde_json::json!(500)), &ctx), Verdict::Permit);
        match eval(rule.clone(), &pay(serde_json::json!(500.01)), &ctx) {
            Verdict::Deny { reason } => {
                assert!(reason.contains("'amount'"), "{}", reason);
                assert!(reason.contains("maximum value 500"), "{}", reason);
            }
            other => panic!("expected Deny, got {:?}", other),
        }
        match eval(rule.clone(), &pay(serde_json::json!("lots")), &ctx) {
            Verdict::Deny { reason } => assert!(reason.contains("not a number"), "{}", reason),
            other => panic!("expected Deny, got {:?}", other),
        }

        let none = ActionRequest::new("a", "order").parameter("quantity", serde_json::json!(0));
        match eval(rule.clone(), &none, &ctx) {
            Verdict::Deny { reason } => assert!(reason.contains("minimum value 1"), "{}", reason),
            other => panic!("expected Deny, got {:?}", other),
        }
        // Absent parameters are not constrained.
        assert_eq!(eval(rule, &request(), &ctx), Verdict::Permit);
    }

    #[test]
    fn parameter_limits_apply_after_keyword_checks() {
        let rule = PolicyRule::ActionRestriction(
            ActionRestrictionRule::restrict(["delete"]).limit("count", ParameterLimit::at_most(3.0)),
        );
        let ctx = at(1, 10, 0);
        let req = ActionRequest::new("a", "delete_file").parameter("count", serde_json::json!(1));
        match eval(rule.clone(), &req, &ctx) {
            Verdict::Deny { reason } => assert!(reason.contains("restricted keyword")),
            other => panic!("expected Deny, got {:?}", other),
        }
        let req = ActionRequest::new("a", "archive").parameter("count", serde_json::json!(4));
        assert!(eval(rule, &req, &ctx).is_deny());
    }

    #[test]
    fn parameter_limit_validation() {
        let with = |name: &str, limit: ParameterLimit| {
            PolicyRule::ActionRestriction(ActionRestrictionRule::default().limit(name, limit))
        };
        assert!(with("amount", ParameterLimit::at_most(10.0)).validate().is_ok());
        assert!(with(" ", ParameterLimit::at_most(10.0)).validate().is_err());
        assert!(with("amount", ParameterLimit::default()).validate().is_err());
        assert!(with("amount", ParameterLimit::between(5.0, 1.0)).validate().is_err());
        assert!(with("amount", ParameterLimit::at_most(f64::NAN)).validate().is_err());
    }

    #[test]
    fn parameter_limits_in_yaml() {
        let yaml = r#"
kind: action_restriction
parameter_limits:
  amount:
    max_value: 250
"#;
        let rule = PolicyRule::from_yaml(yaml).unwrap();
        assert_eq!(
            rule,
            PolicyRule::ActionRestriction(
                ActionRestrictionRule::default().limit("amount", ParameterLimit::at_most(250.0))
            )
        );
        rule.validate().unwrap();
    }

    #[test]
    fn security_minimum_and_restricted_levels() {
        let rule = PolicyRule::SecurityLevel(SecurityLevelRule {
            minimum: Some(SecurityLevel::High),
            restricted_levels: vec![SecurityLevel::Critical],
        });
        let ctx = at(1, 10, 0);
        assert!(eval(rule.clone(), &request(), &ctx).is_deny());
        assert_eq!(
            eval(rule.clone(), &request().security_level(SecurityLevel::High), &ctx),
            Verdict::Permit
        );
        assert!(eval(rule, &request().security_level(SecurityLevel::Critical), &ctx).is_deny());
        assert!(PolicyRule::SecurityLevel(SecurityLevelRule::default())
            .validate()
            .is_err());
    }

    #[test]
    fn yaml_spec_uses_kind_tag() {
        let yaml = r#"
kind: time_window
allowed_days: [Mon, Tue, Wed, Thu, Fri]
window:
  start: "09:00:00"
  end: "17:00:00"
"#;
        let rule = PolicyRule::from_yaml(yaml).unwrap();
        assert_eq!(rule, PolicyRule::TimeWindow(TimeWindowRule::business_hours()));
        assert_eq!(rule.kind_name(), "time_window");
        assert!(rule.to_yaml().unwrap().contains("kind: time_window"));
    }
}
