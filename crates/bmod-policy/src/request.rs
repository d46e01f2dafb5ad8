// request.rs — The unit of work an agent proposes, and its evaluation context.

use std::fmt;
use std::str::FromStr;

use bmod_audit::hasher;
use bmod_audit::RequestSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered security tags: `Low < Normal < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl SecurityLevel {
    pub const ALL: [SecurityLevel; 4] = [
        SecurityLevel::Low,
        SecurityLevel::Normal,
        SecurityLevel::High,
        SecurityLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SecurityLevel::Low => "low",
            SecurityLevel::Normal => "normal",
            SecurityLevel::High => "high",
            SecurityLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(SecurityLevel::Low),
            "normal" | "medium" | "standard" => Ok(SecurityLevel::Normal),
            "high" => Ok(SecurityLevel::High),
            "critical" => Ok(SecurityLevel::Critical),
            other => Err(format!("unknown security level '{}'", other)),
        }
    }
}

/// An action the agent wants to perform. Read-only to the policy core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRequest {
    /// User id or email of the principal the agent acts for.
    pub actor: String,
    pub role: Option<String>,
    /// The action verb or tool name (e.g. "send_email", "delete_file").
    pub action: String,
    /// Free-text content the action carries (message body, file text, ...).
    pub payload: Option<String>,
    /// Structured arguments, for tool calls without a text payload.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub security_level: SecurityLevel,
}

impl ActionRequest {
    /// A request stamped with the current time at `Normal` security level.
    pub fn new(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            role: None,
            action: action.into(),
            payload: None,
            parameters: serde_json::Map::new(),
            timestamp: Utc::now(),
            security_level: SecurityLevel::Normal,
        }
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }

    /// The text content rules inspect: the payload, or else the structured
    /// parameters rendered as JSON. None when the request carries neither.
    pub fn content_text(&self) -> Option<String> {
        match &self.payload {
            Some(p) => Some(p.clone()),
            None if !self.parameters.is_empty() => {
                serde_json::to_string(&self.parameters).ok()
            }
            None => None,
        }
    }

    /// Audit summary. The payload is reduced to its hash.
    pub fn summary(&self) -> RequestSummary {
        RequestSummary {
            actor: self.actor.clone(),
            role: self.role.clone(),
            action: self.action.clone(),
            security_level: self.security_level.to_string(),
            requested_at: self.timestamp,
            payload_hash: self.content_text().map(|text| hasher::hash_str(&text)),
        }
    }
}

/// What a rule may consult besides the request itself.
///
/// `now` is the request's own timestamp, which keeps evaluation a pure
/// function of the request and the active rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationContext {
    pub now: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn for_request(request: &ActionRequest) -> Self {
        Self {
            now: request.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_levels_are_ordered() {
        assert!(SecurityLevel::Low < SecurityLevel::Normal);
        assert!(SecurityLevel::High < SecurityLevel::Critical);
        assert_eq!("HIGH".parse::<SecurityLevel>().unwrap(), SecurityLevel::High);
        assert!("extreme".parse::<SecurityLevel>().is_err());
    }

    #[test]
    fn content_text_falls_back_to_parameters() {
        let bare = ActionRequest::new("bob", "read_file");
        assert_eq!(bare.content_text(), None);

        let structured =
            ActionRequest::new("bob", "send_email").parameter("to", serde_json::json!("eve"));
        assert_eq!(structured.content_text().unwrap(), r#"{"to":"eve"}"#);

        let text = structured.payload("hello");
        assert_eq!(text.content_text().unwrap(), "hello");
    }

    #[test]
    fn summary_hashes_payload() {
        let req = ActionRequest::new("bob", "send_email").payload("SSN 123-45-6789");
        let summary = req.summary();
        let hash = summary.payload_hash.unwrap();
        assert_eq!(hash.len(), 64);
        assert!(!hash.contains("123-45"));
        assert_eq!(summary.security_level, "normal");
    }
}
