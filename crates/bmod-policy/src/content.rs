// content.rs — Content filtering over the text an action carries.
//
// Patterns are regular expressions matched case-insensitively. They are
// compiled once when the policy is added; a pattern that does not compile
// makes the whole rule invalid.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::request::ActionRequest;
use crate::rule::Verdict;

/// Restricts what content an action may carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentFilterRule {
    /// Deny when the content matches any of these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_patterns: Vec<String>,
    /// Deny when the content fails to match any one of these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Named patterns for sensitive data (e.g. `ssn`). Matching one denies
    /// and the reason names the category, never the matched text.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sensitive_patterns: BTreeMap<String, String>,
}

impl ContentFilterRule {
    pub fn block<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked_patterns: patterns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn compile(&self) -> Result<CompiledContentFilter, PolicyError> {
        if self.blocked_patterns.is_empty()
            && self.required_patterns.is_empty()
            && self.max_length.is_none()
            && self.sensitive_patterns.is_empty()
        {
            return Err(PolicyError::invalid(
                "content rule needs a pattern, a sensitive category, or max_length",
            ));
        }
        if self.max_length == Some(0) {
            return Err(PolicyError::invalid("max_length must be greater than zero"));
        }

        let blocked = compile_all(&self.blocked_patterns)?;
        let required = compile_all(&self.required_patterns)?;
        let sensitive = self
            .sensitive_patterns
            .iter()
            .map(|(name, pattern)| Ok((name.clone(), compile_one(pattern)?)))
            .collect::<Result<Vec<_>, PolicyError>>()?;

        Ok(CompiledContentFilter {
            blocked,
            required,
            max_length: self.max_length,
            sensitive,
        })
    }
}

fn compile_one(pattern: &str) -> Result<Regex, PolicyError> {
    if pattern.is_empty() {
        return Err(PolicyError::invalid("content pattern must not be empty"));
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| PolicyError::invalid(format!("bad pattern '{}': {}", pattern, e)))
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, PolicyError> {
    patterns.iter().map(|p| compile_one(p)).collect()
}

/// A content rule with its regexes compiled.
#[derive(Debug, Clone)]
pub struct CompiledContentFilter {
    blocked: Vec<Regex>,
    required: Vec<Regex>,
    max_length: Option<usize>,
    sensitive: Vec<(String, Regex)>,
}

impl CompiledContentFilter {
    /// A request with no content is permitted; there is nothing to filter.
    pub fn evaluate(&self, request: &ActionRequest) -> Verdict {
        let Some(text) = request.content_text() else {
            return Verdict::Permit;
        };

        if let Some(max) = self.max_length {
            let len = text.chars().count();
            if len > max {
                return Verdict::deny(format!(
                    "content length {} exceeds the limit of {}",
                    len, max
                ));
            }
        }
        if let Some(re) = self.blocked.iter().find(|re| re.is_match(&text)) {
            return Verdict::deny(format!("content matches blocked pattern '{}'", re.as_str()));
        }
        if let Some((name, _)) = self.sensitive.iter().find(|(_, re)| re.is_match(&text)) {
            return Verdict::deny(format!("content contains sensitive data ({})", name));
        }
        if let Some(re) = self.required.iter().find(|re| !re.is_match(&text)) {
            return Verdict::deny(format!(
                "content is missing required pattern '{}'",
                re.as_str()
            ));
        }
        Verdict::Permit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(rule: &ContentFilterRule, req: &ActionRequest) -> Verdict {
        rule.compile().unwrap().evaluate(req)
    }

    #[test]
    fn blocked_pattern_is_case_insensitive() {
        let rule = ContentFilterRule::block(["confidential"]);
        let req = ActionRequest::new("a", "send_email").payload("This is CONFIDENTIAL");
        match check(&rule, &req) {
            Verdict::Deny { reason } => assert!(reason.contains("confidential")),
            other => panic!("expected Deny, got {:?}", other),
        }
    }

    #[test]
    fn no_content_is_permitted() {
        let rule = ContentFilterRule::block(["secret"]);
        assert_eq!(
            check(&rule, &ActionRequest::new("a", "list_files")),
            Verdict::Permit
        );
    }

    #[test]
    fn parameters_are_inspected_when_payload_absent() {
        let rule = ContentFilterRule::block(["secret"]);
        let req = ActionRequest::new("a", "call_tool")
            .parameter("body", serde_json::json!("the secret plan"));
        assert!(check(&rule, &req).is_deny());
    }

    #[test]
    fn sensitive_reason_names_category_not_text() {
        let mut rule = ContentFilterRule::default();
        rule.sensitive_patterns
            .insert("ssn".to_string(), r"\b\d{3}-\d{2}-\d{4}\b".to_string());
        let req = ActionRequest::new("a", "send_email").payload("my ssn is 123-45-6789");
        match check(&rule, &req) {
            Verdict::Deny { reason } => {
                assert!(reason.contains("ssn"));
                assert!(!reason.contains("123-45-6789"));
            }
            other => panic!("expected Deny, got {:?}", other),
        }
    }

    #[test]
    fn required_pattern_and_max_length() {
        let rule = ContentFilterRule {
            required_patterns: vec!["^ticket-\\d+".to_string()],
            max_length: Some(20),
            ..ContentFilterRule::default()
        };
        let ok = ActionRequest::new("a", "comment").payload("TICKET-42 done");
        let missing = ActionRequest::new("a", "comment").payload("done");
        let long = ActionRequest::new("a", "comment").payload("ticket-1 ".repeat(5));
        assert_eq!(check(&rule, &ok), Verdict::Permit);
        assert!(check(&rule, &missing).is_deny());
        match check(&rule, &long) {
            Verdict::Deny { reason } => assert!(reason.contains("exceeds")),
            other => panic!("expected Deny, got {:?}", other),
        }
    }

    #[test]
    fn invalid_rules_are_rejected() {
        assert!(ContentFilterRule::default().compile().is_err());
        assert!(ContentFilterRule::block(["(unclosed"]).compile().is_err());
        assert!(ContentFilterRule::block([""]).compile().is_err());
        let zero = ContentFilterRule {
            max_length: Some(0),
            ..ContentFilterRule::default()
        };
        assert!(zero.compile().is_err());
    }
}
