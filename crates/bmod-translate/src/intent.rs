// intent.rs — What a plain-language request is asking for.

use std::fmt;

use bmod_policy::PolicyRule;
use serde::{Deserialize, Serialize};

/// The fixed set of modification intents the translator recognizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModificationIntent {
    RestrictTime,
    BlockUser,
    RestrictAction,
    BlockContent,
    SetSecurityLevel,
}

impl ModificationIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            ModificationIntent::RestrictTime => "restrict_time",
            ModificationIntent::BlockUser => "block_user",
            ModificationIntent::RestrictAction => "restrict_action",
            ModificationIntent::BlockContent => "block_content",
            ModificationIntent::SetSecurityLevel => "set_security_level",
        }
    }

    /// Prefix for generated policy descriptions.
    pub fn label(self) -> &'static str {
        match self {
            ModificationIntent::RestrictTime => "Time restriction",
            ModificationIntent::BlockUser => "User restriction",
            ModificationIntent::RestrictAction => "Action restriction",
            ModificationIntent::BlockContent => "Content restriction",
            ModificationIntent::SetSecurityLevel => "Security level",
        }
    }
}

impl fmt::Display for ModificationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful translation: the classified intent and the rule built for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Translation {
    pub intent: ModificationIntent,
    pub rule: PolicyRule,
    pub description: String,
}
