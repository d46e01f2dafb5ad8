// error.rs — Error types for the runtime controller.

use std::path::PathBuf;

use bmod_audit::AuditError;
use bmod_policy::PolicyError;
use bmod_translate::TranslateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The operator's role is not one of the configured admin roles.
    /// The attempt itself is audited.
    #[error("unauthorized modification: operator '{operator}' (role {role:?}) is not an admin")]
    UnauthorizedModification {
        operator: String,
        role: Option<String>,
    },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    /// Audit log could not be opened or appended to outside the engine.
    #[error("persistence failure: {0}")]
    Audit(#[from] AuditError),

    /// Config file exists but could not be read or parsed.
    #[error("invalid config at {path}: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl RuntimeError {
    /// True when something could not be durably recorded.
    pub fn is_persistence_failure(&self) -> bool {
        match self {
            RuntimeError::Policy(e) => e.is_persistence_failure(),
            RuntimeError::Audit(_) => true,
            _ => false,
        }
    }
}
