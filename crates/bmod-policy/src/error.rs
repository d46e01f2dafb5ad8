// error.rs — Error types for the policy subsystem.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during policy operations.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The rule is malformed (empty constraint sets, bad regex, ...).
    /// Rejected before any state changes.
    #[error("invalid policy spec: {reason}")]
    InvalidPolicySpec { reason: String },

    /// No active policy with this id.
    #[error("policy not found: {0}")]
    PolicyNotFound(Uuid),

    /// The audit entry for this operation could not be recorded.
    #[error("persistence failure: audit append failed: {0}")]
    AuditFailure(#[from] bmod_audit::AuditError),

    /// A policy record could not be written to the store.
    #[error("persistence failure: cannot write policy store at {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A persisted policy could not be read back. Fatal at startup.
    #[error("policy store at {path} is corrupt: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    /// A rule spec document could not be parsed.
    #[error("cannot parse rule spec: {0}")]
    SpecParse(#[from] serde_yaml::Error),

    /// Failed to serialize a policy record.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A thread panicked while holding the engine's lock.
    #[error("policy engine lock poisoned")]
    LockPoisoned,
}

impl PolicyError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        PolicyError::InvalidPolicySpec {
            reason: reason.into(),
        }
    }

    /// True when the operation failed because something could not be
    /// durably recorded (audit entry or policy record).
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            PolicyError::AuditFailure(_) | PolicyError::StoreWrite { .. }
        )
    }
}
