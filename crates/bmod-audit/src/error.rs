// error.rs — Error types for the audit subsystem.
//
// Every variant here surfaces to callers as a persistence failure: an audit
// entry that could not be recorded must never be reported as recorded.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during audit operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create the audit log file.
    #[error("failed to open audit log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an entry to the backing store.
    #[error("failed to append entry: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Failed to serialize or deserialize an entry (malformed JSON).
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The audit log has been tampered with and its hash chain is broken.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },

    /// The backing store did not acknowledge the write in time.
    #[error("audit write did not complete within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The sink refuses further writes (a previous write timed out or its
    /// writer thread is gone).
    #[error("audit sink unavailable: {0}")]
    SinkUnavailable(String),

    /// A thread panicked while holding the audit lock.
    #[error("audit log lock poisoned")]
    LockPoisoned,
}
