//! # bmod-audit
//!
//! Append-only audit trail for agent behavior modification.
//!
//! Every policy decision and every policy mutation is recorded as an
//! [`AuditEntry`]. Entries carry a gap-free sequence number assigned under a
//! single lock, so concurrent callers always observe one total order.
//! Durability is delegated to an [`AuditSink`]: the JSONL sink links each
//! line to the previous one with a SHA-256 hash chain.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use bmod_audit::{AuditFilter, AuditKind, AuditLog, AuditRecord, PolicySummary};
//!
//! let log = AuditLog::open_jsonl("/tmp/audit.jsonl").unwrap();
//! log.record(
//!     AuditKind::PolicyAdded,
//!     AuditRecord::mutation(PolicySummary::new(None, "time_window", "business hours"), "added"),
//! )
//! .unwrap();
//! let everything = log.query(&AuditFilter::all());
//! assert!(!everything.is_empty());
//! ```

pub mod entry;
pub mod error;
pub mod filter;
pub mod hasher;
pub mod log;
pub mod sink;

pub use entry::{AuditEntry, AuditKind, AuditRecord, DecisionSummary, PolicySummary, RequestSummary};
pub use error::AuditError;
pub use filter::{AuditFilter, OutcomeFilter};
pub use log::AuditLog;
pub use sink::{AuditSink, JsonlSink, MemorySink, TimeoutSink};
