// log.rs — The audit log: a totally ordered, append-only sequence.
//
// One mutex guards the sequence counter, the sink, and the in-memory index,
// so the order entries are numbered in is the order they reach the sink and
// the order queries return them in. A failed sink write consumes no
// sequence number and leaves no entry behind.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::entry::{AuditEntry, AuditKind, AuditRecord};
use crate::error::AuditError;
use crate::filter::AuditFilter;
use crate::sink::{AuditSink, JsonlSink, MemorySink, TimeoutSink};

struct LogState {
    sink: Box<dyn AuditSink>,
    entries: Vec<AuditEntry>,
    next_sequence: u64,
}

/// Append-only audit log. Share it behind an `Arc`; all methods take `&self`.
pub struct AuditLog {
    state: Mutex<LogState>,
}

impl AuditLog {
    /// Build a log over any sink, recovering entries it already holds.
    pub fn with_sink(mut sink: impl AuditSink + 'static) -> Result<Self, AuditError> {
        let entries = sink.recover()?;
        let next_sequence = entries.last().map(|e| e.sequence + 1).unwrap_or(1);
        tracing::debug!(recovered = entries.len(), next_sequence, "audit log opened");
        Ok(Self {
            state: Mutex::new(LogState {
                sink: Box::new(sink),
                entries,
                next_sequence,
            }),
        })
    }

    /// An ephemeral log that lives only in this process.
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(LogState {
                sink: Box::new(MemorySink::new()),
                entries: Vec::new(),
                next_sequence: 1,
            }),
        }
    }

    /// Open (or create) a JSONL-backed log.
    pub fn open_jsonl(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        Self::with_sink(JsonlSink::open(path)?)
    }

    /// Open a JSONL-backed log whose writes are bounded by `timeout`.
    pub fn open_jsonl_with_timeout(
        path: impl AsRef<Path>,
        timeout: Duration,
    ) -> Result<Self, AuditError> {
        Self::with_sink(TimeoutSink::new(JsonlSink::open(path)?, timeout)?)
    }

    /// Append one entry. Returns only after the sink has recorded it.
    pub fn record(&self, kind: AuditKind, record: AuditRecord) -> Result<AuditEntry, AuditError> {
        let mut state = self.state.lock().map_err(|_| AuditError::LockPoisoned)?;
        let mut entry = AuditEntry::new(state.next_sequence, kind, record);

        if let Err(e) = state.sink.write(&mut entry) {
            tracing::error!(sequence = entry.sequence, kind = %kind, error = %e, "audit append failed");
            return Err(e);
        }

        state.next_sequence += 1;
        state.entries.push(entry.clone());
        Ok(entry)
    }

    /// Entries matching `filter`, oldest first. Never mutates the log.
    pub fn query(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        match self.state.lock() {
            Ok(state) => filter.apply(&state.entries),
            // Entries are only pushed after a complete write, so the data
            // behind a poisoned lock is still consistent.
            Err(poisoned) => filter.apply(&poisoned.into_inner().entries),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequence number of the most recent entry, if any.
    pub fn last_sequence(&self) -> Option<u64> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.entries.last().map(|e| e.sequence))
    }
}
