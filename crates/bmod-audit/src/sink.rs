// sink.rs — Durable backends for the audit log.
//
// A sink must not return Ok until the entry is recorded as durably as the
// backend allows. Three backends:
//
//   MemorySink: process-local, for tests and ephemeral runtimes
//   JsonlSink: append-only JSONL file with a SHA-256 hash chain
//   TimeoutSink: runs another sink on a writer thread and bounds each write

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::entry::AuditEntry;
use crate::error::AuditError;
use crate::hasher;

/// A durable destination for audit entries.
pub trait AuditSink: Send {
    /// Persist one entry. May fill in backend fields such as `previous_hash`.
    fn write(&mut self, entry: &mut AuditEntry) -> Result<(), AuditError>;

    /// Entries already persisted by a previous process, oldest first.
    /// Called once when the log is opened.
    fn recover(&mut self) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(Vec::new())
    }
}

// ── MemorySink ───────────────────────────────────────────────────

/// In-memory sink. Clones share the same storage, so a test can keep a
/// handle to inspect writes or to simulate a failing backend.
#[derive(Clone, Default)]
pub struct MemorySink {
    written: Arc<Mutex<Vec<AuditEntry>>>,
    failing: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn written(&self) -> Vec<AuditEntry> {
        self.written
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemorySink {
    fn write(&mut self, entry: &mut AuditEntry) -> Result<(), AuditError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::SinkUnavailable(
                "memory sink configured to fail".to_string(),
            ));
        }
        self.written
            .lock()
            .map_err(|_| AuditError::LockPoisoned)?
            .push(entry.clone());
        Ok(())
    }
}

// ── JsonlSink ────────────────────────────────────────────────────

/// An append-only audit log backed by a JSONL file.
///
/// Each entry is linked to the previous one via `previous_hash`, forming a
/// hash chain, so inserting, deleting, or editing lines is detectable.
///
/// Lines go straight to the file, unbuffered. A failed append is truncated
/// away and the sink then refuses every later write: the file holds exactly
/// the entries callers were told were recorded.
pub struct JsonlSink {
    file: File,
    path: PathBuf,
    /// Hash of the last line written (becomes `previous_hash` of the next entry).
    last_hash: Option<String>,
    failed: Option<String>,
    #[cfg(test)]
    fail_after_bytes: Option<usize>,
}

impl JsonlSink {
    /// Open (or create) a JSONL log, recovering the chain head from existing content.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| AuditError::OpenFailed {
                    path: path.clone(),
                    source,
                })?;
            }
        }

        let last_hash = if path.exists() {
            Self::read_last_hash(&path)?
        } else {
            None
        };

        // Append mode: existing lines are never overwritten.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            file,
            path,
            last_hash,
            failed: None,
            #[cfg(test)]
            fail_after_bytes: None,
        })
    }

    /// Make the next append write only `bytes` bytes and then fail.
    #[cfg(test)]
    pub(crate) fn fail_next_append_after(&mut self, bytes: usize) {
        self.fail_after_bytes = Some(bytes);
    }

    fn append(&mut self, line: &[u8]) -> std::io::Result<()> {
        #[cfg(test)]
        if let Some(n) = self.fail_after_bytes.take() {
            self.file.write_all(&line[..n.min(line.len())])?;
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected append failure",
            ));
        }
        self.file.write_all(line)?;
        // Reach the device, not just the OS page cache.
        self.file.sync_data()
    }

    /// Read all entries from a log file, oldest first. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, AuditError> {
        let reader = open_reader(path.as_ref())?;
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// Verify a log file's hash chain and sequence numbering.
    ///
    /// Returns the number of entries checked, or `IntegrityViolation` at the
    /// first broken link.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<usize, AuditError> {
        let reader = open_reader(path.as_ref())?;
        let mut previous_hash: Option<String> = None;
        let mut previous_sequence: Option<u64> = None;
        let mut count = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(&line)?;

            if entry.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: line_num + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: entry.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            if let Some(prev) = previous_sequence {
                if entry.sequence != prev + 1 {
                    return Err(AuditError::IntegrityViolation {
                        line: line_num + 1,
                        expected: format!("sequence {}", prev + 1),
                        actual: format!("sequence {}", entry.sequence),
                    });
                }
            }

            // Hash the raw line: re-serializing could reorder fields.
            previous_hash = Some(hasher::hash_str(&line));
            previous_sequence = Some(entry.sequence);
            count += 1;
        }

        Ok(count)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_last_hash(path: &Path) -> Result<Option<String>, AuditError> {
        let reader = open_reader(path)?;
        let mut last_line: Option<String> = None;
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                last_line = Some(line);
            }
        }
        Ok(last_line.map(|line| hasher::hash_str(&line)))
    }
}

impl AuditSink for JsonlSink {
    fn write(&mut self, entry: &mut AuditEntry) -> Result<(), AuditError> {
        if let Some(reason) = &self.failed {
            return Err(AuditError::SinkUnavailable(reason.clone()));
        }
        entry.previous_hash = self.last_hash.clone();
        let json = serde_json::to_string(entry)?;
        let mut line = Vec::with_capacity(json.len() + 1);
        line.extend_from_slice(json.as_bytes());
        line.push(b'\n');

        let start = self.file.metadata()?.len();
        if let Err(e) = self.append(&line) {
            let reason = match self.file.set_len(start).and_then(|()| self.file.sync_data()) {
                Ok(()) => format!("append of sequence {} failed: {}", entry.sequence, e),
                Err(t) => format!(
                    "append of sequence {} failed ({}) and could not be truncated: {}",
                    entry.sequence, e, t
                ),
            };
            tracing::error!(path = %self.path.display(), reason = %reason, "audit log disabled");
            self.failed = Some(reason);
            return Err(AuditError::WriteFailed(e));
        }

        // Only advance the chain once the line is on disk.
        self.last_hash = Some(hasher::hash_str(&json));
        Ok(())
    }

    fn recover(&mut self) -> Result<Vec<AuditEntry>, AuditError> {
        Self::read_all(&self.path)
    }
}

fn open_reader(path: &Path) -> Result<BufReader<File>, AuditError> {
    let file = File::open(path).map_err(|source| AuditError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

// ── TimeoutSink ──────────────────────────────────────────────────

struct WriteJob {
    entry: AuditEntry,
    reply: mpsc::SyncSender<Result<AuditEntry, AuditError>>,
}

/// Bounds every write of a possibly-blocking sink.
///
/// Writes run on a dedicated thread. If one does not finish within the
/// timeout the caller gets `AuditError::Timeout` and the sink refuses all
/// later writes: the stalled write may still land, so sequence numbers
/// handed out afterwards could collide with it.
pub struct TimeoutSink {
    jobs: Option<mpsc::Sender<WriteJob>>,
    worker: Option<JoinHandle<()>>,
    timeout: Duration,
    recovered: Vec<AuditEntry>,
    failed: Option<String>,
}

impl TimeoutSink {
    pub fn new<S>(mut inner: S, timeout: Duration) -> Result<Self, AuditError>
    where
        S: AuditSink + 'static,
    {
        let recovered = inner.recover()?;
        let (jobs, rx) = mpsc::channel::<WriteJob>();
        let worker = thread::Builder::new()
            .name("bmod-audit-writer".to_string())
            .spawn(move || {
                for job in rx {
                    let mut entry = job.entry;
                    let result = inner.write(&mut entry).map(|()| entry);
                    // The caller may have given up waiting; nothing to do then.
                    let _ = job.reply.send(result);
                }
            })?;

        Ok(Self {
            jobs: Some(jobs),
            worker: Some(worker),
            timeout,
            recovered,
            failed: None,
        })
    }

    fn poison(&mut self, reason: String) {
        tracing::error!(reason = %reason, "audit sink disabled");
        self.failed = Some(reason);
    }
}

impl AuditSink for TimeoutSink {
    fn write(&mut self, entry: &mut AuditEntry) -> Result<(), AuditError> {
        if let Some(reason) = &self.failed {
            return Err(AuditError::SinkUnavailable(reason.clone()));
        }
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| AuditError::SinkUnavailable("writer closed".to_string()))?;

        let (reply, response) = mpsc::sync_channel(1);
        if jobs
            .send(WriteJob {
                entry: entry.clone(),
                reply,
            })
            .is_err()
        {
            self.poison("audit writer thread exited".to_string());
            return Err(AuditError::SinkUnavailable(
                "audit writer thread exited".to_string(),
            ));
        }

        match response.recv_timeout(self.timeout) {
            Ok(Ok(written)) => {
                *entry = written;
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(RecvTimeoutError::Timeout) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                self.poison(format!(
                    "write of sequence {} timed out after {}ms",
                    entry.sequence, timeout_ms
                ));
                Err(AuditError::Timeout { timeout_ms })
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.poison("audit writer thread exited".to_string());
                Err(AuditError::SinkUnavailable(
                    "audit writer thread exited".to_string(),
                ))
            }
        }
    }

    fn recover(&mut self) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(std::mem::take(&mut self.recovered))
    }
}

impl Drop for TimeoutSink {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            // A stalled writer would block the join forever; leave it detached.
            if self.failed.is_none() {
                let _ = worker.join();
            }
        }
    }
}
