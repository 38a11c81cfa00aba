use crate::error::DbResult;
use crate::transaction::TransactionId;

/// Write-ahead logging hook the buffer pool calls into around flush.
/// The only invariant the buffer pool relies on is WAL ordering: `write`
/// appends the record, and `force` does not return until every record
/// appended so far is durable. The buffer pool always calls `write`
/// then `force` before the corresponding data page is written to the
/// heap file.
pub trait LogFile: Send + Sync {
    /// Appends one record carrying a page's image before and after the
    /// change `tid` made to it.
    fn write(&self, tid: TransactionId, before: &[u8], after: &[u8]) -> DbResult<()>;
    /// Forces every record appended so far to stable storage.
    fn force(&self) -> DbResult<()>;
}

/// A `LogFile` that records nothing beyond a debug-level trace of each
/// call. Recovery replay is out of scope for this crate; this exists so
/// the buffer pool can always call through the trait without every
/// caller standing up a real log.
pub struct NullLogFile;

impl LogFile for NullLogFile {
    fn write(&self, tid: TransactionId, before: &[u8], after: &[u8]) -> DbResult<()> {
        log::debug!(
            "log write: tx {} ({} before bytes, {} after bytes)",
            tid,
            before.len(),
            after.len()
        );
        Ok(())
    }

    fn force(&self) -> DbResult<()> {
        log::debug!("log force");
        Ok(())
    }
}

/// Test double that records every call instead of discarding it, so a
/// test can assert the buffer pool actually exercises the WAL ordering
/// (`write` then `force`, before the page is written back) rather than
/// just compiling against the trait.
#[cfg(test)]
pub struct RecordingLogFile {
    calls: std::sync::Mutex<Vec<LoggedCall>>,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggedCall {
    Write { tid: TransactionId, before_len: usize, after_len: usize },
    Force,
}

#[cfg(test)]
impl RecordingLogFile {
    pub fn new() -> Self {
        RecordingLogFile {
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<LoggedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl LogFile for RecordingLogFile {
    fn write(&self, tid: TransactionId, before: &[u8], after: &[u8]) -> DbResult<()> {
        self.calls.lock().unwrap().push(LoggedCall::Write {
            tid,
            before_len: before.len(),
            after_len: after.len(),
        });
        Ok(())
    }

    fn force(&self) -> DbResult<()> {
        self.calls.lock().unwrap().push(LoggedCall::Force);
        Ok(())
    }
}
