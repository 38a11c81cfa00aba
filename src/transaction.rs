use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one transaction. Transactions begin implicitly on first
/// lock acquisition and end at commit or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId {
    tid: u64,
}

impl TransactionId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let tid = COUNTER.fetch_add(1, Ordering::SeqCst);
        TransactionId { tid }
    }

    pub fn id(&self) -> u64 {
        self.tid
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{}", self.tid)
    }
}
