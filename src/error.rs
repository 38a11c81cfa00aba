use std::fmt;

use crate::transaction::TransactionId;

/// The error kinds a caller of this crate can observe, per the error
/// handling design: each maps to one distinct outcome a driver must
/// react to (abort the transaction, surface to the user, etc.).
#[derive(Debug)]
pub enum DbError {
    /// Deadlock victim, explicit abort, or a cascading failure from one.
    TxAborted { tid: TransactionId },
    /// A tuple's descriptor disagrees with the page/table it is inserted into.
    SchemaMismatch { expected: String, found: String },
    /// `HeapPage::insert` found every slot occupied.
    NoSpace,
    /// An invariant was violated: stale `RecordId`, eviction with no clean
    /// page, lookup of a table/page that does not exist.
    NotFound(String),
    /// `Operator::next` called at or past end-of-stream, or a lookup by a
    /// missing field name / out-of-range index.
    NoSuchElement,
    /// Disk or log I/O failed.
    Io(std::io::Error),
    /// Anything else that does not warrant its own variant.
    Other(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::TxAborted { tid } => write!(f, "transaction {} aborted", tid),
            DbError::SchemaMismatch { expected, found } => {
                write!(f, "schema mismatch: expected {}, found {}", expected, found)
            }
            DbError::NoSpace => write!(f, "no space left on page"),
            DbError::NotFound(what) => write!(f, "not found: {}", what),
            DbError::NoSuchElement => write!(f, "no such element"),
            DbError::Io(e) => write!(f, "io error: {}", e),
            DbError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DbError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::Io(e)
    }
}

pub type DbResult<T> = Result<T, DbError>;
