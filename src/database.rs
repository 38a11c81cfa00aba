use std::sync::Arc;

use lazy_static::lazy_static;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::log_file::{LogFile, NullLogFile};

lazy_static! {
    static ref GLOBAL_DB: Arc<Database> = Arc::new(Database::new());
}

/// Returns a handle to the process-wide database instance, lazily
/// constructed on first use.
pub fn get_global_db() -> Arc<Database> {
    Arc::clone(&GLOBAL_DB)
}

/// Ties together the catalog (schema + table lookup) and the buffer pool
/// (cached pages + locking) that every table operation goes through. The
/// catalog is shared with the buffer pool (rather than duplicated) so a
/// `Database` built via `with_log_file` resolves table ids against its
/// own tables, not the process-wide singleton's.
pub struct Database {
    buffer_pool: BufferPool,
    catalog: Arc<Catalog>,
}

impl Database {
    pub fn new() -> Self {
        let catalog = Arc::new(Catalog::new());
        Database {
            buffer_pool: BufferPool::new(Arc::clone(&catalog), Arc::new(NullLogFile)),
            catalog,
        }
    }

    pub fn with_log_file(log_file: Arc<dyn LogFile>) -> Self {
        let catalog = Arc::new(Catalog::new());
        Database {
            buffer_pool: BufferPool::new(Arc::clone(&catalog), log_file),
            catalog,
        }
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn log_file(&self) -> &Arc<dyn LogFile> {
        self.buffer_pool.log_file()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
