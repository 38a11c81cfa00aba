use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use log::debug;

use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::heap_page::{HeapPage, HeapPageId, Permission};
use crate::lock_manager::LockManager;
use crate::log_file::LogFile;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;

pub const PAGE_SIZE: usize = 4096;
pub const DEFAULT_PAGES: usize = 50;

/// Bounded cache of `HeapPage`s backed by disk, fetched through the
/// catalog on a miss. Eviction is NO-STEAL: a dirty page is never
/// written out to make room, only clean pages are reclaimed, by least
/// recently touched.
///
/// Holds a handle to the `Catalog` of the `Database` it belongs to
/// (not the process-wide singleton) so a pool built via
/// `Database::with_log_file` resolves table ids against its own
/// owner's tables rather than the global catalog.
pub struct BufferPool {
    id_to_page: RwLock<HashMap<HeapPageId, Arc<RwLock<HeapPage>>>>,
    recency: Mutex<HashMap<HeapPageId, u64>>,
    clock: AtomicU64,
    lock_manager: LockManager,
    num_pages: usize,
    log_file: Arc<dyn LogFile>,
    catalog: Arc<Catalog>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, log_file: Arc<dyn LogFile>) -> Self {
        Self::with_capacity(DEFAULT_PAGES, catalog, log_file)
    }

    pub fn with_capacity(num_pages: usize, catalog: Arc<Catalog>, log_file: Arc<dyn LogFile>) -> Self {
        BufferPool {
            id_to_page: RwLock::new(HashMap::new()),
            recency: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
            lock_manager: LockManager::new(),
            num_pages,
            log_file,
            catalog,
        }
    }

    fn touch(&self, pid: HeapPageId) {
        let stamp = self.clock.fetch_add(1, Ordering::SeqCst);
        self.recency.lock().unwrap().insert(pid, stamp);
    }

    /// Fetches `pid` for `tid` under `perm`, acquiring the page-level
    /// lock first. Blocks on lock contention; fails with `TxAborted` if
    /// the wait would deadlock.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: HeapPageId,
        perm: Permission,
    ) -> DbResult<Arc<RwLock<HeapPage>>> {
        self.lock_manager.acquire(tid, pid, perm)?;

        {
            let id_to_page = self.id_to_page.read().unwrap();
            if let Some(page) = id_to_page.get(&pid) {
                self.touch(pid);
                return Ok(Arc::clone(page));
            }
        }

        let table = self
            .catalog
            .table_by_id(pid.table_id())
            .ok_or_else(|| DbError::NotFound(format!("table {}", pid.table_id())))?;

        let mut id_to_page = self.id_to_page.write().unwrap();
        if let Some(page) = id_to_page.get(&pid) {
            self.touch(pid);
            return Ok(Arc::clone(page));
        }
        if id_to_page.len() >= self.num_pages {
            self.evict_one(&mut id_to_page)?;
        }
        let page = table.read_page(&pid)?;
        let page = Arc::new(RwLock::new(page));
        id_to_page.insert(pid, Arc::clone(&page));
        drop(id_to_page);
        self.touch(pid);
        Ok(page)
    }

    /// Picks the least-recently-touched clean page and drops it from the
    /// cache. Fails with `NoSpace` if every cached page is dirty.
    fn evict_one(
        &self,
        id_to_page: &mut HashMap<HeapPageId, Arc<RwLock<HeapPage>>>,
    ) -> DbResult<()> {
        let recency = self.recency.lock().unwrap();
        let victim = recency
            .iter()
            .filter(|(pid, _)| {
                id_to_page
                    .get(pid)
                    .map(|p| p.read().unwrap().is_dirty().is_none())
                    .unwrap_or(false)
            })
            .min_by_key(|(_, stamp)| **stamp)
            .map(|(pid, _)| *pid);
        drop(recency);

        match victim {
            Some(pid) => {
                debug!("evicting page {:?}", pid);
                id_to_page.remove(&pid);
                self.recency.lock().unwrap().remove(&pid);
                Ok(())
            }
            None => Err(DbError::NoSpace),
        }
    }

    /// Flushes `pid` to disk if dirty and clears its dirty bit, without
    /// evicting it from the cache.
    pub fn flush_page(&self, pid: HeapPageId) -> DbResult<()> {
        let id_to_page = self.id_to_page.read().unwrap();
        let page = match id_to_page.get(&pid) {
            Some(p) => Arc::clone(p),
            None => return Ok(()),
        };
        drop(id_to_page);

        let mut page = page.write().unwrap();
        if let Some(tid) = page.is_dirty() {
            let before = page.before_image_bytes().to_vec();
            let after = page.serialize();
            self.log_file.write(tid, &before, &after)?;
            self.log_file.force()?;

            let table = self
                .catalog
                .table_by_id(pid.table_id())
                .ok_or_else(|| DbError::NotFound(format!("table {}", pid.table_id())))?;
            table.write_page(&page)?;
            page.mark_dirty(false, tid);
            page.set_before_image();
        }
        Ok(())
    }

    fn flush_pages(&self, pids: &[HeapPageId]) -> DbResult<()> {
        for pid in pids {
            self.flush_page(*pid)?;
        }
        Ok(())
    }

    pub fn flush_all_pages(&self) -> DbResult<()> {
        let pids: Vec<HeapPageId> = self.id_to_page.read().unwrap().keys().copied().collect();
        self.flush_pages(&pids)
    }

    /// Drops `pid` from the cache without writing it back, regardless of
    /// its dirty bit.
    pub fn discard_page(&self, pid: HeapPageId) {
        self.id_to_page.write().unwrap().remove(&pid);
        self.recency.lock().unwrap().remove(&pid);
    }

    /// Commits `tid`: for each page it dirtied, logs the before/after
    /// image and forces the log ahead of writing the page back (WAL),
    /// then releases its locks.
    pub fn commit_transaction(&self, tid: TransactionId) -> DbResult<()> {
        let pages = self.lock_manager.pages_held_by(tid);
        self.flush_pages(&pages.into_iter().collect::<Vec<_>>())?;
        self.lock_manager.release_all(tid);
        Ok(())
    }

    /// Aborts `tid`: reverts any dirty pages it touched to their
    /// pre-transaction image (pure in-memory rollback, nothing was
    /// logged or written for an uncommitted change) and releases its
    /// locks.
    pub fn abort_transaction(&self, tid: TransactionId) -> DbResult<()> {
        let pages = self.lock_manager.pages_held_by(tid);
        let id_to_page = self.id_to_page.read().unwrap();
        for pid in &pages {
            if let Some(page) = id_to_page.get(pid) {
                let mut page = page.write().unwrap();
                if page.is_dirty().is_some() {
                    let restored = page.before_image()?;
                    *page = restored;
                    page.mark_dirty(false, tid);
                }
            }
        }
        drop(id_to_page);
        self.lock_manager.release_all(tid);
        Ok(())
    }

    /// Inserts `tuple` into the first page of `table_id` with a free
    /// slot, appending a fresh page if every existing page is full.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: u32, tuple: Tuple) -> DbResult<()> {
        let table = self
            .catalog
            .table_by_id(table_id)
            .ok_or_else(|| DbError::NotFound(format!("table {}", table_id)))?;

        let mut page_no = 0;
        loop {
            let pid = HeapPageId::new(table_id, page_no);
            let page = self.get_page(tid, pid, Permission::Read)?;
            let has_space = page.read().unwrap().num_empty_slots() > 0;
            if has_space || page_no >= table.num_pages()? {
                let page = self.get_page(tid, pid, Permission::Write)?;
                let mut page = page.write().unwrap();
                page.insert_tuple(tuple)?;
                page.mark_dirty(true, tid);
                return Ok(());
            }
            page_no += 1;
        }
    }

    /// Deletes `tuple` from the page named by its own `RecordId`.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> DbResult<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| DbError::NotFound("tuple has no record id".to_string()))?;
        let page = self.get_page(tid, rid.page_id(), Permission::Write)?;
        let mut page = page.write().unwrap();
        page.delete_tuple(tuple)?;
        page.mark_dirty(true, tid);
        Ok(())
    }

    pub fn num_pages(&self) -> usize {
        self.num_pages
    }

    pub fn log_file(&self) -> &Arc<dyn LogFile> {
        &self.log_file
    }
}
