use crate::database;
use crate::error::{DbError, DbResult};
use crate::heap_page::{HeapPageId, Permission};
use crate::operator::Operator;
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};

/// Reads every tuple of one table, one page at a time, through the
/// buffer pool (so each page fetch takes the transaction's read lock).
pub struct SeqScan {
    tid: TransactionId,
    table_id: u32,
    td: TupleDesc,
    next_page: usize,
    num_pages: usize,
    page_buf: std::vec::IntoIter<Tuple>,
    peeked: Option<Tuple>,
}

impl SeqScan {
    /// Scans `table_id`, qualifying every output field name as
    /// `"{alias}.{field}"` (spec §4.5).
    pub fn new(tid: TransactionId, table_id: u32, alias: &str) -> DbResult<Self> {
        let db = database::get_global_db();
        let table = db
            .catalog()
            .table_by_id(table_id)
            .ok_or_else(|| DbError::NotFound(format!("table {}", table_id)))?;
        let td = table.tuple_desc().prefixed(alias);
        let num_pages = table.num_pages()?;
        Ok(SeqScan {
            tid,
            table_id,
            td,
            next_page: 0,
            num_pages,
            page_buf: Vec::new().into_iter(),
            peeked: None,
        })
    }

    /// Convenience constructor that aliases the scan with the table's
    /// own registered name.
    pub fn with_table_name(tid: TransactionId, table_id: u32) -> DbResult<Self> {
        let db = database::get_global_db();
        let alias = db
            .catalog()
            .name_for(table_id)
            .ok_or_else(|| DbError::NotFound(format!("table {}", table_id)))?;
        Self::new(tid, table_id, &alias)
    }

    fn load_next_page(&mut self) -> DbResult<bool> {
        let db = database::get_global_db();
        while self.next_page < self.num_pages {
            let pid = HeapPageId::new(self.table_id, self.next_page);
            self.next_page += 1;
            let page = db.buffer_pool().get_page(self.tid, pid, Permission::Read)?;
            let tuples: Vec<Tuple> = page.read().unwrap().iter().cloned().collect();
            if !tuples.is_empty() {
                self.page_buf = tuples.into_iter();
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn fetch(&mut self) -> DbResult<Option<Tuple>> {
        loop {
            if let Some(t) = self.page_buf.next() {
                return Ok(Some(t));
            }
            if !self.load_next_page()? {
                return Ok(None);
            }
        }
    }
}

impl Operator for SeqScan {
    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    fn open(&mut self) -> DbResult<()> {
        Ok(())
    }

    fn has_next(&mut self) -> DbResult<bool> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        self.peeked = self.fetch()?;
        Ok(self.peeked.is_some())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        if let Some(t) = self.peeked.take() {
            return Ok(Some(t));
        }
        self.fetch()
    }

    fn close(&mut self) {
        self.next_page = self.num_pages;
        self.page_buf = Vec::new().into_iter();
        self.peeked = None;
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.next_page = 0;
        self.page_buf = Vec::new().into_iter();
        self.peeked = None;
        Ok(())
    }
}
