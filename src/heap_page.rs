use crate::buffer_pool::PAGE_SIZE;
use crate::error::{DbError, DbResult};
use crate::transaction::TransactionId;
use crate::tuple::{RecordId, Tuple, TupleDesc};

/// Whether a page is being fetched to be read or to be written; the
/// `BufferPool` maps this to the shared/exclusive lock it must hold.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Copy)]
pub enum Permission {
    Read,
    Write,
}

/// Stable identity of a page: its table and its 0-based page number.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Copy)]
pub struct HeapPageId {
    table_id: u32,
    page_number: usize,
}

impl HeapPageId {
    pub fn new(table_id: u32, page_number: usize) -> Self {
        HeapPageId {
            table_id,
            page_number,
        }
    }

    pub fn table_id(&self) -> u32 {
        self.table_id
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }
}

/// A slotted page: a bitmap header followed by `num_slots` fixed-size
/// tuple slots. Bit `i` of the header (LSB-first within each byte, i.e.
/// bit `i % 8` of byte `i / 8`) is 1 iff slot `i` is occupied.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HeapPage {
    pid: HeapPageId,
    td: TupleDesc,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    num_slots: usize,
    before_image: Vec<u8>,
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// Computes the number of fixed-size tuple slots a page of `PAGE_SIZE`
    /// bytes can hold for tuples of `tuple_size` bytes each, per the
    /// formula `floor((pageSize * 8) / (tupleSize * 8 + 1))`.
    pub fn num_slots_for(tuple_size: usize) -> usize {
        (PAGE_SIZE * 8) / (tuple_size * 8 + 1)
    }

    pub fn header_size_for(num_slots: usize) -> usize {
        (num_slots + 7) / 8
    }

    /// Parses a page's worth of raw bytes (`data.len() == PAGE_SIZE`).
    pub fn parse(pid: HeapPageId, data: Vec<u8>, td: TupleDesc) -> DbResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(DbError::Other(format!(
                "expected {} bytes, got {}",
                PAGE_SIZE,
                data.len()
            )));
        }
        let tuple_size = td.byte_size();
        let num_slots = Self::num_slots_for(tuple_size);
        let header_size = Self::header_size_for(num_slots);
        let header = data[..header_size].to_vec();

        let mut tuples = Vec::with_capacity(num_slots);
        for i in 0..num_slots {
            if Self::get_slot(&header, i) {
                let start = header_size + i * tuple_size;
                let end = start + tuple_size;
                let mut tuple = Tuple::decode(&data[start..end], &td)?;
                tuple.set_record_id(RecordId::new(pid, i));
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }
        }

        Ok(HeapPage {
            pid,
            td,
            header,
            tuples,
            num_slots,
            before_image: data,
            dirtied_by: None,
        })
    }

    pub fn id(&self) -> HeapPageId {
        self.pid
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    /// The page's content as it was at the last `set_before_image` call
    /// (i.e. its state at the start of the current dirtying transaction).
    pub fn before_image(&self) -> DbResult<HeapPage> {
        HeapPage::parse(self.pid, self.before_image.clone(), self.td.clone())
    }

    /// Snapshots the page's current bytes as the new clean baseline.
    pub fn set_before_image(&mut self) {
        self.before_image = self.serialize();
    }

    /// Raw bytes of the last-snapshotted clean baseline, for handing to
    /// the log file alongside the current bytes.
    pub fn before_image_bytes(&self) -> &[u8] {
        &self.before_image
    }

    /// Serializes the page back to exactly `PAGE_SIZE` bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let tuple_size = self.td.byte_size();
        let mut data = self.header.clone();
        for i in 0..self.num_slots {
            match &self.tuples[i] {
                Some(tuple) => data.extend(tuple.encode()),
                None => data.extend(vec![0u8; tuple_size]),
            }
        }
        data.resize(PAGE_SIZE, 0);
        data
    }

    fn get_slot(header: &[u8], i: usize) -> bool {
        let idx = i / 8;
        let bit = i % 8;
        if idx >= header.len() {
            return false;
        }
        header[idx] & (1 << bit) != 0
    }

    fn set_slot(header: &mut [u8], i: usize, value: bool) {
        let idx = i / 8;
        let bit = i % 8;
        if value {
            header[idx] |= 1 << bit;
        } else {
            header[idx] &= !(1 << bit);
        }
    }

    /// Inserts `tuple` into the lowest-index free slot, assigning its
    /// `RecordId`. Fails with `NoSpace` if the page is full, or
    /// `SchemaMismatch` if the tuple's descriptor disagrees with the
    /// page's.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> DbResult<()> {
        if tuple.tuple_desc() != &self.td {
            return Err(DbError::SchemaMismatch {
                expected: format!("{:?}", self.td.field_name(0)),
                found: format!("{:?}", tuple.tuple_desc().field_name(0)),
            });
        }
        for i in 0..self.num_slots {
            if !Self::get_slot(&self.header, i) {
                tuple.set_record_id(RecordId::new(self.pid, i));
                self.tuples[i] = Some(tuple);
                Self::set_slot(&mut self.header, i, true);
                return Ok(());
            }
        }
        Err(DbError::NoSpace)
    }

    /// Clears the slot backing `tuple`'s `RecordId`. Fails with
    /// `NotFound` if the id names a different page or an already-empty
    /// slot.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> DbResult<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| DbError::NotFound("tuple has no record id".to_string()))?;
        if rid.page_id() != self.pid {
            return Err(DbError::NotFound("tuple not on this page".to_string()));
        }
        if !Self::get_slot(&self.header, rid.slot()) {
            return Err(DbError::NotFound("slot already empty".to_string()));
        }
        self.tuples[rid.slot()] = None;
        Self::set_slot(&mut self.header, rid.slot(), false);
        Ok(())
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots)
            .filter(|&i| !Self::get_slot(&self.header, i))
            .count()
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirtied_by = if dirty { Some(tid) } else { None };
    }

    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn iter(&self) -> HeapPageIterator {
        HeapPageIterator {
            page: self,
            index: 0,
        }
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }
}

pub struct HeapPageIterator<'a> {
    page: &'a HeapPage,
    index: usize,
}

impl<'a> Iterator for HeapPageIterator<'a> {
    type Item = &'a Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.page.num_slots {
            let i = self.index;
            self.index += 1;
            if let Some(tuple) = &self.page.tuples[i] {
                return Some(tuple);
            }
        }
        None
    }
}
