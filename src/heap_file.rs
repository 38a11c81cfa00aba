use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::buffer_pool::PAGE_SIZE;
use crate::error::DbResult;
use crate::heap_page::{HeapPage, HeapPageId};
use crate::tuple::TupleDesc;

/// Derives a table id deterministically from its backing file's path, so
/// the same file always maps to the same id across process restarts
/// (unlike a random id minted fresh each run). Canonicalizes first so
/// `./data/foo.dat` and `/abs/data/foo.dat` (or a path reached through a
/// symlink) hash to the same id; falls back to hashing the path as given
/// if canonicalization fails, e.g. the file doesn't exist yet.
pub fn table_id_for_path(path: &Path) -> u32 {
    let canonical = path.canonicalize();
    let mut hasher = DefaultHasher::new();
    match &canonical {
        Ok(resolved) => resolved.hash(&mut hasher),
        Err(_) => path.hash(&mut hasher),
    }
    hasher.finish() as u32
}

/// A table's on-disk storage: a flat file of fixed-size heap pages,
/// addressed by page number. All mutation goes through the buffer pool;
/// this type only knows how to seek and read/write whole pages.
pub struct HeapFile {
    file: Mutex<File>,
    td: TupleDesc,
    id: u32,
}

impl HeapFile {
    pub fn new(file: File, td: TupleDesc, id: u32) -> Self {
        HeapFile {
            file: Mutex::new(file),
            td,
            id,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    /// Reads the page at `pid`. A page entirely past the current end of
    /// file comes back as an all-zero page purely in memory — this is a
    /// read path (callers may only hold a SHARED lock), so it never
    /// extends the file on disk. A page straddling the end of file (the
    /// file's length isn't a multiple of `PAGE_SIZE`) reads whatever
    /// bytes exist and zero-fills the rest, per the "short last page
    /// tolerated on read" rule.
    pub fn read_page(&self, pid: &HeapPageId) -> DbResult<HeapPage> {
        let mut file = self.file.lock().unwrap();
        let offset = (pid.page_number() * PAGE_SIZE) as u64;
        let file_len = file.metadata()?.len();

        let mut data = vec![0u8; PAGE_SIZE];
        if offset < file_len {
            let available = std::cmp::min(file_len - offset, PAGE_SIZE as u64) as usize;
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut data[..available])?;
        }
        HeapPage::parse(*pid, data, self.td.clone())
    }

    pub fn write_page(&self, page: &HeapPage) -> DbResult<()> {
        let pid = page.id();
        let data = page.serialize();
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((pid.page_number() * PAGE_SIZE) as u64))?;
        file.write_all(&data)?;
        Ok(())
    }

    pub fn num_pages(&self) -> DbResult<usize> {
        let mut file = self.file.lock().unwrap();
        Self::num_pages_locked(&mut file)
    }

    fn num_pages_locked(file: &mut File) -> DbResult<usize> {
        let len = file.metadata()?.len() as usize;
        Ok((len + PAGE_SIZE - 1) / PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldVal, IntField};
    use crate::types::Type;
    use tempfile::tempfile;

    fn desc() -> TupleDesc {
        TupleDesc::named(vec![Type::Int], vec!["a".to_string()])
    }

    #[test]
    fn read_page_past_eof_zero_pads_without_growing_the_file() {
        let file = tempfile().unwrap();
        let hf = HeapFile::new(file, desc(), 1);
        let pid = HeapPageId::new(1, 2);
        let page = hf.read_page(&pid).unwrap();
        assert_eq!(page.num_empty_slots(), page.num_slots());
        // A read past EOF must not itself extend the file on disk.
        assert_eq!(hf.num_pages().unwrap(), 0);
    }

    #[test]
    fn read_page_tolerates_a_short_final_page() {
        let mut file = tempfile().unwrap();
        // Write less than one full page's worth of (all-zero) bytes
        // directly, simulating a file whose length isn't a multiple of
        // PAGE_SIZE. `read_exact` would otherwise fail with
        // `UnexpectedEof` instead of zero-filling the remainder.
        file.write_all(&vec![0u8; PAGE_SIZE / 2]).unwrap();
        let hf = HeapFile::new(file, desc(), 1);
        let pid = HeapPageId::new(1, 0);
        let page = hf.read_page(&pid).unwrap();
        assert_eq!(page.num_empty_slots(), page.num_slots());
    }

    #[test]
    fn write_then_read_round_trips() {
        let file = tempfile().unwrap();
        let hf = HeapFile::new(file, desc(), 1);
        let pid = HeapPageId::new(1, 0);
        let mut page = hf.read_page(&pid).unwrap();
        page.insert_tuple(tuple_for_test()).unwrap();
        hf.write_page(&page).unwrap();

        let reread = hf.read_page(&pid).unwrap();
        assert_eq!(reread.iter().count(), 1);
    }

    fn tuple_for_test() -> crate::tuple::Tuple {
        crate::tuple::Tuple::new(vec![FieldVal::Int(IntField::new(5))], &desc())
    }

    #[test]
    fn table_id_for_path_is_stable() {
        let p = Path::new("/var/data/employees.dat");
        assert_eq!(table_id_for_path(p), table_id_for_path(p));
    }

    #[test]
    fn table_id_for_path_matches_across_equivalent_spellings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("employees.dat");
        std::fs::write(&path, b"").unwrap();

        let via_dotdot = dir
            .path()
            .join("sub")
            .join("..")
            .join("employees.dat");
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();

        assert_eq!(table_id_for_path(&path), table_id_for_path(&via_dotdot));
    }
}
