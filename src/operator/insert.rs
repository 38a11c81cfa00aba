use crate::database;
use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField};
use crate::operator::Operator;
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

/// Draining operator: pulls every tuple from `child` and inserts it into
/// `table_id` through the buffer pool, then emits exactly one `(Int)`
/// tuple counting the insertions. A second `next()` call after that row
/// sees end-of-stream, same as every other operator.
pub struct Insert {
    tid: TransactionId,
    table_id: u32,
    child: Box<dyn Operator>,
    td: TupleDesc,
    result: Option<Tuple>,
    done: bool,
}

impl Insert {
    pub fn new(tid: TransactionId, table_id: u32, child: Box<dyn Operator>) -> DbResult<Self> {
        let db = database::get_global_db();
        let target_desc = db
            .catalog()
            .desc_for(table_id)
            .ok_or_else(|| DbError::NotFound(format!("table {}", table_id)))?;
        if child.tuple_desc() != &target_desc {
            return Err(DbError::SchemaMismatch {
                expected: format!("{:?}", target_desc),
                found: format!("{:?}", child.tuple_desc()),
            });
        }
        Ok(Insert {
            tid,
            table_id,
            child,
            td: TupleDesc::named(vec![Type::Int], vec!["count".to_string()]),
            result: None,
            done: false,
        })
    }
}

impl Operator for Insert {
    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
        let db = database::get_global_db();
        let mut count = 0i32;
        while self.child.has_next()? {
            let tuple = self
                .child
                .next()?
                .ok_or_else(|| DbError::Other("has_next/next disagreed".to_string()))?;
            db.buffer_pool()
                .insert_tuple(self.tid, self.table_id, tuple)?;
            count += 1;
        }
        self.result = Some(Tuple::new(vec![FieldVal::Int(IntField::new(count))], &self.td));
        self.done = false;
        Ok(())
    }

    fn has_next(&mut self) -> DbResult<bool> {
        Ok(!self.done && self.result.is_some())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        Ok(self.result.take())
    }

    fn close(&mut self) {
        self.child.close();
        self.result = None;
        self.done = true;
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.child.rewind()?;
        self.open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;
    use crate::fields::{FieldVal, IntField};
    use crate::heap_file::HeapFile;
    use crate::operator::collect;
    use tempfile::tempfile;

    fn desc() -> TupleDesc {
        TupleDesc::named(vec![Type::Int], vec!["a".to_string()])
    }

    struct VecOperator {
        td: TupleDesc,
        items: Vec<Tuple>,
        idx: usize,
    }

    impl Operator for VecOperator {
        fn tuple_desc(&self) -> &TupleDesc {
            &self.td
        }
        fn open(&mut self) -> DbResult<()> {
            Ok(())
        }
        fn has_next(&mut self) -> DbResult<bool> {
            Ok(self.idx < self.items.len())
        }
        fn next(&mut self) -> DbResult<Option<Tuple>> {
            if self.idx < self.items.len() {
                let t = self.items[self.idx].clone();
                self.idx += 1;
                Ok(Some(t))
            } else {
                Ok(None)
            }
        }
        fn close(&mut self) {}
        fn rewind(&mut self) -> DbResult<()> {
            self.idx = 0;
            Ok(())
        }
    }

    #[test]
    fn inserts_every_child_tuple_and_emits_one_count_row() {
        let db = database::get_global_db();
        let file = tempfile().unwrap();
        db.catalog()
            .add_table("insert_op_test".to_string(), HeapFile::new(file, desc(), 1001));

        let td = desc();
        let items: Vec<Tuple> = (0..4)
            .map(|i| Tuple::new(vec![FieldVal::Int(IntField::new(i))], &td))
            .collect();
        let child = Box::new(VecOperator {
            td: td.clone(),
            items,
            idx: 0,
        });

        let tid = TransactionId::new();
        let mut insert = Insert::new(tid, 1001, child).unwrap();
        insert.open().unwrap();
        let rows = collect(&mut insert).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field(0).unwrap(), &FieldVal::Int(IntField::new(4)));
        db.buffer_pool().commit_transaction(tid).unwrap();

        let tid2 = TransactionId::new();
        let mut scan = crate::operator::SeqScan::new(tid2, 1001, "t").unwrap();
        scan.open().unwrap();
        assert_eq!(collect(&mut scan).unwrap().len(), 4);
        db.buffer_pool().commit_transaction(tid2).unwrap();
    }

    #[test]
    fn close_before_draining_the_count_row_makes_it_inert() {
        let db = database::get_global_db();
        let file = tempfile().unwrap();
        db.catalog()
            .add_table("insert_op_close_test".to_string(), HeapFile::new(file, desc(), 1003));

        let child = Box::new(VecOperator {
            td: desc(),
            items: vec![],
            idx: 0,
        });
        let tid = TransactionId::new();
        let mut insert = Insert::new(tid, 1003, child).unwrap();
        insert.open().unwrap();
        insert.close();
        assert!(!insert.has_next().unwrap());
        assert_eq!(insert.next().unwrap(), None);
        db.buffer_pool().commit_transaction(tid).unwrap();
    }

    #[test]
    fn rejects_schema_mismatch_at_construction() {
        let db = database::get_global_db();
        let file = tempfile().unwrap();
        db.catalog()
            .add_table("insert_op_mismatch".to_string(), HeapFile::new(file, desc(), 1002));

        let wrong_td = TupleDesc::named(vec![Type::Int, Type::Int], vec!["a".into(), "b".into()]);
        let child = Box::new(VecOperator {
            td: wrong_td,
            items: vec![],
            idx: 0,
        });
        let tid = TransactionId::new();
        assert!(matches!(
            Insert::new(tid, 1002, child),
            Err(DbError::SchemaMismatch { .. })
        ));
    }
}
