use crate::database;
use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField};
use crate::operator::Operator;
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

/// Draining operator, symmetric to `Insert`: pulls every tuple from
/// `child` and deletes it (by its own `RecordId`) through the buffer
/// pool, then emits one `(Int)` count row.
pub struct Delete {
    tid: TransactionId,
    child: Box<dyn Operator>,
    td: TupleDesc,
    result: Option<Tuple>,
    done: bool,
}

impl Delete {
    pub fn new(tid: TransactionId, child: Box<dyn Operator>) -> Self {
        Delete {
            tid,
            child,
            td: TupleDesc::named(vec![Type::Int], vec!["count".to_string()]),
            result: None,
            done: false,
        }
    }
}

impl Operator for Delete {
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
            db.buffer_pool().delete_tuple(self.tid, &tuple)?;
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
