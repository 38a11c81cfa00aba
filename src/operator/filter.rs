use crate::error::{DbError, DbResult};
use crate::fields::Op;
use crate::operator::Operator;
use crate::tuple::{Tuple, TupleDesc};

/// Passes through only the tuples from `child` for which
/// `field <op> value` holds.
pub struct Filter {
    field_index: usize,
    op: Op,
    value: crate::fields::FieldVal,
    child: Box<dyn Operator>,
    buffered: Option<Tuple>,
}

impl Filter {
    pub fn new(
        field_name: &str,
        op: Op,
        value: crate::fields::FieldVal,
        child: Box<dyn Operator>,
    ) -> DbResult<Self> {
        let field_index = child
            .tuple_desc()
            .name_to_index(field_name)
            .ok_or_else(|| DbError::NotFound(format!("field {}", field_name)))?;
        Ok(Filter {
            field_index,
            op,
            value,
            child,
            buffered: None,
        })
    }
}

impl Operator for Filter {
    fn tuple_desc(&self) -> &TupleDesc {
        self.child.tuple_desc()
    }

    fn open(&mut self) -> DbResult<()> {
        self.child.open()
    }

    fn has_next(&mut self) -> DbResult<bool> {
        while self.child.has_next()? {
            let peek = self
                .child
                .next()?
                .ok_or_else(|| DbError::Other("has_next/next disagreed".to_string()))?;
            if peek.field(self.field_index)?.compare(self.op, &self.value)? {
                self.buffered = Some(peek);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        if self.buffered.is_some() {
            return Ok(self.buffered.take());
        }
        if self.has_next()? {
            return Ok(self.buffered.take());
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.child.close();
        self.buffered = None;
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.buffered = None;
        self.child.rewind()
    }
}
