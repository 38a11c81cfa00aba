use crate::error::{DbError, DbResult};
use crate::fields::Op;
use crate::operator::Operator;
use crate::tuple::{Tuple, TupleDesc};

/// Nested-loop equijoin (or any `Op`-predicate join): for each left
/// tuple, rewinds and scans the entire right side looking for matches.
/// `right` must support `rewind`, which every operator in this module
/// does.
pub struct Join {
    left: Box<dyn Operator>,
    right: Box<dyn Operator>,
    left_field: usize,
    right_field: usize,
    op: Op,
    td: TupleDesc,
    current_left: Option<Tuple>,
    buffered: Option<Tuple>,
}

impl Join {
    pub fn new(
        left_field: &str,
        op: Op,
        right_field: &str,
        left: Box<dyn Operator>,
        right: Box<dyn Operator>,
    ) -> DbResult<Self> {
        let left_field_idx = left
            .tuple_desc()
            .name_to_index(left_field)
            .ok_or_else(|| DbError::NotFound(format!("field {}", left_field)))?;
        let right_field_idx = right
            .tuple_desc()
            .name_to_index(right_field)
            .ok_or_else(|| DbError::NotFound(format!("field {}", right_field)))?;
        let td = TupleDesc::merge(left.tuple_desc(), right.tuple_desc());
        Ok(Join {
            left,
            right,
            left_field: left_field_idx,
            right_field: right_field_idx,
            op,
            td,
            current_left: None,
            buffered: None,
        })
    }

    fn fetch(&mut self) -> DbResult<Option<Tuple>> {
        loop {
            if self.current_left.is_none() {
                if !self.left.has_next()? {
                    return Ok(None);
                }
                self.current_left = Some(
                    self.left
                        .next()?
                        .ok_or_else(|| DbError::Other("has_next/next disagreed".to_string()))?,
                );
                self.right.rewind()?;
            }

            if !self.right.has_next()? {
                self.current_left = None;
                continue;
            }
            let right_tuple = self
                .right
                .next()?
                .ok_or_else(|| DbError::Other("has_next/next disagreed".to_string()))?;
            let left_tuple = self
                .current_left
                .as_ref()
                .expect("current_left was just set to Some above");

            let matches = left_tuple
                .field(self.left_field)?
                .compare(self.op, right_tuple.field(self.right_field)?)?;
            if matches {
                let mut fields = left_tuple.fields().to_vec();
                fields.extend(right_tuple.fields().iter().cloned());
                return Ok(Some(Tuple::new(fields, &self.td)));
            }
        }
    }
}

impl Operator for Join {
    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    fn open(&mut self) -> DbResult<()> {
        self.left.open()?;
        self.right.open()
    }

    fn has_next(&mut self) -> DbResult<bool> {
        // Joins can't cheaply peek without consuming a right-side tuple,
        // so has_next itself advances and buffers; next() drains that
        // buffer first.
        if self.buffered.is_some() {
            return Ok(true);
        }
        self.buffered = self.fetch()?;
        Ok(self.buffered.is_some())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        if let Some(t) = self.buffered.take() {
            return Ok(Some(t));
        }
        self.fetch()
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.current_left = None;
        self.buffered = None;
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.current_left = None;
        self.buffered = None;
        self.left.rewind()?;
        self.right.rewind()
    }
}
