use std::collections::HashMap;

use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField};
use crate::operator::Operator;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

/// Aggregate functions over an integer field. `Count` also accepts a
/// string field, since it never inspects the value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

struct Accumulator {
    count: i64,
    sum: i64,
    min: Option<i32>,
    max: Option<i32>,
}

impl Accumulator {
    fn new() -> Self {
        Accumulator {
            count: 0,
            sum: 0,
            min: None,
            max: None,
        }
    }

    fn add(&mut self, value: Option<i32>) {
        self.count += 1;
        if let Some(v) = value {
            self.sum += v as i64;
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }

    fn result(&self, op: AggregateOp) -> DbResult<i32> {
        match op {
            AggregateOp::Count => Ok(self.count as i32),
            AggregateOp::Sum => Ok(self.sum as i32),
            AggregateOp::Avg => {
                if self.count == 0 {
                    Ok(0)
                } else {
                    Ok((self.sum / self.count) as i32)
                }
            }
            AggregateOp::Min => self
                .min
                .ok_or_else(|| DbError::Other("MIN over empty group".to_string())),
            AggregateOp::Max => self
                .max
                .ok_or_else(|| DbError::Other("MAX over empty group".to_string())),
        }
    }
}

/// Groups `child`'s output by `group_field` (if given) and reduces the
/// `agg_field` of each group with `op`, producing one result tuple per
/// group (or a single tuple, for the ungrouped case, even over zero
/// input rows for every op but MIN/MAX which have no identity value).
pub struct Aggregate {
    child: Box<dyn Operator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    td: TupleDesc,
    results: Option<std::iter::Peekable<std::vec::IntoIter<Tuple>>>,
}

impl Aggregate {
    pub fn new(
        agg_field_name: &str,
        op: AggregateOp,
        group_field_name: Option<&str>,
        child: Box<dyn Operator>,
    ) -> DbResult<Self> {
        let child_td = child.tuple_desc();
        let agg_field = child_td
            .name_to_index(agg_field_name)
            .ok_or_else(|| DbError::NotFound(format!("field {}", agg_field_name)))?;
        let group_field = group_field_name
            .map(|n| {
                child_td
                    .name_to_index(n)
                    .ok_or_else(|| DbError::NotFound(format!("field {}", n)))
            })
            .transpose()?;

        let mut types = vec![];
        let mut names = vec![];
        if let (Some(idx), Some(name)) = (group_field, group_field_name) {
            types.push(child_td.field_type(idx).unwrap());
            names.push(name.to_string());
        }
        types.push(Type::Int);
        names.push(format!("{} {}", format!("{:?}", op).to_uppercase(), agg_field_name));
        let td = TupleDesc::named(types, names);

        Ok(Aggregate {
            child,
            agg_field,
            group_field,
            op,
            td,
            results: None,
        })
    }

    fn compute(&mut self) -> DbResult<()> {
        let mut groups: HashMap<Option<FieldVal>, Accumulator> = HashMap::new();
        while self.child.has_next()? {
            let tuple = self
                .child
                .next()?
                .ok_or_else(|| DbError::Other("has_next/next disagreed".to_string()))?;
            let key = match self.group_field {
                Some(idx) => Some(tuple.field(idx)?.clone()),
                None => None,
            };
            let value = match tuple.field(self.agg_field)? {
                FieldVal::Int(f) => Some(f.value()),
                FieldVal::Str(_) if self.op == AggregateOp::Count => None,
                FieldVal::Str(_) => {
                    return Err(DbError::Other(
                        "cannot aggregate a string field with this op".to_string(),
                    ))
                }
            };
            groups.entry(key).or_insert_with(Accumulator::new).add(value);
        }

        if groups.is_empty() && self.group_field.is_none() {
            groups.insert(None, Accumulator::new());
        }

        let mut out = vec![];
        for (key, acc) in groups {
            let result = acc.result(self.op)?;
            let mut fields = vec![];
            if let Some(k) = key {
                fields.push(k);
            }
            fields.push(FieldVal::Int(IntField::new(result)));
            out.push(Tuple::new(fields, &self.td));
        }
        self.results = Some(out.into_iter().peekable());
        Ok(())
    }
}

impl Operator for Aggregate {
    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
        self.compute()
    }

    fn has_next(&mut self) -> DbResult<bool> {
        Ok(self
            .results
            .as_mut()
            .map(|r| r.peek().is_some())
            .unwrap_or(false))
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        Ok(self.results.as_mut().and_then(|r| r.next()))
    }

    fn close(&mut self) {
        self.child.close();
        self.results = None;
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.child.rewind()?;
        self.compute()
    }
}
