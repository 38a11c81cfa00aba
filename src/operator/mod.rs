mod aggregate;
mod delete;
mod filter;
mod insert;
mod join;
mod seq_scan;

pub use aggregate::{Aggregate, AggregateOp};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use seq_scan::SeqScan;

use crate::error::DbResult;
use crate::tuple::{Tuple, TupleDesc};

/// The pull-based query execution interface every operator implements.
/// Callers drive an operator through `open`, then alternate `has_next`/
/// `next` until exhausted, then `close`. `rewind` resets a closed-over
/// operator back to the start of its output without a fresh `open`,
/// which `Join` relies on for its inner side.
pub trait Operator {
    fn tuple_desc(&self) -> &TupleDesc;
    fn open(&mut self) -> DbResult<()>;
    fn has_next(&mut self) -> DbResult<bool>;
    fn next(&mut self) -> DbResult<Option<Tuple>>;
    fn close(&mut self);
    fn rewind(&mut self) -> DbResult<()>;
}

/// Drains `op` into a `Vec`, for tests and small result sets. `op` must
/// already be open.
pub fn collect(op: &mut dyn Operator) -> DbResult<Vec<Tuple>> {
    let mut out = Vec::new();
    while op.has_next()? {
        if let Some(t) = op.next()? {
            out.push(t);
        }
    }
    Ok(out)
}
