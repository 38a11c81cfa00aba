use std::thread;

use rustic_db::database;
use rustic_db::fields::{FieldVal, IntField, StringField};
use rustic_db::logging;
use rustic_db::operator::{collect, Insert, Operator, SeqScan};
use rustic_db::transaction::TransactionId;
use rustic_db::tuple::Tuple;

/// Small end-to-end demo: loads `schemas.txt`, inserts a batch of rows
/// from three concurrent transactions through the `Insert` operator,
/// then scans the table back with `SeqScan`. Exercises the same
/// concurrency path the crate's own tests do, just with real threads
/// and a real file on disk instead of a tempfile.
fn main() {
    logging::init();

    let db = database::get_global_db();
    let mut schema_file_path = std::env::current_dir().unwrap();
    schema_file_path.push("schemas.txt");
    db.catalog()
        .load_schema(schema_file_path.to_str().unwrap())
        .expect("failed to load schemas.txt");

    let table = db
        .catalog()
        .table_by_name("employees")
        .expect("schemas.txt must declare an `employees` table");
    let table_id = table.id();
    let td = table.tuple_desc().clone();

    println!("table id: {}", table_id);
    println!("table schema: {:?}", td);

    // Each thread runs its own transaction and retries on TxAborted
    // (the deadlock victim path), same retry shape `LockManager::acquire`
    // expects of its callers.
    let handles: Vec<_> = (0..3)
        .map(|n| {
            let db = database::get_global_db();
            let td = td.clone();
            thread::spawn(move || loop {
                let tid = TransactionId::new();
                let rows: Vec<Tuple> = (0..3)
                    .map(|i| {
                        Tuple::new(
                            vec![
                                FieldVal::Int(IntField::new(i)),
                                FieldVal::Str(StringField::new(format!("Alice_{}_{}", n, i))),
                            ],
                            &td,
                        )
                    })
                    .collect();
                let source = VecOperator::new(rows, td.clone());
                let mut insert = match Insert::new(tid, table_id, Box::new(source)) {
                    Ok(op) => op,
                    Err(e) => {
                        eprintln!("insert rejected: {}", e);
                        return;
                    }
                };
                let outcome = insert
                    .open()
                    .and_then(|_| collect(&mut insert))
                    .and_then(|rows| db.buffer_pool().commit_transaction(tid).map(|_| rows));
                match outcome {
                    Ok(rows) => {
                        println!("thread {} committed, inserted {:?}", n, rows.first());
                        break;
                    }
                    Err(e) => {
                        println!("thread {} aborted ({}), retrying", n, e);
                        let _ = db.buffer_pool().abort_transaction(tid);
                        thread::sleep(std::time::Duration::from_millis(50));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let tid = TransactionId::new();
    let mut scan = SeqScan::with_table_name(tid, table_id).unwrap();
    scan.open().unwrap();
    let rows = collect(&mut scan).unwrap();
    for tuple in &rows {
        println!("{}", tuple);
    }
    scan.close();
    db.buffer_pool().commit_transaction(tid).unwrap();
    println!("tuple count: {}", rows.len());
}

/// A fixed in-memory source of tuples, for feeding the `Insert` operator
/// from data that doesn't live on a heap page. The crate's own tests use
/// the same shim.
struct VecOperator {
    td: rustic_db::tuple::TupleDesc,
    items: Vec<Tuple>,
    idx: usize,
}

impl VecOperator {
    fn new(items: Vec<Tuple>, td: rustic_db::tuple::TupleDesc) -> Self {
        VecOperator { td, items, idx: 0 }
    }
}

impl Operator for VecOperator {
    fn tuple_desc(&self) -> &rustic_db::tuple::TupleDesc {
        &self.td
    }
    fn open(&mut self) -> rustic_db::error::DbResult<()> {
        Ok(())
    }
    fn has_next(&mut self) -> rustic_db::error::DbResult<bool> {
        Ok(self.idx < self.items.len())
    }
    fn next(&mut self) -> rustic_db::error::DbResult<Option<Tuple>> {
        if self.idx < self.items.len() {
            let t = self.items[self.idx].clone();
            self.idx += 1;
            Ok(Some(t))
        } else {
            Ok(None)
        }
    }
    fn close(&mut self) {}
    fn rewind(&mut self) -> rustic_db::error::DbResult<()> {
        self.idx = 0;
        Ok(())
    }
}
