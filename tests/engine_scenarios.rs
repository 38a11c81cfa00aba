//! End-to-end scenarios against the process-wide `Database` singleton,
//! each using a dedicated tempfile-backed table so the shared buffer
//! pool and catalog don't leak state between tests.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rustic_db::database;
use rustic_db::fields::{FieldVal, IntField, Op};
use rustic_db::heap_file::HeapFile;
use rustic_db::heap_page::{HeapPageId, Permission};
use rustic_db::lock_manager::LockManager;
use rustic_db::operator::{collect, Aggregate, AggregateOp, Filter, Join, Operator, SeqScan};
use rustic_db::transaction::TransactionId;
use rustic_db::tuple::{Tuple, TupleDesc};
use rustic_db::types::Type;
use tempfile::tempfile;

fn int_desc(name: &str) -> TupleDesc {
    TupleDesc::named(vec![Type::Int], vec![name.to_string()])
}

fn register(name: &str, desc: TupleDesc, id: u32) {
    let db = database::get_global_db();
    db.catalog()
        .add_table(name.to_string(), HeapFile::new(tempfile().unwrap(), desc, id));
}

/// Scenario 1: scan a table with enough rows to matter, values 0..599
/// inserted in order, must come back out in that same order.
#[test]
fn scan_yields_every_row_in_insertion_order() {
    register("scan_scenario", int_desc("a"), 90_001);
    let db = database::get_global_db();

    let tid = TransactionId::new();
    for i in 0..600 {
        db.buffer_pool()
            .insert_tuple(tid, 90_001, Tuple::new(vec![FieldVal::Int(IntField::new(i))], &int_desc("a")))
            .unwrap();
    }
    db.buffer_pool().commit_transaction(tid).unwrap();

    let tid2 = TransactionId::new();
    let mut scan = SeqScan::new(tid2, 90_001, "t").unwrap();
    scan.open().unwrap();
    let rows = collect(&mut scan).unwrap();
    scan.close();
    db.buffer_pool().commit_transaction(tid2).unwrap();

    assert_eq!(rows.len(), 600);
    for (i, tuple) in rows.iter().enumerate() {
        assert_eq!(tuple.field(0).unwrap(), &FieldVal::Int(IntField::new(i as i32)));
    }
}

/// Scenario 2: filter down to the tail of a scanned table.
#[test]
fn filter_keeps_only_rows_past_threshold() {
    register("filter_scenario", int_desc("a"), 90_002);
    let db = database::get_global_db();

    let tid = TransactionId::new();
    for i in 0..600 {
        db.buffer_pool()
            .insert_tuple(tid, 90_002, Tuple::new(vec![FieldVal::Int(IntField::new(i))], &int_desc("a")))
            .unwrap();
    }
    db.buffer_pool().commit_transaction(tid).unwrap();

    let tid2 = TransactionId::new();
    let scan = Box::new(SeqScan::new(tid2, 90_002, "t").unwrap());
    let mut filter = Filter::new("t.a", Op::Gt, FieldVal::Int(IntField::new(597)), scan).unwrap();
    filter.open().unwrap();
    let rows = collect(&mut filter).unwrap();
    filter.close();
    db.buffer_pool().commit_transaction(tid2).unwrap();

    let values: Vec<i32> = rows
        .iter()
        .map(|t| t.field(0).unwrap().clone().into_int().unwrap().value())
        .collect();
    assert_eq!(values, vec![598, 599]);
}

/// Scenario 3: inner equijoin, right side rescanned per left tuple.
#[test]
fn inner_join_on_equality_matches_and_orders_by_left_then_right() {
    register("join_left", int_desc("x"), 90_003);
    register("join_right", int_desc("y"), 90_004);
    let db = database::get_global_db();

    let tid = TransactionId::new();
    for v in [1, 2, 3] {
        db.buffer_pool()
            .insert_tuple(tid, 90_003, Tuple::new(vec![FieldVal::Int(IntField::new(v))], &int_desc("x")))
            .unwrap();
    }
    for v in [2, 3, 4] {
        db.buffer_pool()
            .insert_tuple(tid, 90_004, Tuple::new(vec![FieldVal::Int(IntField::new(v))], &int_desc("y")))
            .unwrap();
    }
    db.buffer_pool().commit_transaction(tid).unwrap();

    let tid2 = TransactionId::new();
    let left = Box::new(SeqScan::new(tid2, 90_003, "r").unwrap());
    let right = Box::new(SeqScan::new(tid2, 90_004, "s").unwrap());
    let mut join = Join::new("r.x", Op::Eq, "s.y", left, right).unwrap();
    join.open().unwrap();
    let rows = collect(&mut join).unwrap();
    join.close();
    db.buffer_pool().commit_transaction(tid2).unwrap();

    assert_eq!(rows.len(), 2);
    let pairs: Vec<(i32, i32)> = rows
        .iter()
        .map(|t| {
            (
                t.field(0).unwrap().clone().into_int().unwrap().value(),
                t.field(1).unwrap().clone().into_int().unwrap().value(),
            )
        })
        .collect();
    assert_eq!(pairs, vec![(2, 2), (3, 3)]);
}

/// Scenario 4: grouped SUM aggregate.
#[test]
fn grouped_sum_aggregate_produces_one_row_per_group() {
    let td = TupleDesc::named(vec![Type::Int, Type::Int], vec!["g".to_string(), "v".to_string()]);
    register("agg_scenario", td.clone(), 90_005);
    let db = database::get_global_db();

    let tid = TransactionId::new();
    for (g, v) in [(1, 10), (1, 20), (2, 5)] {
        db.buffer_pool()
            .insert_tuple(
                tid,
                90_005,
                Tuple::new(vec![FieldVal::Int(IntField::new(g)), FieldVal::Int(IntField::new(v))], &td),
            )
            .unwrap();
    }
    db.buffer_pool().commit_transaction(tid).unwrap();

    let tid2 = TransactionId::new();
    let scan = Box::new(SeqScan::new(tid2, 90_005, "u").unwrap());
    let mut agg = Aggregate::new("u.v", AggregateOp::Sum, Some("u.g"), scan).unwrap();
    agg.open().unwrap();
    let mut rows = collect(&mut agg).unwrap();
    agg.close();
    db.buffer_pool().commit_transaction(tid2).unwrap();

    rows.sort_by_key(|t| t.field(0).unwrap().clone().into_int().unwrap().value());
    let pairs: Vec<(i32, i32)> = rows
        .iter()
        .map(|t| {
            (
                t.field(0).unwrap().clone().into_int().unwrap().value(),
                t.field(1).unwrap().clone().into_int().unwrap().value(),
            )
        })
        .collect();
    assert_eq!(pairs, vec![(1, 30), (2, 5)]);
}

/// Scenario 5: Insert drains a child into a fresh table, then a
/// subsequent SeqScan sees exactly that row.
#[test]
fn insert_then_scan_round_trips_a_single_row() {
    register("insert_scenario", int_desc("a"), 90_006);
    let db = database::get_global_db();

    struct OneRow {
        td: TupleDesc,
        emitted: bool,
    }
    impl Operator for OneRow {
        fn tuple_desc(&self) -> &TupleDesc {
            &self.td
        }
        fn open(&mut self) -> rustic_db::error::DbResult<()> {
            Ok(())
        }
        fn has_next(&mut self) -> rustic_db::error::DbResult<bool> {
            Ok(!self.emitted)
        }
        fn next(&mut self) -> rustic_db::error::DbResult<Option<Tuple>> {
            if self.emitted {
                return Ok(None);
            }
            self.emitted = true;
            Ok(Some(Tuple::new(vec![FieldVal::Int(IntField::new(42))], &self.td)))
        }
        fn close(&mut self) {}
        fn rewind(&mut self) -> rustic_db::error::DbResult<()> {
            self.emitted = false;
            Ok(())
        }
    }

    let tid = TransactionId::new();
    let source = Box::new(OneRow {
        td: int_desc("a"),
        emitted: false,
    });
    let mut insert = rustic_db::operator::Insert::new(tid, 90_006, source).unwrap();
    insert.open().unwrap();
    let rows = collect(&mut insert).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].field(0).unwrap(), &FieldVal::Int(IntField::new(1)));
    db.buffer_pool().commit_transaction(tid).unwrap();

    let tid2 = TransactionId::new();
    let mut scan = SeqScan::new(tid2, 90_006, "t").unwrap();
    scan.open().unwrap();
    let after = collect(&mut scan).unwrap();
    db.buffer_pool().commit_transaction(tid2).unwrap();

    assert_eq!(after.len(), 1);
    assert_eq!(after[0].field(0).unwrap(), &FieldVal::Int(IntField::new(42)));
}

/// Scenario 6: classic two-way deadlock at the lock manager level
/// (independent of the buffer pool / operator stack, which just defer
/// to it): A holds S(P1) and wants X(P2); B holds S(P2) and wants
/// X(P1). Exactly one side must abort.
#[test]
fn deadlock_resolution_aborts_exactly_one_side() {
    let lm = Arc::new(LockManager::new());
    let p1 = HeapPageId::new(1, 0);
    let p2 = HeapPageId::new(1, 1);
    let t_a = TransactionId::new();
    let t_b = TransactionId::new();

    lm.acquire(t_a, p1, Permission::Read).unwrap();
    lm.acquire(t_b, p2, Permission::Read).unwrap();

    let lm_a = Arc::clone(&lm);
    let handle_a = thread::spawn(move || lm_a.acquire(t_a, p2, Permission::Write));
    thread::sleep(Duration::from_millis(50));
    let lm_b = Arc::clone(&lm);
    let handle_b = thread::spawn(move || lm_b.acquire(t_b, p1, Permission::Write));

    let result_a = handle_a.join().unwrap();
    let result_b = handle_b.join().unwrap();

    assert_ne!(result_a.is_err(), result_b.is_err(), "exactly one side must abort");

    let survivor = if result_a.is_ok() { t_a } else { t_b };
    lm.release_all(survivor);
    assert!(lm.pages_held_by(survivor).is_empty());
}
