use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex, MutexGuard};

use log::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::heap_page::{HeapPageId, Permission};
use crate::transaction::TransactionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

impl From<Permission> for LockMode {
    fn from(p: Permission) -> Self {
        match p {
            Permission::Read => LockMode::Shared,
            Permission::Write => LockMode::Exclusive,
        }
    }
}

struct PageLock {
    mode: LockMode,
    holders: HashSet<TransactionId>,
}

struct State {
    page_locks: HashMap<HeapPageId, PageLock>,
    pages_held_by: HashMap<TransactionId, HashSet<HeapPageId>>,
    /// `waits_for[tid]` is the set of transactions `tid` is currently
    /// blocked behind. Populated right before a wait, consulted only for
    /// cycle detection.
    waits_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

enum Decision {
    Granted,
    Conflict(HashSet<TransactionId>),
}

/// Page-level shared/exclusive lock manager with upgrade, wait queues,
/// and waits-for-graph deadlock detection.
///
/// Internal state is guarded by a single mutex; a condition variable
/// wakes every waiter whenever any lock is released, and each waiter
/// re-evaluates its request from scratch on wake.
pub struct LockManager {
    state: Mutex<State>,
    condvar: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        LockManager {
            state: Mutex::new(State {
                page_locks: HashMap::new(),
                pages_held_by: HashMap::new(),
                waits_for: HashMap::new(),
            }),
            condvar: Condvar::new(),
        }
    }

    /// Acquires `perm` on `pid` for `tid`, per the state table in the
    /// concurrency design: blocks on contention, and fails with
    /// `TxAborted` if waiting would complete a waits-for cycle
    /// involving `tid` (the requester is always the victim).
    pub fn acquire(&self, tid: TransactionId, pid: HeapPageId, perm: Permission) -> DbResult<()> {
        let mode = LockMode::from(perm);
        let mut state = self.state.lock().unwrap();
        loop {
            match Self::decide(&state, tid, pid, mode) {
                Decision::Granted => {
                    Self::apply_grant(&mut state, tid, pid, mode);
                    return Ok(());
                }
                Decision::Conflict(holders) => {
                    state
                        .waits_for
                        .entry(tid)
                        .or_default()
                        .extend(holders.iter().copied());

                    if Self::has_cycle(&state, tid) {
                        warn!("deadlock detected, aborting requester {}", tid);
                        state.waits_for.remove(&tid);
                        return Err(DbError::TxAborted { tid });
                    }

                    debug!("tx {} waiting for lock on page {:?}", tid, pid);
                    state = self.condvar.wait(state).unwrap();
                    if let Some(waiting) = state.waits_for.get_mut(&tid) {
                        waiting.clear();
                    }
                }
            }
        }
    }

    /// Decides what `tid` requesting `mode` on `pid` should do, given the
    /// current lock table, without mutating anything.
    fn decide(state: &State, tid: TransactionId, pid: HeapPageId, mode: LockMode) -> Decision {
        match state.page_locks.get(&pid) {
            None => Decision::Granted,
            Some(lock) if lock.holders.contains(&tid) => {
                if lock.holders.len() == 1 {
                    // sole holder: any request (incl. upgrade) is satisfiable
                    Decision::Granted
                } else if mode == LockMode::Shared {
                    // already shared among others, plain S is a no-op
                    Decision::Granted
                } else {
                    Decision::Conflict(
                        lock.holders.iter().copied().filter(|h| *h != tid).collect(),
                    )
                }
            }
            Some(lock) => {
                let conflict = match lock.mode {
                    LockMode::Exclusive => true,
                    LockMode::Shared => mode == LockMode::Exclusive,
                };
                if conflict {
                    Decision::Conflict(lock.holders.clone())
                } else {
                    Decision::Granted
                }
            }
        }
    }

    fn apply_grant(state: &mut State, tid: TransactionId, pid: HeapPageId, mode: LockMode) {
        match state.page_locks.get_mut(&pid) {
            None => {
                state.page_locks.insert(
                    pid,
                    PageLock {
                        mode,
                        holders: HashSet::from([tid]),
                    },
                );
            }
            Some(lock) if lock.holders.contains(&tid) => {
                // sole holder upgrading, or a no-op re-request
                if mode == LockMode::Exclusive {
                    lock.mode = LockMode::Exclusive;
                }
            }
            Some(lock) => {
                lock.holders.insert(tid);
            }
        }
        state.pages_held_by.entry(tid).or_default().insert(pid);
    }

    /// BFS from `tid` through the waits-for graph; true iff `tid` is
    /// reachable from itself (a cycle including the requester exists).
    fn has_cycle(state: &State, tid: TransactionId) -> bool {
        let mut frontier: Vec<TransactionId> = state
            .waits_for
            .get(&tid)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        let mut visited: HashSet<TransactionId> = HashSet::new();
        while let Some(next) = frontier.pop() {
            if next == tid {
                return true;
            }
            if !visited.insert(next) {
                continue;
            }
            if let Some(edges) = state.waits_for.get(&next) {
                frontier.extend(edges.iter().copied());
            }
        }
        false
    }

    pub fn release(&self, tid: TransactionId, pid: HeapPageId) {
        let mut state = self.state.lock().unwrap();
        Self::release_locked(&mut state, tid, pid);
        self.condvar.notify_all();
    }

    fn release_locked(state: &mut MutexGuard<State>, tid: TransactionId, pid: HeapPageId) {
        if let Some(lock) = state.page_locks.get_mut(&pid) {
            lock.holders.remove(&tid);
            if lock.holders.is_empty() {
                state.page_locks.remove(&pid);
            }
        }
        if let Some(pages) = state.pages_held_by.get_mut(&tid) {
            pages.remove(&pid);
        }
    }

    /// Releases every lock `tid` holds and purges it from all waits-for
    /// sets. Idempotent.
    pub fn release_all(&self, tid: TransactionId) {
        let mut state = self.state.lock().unwrap();
        let pages = state.pages_held_by.remove(&tid).unwrap_or_default();
        for pid in pages {
            Self::release_locked(&mut state, tid, pid);
        }
        state.waits_for.remove(&tid);
        for waiters in state.waits_for.values_mut() {
            waiters.remove(&tid);
        }
        self.condvar.notify_all();
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: HeapPageId) -> Option<Permission> {
        let state = self.state.lock().unwrap();
        state.page_locks.get(&pid).and_then(|lock| {
            if lock.holders.contains(&tid) {
                Some(match lock.mode {
                    LockMode::Shared => Permission::Read,
                    LockMode::Exclusive => Permission::Write,
                })
            } else {
                None
            }
        })
    }

    pub fn pages_held_by(&self, tid: TransactionId) -> HashSet<HeapPageId> {
        let state = self.state.lock().unwrap();
        state.pages_held_by.get(&tid).cloned().unwrap_or_default()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
