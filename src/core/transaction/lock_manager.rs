//! Hierarchical lock manager: intention locks on tables, record/gap/next-key
//! locks on index entries, wait-for-graph deadlock detection.

use crate::core::common::error::OxidbError;
use crate::core::common::types::TransactionId;
use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// InnoDB's historical default; used as the fallback for `WaitPolicy::default()`.
pub const DEFAULT_LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(50);

/// Lock strength. `IntentionShared`/`IntentionExclusive`/`SharedIntentionExclusive`
/// only make sense on `ResourceId::Table`; record/gap/next-key locks use only
/// `Shared`/`Exclusive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// IS
    IntentionShared,
    /// IX
    IntentionExclusive,
    /// S
    Shared,
    /// X
    Exclusive,
    /// SIX: an IX on the table plus an S that covers rows the transaction
    /// has not separately locked.
    SharedIntentionExclusive,
}

impl LockMode {
    fn rank(self) -> u8 {
        match self {
            Self::IntentionShared => 0,
            Self::IntentionExclusive => 1,
            Self::Shared => 2,
            Self::SharedIntentionExclusive => 3,
            Self::Exclusive => 4,
        }
    }
}

/// A lockable resource. Record/gap/next-key locks are scoped to one index
/// (`index_id`) since the same row has an independent lock per index it
/// appears in (clustered and each secondary index).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Table(String),
    Record { index_id: String, key: Vec<u8> },
    Gap { index_id: String, key: Vec<u8> },
    /// Record lock plus the gap immediately preceding it: the standard
    /// REPEATABLE READ protection against phantom inserts into an index
    /// range scan. Acquired as a single resource via
    /// `LockManager::acquire_next_key`, so it follows the ordinary
    /// Shared/Exclusive compatibility rule as a whole rather than splitting
    /// into separately-compatible record/gap halves; that is stricter than
    /// true next-key locking (it blocks another next-key waiter even when
    /// only the gap portions overlap) but never under-locks.
    NextKey { index_id: String, key: Vec<u8> },
}

/// How a requester wants to handle a conflicting lock.
#[derive(Debug, Clone, Copy)]
pub enum WaitPolicy {
    /// Block up to the given duration, then fail with `LockWaitTimeout`.
    Wait(Duration),
    /// Fail immediately with `LockWouldBlock` on any conflict.
    NoWait,
    /// Silently skip the resource instead of waiting or failing.
    SkipLocked,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::Wait(DEFAULT_LOCK_WAIT_TIMEOUT)
    }
}

/// Outcome of a successful `acquire` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Granted,
    /// Only possible under `WaitPolicy::SkipLocked`.
    Skipped,
}

#[derive(Debug, Clone, Copy)]
struct Holder {
    tx_id: TransactionId,
    mode: LockMode,
}

#[derive(Debug, Default)]
struct LockTable {
    holders: HashMap<ResourceId, Vec<Holder>>,
    held_by_tx: HashMap<TransactionId, HashSet<ResourceId>>,
    /// Gap/next-key locks acquired by the current statement, tracked so a
    /// caller running under READ COMMITTED can release them at statement end
    /// while leaving record locks untouched.
    statement_locks: HashMap<TransactionId, HashSet<ResourceId>>,
    wait_for: HashMap<TransactionId, HashSet<TransactionId>>,
    /// Transactions chosen as deadlock victims; consumed (and cleared) by the
    /// victim's own blocked `acquire` call the next time it wakes.
    victims: HashSet<TransactionId>,
}

/// Standard IS/IX/S/X/SIX compatibility, used for table intention locks and
/// for the record component of record/next-key locks.
fn compatible(a: LockMode, b: LockMode) -> bool {
    use LockMode::{IntentionExclusive, IntentionShared, Shared, SharedIntentionExclusive};
    matches!(
        (a, b),
        (IntentionShared, IntentionShared)
            | (IntentionShared, IntentionExclusive)
            | (IntentionExclusive, IntentionShared)
            | (IntentionShared, Shared)
            | (Shared, IntentionShared)
            | (IntentionShared, SharedIntentionExclusive)
            | (SharedIntentionExclusive, IntentionShared)
            | (IntentionExclusive, IntentionExclusive)
            | (Shared, Shared)
    )
}

/// The mode a transaction ends up holding after being granted `requested` on
/// top of a `current` mode it already held on the same resource. Handles the
/// IX+S -> SIX combination explicitly; otherwise takes the stronger of the two.
fn combine(current: LockMode, requested: LockMode) -> LockMode {
    use LockMode::{IntentionExclusive, Shared, SharedIntentionExclusive};
    match (current, requested) {
        (IntentionExclusive, Shared) | (Shared, IntentionExclusive) => SharedIntentionExclusive,
        _ => {
            if current.rank() >= requested.rank() {
                current
            } else {
                requested
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    cond: Condvar,
}

impl LockManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `mode` on `resource` for `tx_id`, following `policy` on conflict.
    ///
    /// # Errors
    /// Returns `LockWouldBlock` under `NoWait`, `LockWaitTimeout` if the wait
    /// deadline passes, or `DeadlockDetected` if this transaction is chosen as
    /// a cycle's victim while waiting.
    pub fn acquire(
        &self,
        tx_id: TransactionId,
        resource: ResourceId,
        mode: LockMode,
    ) -> Result<LockOutcome, OxidbError> {
        self.acquire_with_policy(tx_id, resource, mode, WaitPolicy::default())
    }

    /// Acquire a next-key lock covering `key` in `index_id` and the gap
    /// immediately before it, under REPEATABLE READ's default `WaitPolicy`.
    /// A range-scanning reader takes one of these per key it passes over so
    /// no other transaction can insert a new row between two already-locked
    /// keys before this one commits.
    ///
    /// # Errors
    /// See `acquire`.
    pub fn acquire_next_key(
        &self,
        tx_id: TransactionId,
        index_id: &str,
        key: &[u8],
        mode: LockMode,
    ) -> Result<LockOutcome, OxidbError> {
        self.acquire(
            tx_id,
            ResourceId::NextKey { index_id: index_id.to_string(), key: key.to_vec() },
            mode,
        )
    }

    /// As `acquire`, but with an explicit `WaitPolicy`.
    ///
    /// # Errors
    /// See `acquire`.
    pub fn acquire_with_policy(
        &self,
        tx_id: TransactionId,
        resource: ResourceId,
        mode: LockMode,
        policy: WaitPolicy,
    ) -> Result<LockOutcome, OxidbError> {
        let deadline = match policy {
            WaitPolicy::Wait(timeout) => Some(Instant::now() + timeout),
            WaitPolicy::NoWait | WaitPolicy::SkipLocked => None,
        };

        let mut table = self.table.lock().unwrap();

        loop {
            if table.victims.remove(&tx_id) {
                table.wait_for.remove(&tx_id);
                return Err(OxidbError::DeadlockDetected(format!(
                    "transaction {tx_id} chosen as deadlock victim"
                )));
            }

            let is_gap = matches!(resource, ResourceId::Gap { .. });
            let existing_self_mode = table
                .holders
                .get(&resource)
                .and_then(|hs| hs.iter().find(|h| h.tx_id == tx_id).map(|h| h.mode));
            let effective_mode = existing_self_mode.map_or(mode, |current| combine(current, mode));

            let conflicts = table.holders.get(&resource).is_some_and(|hs| {
                hs.iter().any(|h| h.tx_id != tx_id && !(is_gap || compatible(h.mode, effective_mode)))
            });

            if !conflicts {
                let holders = table.holders.entry(resource.clone()).or_default();
                holders.retain(|h| h.tx_id != tx_id);
                holders.push(Holder { tx_id, mode: effective_mode });
                table.held_by_tx.entry(tx_id).or_default().insert(resource.clone());
                if matches!(resource, ResourceId::Gap { .. } | ResourceId::NextKey { .. }) {
                    table.statement_locks.entry(tx_id).or_default().insert(resource);
                }
                table.wait_for.remove(&tx_id);
                return Ok(LockOutcome::Granted);
            }

            match policy {
                WaitPolicy::NoWait => {
                    return Err(OxidbError::LockWouldBlock(format!(
                        "transaction {tx_id} would block acquiring {mode:?} on {resource:?}"
                    )));
                }
                WaitPolicy::SkipLocked => return Ok(LockOutcome::Skipped),
                WaitPolicy::Wait(_) => {}
            }

            if let Some(hs) = table.holders.get(&resource) {
                for h in hs {
                    if h.tx_id != tx_id && !(is_gap || compatible(h.mode, effective_mode)) {
                        table.wait_for.entry(tx_id).or_default().insert(h.tx_id);
                    }
                }
            }

            if !detect_and_mark_victims(&mut table).is_empty() {
                self.cond.notify_all();
            }
            if table.victims.contains(&tx_id) {
                continue;
            }

            let deadline = deadline.expect("Wait policy always carries a deadline");
            let now = Instant::now();
            if now >= deadline {
                table.wait_for.entry(tx_id).and_modify(HashSet::clear);
                return Err(OxidbError::LockWaitTimeout(format!(
                    "transaction {tx_id} timed out waiting for {mode:?} on {resource:?}"
                )));
            }
            let (guard, _) =
                self.cond.wait_timeout(table, deadline - now).unwrap();
            table = guard;
        }
    }

    /// Release every lock `tx_id` holds. Called at transaction end (strict 2PL).
    pub fn release_all(&self, tx_id: TransactionId) {
        let mut table = self.table.lock().unwrap();
        if let Some(resources) = table.held_by_tx.remove(&tx_id) {
            for resource in resources {
                if let Some(hs) = table.holders.get_mut(&resource) {
                    hs.retain(|h| h.tx_id != tx_id);
                    if hs.is_empty() {
                        table.holders.remove(&resource);
                    }
                }
            }
        }
        table.statement_locks.remove(&tx_id);
        table.wait_for.remove(&tx_id);
        for waiters in table.wait_for.values_mut() {
            waiters.remove(&tx_id);
        }
        table.victims.remove(&tx_id);
        drop(table);
        self.cond.notify_all();
    }

    /// Release only the gap/next-key locks `tx_id` acquired since the last
    /// call. The caller is responsible for invoking this at statement end,
    /// and only under READ COMMITTED (§4.7's exception to strict 2PL).
    pub fn release_statement_gap_locks(&self, tx_id: TransactionId) {
        let mut table = self.table.lock().unwrap();
        if let Some(resources) = table.statement_locks.remove(&tx_id) {
            for resource in resources {
                if let Some(hs) = table.holders.get_mut(&resource) {
                    hs.retain(|h| h.tx_id != tx_id);
                    if hs.is_empty() {
                        table.holders.remove(&resource);
                    }
                }
                if let Some(set) = table.held_by_tx.get_mut(&tx_id) {
                    set.remove(&resource);
                }
            }
        }
        drop(table);
        self.cond.notify_all();
    }

    /// Run one pass of the wait-for-graph cycle detector, marking and
    /// returning newly-chosen victims. Intended to be driven on a timer by
    /// the embedding engine; `acquire` also runs it inline whenever it is
    /// about to block, so most deadlocks resolve without waiting for this to
    /// be called externally.
    pub fn detect_deadlocks(&self) -> Vec<TransactionId> {
        let mut table = self.table.lock().unwrap();
        let victims = detect_and_mark_victims(&mut table);
        if !victims.is_empty() {
            drop(table);
            self.cond.notify_all();
        }
        victims
    }

    /// The mode `tx_id` currently holds on `resource`, if any.
    #[must_use]
    pub fn mode_held(&self, tx_id: TransactionId, resource: &ResourceId) -> Option<LockMode> {
        let table = self.table.lock().unwrap();
        table.holders.get(resource).and_then(|hs| hs.iter().find(|h| h.tx_id == tx_id).map(|h| h.mode))
    }

    /// `true` if any transaction other than `tx_id` holds a lock on `resource`.
    #[must_use]
    pub fn has_other_holder(&self, tx_id: TransactionId, resource: &ResourceId) -> bool {
        let table = self.table.lock().unwrap();
        table.holders.get(resource).is_some_and(|hs| hs.iter().any(|h| h.tx_id != tx_id))
    }
}

fn find_cycle_from(
    wait_for: &HashMap<TransactionId, HashSet<TransactionId>>,
    start: TransactionId,
) -> Option<Vec<TransactionId>> {
    fn dfs(
        node: TransactionId,
        wait_for: &HashMap<TransactionId, HashSet<TransactionId>>,
        visited: &mut HashSet<TransactionId>,
        stack: &mut Vec<TransactionId>,
    ) -> Option<Vec<TransactionId>> {
        if let Some(pos) = stack.iter().position(|&t| t == node) {
            return Some(stack[pos..].to_vec());
        }
        if !visited.insert(node) {
            return None;
        }
        stack.push(node);
        if let Some(next) = wait_for.get(&node) {
            for &n in next {
                if let Some(cycle) = dfs(n, wait_for, visited, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        None
    }
    dfs(start, wait_for, &mut HashSet::new(), &mut Vec::new())
}

/// Scans every waiter's reachable set for a cycle; per §4.7, the victim is
/// the transaction with the youngest (highest) id among the cycle's members.
fn detect_and_mark_victims(table: &mut LockTable) -> Vec<TransactionId> {
    let mut victims = Vec::new();
    let waiters: Vec<TransactionId> = table.wait_for.keys().copied().collect();
    for tx in waiters {
        if let Some(cycle) = find_cycle_from(&table.wait_for, tx) {
            if let Some(&victim) = cycle.iter().max() {
                if table.victims.insert(victim) {
                    victims.push(victim);
                }
            }
        }
    }
    victims
}
