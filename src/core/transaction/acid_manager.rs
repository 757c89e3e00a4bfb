//! Transaction coordinator.
//!
//! Sits above `TransactionManager` (WAL begin/commit/abort bookkeeping) and
//! `LockManager` (resource locking and deadlock detection), and exposes the
//! open/commit/rollback/savepoint surface the executor drives: `begin`,
//! `commit`, `rollback`, `set_savepoint`, `rollback_to`.

use crate::core::common::types::TransactionId;
use crate::core::common::OxidbError;
use crate::core::transaction::lock_manager::{LockManager, LockMode, ResourceId, WaitPolicy};
use crate::core::transaction::manager::TransactionManager;
use crate::core::wal::log_manager::LogManager;
use crate::core::wal::writer::WalWriter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Transaction isolation levels, in ascending strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// A change made by a transaction, kept so it can be undone on abort or
/// rollback to a savepoint.
#[derive(Debug, Clone)]
pub enum Modification {
    Insert { table: String, key: Vec<u8>, value: Vec<u8> },
    Update { table: String, key: Vec<u8>, old_value: Vec<u8>, new_value: Vec<u8> },
    Delete { table: String, key: Vec<u8>, old_value: Vec<u8> },
}

struct TransactionMetadata {
    isolation_level: IsolationLevel,
    modifications: Vec<Modification>,
    /// Savepoint name -> length of `modifications` when it was taken.
    savepoints: HashMap<String, usize>,
}

/// Coordinates transaction lifecycle across the WAL-backed transaction
/// manager and the lock manager.
pub struct AcidTransactionManager {
    transaction_manager: Arc<Mutex<TransactionManager>>,
    lock_manager: Arc<LockManager>,
    log_manager: Arc<LogManager>,
    active_transactions: Arc<RwLock<HashMap<TransactionId, TransactionMetadata>>>,
    /// Row storage this coordinator is responsible for undoing on abort or
    /// `rollback_to`. Stands in for the clustered index until one is wired up
    /// through a top-level `Engine` (see `DESIGN.md`); keyed by table name and
    /// primary key.
    row_store: Arc<Mutex<HashMap<(String, Vec<u8>), Vec<u8>>>>,
}

impl AcidTransactionManager {
    #[must_use]
    pub fn new(wal_writer: WalWriter, log_manager: Arc<LogManager>) -> Self {
        let transaction_manager =
            Arc::new(Mutex::new(TransactionManager::new(wal_writer, log_manager.clone())));

        Self {
            transaction_manager,
            lock_manager: Arc::new(LockManager::new()),
            log_manager,
            active_transactions: Arc::new(RwLock::new(HashMap::new())),
            row_store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Current value stored for `(table, key)`, if any. Exposed so callers
    /// (and tests) can observe the effect of `record_modification` and
    /// rollback directly, rather than only the modification-list bookkeeping.
    #[must_use]
    pub fn get(&self, table: &str, key: &[u8]) -> Option<Vec<u8>> {
        self.row_store.lock().unwrap().get(&(table.to_string(), key.to_vec())).cloned()
    }

    /// Begin a new transaction at the given isolation level.
    ///
    /// # Errors
    /// Propagates any I/O error from writing the begin record to the WAL.
    pub fn begin(&self, isolation_level: IsolationLevel) -> Result<TransactionId, OxidbError> {
        let mut tx_manager = self.transaction_manager.lock().unwrap();
        let transaction = tx_manager
            .begin_transaction()
            .map_err(|e| OxidbError::TransactionError(format!("failed to begin transaction: {e}")))?;
        drop(tx_manager);

        let tx_id = transaction.id;
        let metadata = TransactionMetadata {
            isolation_level,
            modifications: Vec::new(),
            savepoints: HashMap::new(),
        };
        self.active_transactions.write().unwrap().insert(tx_id, metadata);
        Ok(tx_id)
    }

    /// Acquire `mode` on `resource` for `tx_id`.
    ///
    /// # Errors
    /// Returns `TransactionNotFound` if `tx_id` is not active, or whatever
    /// `LockManager::acquire_with_policy` returns on conflict.
    pub fn acquire_lock(
        &self,
        tx_id: TransactionId,
        resource: ResourceId,
        mode: LockMode,
        policy: WaitPolicy,
    ) -> Result<(), OxidbError> {
        if !self.active_transactions.read().unwrap().contains_key(&tx_id) {
            return Err(OxidbError::TransactionNotFound(format!("transaction {tx_id} not found")));
        }
        self.lock_manager.acquire_with_policy(tx_id, resource, mode, policy)?;
        Ok(())
    }

    /// Apply `modification` to the row store and record it so it can be
    /// undone on abort or `rollback_to`.
    ///
    /// # Errors
    /// Returns `TransactionNotFound` if `tx_id` is not active.
    pub fn record_modification(
        &self,
        tx_id: TransactionId,
        modification: Modification,
    ) -> Result<(), OxidbError> {
        {
            let mut active = self.active_transactions.write().unwrap();
            let metadata = active.get_mut(&tx_id).ok_or_else(|| {
                OxidbError::TransactionNotFound(format!("transaction {tx_id} not found"))
            })?;
            metadata.modifications.push(modification.clone());
        }
        Self::apply_forward(&self.row_store, &modification);
        Ok(())
    }

    fn apply_forward(row_store: &Mutex<HashMap<(String, Vec<u8>), Vec<u8>>>, modification: &Modification) {
        let mut store = row_store.lock().unwrap();
        match modification {
            Modification::Insert { table, key, value } | Modification::Update { table, key, new_value: value, .. } => {
                store.insert((table.clone(), key.clone()), value.clone());
            }
            Modification::Delete { table, key, .. } => {
                store.remove(&(table.clone(), key.clone()));
            }
        }
    }

    /// Mark a named savepoint at the transaction's current position.
    ///
    /// # Errors
    /// Returns `TransactionNotFound` if `tx_id` is not active.
    pub fn set_savepoint(&self, tx_id: TransactionId, name: &str) -> Result<(), OxidbError> {
        let mut active = self.active_transactions.write().unwrap();
        let metadata = active
            .get_mut(&tx_id)
            .ok_or_else(|| OxidbError::TransactionNotFound(format!("transaction {tx_id} not found")))?;
        metadata.savepoints.insert(name.to_string(), metadata.modifications.len());
        Ok(())
    }

    /// Undo every modification made since `name` was set, then drop the
    /// savepoint itself (and any later ones).
    ///
    /// # Errors
    /// Returns `TransactionNotFound` if `tx_id` is not active, or `NotFound`
    /// if `name` was never set.
    pub fn rollback_to(&self, tx_id: TransactionId, name: &str) -> Result<(), OxidbError> {
        let (mark, tail) = {
            let mut active = self.active_transactions.write().unwrap();
            let metadata = active.get_mut(&tx_id).ok_or_else(|| {
                OxidbError::TransactionNotFound(format!("transaction {tx_id} not found"))
            })?;
            let mark = *metadata
                .savepoints
                .get(name)
                .ok_or_else(|| OxidbError::NotFound(format!("savepoint {name} not found")))?;
            let tail = metadata.modifications.split_off(mark);
            metadata.savepoints.retain(|_, pos| *pos <= mark);
            (mark, tail)
        };
        let _ = mark;
        for modification in tail.iter().rev() {
            self.undo_modification(modification);
        }
        Ok(())
    }

    /// Commit a transaction: flush its WAL commit record, then release locks.
    ///
    /// # Errors
    /// Propagates any I/O error from the commit WAL write.
    pub fn commit(&self, tx_id: TransactionId) -> Result<(), OxidbError> {
        if !self.active_transactions.read().unwrap().contains_key(&tx_id) {
            return Err(OxidbError::TransactionNotFound(format!("transaction {tx_id} not found")));
        }

        let mut tx_manager = self.transaction_manager.lock().unwrap();
        tx_manager
            .commit_transaction()
            .map_err(|e| OxidbError::TransactionError(format!("failed to commit transaction: {e}")))?;
        drop(tx_manager);

        self.lock_manager.release_all(tx_id);
        self.active_transactions.write().unwrap().remove(&tx_id);
        Ok(())
    }

    /// Abort a transaction: undo its modifications in reverse, write the
    /// abort WAL record, then release locks.
    ///
    /// # Errors
    /// Propagates any I/O error from the abort WAL write.
    pub fn rollback(&self, tx_id: TransactionId) -> Result<(), OxidbError> {
        let modifications = {
            let mut active = self.active_transactions.write().unwrap();
            let metadata = active.get_mut(&tx_id).ok_or_else(|| {
                OxidbError::TransactionNotFound(format!("transaction {tx_id} not found"))
            })?;
            std::mem::take(&mut metadata.modifications)
        };

        for modification in modifications.iter().rev() {
            self.undo_modification(modification);
        }

        let mut tx_manager = self.transaction_manager.lock().unwrap();
        tx_manager
            .abort_transaction()
            .map_err(|e| OxidbError::TransactionError(format!("failed to abort transaction: {e}")))?;
        drop(tx_manager);

        self.lock_manager.release_all(tx_id);
        self.active_transactions.write().unwrap().remove(&tx_id);
        Ok(())
    }

    /// Apply the inverse of one modification against the row store: an
    /// insert is undone by removing the key, an update by restoring
    /// `old_value`, a delete by re-inserting `old_value`.
    fn undo_modification(&self, modification: &Modification) {
        let mut store = self.row_store.lock().unwrap();
        match modification {
            Modification::Insert { table, key, .. } => {
                log::debug!("rollback: undoing insert into {table} key={key:?}");
                store.remove(&(table.clone(), key.clone()));
            }
            Modification::Update { table, key, old_value, .. } => {
                log::debug!("rollback: undoing update in {table} key={key:?}");
                store.insert((table.clone(), key.clone()), old_value.clone());
            }
            Modification::Delete { table, key, old_value } => {
                log::debug!("rollback: undoing delete from {table} key={key:?}");
                store.insert((table.clone(), key.clone()), old_value.clone());
            }
        }
    }

    /// Whether `tx_id` may read data currently locked by another transaction,
    /// given its isolation level. `READ UNCOMMITTED` ignores writer locks
    /// entirely; every stricter level requires the writer to have released
    /// its exclusive lock (i.e. committed or aborted).
    #[must_use]
    pub fn can_read(&self, tx_id: TransactionId, resource: &ResourceId) -> bool {
        let active = self.active_transactions.read().unwrap();
        let Some(metadata) = active.get(&tx_id) else {
            return false;
        };
        if metadata.isolation_level == IsolationLevel::ReadUncommitted {
            return true;
        }
        !self.lock_manager.has_other_holder(tx_id, resource)
    }

    #[must_use]
    pub fn log_manager(&self) -> &Arc<LogManager> {
        &self.log_manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn new_manager() -> AcidTransactionManager {
        let temp_file = NamedTempFile::new().unwrap();
        let wal_writer = WalWriter::new(temp_file.path().to_path_buf(), Default::default());
        let log_manager = Arc::new(LogManager::new());
        AcidTransactionManager::new(wal_writer, log_manager)
    }

    #[test]
    fn begin_registers_an_active_transaction() {
        let manager = new_manager();
        let tx_id = manager.begin(IsolationLevel::ReadCommitted).unwrap();
        assert!(manager.active_transactions.read().unwrap().contains_key(&tx_id));
    }

    #[test]
    fn commit_releases_locks_and_clears_metadata() {
        let manager = new_manager();
        let tx_id = manager.begin(IsolationLevel::ReadCommitted).unwrap();
        let resource = ResourceId::Record { index_id: "idx".to_string(), key: b"k".to_vec() };
        manager
            .acquire_lock(tx_id, resource.clone(), LockMode::Exclusive, WaitPolicy::NoWait)
            .unwrap();

        manager.commit(tx_id).unwrap();

        assert!(!manager.active_transactions.read().unwrap().contains_key(&tx_id));
        assert!(manager.lock_manager.mode_held(tx_id, &resource).is_none());
    }

    #[test]
    fn rollback_to_savepoint_drops_later_modifications() {
        let manager = new_manager();
        let tx_id = manager.begin(IsolationLevel::ReadCommitted).unwrap();

        manager
            .record_modification(
                tx_id,
                Modification::Insert { table: "t".into(), key: b"a".to_vec(), value: b"1".to_vec() },
            )
            .unwrap();
        manager.set_savepoint(tx_id, "sp1").unwrap();
        manager
            .record_modification(
                tx_id,
                Modification::Insert { table: "t".into(), key: b"b".to_vec(), value: b"2".to_vec() },
            )
            .unwrap();

        manager.rollback_to(tx_id, "sp1").unwrap();

        let active = manager.active_transactions.read().unwrap();
        assert_eq!(active.get(&tx_id).unwrap().modifications.len(), 1);
    }

    #[test]
    fn rollback_to_savepoint_restores_the_row_store_to_its_earlier_state() {
        let manager = new_manager();
        let tx_id = manager.begin(IsolationLevel::ReadCommitted).unwrap();

        manager
            .record_modification(
                tx_id,
                Modification::Insert { table: "t".into(), key: b"a".to_vec(), value: b"1".to_vec() },
            )
            .unwrap();
        manager.set_savepoint(tx_id, "sp1").unwrap();
        manager
            .record_modification(
                tx_id,
                Modification::Update {
                    table: "t".into(),
                    key: b"a".to_vec(),
                    old_value: b"1".to_vec(),
                    new_value: b"2".to_vec(),
                },
            )
            .unwrap();
        manager
            .record_modification(
                tx_id,
                Modification::Insert { table: "t".into(), key: b"b".to_vec(), value: b"new".to_vec() },
            )
            .unwrap();

        assert_eq!(manager.get("t", b"a"), Some(b"2".to_vec()));
        assert_eq!(manager.get("t", b"b"), Some(b"new".to_vec()));

        manager.rollback_to(tx_id, "sp1").unwrap();

        assert_eq!(manager.get("t", b"a"), Some(b"1".to_vec()));
        assert_eq!(manager.get("t", b"b"), None);
    }

    #[test]
    fn full_rollback_undoes_every_modification_in_reverse_order() {
        let manager = new_manager();
        let tx_id = manager.begin(IsolationLevel::ReadCommitted).unwrap();

        manager
            .record_modification(
                tx_id,
                Modification::Delete { table: "t".into(), key: b"x".to_vec(), old_value: b"orig".to_vec() },
            )
            .unwrap();
        assert_eq!(manager.get("t", b"x"), None);

        manager.rollback(tx_id).unwrap();

        assert_eq!(manager.get("t", b"x"), Some(b"orig".to_vec()));
    }

    #[test]
    fn read_uncommitted_ignores_other_transactions_locks() {
        let manager = new_manager();
        let writer = manager.begin(IsolationLevel::ReadCommitted).unwrap();
        let reader = manager.begin(IsolationLevel::ReadUncommitted).unwrap();
        let resource = ResourceId::Record { index_id: "idx".to_string(), key: b"k".to_vec() };
        manager.acquire_lock(writer, resource.clone(), LockMode::Exclusive, WaitPolicy::NoWait).unwrap();

        assert!(manager.can_read(reader, &resource));
    }

    #[test]
    fn read_committed_is_blocked_by_another_transactions_exclusive_lock() {
        let manager = new_manager();
        let writer = manager.begin(IsolationLevel::ReadCommitted).unwrap();
        let reader = manager.begin(IsolationLevel::ReadCommitted).unwrap();
        let resource = ResourceId::Record { index_id: "idx".to_string(), key: b"k".to_vec() };
        manager.acquire_lock(writer, resource.clone(), LockMode::Exclusive, WaitPolicy::NoWait).unwrap();

        assert!(!manager.can_read(reader, &resource));
    }

    #[test]
    fn acquire_lock_for_unknown_transaction_is_rejected() {
        let manager = new_manager();
        let resource = ResourceId::Record { index_id: "idx".to_string(), key: b"k".to_vec() };
        let err = manager
            .acquire_lock(TransactionId(9999), resource, LockMode::Shared, WaitPolicy::NoWait)
            .unwrap_err();
        assert!(matches!(err, OxidbError::TransactionNotFound(_)));
    }
}
