use crate::core::common::types::TransactionId;
use crate::core::common::OxidbError;
use std::collections::HashSet;

/// A value paired with the transaction that created it and, once superseded,
/// the transaction that expired it — the shape every version chain entry
/// eventually reduces to before MVCC visibility is layered on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue<V> {
    pub value: V,
    pub created_tx_id: TransactionId,
    pub expired_tx_id: Option<TransactionId>,
}

/// Trait for basic key-value store operations with snapshot-isolated reads.
pub trait KeyValueStore<K, V>: Send + Sync + 'static {
    /// Inserts or updates a key-value pair on behalf of `tx_id`.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError` if the write cannot be durably recorded.
    fn put(&mut self, key: K, value: V, tx_id: TransactionId) -> Result<(), OxidbError>;

    /// Reads the version of `key` visible to a transaction holding `snapshot_id`
    /// given the set of transactions committed at snapshot time.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError` if the lookup fails.
    fn get(
        &self,
        key: &K,
        snapshot_id: u64,
        committed_ids: &HashSet<u64>,
    ) -> Result<Option<V>, OxidbError>;

    /// Deletes `key` on behalf of `tx_id`. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError` if the delete cannot be durably recorded.
    fn delete(&mut self, key: &K, tx_id: TransactionId) -> Result<bool, OxidbError>;

    /// # Errors
    ///
    /// Returns `OxidbError` if the lookup fails.
    fn contains_key(
        &self,
        key: &K,
        snapshot_id: u64,
        committed_ids: &HashSet<u64>,
    ) -> Result<bool, OxidbError>;

    /// Reclaims versions no longer visible to any active transaction.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError` if garbage collection fails.
    fn gc(&mut self, low_water_mark: u64, committed_ids: &HashSet<u64>) -> Result<(), OxidbError>;

    /// Scans all key-value pairs, returning the latest committed version of each.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError` if the scan fails.
    fn scan(&self) -> Result<Vec<(K, V)>, OxidbError>
    where
        K: Clone,
        V: Clone;
}
