//! ReadView: an immutable snapshot of which transaction ids are visible.

use crate::core::common::types::TransactionId;
use std::collections::HashSet;

/// A snapshot taken at a point in time, used to decide which row version in
/// a chain a reader is allowed to see.
///
/// Visibility rule for a candidate producer `T`:
/// `T == creator_txn_id` OR `T < min_active_txn_id` OR
/// (`T < max_txn_id` AND `T` is not in the active set recorded at creation).
#[derive(Debug, Clone)]
pub struct ReadView {
    creator_txn_id: TransactionId,
    min_active_txn_id: TransactionId,
    max_txn_id: TransactionId,
    active_ids: HashSet<TransactionId>,
}

impl ReadView {
    /// Builds a ReadView from the transaction ids active (and not yet
    /// committed) at the moment of the snapshot, plus the id the snapshot is
    /// being taken for and the id that will be assigned to the *next* new
    /// transaction (the snapshot's strict upper bound).
    #[must_use]
    pub fn new(
        creator_txn_id: TransactionId,
        active_ids: impl IntoIterator<Item = TransactionId>,
        next_txn_id: TransactionId,
    ) -> Self {
        let active_ids: HashSet<TransactionId> =
            active_ids.into_iter().filter(|id| *id != creator_txn_id).collect();
        let min_active_txn_id = active_ids.iter().copied().min().unwrap_or(next_txn_id);
        Self { creator_txn_id, min_active_txn_id, max_txn_id: next_txn_id, active_ids }
    }

    #[must_use]
    pub const fn creator_txn_id(&self) -> TransactionId {
        self.creator_txn_id
    }

    /// True iff a row version produced by `producer` is visible to this view.
    #[must_use]
    pub fn is_visible(&self, producer: TransactionId) -> bool {
        producer == self.creator_txn_id
            || producer < self.min_active_txn_id
            || (producer < self.max_txn_id && !self.active_ids.contains(&producer))
    }
}

/// Produces ReadViews according to isolation level, and tracks the one
/// REPEATABLE READ/SERIALIZABLE reuse across a transaction's lifetime.
///
/// The transaction-id source (active set + next id) is supplied by the
/// caller at each snapshot rather than owned here, mirroring how the
/// coordinator, not the ReadView machinery itself, holds the transaction
/// table latch.
#[derive(Debug, Default)]
pub struct ReadViewFactory;

impl ReadViewFactory {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Snapshots the currently active transaction ids into a fresh ReadView.
    #[must_use]
    pub fn snapshot(
        &self,
        creator_txn_id: TransactionId,
        active_ids: impl IntoIterator<Item = TransactionId>,
        next_txn_id: TransactionId,
    ) -> ReadView {
        ReadView::new(creator_txn_id, active_ids, next_txn_id)
    }
}
