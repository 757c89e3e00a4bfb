//! Version-chain lookup: walks a row's current version and its undo chain
//! to find the version visible to a given `ReadView`.

use crate::core::common::error::OxidbError;
use crate::core::common::types::{RollPtr, TransactionId};
use crate::core::mvcc::read_view::ReadView;
use crate::core::mvcc::undo::{UndoLog, UndoRecordKind};

/// The three hidden fields every row carries alongside its typed columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowVersion {
    /// Transaction that produced this version.
    pub trx_id: TransactionId,
    /// Pointer to the undo record holding the previous version, if any.
    pub roll_ptr: Option<RollPtr>,
    pub deleted: bool,
    pub data: Vec<u8>,
}

/// Reconstructs, for a given `view`, the row image it is allowed to see
/// starting from the current in-page version `current`.
///
/// Walks `trx_id`s in strictly decreasing order (each undo record names the
/// transaction that produced the version it reconstructs), which is what
/// guarantees termination.
///
/// Returns `Ok(None)` if no version in the chain is both visible to `view`
/// and non-deleted (i.e. the row does not exist from `view`'s perspective).
///
/// # Errors
///
/// Propagates `undo_log.get`'s errors — `NotFound` if a roll pointer the
/// chain still references has already been purged (a purge bug, since
/// purge is only supposed to drop pages below every active ReadView's
/// watermark), or `Deserialization` on corrupted undo bytes.
pub fn find_visible_version(
    current: &RowVersion,
    view: &ReadView,
    undo_log: &UndoLog,
) -> Result<Option<Vec<u8>>, OxidbError> {
    if view.is_visible(current.trx_id) {
        return Ok(if current.deleted { None } else { Some(current.data.clone()) });
    }

    let mut roll_ptr = current.roll_ptr;
    while let Some(ptr) = roll_ptr {
        let record = undo_log.get(ptr)?;
        let Some(prev_trx_id) = record.prev_trx_id else {
            // Reached the INSERT that created the row: no earlier version exists.
            debug_assert!(matches!(record.kind, UndoRecordKind::Insert));
            return Ok(None);
        };
        if view.is_visible(prev_trx_id) {
            // UPDATE/DELETE undo records always carry the live pre-operation
            // row; only the current on-page version can be delete-marked.
            return Ok(record.before);
        }
        roll_ptr = record.prev_roll_ptr;
    }

    Ok(None)
}

/// A chain anchored at a row's current version, with the undo log needed to
/// walk it further back. Thin convenience wrapper over
/// [`find_visible_version`] for callers that want to hold the pieces
/// together (an index scan operator, typically).
pub struct VersionChain<'a> {
    pub current: RowVersion,
    pub undo_log: &'a UndoLog,
}

impl<'a> VersionChain<'a> {
    #[must_use]
    pub const fn new(current: RowVersion, undo_log: &'a UndoLog) -> Self {
        Self { current, undo_log }
    }

    /// # Errors
    ///
    /// See [`find_visible_version`].
    pub fn visible_to(&self, view: &ReadView) -> Result<Option<Vec<u8>>, OxidbError> {
        find_visible_version(&self.current, view, self.undo_log)
    }
}
