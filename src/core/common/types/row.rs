use super::ids::{RollPtr, TransactionId};
use super::value::Value;

/// A row as stored in a clustered-index leaf: the visible column values plus
/// the hidden MVCC bookkeeping fields every version carries.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
    /// Transaction that created this version.
    pub trx_id: TransactionId,
    /// Pointer to the prior version in the undo chain, or `None` if this is
    /// the oldest version still reachable.
    pub roll_ptr: Option<RollPtr>,
    /// Set once a transaction has deleted this version; the row stays in
    /// place (purged later) so concurrent readers with an older ReadView
    /// can still see it.
    pub deleted_flag: bool,
}

impl Row {
    #[must_use]
    pub fn new(values: Vec<Value>, trx_id: TransactionId) -> Self {
        Self { values, trx_id, roll_ptr: None, deleted_flag: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_row_has_no_roll_ptr_and_is_not_deleted() {
        let row = Row::new(vec![Value::Integer(1)], TransactionId(7));
        assert_eq!(row.trx_id, TransactionId(7));
        assert!(row.roll_ptr.is_none());
        assert!(!row.deleted_flag);
    }
}
