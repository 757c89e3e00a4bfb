use crate::core::common::types::ids::{PageId, SlotId};
use crate::core::common::types::{Lsn, TransactionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Copy, Serialize, Deserialize)]
pub enum PageType {
    TablePage,
    BTreeInternal,
    BTreeLeaf,
    Undo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTransactionInfo {
    pub tx_id: TransactionId,
    pub last_lsn: Lsn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyPageInfo {
    pub page_id: PageId,
    pub recovery_lsn: Lsn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRecord {
    BeginTransaction {
        lsn: Lsn,
        tx_id: TransactionId,
    },
    CommitTransaction {
        lsn: Lsn,
        tx_id: TransactionId,
        prev_lsn: Lsn,
    },
    AbortTransaction {
        lsn: Lsn,
        tx_id: TransactionId,
        prev_lsn: Lsn,
    },
    InsertRecord {
        lsn: Lsn,
        tx_id: TransactionId,
        page_id: PageId,
        slot_id: SlotId,
        record_data: Vec<u8>,
        prev_lsn: Lsn,
    },
    DeleteRecord {
        lsn: Lsn,
        tx_id: TransactionId,
        page_id: PageId,
        slot_id: SlotId,
        old_record_data: Vec<u8>,
        prev_lsn: Lsn,
    },
    UpdateRecord {
        lsn: Lsn,
        tx_id: TransactionId,
        page_id: PageId,
        slot_id: SlotId,
        old_record_data: Vec<u8>,
        new_record_data: Vec<u8>,
        prev_lsn: Lsn,
    },
    NewPage {
        lsn: Lsn,
        tx_id: TransactionId,
        page_id: PageId,
        page_type: PageType,
        prev_lsn: Lsn,
    },
    /// Marks the start of a mini-transaction: every subsequent record sharing
    /// `mtr_id` up to the matching `MtrCommit` applies atomically during redo.
    MtrBegin {
        lsn: Lsn,
        tx_id: TransactionId,
        mtr_id: u64,
        prev_lsn: Lsn,
    },
    MtrCommit {
        lsn: Lsn,
        tx_id: TransactionId,
        mtr_id: u64,
        prev_lsn: Lsn,
    },
    CompensationLogRecord {
        // CLR
        lsn: Lsn,
        tx_id: TransactionId,
        page_id: PageId,
        slot_id: Option<SlotId>, // Some operations might be page-level
        undone_lsn: Lsn,         // LSN of the log record that was undone
        data_for_redo_of_undo: Vec<u8>,
        prev_lsn: Lsn,              // Previous LSN for this transaction
        next_undo_lsn: Option<Lsn>, // For traversing undo chain for this transaction
    },
    CheckpointBegin {
        lsn: Lsn,
    },
    CheckpointEnd {
        lsn: Lsn,
        active_transactions: Vec<ActiveTransactionInfo>,
        dirty_pages: Vec<DirtyPageInfo>,
    },
}

impl LogRecord {
    /// The LSN every variant carries.
    #[must_use]
    pub const fn lsn(&self) -> Lsn {
        match self {
            Self::BeginTransaction { lsn, .. }
            | Self::CommitTransaction { lsn, .. }
            | Self::AbortTransaction { lsn, .. }
            | Self::InsertRecord { lsn, .. }
            | Self::DeleteRecord { lsn, .. }
            | Self::UpdateRecord { lsn, .. }
            | Self::NewPage { lsn, .. }
            | Self::MtrBegin { lsn, .. }
            | Self::MtrCommit { lsn, .. }
            | Self::CompensationLogRecord { lsn, .. }
            | Self::CheckpointBegin { lsn, .. }
            | Self::CheckpointEnd { lsn, .. } => *lsn,
        }
    }

    /// The transaction this record belongs to, if any (checkpoint records have none).
    #[must_use]
    pub const fn tx_id(&self) -> Option<TransactionId> {
        match self {
            Self::BeginTransaction { tx_id, .. }
            | Self::CommitTransaction { tx_id, .. }
            | Self::AbortTransaction { tx_id, .. }
            | Self::InsertRecord { tx_id, .. }
            | Self::DeleteRecord { tx_id, .. }
            | Self::UpdateRecord { tx_id, .. }
            | Self::NewPage { tx_id, .. }
            | Self::MtrBegin { tx_id, .. }
            | Self::MtrCommit { tx_id, .. }
            | Self::CompensationLogRecord { tx_id, .. } => Some(*tx_id),
            Self::CheckpointBegin { .. } | Self::CheckpointEnd { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(record: &LogRecord) -> LogRecord {
        let serialized = bincode::serialize(record).unwrap();
        bincode::deserialize(&serialized).unwrap()
    }

    #[test]
    fn test_serialize_deserialize_begin_transaction() {
        let original_record = LogRecord::BeginTransaction { lsn: 0, tx_id: TransactionId(123) };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn test_serialize_deserialize_commit_transaction() {
        let original_record =
            LogRecord::CommitTransaction { lsn: 1, tx_id: TransactionId(123), prev_lsn: 0 };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn test_serialize_deserialize_abort_transaction() {
        let original_record =
            LogRecord::AbortTransaction { lsn: 2, tx_id: TransactionId(123), prev_lsn: 1 };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn test_serialize_deserialize_insert_record() {
        let original_record = LogRecord::InsertRecord {
            lsn: 3,
            tx_id: TransactionId(1),
            page_id: PageId(2),
            slot_id: SlotId(3),
            record_data: vec![10, 20, 30],
            prev_lsn: 2,
        };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn test_serialize_deserialize_delete_record() {
        let original_record = LogRecord::DeleteRecord {
            lsn: 4,
            tx_id: TransactionId(1),
            page_id: PageId(2),
            slot_id: SlotId(3),
            old_record_data: vec![40, 50, 60],
            prev_lsn: 3,
        };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn test_serialize_deserialize_update_record() {
        let original_record = LogRecord::UpdateRecord {
            lsn: 5,
            tx_id: TransactionId(1),
            page_id: PageId(2),
            slot_id: SlotId(3),
            old_record_data: vec![70, 80],
            new_record_data: vec![90, 100],
            prev_lsn: 4,
        };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn test_serialize_deserialize_new_page() {
        let original_record = LogRecord::NewPage {
            lsn: 6,
            tx_id: TransactionId(1),
            page_id: PageId(5),
            page_type: PageType::TablePage,
            prev_lsn: 5,
        };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn test_serialize_deserialize_mtr_bracket() {
        let begin = LogRecord::MtrBegin { lsn: 6, tx_id: TransactionId(1), mtr_id: 42, prev_lsn: 5 };
        let commit = LogRecord::MtrCommit { lsn: 7, tx_id: TransactionId(1), mtr_id: 42, prev_lsn: 6 };
        assert_eq!(begin, roundtrip(&begin));
        assert_eq!(commit, roundtrip(&commit));
    }

    #[test]
    fn test_serialize_deserialize_compensation_log_record() {
        let original_record = LogRecord::CompensationLogRecord {
            lsn: 7,
            tx_id: TransactionId(1),
            page_id: PageId(6),
            slot_id: Some(SlotId(7)),
            undone_lsn: 200,
            data_for_redo_of_undo: vec![1, 2, 3],
            prev_lsn: 6,
            next_undo_lsn: Some(99),
        };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn test_serialize_deserialize_compensation_log_record_no_slot() {
        let original_record = LogRecord::CompensationLogRecord {
            lsn: 8,
            tx_id: TransactionId(1),
            page_id: PageId(6),
            slot_id: None,
            undone_lsn: 201,
            data_for_redo_of_undo: vec![4, 5, 6],
            prev_lsn: 7,
            next_undo_lsn: None,
        };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn test_serialize_deserialize_checkpoint_begin() {
        let original_record = LogRecord::CheckpointBegin { lsn: 9 };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn test_serialize_deserialize_checkpoint_end() {
        let original_record = LogRecord::CheckpointEnd {
            lsn: 10,
            active_transactions: vec![
                ActiveTransactionInfo { tx_id: TransactionId(1), last_lsn: 8 },
                ActiveTransactionInfo { tx_id: TransactionId(2), last_lsn: 7 },
            ],
            dirty_pages: vec![
                DirtyPageInfo { page_id: PageId(100), recovery_lsn: 5 },
                DirtyPageInfo { page_id: PageId(101), recovery_lsn: 6 },
            ],
        };
        assert_eq!(original_record, roundtrip(&original_record));
    }

    #[test]
    fn lsn_accessor_matches_every_variant() {
        let record = LogRecord::CheckpointBegin { lsn: 42 };
        assert_eq!(record.lsn(), 42);
        assert_eq!(record.tx_id(), None);
    }
}
