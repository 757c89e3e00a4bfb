//! Undo log: durable pre-images chained by roll pointer.
//!
//! Every INSERT/UPDATE/DELETE produces an [`UndoRecord`] before the row it
//! protects is mutated. The record is appended to an undo page
//! (`PageType::Undo`) using the same slotted-page layout the heap uses for
//! ordinary rows ([`TablePage`]), so the record's address is a
//! `(page_id, slot)` pair — a [`RollPtr`] — exactly like any other page
//! reference in the engine. A bounded arena of in-memory undo pages backs
//! the roll pointers; pages are retired wholesale once [`UndoLog::purge`]
//! determines no active `ReadView` can still need anything on them.

use crate::core::common::error::OxidbError;
use crate::core::common::types::{PageId, RollPtr, SlotId, TransactionId};
use crate::core::storage::engine::heap::table_page::TablePage;
use crate::core::storage::engine::page::{Page, PageType};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// What kind of operation produced this undo record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoRecordKind {
    /// The row did not exist before; undoing means deleting it.
    Insert,
    /// `before` holds the row image prior to the update.
    Update,
    /// `before` holds the row image that was deleted.
    Delete,
}

/// One pre-image in a row's version chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRecord {
    pub kind: UndoRecordKind,
    pub tx_id: TransactionId,
    pub table: String,
    /// Primary key of the row this record protects.
    pub row_key: Vec<u8>,
    /// Row image to restore on rollback, or to reconstruct the previous
    /// version from when a reader's `ReadView` walks past the current one.
    /// `None` for `Insert`, since there is no prior image.
    pub before: Option<Vec<u8>>,
    /// The transaction that produced the version `before` reconstructs.
    /// `None` for `Insert`: there is no earlier version to attribute.
    /// Distinct from `tx_id` (the transaction that wrote *this* record) so a
    /// version-chain walk can decide the reconstructed version's visibility
    /// without needing a separate lookup; `trx_id` values strictly decrease
    /// along the chain, which is what guarantees the walk terminates.
    pub prev_trx_id: Option<TransactionId>,
    /// The row's `roll_ptr` before this record was written, continuing the
    /// chain one step further back. `None` if this is the row's first version.
    pub prev_roll_ptr: Option<RollPtr>,
}

struct UndoPage {
    page: Page,
}

impl UndoPage {
    fn new(page_id: PageId) -> Self {
        let mut page = Page::new(page_id, PageType::Undo);
        TablePage::init(&mut page.data).expect("fresh undo page always has room for the header");
        Self { page }
    }
}

/// In-process arena of undo pages, addressed by [`RollPtr`].
///
/// Mirrors the role InnoDB's undo tablespace plays for the rollback segment:
/// append-only within a page, one page retired at a time once it is no
/// longer reachable from any live `ReadView`.
pub struct UndoLog {
    pages: Mutex<Vec<UndoPage>>,
    next_page_id: AtomicU64,
}

impl UndoLog {
    #[must_use]
    pub fn new() -> Self {
        Self { pages: Mutex::new(Vec::new()), next_page_id: AtomicU64::new(1) }
    }

    fn allocate_page(&self, pages: &mut Vec<UndoPage>) -> PageId {
        let page_id = PageId(self.next_page_id.fetch_add(1, Ordering::SeqCst));
        pages.push(UndoPage::new(page_id));
        page_id
    }

    /// Appends `record` to the log, returning the `roll_ptr` that now
    /// addresses it.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError::Serialization` if the record cannot be encoded,
    /// or `OxidbError::Storage` if even a freshly allocated page cannot hold it
    /// (i.e. the record itself exceeds the page's data capacity).
    pub fn append(&self, record: &UndoRecord) -> Result<RollPtr, OxidbError> {
        let encoded = bincode::serialize(record).map_err(OxidbError::from)?;
        let mut pages = self.pages.lock().unwrap();

        if pages.is_empty() {
            self.allocate_page(&mut pages);
        }

        let last_idx = pages.len() - 1;
        match TablePage::insert_record(&mut pages[last_idx].page.data, &encoded) {
            Ok(slot) => Ok(RollPtr { page_id: pages[last_idx].page.header.page_id, slot }),
            Err(OxidbError::Storage(_)) => {
                // Current page is full; roll onto a fresh one.
                let page_id = self.allocate_page(&mut pages);
                let idx = pages.len() - 1;
                debug_assert_eq!(pages[idx].page.header.page_id, page_id);
                let slot = TablePage::insert_record(&mut pages[idx].page.data, &encoded)?;
                Ok(RollPtr { page_id, slot })
            }
            Err(e) => Err(e),
        }
    }

    /// Looks up the record addressed by `roll_ptr`.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError::NotFound` if the page has already been purged or
    /// the slot was never occupied, and `OxidbError::Deserialization` if the
    /// stored bytes cannot be decoded (data corruption).
    pub fn get(&self, roll_ptr: RollPtr) -> Result<UndoRecord, OxidbError> {
        let pages = self.pages.lock().unwrap();
        let page = pages
            .iter()
            .find(|p| p.page.header.page_id == roll_ptr.page_id)
            .ok_or_else(|| OxidbError::NotFound(format!("undo page {:?} purged", roll_ptr.page_id)))?;
        let bytes = TablePage::get_record(&page.page.data, roll_ptr.slot)?.ok_or_else(|| {
            OxidbError::NotFound(format!("undo slot {:?} empty", roll_ptr.slot))
        })?;
        bincode::deserialize(&bytes).map_err(OxidbError::from)
    }

    /// Drops every undo page whose records were all produced by transactions
    /// strictly older than `min_active_txn_id` — i.e. no `ReadView` created
    /// from here on could still need them (see [`crate::core::mvcc::ReadView`]).
    ///
    /// A page is purged only if every record on it qualifies; a single
    /// long-lived record keeps the whole page (and the undo it chains to)
    /// alive, matching how a real rollback-segment purge works.
    pub fn purge(&self, min_active_txn_id: TransactionId) -> usize {
        let mut pages = self.pages.lock().unwrap();
        let before = pages.len();
        pages.retain(|p| {
            let num_records = TablePage::get_num_records(&p.page.data).unwrap_or(0);
            (0..num_records).any(|i| {
                let slot_id = SlotId(u32::from(i));
                match TablePage::get_record(&p.page.data, slot_id) {
                    Ok(Some(bytes)) => match bincode::deserialize::<UndoRecord>(&bytes) {
                        Ok(record) => record.tx_id >= min_active_txn_id,
                        Err(_) => true,
                    },
                    _ => false,
                }
            })
        });
        before - pages.len()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.lock().unwrap().len()
    }
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new()
    }
}
