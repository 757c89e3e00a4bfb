#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct PageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TransactionId(pub u64);

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::AddAssign<u64> for TransactionId {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct SlotId(pub u32);

/// Log Sequence Number. A bare `u64` rather than a newtype: every WAL/recovery
/// component treats it as an ordinary integer (atomic counters, `min()`/`max()`,
/// arithmetic comparisons against dirty-page recovery LSNs), and wrapping it
/// would mean threading `.0` through all of that for no benefit.
pub type Lsn = u64;

/// A handle to one version in a row's undo chain: the undo page holding the
/// previous version's image, and the slot within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RollPtr {
    pub page_id: PageId,
    pub slot: SlotId,
}
