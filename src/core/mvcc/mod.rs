//! Multi-version concurrency control: undo log, version chains, ReadViews.
//!
//! Every row carries a hidden `trx_id` and `roll_ptr` (see
//! [`crate::core::common::types::RollPtr`]). An update or delete first writes
//! the row's pre-image to the undo log ([`undo`]), chaining it onto the
//! row's previous `roll_ptr`, then overwrites the row in place. A reader
//! holding a [`read_view::ReadView`] walks that chain ([`version_chain`])
//! until it finds the version its snapshot can see.

pub mod read_view;
pub mod undo;
pub mod version_chain;

pub use read_view::{ReadView, ReadViewFactory};
pub use undo::{UndoLog, UndoRecord, UndoRecordKind};
pub use version_chain::{RowVersion, VersionChain};
