pub mod data_type;
pub mod value;
pub mod row;
pub mod schema;
pub mod ids; // Added ids module

pub use data_type::DataType;
pub use value::Value;
pub use row::Row;
pub use schema::{Schema, ColumnDef};
pub use ids::{Lsn, PageId, RollPtr, SlotId, TransactionId};
