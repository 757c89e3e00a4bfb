pub mod common;
pub mod config;
pub mod indexing;
pub mod mvcc;
pub mod recovery;
pub mod storage;
pub mod transaction;
pub mod wal;

pub use self::config::Config;
