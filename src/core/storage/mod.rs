pub mod engine;

pub use engine::{BufferPoolManager, DiskManager, Page, PageHeader, PageType, PAGE_SIZE};
