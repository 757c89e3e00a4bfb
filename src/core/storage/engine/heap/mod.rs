pub mod table_page;

#[path = "tests/table_page_tests.rs"]
#[cfg(test)]
mod table_page_tests;

pub use table_page::{Slot, TablePage};
