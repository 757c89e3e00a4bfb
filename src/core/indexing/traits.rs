use crate::core::common::OxidbError;
use std::fmt::Debug;

/// The encoded form of a column value as stored in an index entry.
pub type IndexKey = Vec<u8>;
/// The clustered-index key (primary key) an index entry points back to.
pub type PrimaryKey = Vec<u8>;

/// Trait for secondary indexes.
///
/// A secondary index maps values of a specific column (or a set of columns)
/// to the primary keys of the rows containing those values.
pub trait Index: Debug {
    /// Returns the name of the index.
    fn name(&self) -> &str;

    /// Inserts a new entry into the index.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError` if the insertion fails (e.g., due to I/O issues when persisting).
    fn insert(&mut self, value: &IndexKey, primary_key: &PrimaryKey) -> Result<(), OxidbError>;

    /// Deletes an entry from the index.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError` if the deletion fails.
    fn delete(
        &mut self,
        value: &IndexKey,
        primary_key: Option<&PrimaryKey>,
    ) -> Result<(), OxidbError>;

    /// Finds primary keys associated with a given indexed value.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError` if the lookup fails.
    fn find(&self, value: &IndexKey) -> Result<Option<Vec<PrimaryKey>>, OxidbError>;

    /// Saves the index data to persistent storage.
    fn save(&self) -> Result<(), OxidbError>;

    /// Loads the index data from persistent storage.
    fn load(&mut self) -> Result<(), OxidbError>;

    /// Updates an index entry: removes the old indexed value's entry and
    /// inserts the new one, both pointing at the same primary key.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError` if the update fails.
    fn update(
        &mut self,
        old_value_for_index: &IndexKey,
        new_value_for_index: &IndexKey,
        primary_key: &PrimaryKey,
    ) -> Result<(), OxidbError>;
}
