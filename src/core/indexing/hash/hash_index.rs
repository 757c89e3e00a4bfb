//! An in-memory hash index backed by a flat file for persistence.
//!
//! Unlike the B-tree based indexes, a hash index gives up ordered scans in
//! exchange for O(1) point lookups; it is the right choice for secondary
//! indexes that are only ever equality-probed.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use crate::core::common::OxidbError;
use crate::core::indexing::traits::{Index, IndexKey, PrimaryKey};

#[derive(Debug)]
pub struct HashIndex {
    name: String,
    path: PathBuf,
    map: HashMap<IndexKey, Vec<PrimaryKey>>,
}

impl HashIndex {
    /// Opens (or creates) a hash index backed by `path`.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError::Io` if an existing file cannot be read, or
    /// `OxidbError::Deserialization` if its contents are corrupt.
    pub fn new(name: String, path: PathBuf) -> Result<Self, OxidbError> {
        let map = if path.exists() {
            let file = File::open(&path)?;
            bincode::deserialize_from(BufReader::new(file))
                .map_err(|e| OxidbError::Deserialization(e.to_string()))?
        } else {
            HashMap::new()
        };
        Ok(Self { name, path, map })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Index for HashIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert(&mut self, value: &IndexKey, primary_key: &PrimaryKey) -> Result<(), OxidbError> {
        let bucket = self.map.entry(value.clone()).or_default();
        if !bucket.contains(primary_key) {
            bucket.push(primary_key.clone());
        }
        Ok(())
    }

    fn delete(
        &mut self,
        value: &IndexKey,
        primary_key: Option<&PrimaryKey>,
    ) -> Result<(), OxidbError> {
        let Some(bucket) = self.map.get_mut(value) else {
            return Ok(());
        };
        match primary_key {
            Some(pk) => bucket.retain(|existing| existing != pk),
            None => bucket.clear(),
        }
        if bucket.is_empty() {
            self.map.remove(value);
        }
        Ok(())
    }

    fn find(&self, value: &IndexKey) -> Result<Option<Vec<PrimaryKey>>, OxidbError> {
        Ok(self.map.get(value).cloned())
    }

    fn save(&self) -> Result<(), OxidbError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        bincode::serialize_into(BufWriter::new(file), &self.map)
            .map_err(|e| OxidbError::Serialization(e.to_string()))
    }

    fn load(&mut self) -> Result<(), OxidbError> {
        if !self.path.exists() {
            return Ok(());
        }
        let file = File::open(&self.path)?;
        self.map = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| OxidbError::Deserialization(e.to_string()))?;
        Ok(())
    }

    fn update(
        &mut self,
        old_value_for_index: &IndexKey,
        new_value_for_index: &IndexKey,
        primary_key: &PrimaryKey,
    ) -> Result<(), OxidbError> {
        self.delete(old_value_for_index, Some(primary_key))?;
        self.insert(new_value_for_index, primary_key)
    }
}
