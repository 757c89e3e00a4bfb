//! Registry of secondary indexes, keyed by name.
//!
//! The manager owns no index logic itself; it dispatches to whichever
//! `Index` implementation (`hash`, `btree`) was requested at creation time
//! and fans out insert/delete/update calls across every index touched by a
//! row mutation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::core::common::OxidbError;
use crate::core::indexing::btree::BPlusTreeIndex;
use crate::core::indexing::hash::HashIndex;
use crate::core::indexing::traits::{Index, IndexKey, PrimaryKey};

type SharedIndex = Arc<RwLock<dyn Index + Send + Sync>>;

/// Manages all secondary indexes within the storage engine.
#[derive(Debug)]
pub struct IndexManager {
    indexes: HashMap<String, SharedIndex>,
    base_path: PathBuf,
}

impl IndexManager {
    /// Opens (or creates) the index directory at `base_path`.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError::Io` if the directory cannot be created, or if
    /// `base_path` already exists but is not a directory.
    pub fn new(base_path: PathBuf) -> Result<Self, OxidbError> {
        if !base_path.exists() {
            std::fs::create_dir_all(&base_path)?;
        } else if !base_path.is_dir() {
            return Err(OxidbError::Io(format!(
                "index base path {base_path:?} must be a directory"
            )));
        }
        Ok(Self { indexes: HashMap::new(), base_path })
    }

    /// Creates a named index of the given `index_type` (`"hash"` or `"btree"`).
    ///
    /// # Errors
    ///
    /// Returns `OxidbError::Index` if an index with this name already exists
    /// or `index_type` is not recognized.
    pub fn create_index(&mut self, index_name: String, index_type: &str) -> Result<(), OxidbError> {
        if self.indexes.contains_key(&index_name) {
            return Err(OxidbError::Index(format!("index '{index_name}' already exists")));
        }

        let index_path = self.base_path.join(format!("{index_name}.{index_type}"));

        let index: SharedIndex = match index_type {
            "hash" => Arc::new(RwLock::new(HashIndex::new(index_name.clone(), index_path)?)),
            "btree" => {
                const DEFAULT_BTREE_ORDER: usize = 5;
                let btree = BPlusTreeIndex::new(index_name.clone(), index_path, DEFAULT_BTREE_ORDER)
                    .map_err(|e| OxidbError::Index(format!("btree creation error: {e:?}")))?;
                Arc::new(RwLock::new(btree))
            }
            other => return Err(OxidbError::Index(format!("unsupported index type: {other}"))),
        };

        self.indexes.insert(index_name, index);
        Ok(())
    }

    #[must_use]
    pub fn get_index(&self, index_name: &str) -> Option<SharedIndex> {
        self.indexes.get(index_name).cloned()
    }

    #[must_use]
    pub fn base_path(&self) -> PathBuf {
        self.base_path.clone()
    }

    /// # Errors
    ///
    /// Returns `OxidbError::Index` if the index is unknown, or `OxidbError::Lock`
    /// if its lock is poisoned.
    pub fn insert_into_index(
        &self,
        index_name: &str,
        value: &IndexKey,
        primary_key: &PrimaryKey,
    ) -> Result<(), OxidbError> {
        let index_arc = self
            .indexes
            .get(index_name)
            .ok_or_else(|| OxidbError::Index(format!("index '{index_name}' not found for insertion")))?;
        let mut index = index_arc
            .write()
            .map_err(|_| OxidbError::Lock(format!("poisoned lock on index '{index_name}'")))?;
        index.insert(value, primary_key)
    }

    /// # Errors
    ///
    /// Returns `OxidbError::Index` if the index is unknown, or `OxidbError::Lock`
    /// if its lock is poisoned.
    pub fn delete_from_index(
        &self,
        index_name: &str,
        value: &IndexKey,
        primary_key: Option<&PrimaryKey>,
    ) -> Result<(), OxidbError> {
        let index_arc = self
            .indexes
            .get(index_name)
            .ok_or_else(|| OxidbError::Index(format!("index '{index_name}' not found for deletion")))?;
        let mut index = index_arc
            .write()
            .map_err(|_| OxidbError::Lock(format!("poisoned lock on index '{index_name}'")))?;
        index.delete(value, primary_key)
    }

    /// # Errors
    ///
    /// Returns `OxidbError::Index` if the index is unknown, or `OxidbError::Lock`
    /// if its lock is poisoned.
    pub fn find_by_index(
        &self,
        index_name: &str,
        value: &IndexKey,
    ) -> Result<Option<Vec<PrimaryKey>>, OxidbError> {
        let index_arc = self
            .indexes
            .get(index_name)
            .ok_or_else(|| OxidbError::Index(format!("index '{index_name}' not found for find")))?;
        let index = index_arc
            .read()
            .map_err(|_| OxidbError::Lock(format!("poisoned lock on index '{index_name}'")))?;
        index.find(value)
    }

    /// Fans out an insert across every index that covers one of `indexed_values`.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError::Lock` if any touched index's lock is poisoned.
    pub fn on_insert_data(
        &self,
        indexed_values: &HashMap<String, IndexKey>,
        primary_key: &PrimaryKey,
    ) -> Result<(), OxidbError> {
        for (index_name, value) in indexed_values {
            if let Some(index_arc) = self.indexes.get(index_name) {
                let mut index = index_arc
                    .write()
                    .map_err(|_| OxidbError::Lock(format!("poisoned lock on index '{index_name}'")))?;
                index.insert(value, primary_key)?;
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `OxidbError::Lock` if any touched index's lock is poisoned.
    pub fn on_delete_data(
        &self,
        indexed_values: &HashMap<String, IndexKey>,
        primary_key: &PrimaryKey,
    ) -> Result<(), OxidbError> {
        for (index_name, value) in indexed_values {
            if let Some(index_arc) = self.indexes.get(index_name) {
                let mut index = index_arc
                    .write()
                    .map_err(|_| OxidbError::Lock(format!("poisoned lock on index '{index_name}'")))?;
                index.delete(value, Some(primary_key))?;
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `OxidbError::Lock` if any touched index's lock is poisoned.
    pub fn on_update_data(
        &self,
        old_values: &HashMap<String, IndexKey>,
        new_values: &HashMap<String, IndexKey>,
        primary_key: &PrimaryKey,
    ) -> Result<(), OxidbError> {
        for (index_name, index_arc) in &self.indexes {
            if let (Some(old_value), Some(new_value)) =
                (old_values.get(index_name), new_values.get(index_name))
            {
                let mut index = index_arc
                    .write()
                    .map_err(|_| OxidbError::Lock(format!("poisoned lock on index '{index_name}'")))?;
                index.update(old_value, new_value, primary_key)?;
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `OxidbError::Lock` if any index's lock is poisoned, or whatever
    /// error the underlying index's `save` returns.
    pub fn save_all_indexes(&self) -> Result<(), OxidbError> {
        for index_arc in self.indexes.values() {
            let index = index_arc
                .read()
                .map_err(|_| OxidbError::Lock("poisoned lock while saving index".to_string()))?;
            index.save()?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `OxidbError::Lock` if any index's lock is poisoned, or whatever
    /// error the underlying index's `load` returns.
    pub fn load_all_indexes(&mut self) -> Result<(), OxidbError> {
        for (name, index_arc) in &self.indexes {
            let mut index = index_arc
                .write()
                .map_err(|_| OxidbError::Lock(format!("poisoned lock while loading index '{name}'")))?;
            index.load()?;
        }
        Ok(())
    }
}
