//! Single-type row table keyed by primary key, with secondary indexes that
//! are kept in step on every write.
mod index;


use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use index::Index;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};
use thiserror::Error as ThisError;

// re-exports
pub use index::IndexDelta;

/// Reads a key (primary or index value) off a row.
pub type Getter<K, V> = Box<dyn Fn(&V) -> Option<K> + Send + Sync>;

///
/// CacheError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CacheError {
    #[error("can't add item to cache with undefined/null key")]
    MissingKey,

    #[error("index {0} doesn't exist")]
    UnknownIndex(String),

    #[error("index {0} is declared twice")]
    DuplicateIndex(String),

    #[error("can't update indexes for 2 items that have different primary keys")]
    KeyMismatch,
}

impl From<CacheError> for InternalError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::KeyMismatch => Self::cache_invariant(err.to_string()),
            CacheError::UnknownIndex(_) => {
                Self::new(ErrorClass::NotFound, ErrorOrigin::Cache, err.to_string())
            }
            CacheError::MissingKey | CacheError::DuplicateIndex(_) => {
                Self::new(ErrorClass::Invalid, ErrorOrigin::Cache, err.to_string())
            }
        }
    }
}

///
/// Upsert
/// Outcome of one `Cache::add`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Upsert<K> {
    pub key: K,
    pub replaced: bool,
    pub index: IndexDelta,
}

///
/// Cache
///
/// Primary-key table plus named secondary indexes. `K` is used both for
/// primary keys and for index values.
///

pub struct Cache<K, V> {
    rows: BTreeMap<K, V>,
    key_of: Getter<K, V>,
    indexes: Vec<Index<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    pub fn new(key_of: Getter<K, V>) -> Self {
        Self {
            rows: BTreeMap::new(),
            key_of,
            indexes: Vec::new(),
        }
    }

    /// Declare a secondary index. Must happen before the first `add`.
    pub fn with_index(
        mut self,
        name: impl Into<String>,
        value_of: Getter<K, V>,
    ) -> Result<Self, CacheError> {
        let name = name.into();
        if self.index(&name).is_ok() {
            return Err(CacheError::DuplicateIndex(name));
        }

        self.indexes.push(Index::new(name, value_of));

        Ok(self)
    }

    //
    // Writes
    //

    /// Insert or replace a row, keeping every index in step.
    pub fn add(&mut self, item: V) -> Result<Upsert<K>, CacheError> {
        let key = (self.key_of)(&item).ok_or(CacheError::MissingKey)?;
        let old = self.rows.get(&key);

        if let Some(old) = old
            && (self.key_of)(old).as_ref() != Some(&key)
        {
            return Err(CacheError::KeyMismatch);
        }

        let mut delta = IndexDelta::default();
        for index in &mut self.indexes {
            delta.merge(index.update(&key, &item, old));
        }

        let replaced = self.rows.insert(key.clone(), item).is_some();

        Ok(Upsert {
            key,
            replaced,
            index: delta,
        })
    }

    pub fn add_many(
        &mut self,
        items: impl IntoIterator<Item = V>,
    ) -> Result<Vec<Upsert<K>>, CacheError> {
        items.into_iter().map(|item| self.add(item)).collect()
    }

    /// Drop a row and its index memberships.
    pub fn remove(&mut self, key: &K) -> Option<(V, IndexDelta)> {
        let row = self.rows.remove(key)?;

        let mut delta = IndexDelta::default();
        for index in &mut self.indexes {
            delta.merge(index.unlink(key, &row));
        }

        Some((row, delta))
    }

    /// Empty the bucket for `value`. Rows stay in the table.
    pub fn remove_by_index(&mut self, name: &str, value: &K) -> Result<usize, CacheError> {
        let index = self
            .indexes
            .iter_mut()
            .find(|i| i.name() == name)
            .ok_or_else(|| CacheError::UnknownIndex(name.to_string()))?;

        Ok(index.clear(value))
    }

    //
    // Reads
    //

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.rows.get(key)
    }

    /// Copies of the rows found for `keys`; missing keys are skipped.
    #[must_use]
    pub fn get_many<'a>(&self, keys: impl IntoIterator<Item = &'a K>) -> BTreeMap<K, V>
    where
        K: 'a,
    {
        keys.into_iter()
            .filter_map(|key| self.rows.get(key).map(|row| (key.clone(), row.clone())))
            .collect()
    }

    #[must_use]
    pub fn all(&self) -> BTreeMap<K, V> {
        self.rows.clone()
    }

    /// Copy of the bucket for `value`; empty if nothing is indexed under it.
    pub fn by_index(&self, name: &str, value: &K) -> Result<BTreeMap<K, V>, CacheError> {
        let index = self.index(name)?;

        Ok(index
            .bucket(value)
            .map(|keys| self.get_many(keys))
            .unwrap_or_default())
    }

    /// Union of the buckets for every `(index, value)` pair.
    pub fn by_indexes<'a>(
        &self,
        pairs: impl IntoIterator<Item = (&'a str, &'a K)>,
    ) -> Result<BTreeMap<K, V>, CacheError>
    where
        K: 'a,
    {
        let mut keys = BTreeSet::new();

        for (name, value) in pairs {
            if let Some(bucket) = self.index(name)?.bucket(value) {
                keys.extend(bucket.iter().cloned());
            }
        }

        Ok(self.get_many(&keys))
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(Index::name)
    }

    #[must_use]
    pub fn has_index(&self, name: &str) -> bool {
        self.index(name).is_ok()
    }

    /// Primary keys per index value, for inspection.
    pub fn index_buckets(&self, name: &str) -> Result<&BTreeMap<K, BTreeSet<K>>, CacheError> {
        Ok(self.index(name)?.buckets())
    }

    fn index(&self, name: &str) -> Result<&Index<K, V>, CacheError> {
        self.indexes
            .iter()
            .find(|i| i.name() == name)
            .ok_or_else(|| CacheError::UnknownIndex(name.to_string()))
    }
}

impl<K, V> fmt::Debug for Cache<K, V>
where
    K: Clone + Ord + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("rows", &self.rows)
            .field(
                "indexes",
                &self.indexes.iter().map(Index::name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
