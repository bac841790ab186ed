use crate::cache::Getter;
use std::collections::{BTreeMap, BTreeSet};

///
/// IndexDelta
/// Bucket memberships touched by one index update.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IndexDelta {
    pub inserts: u64,
    pub removes: u64,
}

impl IndexDelta {
    pub(crate) const fn merge(&mut self, other: Self) {
        self.inserts = self.inserts.saturating_add(other.inserts);
        self.removes = self.removes.saturating_add(other.removes);
    }
}

///
/// Index
///
/// Secondary index: index value -> primary keys of the rows holding it.
/// Rows whose value is absent are not indexed.
///

pub(crate) struct Index<K, V> {
    name: String,
    value_of: Getter<K, V>,
    buckets: BTreeMap<K, BTreeSet<K>>,
}

impl<K: Clone + Ord, V> Index<K, V> {
    pub(crate) fn new(name: String, value_of: Getter<K, V>) -> Self {
        Self {
            name,
            value_of,
            buckets: BTreeMap::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn bucket(&self, value: &K) -> Option<&BTreeSet<K>> {
        self.buckets.get(value)
    }

    pub(crate) fn buckets(&self) -> &BTreeMap<K, BTreeSet<K>> {
        &self.buckets
    }

    /// Move `key` from the bucket of `old` (if any) into the bucket of `new`.
    /// Both rows must carry `key`; the cache checks that before calling.
    pub(crate) fn update(&mut self, key: &K, new: &V, old: Option<&V>) -> IndexDelta {
        let mut delta = IndexDelta::default();

        if let Some(value) = old.and_then(|old| (self.value_of)(old))
            && self.detach(&value, key)
        {
            delta.removes += 1;
        }

        if let Some(value) = (self.value_of)(new)
            && self.buckets.entry(value).or_default().insert(key.clone())
        {
            delta.inserts += 1;
        }

        delta
    }

    /// Drop `key` from whichever bucket `row` places it in.
    pub(crate) fn unlink(&mut self, key: &K, row: &V) -> IndexDelta {
        match (self.value_of)(row) {
            Some(value) if self.detach(&value, key) => IndexDelta {
                inserts: 0,
                removes: 1,
            },
            _ => IndexDelta::default(),
        }
    }

    /// Forget every membership for `value`; returns how many were dropped.
    pub(crate) fn clear(&mut self, value: &K) -> usize {
        self.buckets.remove(value).map_or(0, |bucket| bucket.len())
    }

    fn detach(&mut self, value: &K, key: &K) -> bool {
        let Some(bucket) = self.buckets.get_mut(value) else {
            return false;
        };

        let removed = bucket.remove(key);
        if bucket.is_empty() {
            self.buckets.remove(value);
        }

        removed
    }
}
