use crate::value::{Key, Value};
use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Record
///
/// One entity payload: field name → value. Incoming records may carry
/// nested navigation values; stored rows never do.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Read a field as a key; `None` when absent, null or not key-like.
    #[must_use]
    pub fn key(&self, field: &str) -> Option<Key> {
        self.0.get(field).and_then(Value::as_key)
    }

    /// Copy only the named fields that are present.
    #[must_use]
    pub fn project<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Self {
        let mut out = Self::new();
        for field in fields {
            if let Some(value) = self.0.get(field) {
                out.0.insert(field.to_string(), value.clone());
            }
        }

        out
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
