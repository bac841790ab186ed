pub(crate) mod key;
mod record;


use serde::{Deserialize, Serialize};

// re-exports
pub use key::{Key, WideUint};
pub use record::Record;

///
/// Value
///
/// One field of an entity payload.
///
/// Null     → field is absent or explicitly null.
/// List     → the hydrated (or incoming) value of a collection navigation.
/// Record   → the hydrated (or incoming) value of a reference navigation.
///
/// Serialized untagged, so plain JSON payloads decode without wrappers.
/// Integers decode as `Int` first and only fall back to `Uint` above `i64::MAX`.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    List(Vec<Self>),
    Record(Record),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Project this value onto the scalar key space.
    ///
    /// Returns `None` for null, floats and composite values; those can never
    /// act as a primary key or an index value.
    #[must_use]
    pub fn as_key(&self) -> Option<Key> {
        match self {
            Self::Bool(v) => Some(Key::Bool(*v)),
            Self::Int(v) => Some(Key::Int(*v)),
            Self::Uint(v) => Some(Key::from(*v)),
            Self::Text(v) => Some(Key::Text(v.clone())),
            Self::Null | Self::Float(_) | Self::List(_) | Self::Record(_) => None,
        }
    }

    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short label of the variant, used in diagnostics.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Bool(v) => Self::Bool(v),
            Key::Int(v) => Self::Int(v),
            Key::Uint(v) => Self::Uint(v.get()),
            Key::Text(v) => Self::Text(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::Uint(v), Self::Int)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Self::Record(v)
    }
}

impl From<Vec<Record>> for Value {
    fn from(v: Vec<Record>) -> Self {
        Self::List(v.into_iter().map(Self::Record).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
