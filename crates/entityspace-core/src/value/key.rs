use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use std::fmt::{self, Display, Write};

///
/// Key
///
/// Totally ordered scalar used for primary keys and secondary-index values.
/// Comparison is exact: `Int(1)` and `Text("1")` are different keys.
///
/// Unsigned values that fit in `i64` normalize to `Int`; `WideUint` can only
/// hold values above `i64::MAX`, so `1u64` and `1i64` always address the same
/// row.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(untagged)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Uint(WideUint),
    Text(String),
}

impl Key {
    /// Unambiguous rendering used inside canonical query strings: text is
    /// quoted with `\` and `"` escaped, everything else is written bare.
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        // writing to a String cannot fail
        let _ = self.write_canonical(&mut out);

        out
    }

    pub(crate) fn write_canonical(&self, out: &mut impl Write) -> fmt::Result {
        match self {
            Self::Text(v) => write_quoted(out, v),
            other => write!(out, "{other}"),
        }
    }
}

pub(crate) fn write_quoted(out: &mut impl Write, text: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            out.write_char('\\')?;
        }
        out.write_char(c)?;
    }
    out.write_char('"')
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Key {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Key {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Key {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::Uint(WideUint(v)), Self::Int)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

///
/// WideUint
/// An unsigned key above `i64::MAX`. Smaller values are always `Key::Int`.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct WideUint(u64);

impl WideUint {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for WideUint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for WideUint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = u64::deserialize(deserializer)?;
        if i64::try_from(v).is_ok() {
            return Err(D::Error::custom(format!(
                "unsigned key {v} fits in i64 and must be an Int"
            )));
        }

        Ok(Self(v))
    }
}
