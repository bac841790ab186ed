use crate::value::{Key, key::write_quoted};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display, Write},
};

///
/// QuerySelector
///
/// Which rows of the entity type a query selects.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum QuerySelector {
    All,
    ByKey(Key),
    ByKeys(BTreeSet<Key>),
    ByIndex { index: String, value: Key },

    /// Disjunction: rows matching any of the pairs.
    ByIndexes(BTreeMap<String, Key>),
}

impl QuerySelector {
    /// True if every row selected by `other` is selected by `self`.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        if matches!(self, Self::All) {
            return true;
        }

        match (self.keys(), other.keys()) {
            (Some(mine), Some(theirs)) => return theirs.iter().all(|k| mine.contains(k)),
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => {}
        }

        match (self.pairs(), other.pairs()) {
            (Some(mine), Some(theirs)) => theirs
                .iter()
                .all(|(index, value)| mine.get(index) == Some(value)),
            _ => false,
        }
    }

    fn keys(&self) -> Option<Vec<&Key>> {
        match self {
            Self::ByKey(key) => Some(vec![key]),
            Self::ByKeys(keys) => Some(keys.iter().collect()),
            _ => None,
        }
    }

    fn pairs(&self) -> Option<BTreeMap<&str, &Key>> {
        match self {
            Self::ByIndex { index, value } => Some(BTreeMap::from([(index.as_str(), value)])),
            Self::ByIndexes(pairs) => Some(pairs.iter().map(|(i, v)| (i.as_str(), v)).collect()),
            _ => None,
        }
    }
}

// Canonical rendering: text keys are quoted and index names that are not
// plain identifiers are quoted too, so distinct selectors never render alike.
// Pairs are sorted by their rendered text.
impl Display for QuerySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => Ok(()),
            Self::ByKey(key) => key.write_canonical(f),
            Self::ByKeys(keys) => {
                let rendered: Vec<String> = keys.iter().map(Key::canonical).collect();
                f.write_str(&rendered.join(","))
            }
            Self::ByIndex { index, value } => write_pair(f, index, value),
            Self::ByIndexes(pairs) => {
                let mut rendered: Vec<String> = pairs
                    .iter()
                    .map(|(index, value)| render_pair(index, value))
                    .collect();
                rendered.sort();
                f.write_str(&rendered.join(","))
            }
        }
    }
}

fn render_pair(index: &str, value: &Key) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = write_pair(&mut out, index, value);

    out
}

fn write_pair(out: &mut impl Write, index: &str, value: &Key) -> fmt::Result {
    let plain = !index.is_empty() && index.chars().all(|c| c.is_alphanumeric() || c == '_');
    if plain {
        out.write_str(index)?;
    } else {
        write_quoted(out, index)?;
    }
    out.write_char(':')?;

    value.write_canonical(out)
}
