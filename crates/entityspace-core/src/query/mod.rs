//! Typed request descriptions with a superset ordering used to decide
//! whether a request is already answered by cached data.
mod selector;

#[cfg(test)]
mod tests;

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    expansion::{self, Expansion, Extraction},
    model::{EntityId, EntityModel, NavigationModel},
    value::Key,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display},
    sync::{Arc, OnceLock},
};
use thiserror::Error as ThisError;

// re-exports
pub use selector::QuerySelector;

///
/// QueryError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("by-indexes query on '{entity}' needs at least one index")]
    EmptyIndexes { entity: String },

    #[error("'{field}' is not an index field of '{entity}'")]
    UnknownIndexField { entity: String, field: String },

    #[error("index '{field}' given more than once for '{entity}'")]
    DuplicateIndex { entity: String, field: String },

    #[error("expansion '{expansion}' does not start at '{entity}'")]
    ForeignExpansion { entity: String, expansion: String },
}

impl From<QueryError> for InternalError {
    fn from(err: QueryError) -> Self {
        Self::new(ErrorClass::Invalid, ErrorOrigin::Query, err.to_string())
    }
}

///
/// Query
///
/// Immutable description of a read: entity type, row selection and the
/// expansions to hydrate. Two queries are equal iff their canonical strings
/// are equal, which holds exactly when entity, selector and expansions match.
/// One-key `by_keys` and one-pair `by_indexes` collapse to their single forms.
///

#[derive(Clone, Debug)]
pub struct Query {
    entity: EntityId,
    entity_name: String,
    selector: QuerySelector,
    expansions: Vec<Expansion>,
    canonical: OnceLock<String>,
}

impl Query {
    pub fn all(model: &EntityModel, expansions: Vec<Expansion>) -> Result<Self, QueryError> {
        Self::build(model, QuerySelector::All, expansions)
    }

    pub fn by_key(
        model: &EntityModel,
        key: impl Into<Key>,
        expansions: Vec<Expansion>,
    ) -> Result<Self, QueryError> {
        Self::build(model, QuerySelector::ByKey(key.into()), expansions)
    }

    pub fn by_keys<I, K>(
        model: &EntityModel,
        keys: I,
        expansions: Vec<Expansion>,
    ) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let mut keys: BTreeSet<Key> = keys.into_iter().map(Into::into).collect();

        // a single key selects exactly what by-key selects
        let selector = match (keys.len(), keys.pop_first()) {
            (1, Some(key)) => QuerySelector::ByKey(key),
            (_, first) => {
                keys.extend(first);
                QuerySelector::ByKeys(keys)
            }
        };

        Self::build(model, selector, expansions)
    }

    /// Rows whose `index` field equals `value`. `index` must name the primary
    /// key, a primitive or a foreign key of `model`.
    pub fn by_index(
        model: &EntityModel,
        index: &str,
        value: impl Into<Key>,
        expansions: Vec<Expansion>,
    ) -> Result<Self, QueryError> {
        let index = resolve_index(model, index)?;

        Self::build(
            model,
            QuerySelector::ByIndex {
                index,
                value: value.into(),
            },
            expansions,
        )
    }

    /// Rows matching any of the `(index, value)` pairs. A single pair builds
    /// the same query as `by_index`.
    pub fn by_indexes<I, S, K>(
        model: &EntityModel,
        pairs: I,
        expansions: Vec<Expansion>,
    ) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (S, K)>,
        S: AsRef<str>,
        K: Into<Key>,
    {
        let mut map = BTreeMap::new();

        for (index, value) in pairs {
            let index = resolve_index(model, index.as_ref())?;
            if map.contains_key(&index) {
                return Err(QueryError::DuplicateIndex {
                    entity: model.name().to_string(),
                    field: index,
                });
            }
            map.insert(index, value.into());
        }

        let selector = match (map.len(), map.pop_first()) {
            (_, None) => {
                return Err(QueryError::EmptyIndexes {
                    entity: model.name().to_string(),
                });
            }
            (1, Some((index, value))) => QuerySelector::ByIndex { index, value },
            (_, Some((index, value))) => {
                map.insert(index, value);
                QuerySelector::ByIndexes(map)
            }
        };

        Self::build(model, selector, expansions)
    }

    fn build(
        model: &EntityModel,
        selector: QuerySelector,
        expansions: Vec<Expansion>,
    ) -> Result<Self, QueryError> {
        if let Some(foreign) = expansions
            .iter()
            .find(|exp| exp.property().owner != model.id())
        {
            return Err(QueryError::ForeignExpansion {
                entity: model.name().to_string(),
                expansion: foreign.to_string(),
            });
        }

        Ok(Self::from_parts(
            model.id(),
            model.name().to_string(),
            selector,
            expansions,
        ))
    }

    fn from_parts(
        entity: EntityId,
        entity_name: String,
        selector: QuerySelector,
        expansions: Vec<Expansion>,
    ) -> Self {
        Self {
            entity,
            entity_name,
            selector,
            expansions: expansion::normalize(expansions),
            canonical: OnceLock::new(),
        }
    }

    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    #[must_use]
    pub const fn selector(&self) -> &QuerySelector {
        &self.selector
    }

    #[must_use]
    pub fn expansions(&self) -> &[Expansion] {
        &self.expansions
    }

    #[must_use]
    pub fn canonical(&self) -> &str {
        self.canonical.get_or_init(|| {
            let mut out = self.entity_name.clone();
            if !matches!(self.selector, QuerySelector::All) {
                out.push('(');
                out.push_str(&self.selector.to_string());
                out.push(')');
            }
            if !self.expansions.is_empty() {
                out.push('/');
                out.push_str(&expansion::render_all(&self.expansions));
            }
            out
        })
    }

    /// True if answering `self` also answers `other`.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        self.entity == other.entity
            && self.selector.covers(&other.selector)
            && Expansion::is_superset_all(&self.expansions, &other.expansions)
    }

    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        other.is_superset_of(self)
    }

    /// Same selection with every expansion on `props` cut out.
    /// Top-level cuts carry no path.
    #[must_use]
    pub fn extract(&self, props: &[Arc<NavigationModel>]) -> (Self, Vec<Extraction>) {
        let (reduced, extractions) = expansion::extract_all(&self.expansions, props);
        let query = Self::from_parts(
            self.entity,
            self.entity_name.clone(),
            self.selector.clone(),
            reduced,
        );

        (query, extractions)
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Query {}

impl Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

fn resolve_index(model: &EntityModel, index: &str) -> Result<String, QueryError> {
    model
        .resolve_index_field(index)
        .map(ToString::to_string)
        .ok_or_else(|| QueryError::UnknownIndexField {
            entity: model.name().to_string(),
            field: index.to_string(),
        })
}
