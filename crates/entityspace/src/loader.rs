//! The boundary to whatever actually fetches data (HTTP client, fixture,
//! another cache). A session calls its loader only on a cache miss.
use entityspace_core::{
    query::Query,
    value::{Key, Record},
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

///
/// LoadError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum LoadError {
    #[error("loading {what} of {entity} is not supported")]
    Unsupported { entity: String, what: String },

    #[error("loading '{entity}' failed: {message}")]
    Failed { entity: String, message: String },
}

impl LoadError {
    pub fn unsupported(query: &Query, what: impl Into<String>) -> Self {
        Self::Unsupported {
            entity: query.entity_name().to_string(),
            what: what.into(),
        }
    }

    pub fn failed(query: &Query, message: impl Into<String>) -> Self {
        Self::Failed {
            entity: query.entity_name().to_string(),
            message: message.into(),
        }
    }
}

///
/// Loader
///
/// One method per selector. Every method defaults to `Unsupported`, so a
/// loader only implements the shapes its backend can serve. Returned
/// records may carry nested navigation values for `query.expansions()`.
///

pub trait Loader {
    fn load_all(&mut self, query: &Query) -> Result<Vec<Record>, LoadError> {
        Err(LoadError::unsupported(query, "all entities"))
    }

    fn load_one(&mut self, query: &Query, _key: &Key) -> Result<Option<Record>, LoadError> {
        Err(LoadError::unsupported(query, "one entity by its primary key"))
    }

    fn load_many(
        &mut self,
        query: &Query,
        _keys: &BTreeSet<Key>,
    ) -> Result<Vec<Record>, LoadError> {
        Err(LoadError::unsupported(
            query,
            "multiple entities by their primary keys",
        ))
    }

    fn load_by_index(
        &mut self,
        query: &Query,
        index: &str,
        _value: &Key,
    ) -> Result<Vec<Record>, LoadError> {
        Err(LoadError::unsupported(
            query,
            format!("multiple entities by their index '{index}'"),
        ))
    }

    fn load_by_indexes(
        &mut self,
        query: &Query,
        _pairs: &BTreeMap<String, Key>,
    ) -> Result<Vec<Record>, LoadError> {
        Err(LoadError::unsupported(
            query,
            "multiple entities by multiple indexes",
        ))
    }
}
