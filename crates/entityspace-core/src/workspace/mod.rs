//! The normalized store: one cache per entity type, fed by decomposing
//! incoming graphs and read back by rehydrating rows along an expansion.
//!
//! Rows reference rows by key only, so cyclic graphs are never materialized;
//! a read rebuilds as much of a cycle as its expansion asks for.
mod hydrate;
mod merge;


use crate::{
    cache::{Cache, CacheError, Getter},
    error::{ErrorClass, ErrorOrigin, InternalError},
    expansion::Expansion,
    model::{EntityId, EntityModel, Schema, SchemaError},
    obs::sink::{MetricsEvent, record},
    query::{Query, QuerySelector},
    value::{Key, Record},
};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error as ThisError;

///
/// WorkspaceError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum WorkspaceError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{entity}: {source}")]
    Cache { entity: String, source: CacheError },

    #[error("navigation '{entity}.{navigation}' expects {expected}, found {found}")]
    MalformedNavigation {
        entity: String,
        navigation: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("expansion '{expansion}' does not start at '{entity}'")]
    ForeignExpansion { entity: String, expansion: String },
}

impl From<WorkspaceError> for InternalError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::Schema(inner) => inner.into(),
            WorkspaceError::Cache { ref source, .. } => {
                let class = Self::from(source.clone()).class;
                Self::new(class, ErrorOrigin::Cache, err.to_string())
            }
            WorkspaceError::MalformedNavigation { .. } | WorkspaceError::ForeignExpansion { .. } => {
                Self::new(ErrorClass::Invalid, ErrorOrigin::Workspace, err.to_string())
            }
        }
    }
}

///
/// Workspace
///
/// Exclusively owns one `Cache` per registered entity type. Writes take
/// `&mut self` and reads take `&self`; every read returns deep copies.
///

pub struct Workspace {
    schema: Arc<Schema>,
    caches: Vec<Cache<Key, Record>>,
}

impl Workspace {
    /// Build an empty workspace with a cache (and its indexes) for every
    /// type in `schema`.
    pub fn new(schema: Arc<Schema>) -> Result<Self, WorkspaceError> {
        let caches = schema
            .iter()
            .map(build_cache)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { schema, caches })
    }

    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    //
    // Writes
    //

    /// Store `payload` and every related record reachable along `expansions`.
    /// Returns the primary key of `payload`.
    pub fn add(
        &mut self,
        entity: EntityId,
        payload: &Record,
        expansions: &[Expansion],
    ) -> Result<Key, WorkspaceError> {
        merge::add(self, entity, payload, expansions)
    }

    /// Drop one row and its index memberships. Related rows are untouched.
    pub fn remove(
        &mut self,
        entity: EntityId,
        key: &Key,
    ) -> Result<Option<Record>, WorkspaceError> {
        let name = self.schema.entity(entity)?.name().to_string();
        let Some((row, delta)) = self.cache_mut(entity)?.remove(key) else {
            return Ok(None);
        };

        record(MetricsEvent::RowRemoved { entity: &name });
        record(MetricsEvent::IndexDelta {
            entity: &name,
            inserts: delta.inserts,
            removes: delta.removes,
        });
        tracing::trace!(entity = %name, %key, "removed row");

        Ok(Some(row))
    }

    //
    // Reads
    //

    pub fn get(
        &self,
        entity: EntityId,
        key: &Key,
        expansions: &[Expansion],
    ) -> Result<Option<Record>, WorkspaceError> {
        let mut rows = self.read(entity, false, |cache| {
            Ok(cache
                .get(key)
                .map(|row| BTreeMap::from([(key.clone(), row.clone())]))
                .unwrap_or_default())
        })?;
        self.hydrate(entity, &mut rows, expansions)?;

        Ok(rows.into_values().next())
    }

    pub fn get_many<'a>(
        &self,
        entity: EntityId,
        keys: impl IntoIterator<Item = &'a Key>,
        expansions: &[Expansion],
    ) -> Result<BTreeMap<Key, Record>, WorkspaceError> {
        let mut rows = self.read(entity, false, |cache| Ok(cache.get_many(keys)))?;
        self.hydrate(entity, &mut rows, expansions)?;

        Ok(rows)
    }

    pub fn all(
        &self,
        entity: EntityId,
        expansions: &[Expansion],
    ) -> Result<BTreeMap<Key, Record>, WorkspaceError> {
        let mut rows = self.read(entity, false, |cache| Ok(cache.all()))?;
        self.hydrate(entity, &mut rows, expansions)?;

        Ok(rows)
    }

    /// Rows whose `index` field equals `value`. The primary key may be used
    /// as an index; any other field must be a declared index.
    pub fn by_index(
        &self,
        entity: EntityId,
        index: &str,
        value: &Key,
        expansions: &[Expansion],
    ) -> Result<BTreeMap<Key, Record>, WorkspaceError> {
        let mut rows = self.select_by_index(entity, index, value, false)?;
        self.hydrate(entity, &mut rows, expansions)?;

        Ok(rows)
    }

    /// Rows matching any of the `(index, value)` pairs.
    pub fn by_indexes<'a>(
        &self,
        entity: EntityId,
        pairs: impl IntoIterator<Item = (&'a str, &'a Key)>,
        expansions: &[Expansion],
    ) -> Result<BTreeMap<Key, Record>, WorkspaceError> {
        let model = self.schema.entity(entity)?;
        let mut rows = BTreeMap::new();

        for (index, value) in pairs {
            let found = if is_primary_key(model, index) {
                self.cache(entity)?.get_many([value])
            } else {
                self.cache(entity)?
                    .by_index(&declared(model, index), value)
                    .map_err(|source| cache_error(model, source))?
            };
            rows.extend(found);
        }

        record(MetricsEvent::Read {
            entity: model.name(),
            rows: rows.len() as u64,
            nested: false,
        });
        self.hydrate(entity, &mut rows, expansions)?;

        Ok(rows)
    }

    /// Answer a query from cached rows.
    pub fn execute(&self, query: &Query) -> Result<BTreeMap<Key, Record>, WorkspaceError> {
        let entity = query.entity();
        let expansions = query.expansions();

        match query.selector() {
            QuerySelector::All => self.all(entity, expansions),
            QuerySelector::ByKey(key) => Ok(self
                .get(entity, key, expansions)?
                .map(|row| BTreeMap::from([(key.clone(), row)]))
                .unwrap_or_default()),
            QuerySelector::ByKeys(keys) => self.get_many(entity, keys, expansions),
            QuerySelector::ByIndex { index, value } => {
                self.by_index(entity, index, value, expansions)
            }
            QuerySelector::ByIndexes(pairs) => self.by_indexes(
                entity,
                pairs.iter().map(|(index, value)| (index.as_str(), value)),
                expansions,
            ),
        }
    }

    /// Number of rows stored for `entity`.
    pub fn len(&self, entity: EntityId) -> Result<usize, WorkspaceError> {
        Ok(self.cache(entity)?.len())
    }

    //
    // Internals
    //

    // Handles are checked against the schema before they pick a cache slot.
    fn cache(&self, entity: EntityId) -> Result<&Cache<Key, Record>, WorkspaceError> {
        self.schema.entity(entity)?;
        self.caches
            .get(entity.index())
            .ok_or_else(|| SchemaError::UnknownEntity(entity.to_string()).into())
    }

    fn cache_mut(&mut self, entity: EntityId) -> Result<&mut Cache<Key, Record>, WorkspaceError> {
        self.schema.entity(entity)?;
        self.caches
            .get_mut(entity.index())
            .ok_or_else(|| SchemaError::UnknownEntity(entity.to_string()).into())
    }

    // Run one cache read and report it.
    fn read(
        &self,
        entity: EntityId,
        nested: bool,
        f: impl FnOnce(&Cache<Key, Record>) -> Result<BTreeMap<Key, Record>, CacheError>,
    ) -> Result<BTreeMap<Key, Record>, WorkspaceError> {
        let model = self.schema.entity(entity)?;
        let rows = f(self.cache(entity)?).map_err(|source| cache_error(model, source))?;

        record(MetricsEvent::Read {
            entity: model.name(),
            rows: rows.len() as u64,
            nested,
        });

        Ok(rows)
    }

    fn select_by_index(
        &self,
        entity: EntityId,
        index: &str,
        value: &Key,
        nested: bool,
    ) -> Result<BTreeMap<Key, Record>, WorkspaceError> {
        let model = self.schema.entity(entity)?;

        if is_primary_key(model, index) {
            return self.read(entity, nested, |cache| Ok(cache.get_many([value])));
        }

        let index = declared(model, index);
        self.read(entity, nested, |cache| cache.by_index(&index, value))
    }
}

fn build_cache(model: &EntityModel) -> Result<Cache<Key, Record>, WorkspaceError> {
    let mut cache = Cache::new(field_getter(model.primary_key()));

    for field in model.index_fields() {
        cache = cache
            .with_index(field, field_getter(field))
            .map_err(|source| cache_error(model, source))?;
    }

    Ok(cache)
}

fn field_getter(field: &str) -> Getter<Key, Record> {
    let field = field.to_string();

    Box::new(move |row: &Record| row.key(&field))
}

fn cache_error(model: &EntityModel, source: CacheError) -> WorkspaceError {
    WorkspaceError::Cache {
        entity: model.name().to_string(),
        source,
    }
}

fn is_primary_key(model: &EntityModel, field: &str) -> bool {
    model.primary_key().eq_ignore_ascii_case(field)
}

// Declared spelling of an index field, or the name as given when unknown
// (the cache then reports the missing index).
fn declared(model: &EntityModel, field: &str) -> String {
    model
        .resolve_index_field(field)
        .unwrap_or(field)
        .to_string()
}

fn check_owner(model: &EntityModel, expansion: &Expansion) -> Result<(), WorkspaceError> {
    if expansion.property().owner == model.id() {
        Ok(())
    } else {
        Err(WorkspaceError::ForeignExpansion {
            entity: model.name().to_string(),
            expansion: expansion.to_string(),
        })
    }
}
