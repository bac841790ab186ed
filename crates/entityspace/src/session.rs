use crate::{
    config::SessionConfig,
    error::Error,
    loader::{LoadError, Loader},
};
use entityspace_core::{
    expansion::Expansion,
    model::{EntityModel, Schema},
    obs::sink::{MetricsEvent, MetricsSink, record, with_metrics_sink},
    query::{Query, QuerySelector},
    value::{Key, Record},
    workspace::Workspace,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// Session
///
/// Answers queries from a `Workspace` whenever an executed query already
/// covers them, and goes to the loader otherwise. Loaded payloads are merged
/// into the workspace before the answer is read back out of it.
///

pub struct Session<L: Loader> {
    workspace: Workspace,
    loader: L,
    executed: BTreeMap<String, Query>,
    config: SessionConfig,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl<L: Loader> Session<L> {
    pub fn new(schema: Arc<Schema>, loader: L) -> Result<Self, Error> {
        Self::with_config(schema, loader, SessionConfig::default())
    }

    pub fn with_config(
        schema: Arc<Schema>,
        loader: L,
        config: SessionConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            workspace: Workspace::new(schema)?,
            loader,
            executed: BTreeMap::new(),
            config,
            metrics: None,
        })
    }

    /// Narrate hit/miss decisions for subsequent queries.
    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.config.debug = true;
        self
    }

    /// Override the metrics sink for operations executed through this session.
    #[must_use]
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[must_use]
    pub const fn loader(&self) -> &L {
        &self.loader
    }

    pub const fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    //
    // Query entry points
    //

    pub fn all(&mut self, entity: &str, expansion: &str) -> Result<BTreeMap<Key, Record>, Error> {
        let (model, expansions) = self.resolve(entity, expansion)?;
        let query = Query::all(model, expansions)?;

        self.execute(&query)
    }

    pub fn get(
        &mut self,
        entity: &str,
        key: impl Into<Key>,
        expansion: &str,
    ) -> Result<Option<Record>, Error> {
        let key = key.into();
        let (model, expansions) = self.resolve(entity, expansion)?;
        let query = Query::by_key(model, key.clone(), expansions)?;

        Ok(self.execute(&query)?.remove(&key))
    }

    pub fn get_many<I, K>(
        &mut self,
        entity: &str,
        keys: I,
        expansion: &str,
    ) -> Result<BTreeMap<Key, Record>, Error>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let (model, expansions) = self.resolve(entity, expansion)?;
        let query = Query::by_keys(model, keys, expansions)?;

        self.execute(&query)
    }

    /// Rows matching field filters: none selects everything, one is an index
    /// lookup, several are a union of index lookups.
    pub fn find_where<I, S, K>(
        &mut self,
        entity: &str,
        filters: I,
        expansion: &str,
    ) -> Result<BTreeMap<Key, Record>, Error>
    where
        I: IntoIterator<Item = (S, K)>,
        S: AsRef<str>,
        K: Into<Key>,
    {
        let mut filters: Vec<(S, K)> = filters.into_iter().collect();
        let (model, expansions) = self.resolve(entity, expansion)?;

        let query = match filters.len() {
            0 => Query::all(model, expansions)?,
            1 => {
                let (index, value) = filters.remove(0);
                Query::by_index(model, index.as_ref(), value, expansions)?
            }
            _ => Query::by_indexes(model, filters, expansions)?,
        };

        self.execute(&query)
    }

    /// Answer `query` from the workspace, loading first on a cache miss.
    pub fn execute(&mut self, query: &Query) -> Result<BTreeMap<Key, Record>, Error> {
        match self.metrics.clone() {
            Some(sink) => with_metrics_sink(sink, || self.execute_inner(query)),
            None => self.execute_inner(query),
        }
    }

    //
    // Executed-query log
    //

    /// The executed query that covers `query`, if any.
    #[must_use]
    pub fn covering(&self, query: &Query) -> Option<&Query> {
        self.executed
            .get(query.canonical())
            .or_else(|| self.executed.values().find(|q| q.is_superset_of(query)))
    }

    #[must_use]
    pub fn is_cached(&self, query: &Query) -> bool {
        self.covering(query).is_some()
    }

    pub fn executed(&self) -> impl Iterator<Item = &Query> {
        self.executed.values()
    }

    /// Drop `query` from the executed log; cached rows stay.
    pub fn forget(&mut self, query: &Query) -> bool {
        self.executed.remove(query.canonical()).is_some()
    }

    pub fn clear_executed(&mut self) {
        self.executed.clear();
    }

    //
    // Internals
    //

    fn execute_inner(&mut self, query: &Query) -> Result<BTreeMap<Key, Record>, Error> {
        let entity = query.entity_name();

        if let Some(covering) = self.covering(query) {
            record(MetricsEvent::SessionHit { entity });
            if self.config.debug {
                tracing::debug!(query = %query, covered_by = %covering, "cache hit");
            }

            return Ok(self.workspace.execute(query)?);
        }

        record(MetricsEvent::SessionMiss { entity });
        if self.config.debug {
            tracing::debug!(query = %query, "cache miss, loading");
        }

        let loaded = self.load(query)?;
        self.merge(query, &loaded)?;
        self.executed.insert(query.canonical().to_string(), query.clone());

        Ok(self.workspace.execute(query)?)
    }

    fn load(&mut self, query: &Query) -> Result<Vec<Record>, LoadError> {
        match query.selector() {
            QuerySelector::All => self.loader.load_all(query),
            QuerySelector::ByKey(key) => {
                Ok(self.loader.load_one(query, key)?.into_iter().collect())
            }
            QuerySelector::ByKeys(keys) => self.loader.load_many(query, keys),
            QuerySelector::ByIndex { index, value } => {
                self.loader.load_by_index(query, index, value)
            }
            QuerySelector::ByIndexes(pairs) => self.loader.load_by_indexes(query, pairs),
        }
    }

    // Per-item failures are skipped unless the merge is strict.
    fn merge(&mut self, query: &Query, loaded: &[Record]) -> Result<(), Error> {
        let primary_key = self
            .workspace
            .schema()
            .entity(query.entity())?
            .primary_key()
            .to_string();

        for item in loaded {
            let Err(err) = self
                .workspace
                .add(query.entity(), item, query.expansions())
            else {
                continue;
            };

            if self.config.strict_merge {
                return Err(err.into());
            }

            record(MetricsEvent::MergeFailure {
                entity: query.entity_name(),
            });
            tracing::warn!(
                query = %query,
                key = ?item.key(&primary_key),
                error = %err,
                "failed adding part of payload"
            );
        }

        Ok(())
    }

    fn resolve(
        &self,
        entity: &str,
        expansion: &str,
    ) -> Result<(&EntityModel, Vec<Expansion>), Error> {
        let schema = self.workspace.schema();
        let model = schema.entity_by_name(entity)?;
        let expansions = Expansion::parse_with(schema, model.id(), expansion, &self.config.core)?;

        Ok((model, expansions))
    }
}
