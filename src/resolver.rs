use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use uuid::Uuid;

use crate::annotation::{self, Endpoint, LinkType};
use crate::cache::RecordCache;
use crate::config::{FailurePolicy, ResolverSettings};
use crate::domain::{LocalKey, PersistentId, Registry};
use crate::error::TaxaError;
use crate::node::{Dataset, NameUsageNode, UsagePayload, VernacularName};
use crate::query::split_literals;
use crate::record::{NameUsageRecord, SearchResultRecord, SuggestResultRecord, VernacularRecord};
use crate::source::DataSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub remote_fetches: u64,
    pub cache_hits: u64,
    pub transport_failures: u64,
    pub skipped_keys: u64,
}

#[derive(Default)]
struct Counters {
    remote_fetches: AtomicU64,
    cache_hits: AtomicU64,
    transport_failures: AtomicU64,
    skipped_keys: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct Resolver<S: DataSource> {
    source: S,
    cache: Arc<RecordCache>,
    settings: ResolverSettings,
    counters: Counters,
}

impl<S: DataSource> Resolver<S> {
    pub fn new(source: S, settings: ResolverSettings) -> Self {
        let cache = Arc::new(RecordCache::new(source.registry()));
        Self::with_cache(source, cache, settings)
    }

    pub fn with_cache(source: S, cache: Arc<RecordCache>, settings: ResolverSettings) -> Self {
        Self {
            source,
            cache,
            settings,
            counters: Counters::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn registry(&self) -> Registry {
        self.cache.registry()
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            remote_fetches: self.counters.remote_fetches.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            transport_failures: self.counters.transport_failures.load(Ordering::Relaxed),
            skipped_keys: self.counters.skipped_keys.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    /// `Ok(None)` means the call failed in transport and the failure was tolerated.
    pub(crate) fn remote<T, F>(&self, what: &str, call: F) -> Result<Option<T>, TaxaError>
    where
        F: FnOnce(&S) -> Result<T, TaxaError>,
    {
        Counters::bump(&self.counters.remote_fetches);
        tracing::debug!(registry = %self.registry(), what, "remote fetch");
        match call(&self.source) {
            Ok(value) => Ok(Some(value)),
            Err(err)
                if err.is_transport() && self.settings.failure_policy == FailurePolicy::Tolerate =>
            {
                Counters::bump(&self.counters.transport_failures);
                tracing::warn!(registry = %self.registry(), what, error = %err, "remote call failed, treating as absent");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub(crate) fn remote_list<T, F>(&self, what: &str, call: F) -> Result<Vec<T>, TaxaError>
    where
        F: FnOnce(&S) -> Result<Vec<T>, TaxaError>,
    {
        Ok(self.remote(what, call)?.unwrap_or_default())
    }

    pub(crate) fn note_cache_hit(&self, key: LocalKey) {
        Counters::bump(&self.counters.cache_hits);
        tracing::trace!(registry = %self.registry(), %key, "cache hit");
    }

    fn skip_key(&self, token: &str, err: &TaxaError) {
        Counters::bump(&self.counters.skipped_keys);
        tracing::warn!(token, error = %err, "skipping malformed key");
    }

    pub fn resolve_record(&self, record: NameUsageRecord) -> Result<Arc<NameUsageNode>, TaxaError> {
        let node = self.cache.nominal(record.key);
        let outcome = node.merge(UsagePayload::Record(record));
        if outcome.became_resolved {
            self.after_merge(&node)?;
        }
        Ok(node)
    }

    pub fn resolve_search_result(
        &self,
        record: SearchResultRecord,
    ) -> Result<Arc<NameUsageNode>, TaxaError> {
        let node = self.cache.nominal(record.usage.key);
        let embedded = record.vernacular_names.clone();
        node.merge(UsagePayload::Search(record));
        if self.settings.include_vernaculars && !embedded.is_empty() && node.claim_vernaculars() {
            self.link_vernaculars(&node, &embedded);
        }
        self.attach_dataset(&node)?;
        Ok(node)
    }

    pub fn resolve_suggest_result(&self, record: SuggestResultRecord) -> Arc<NameUsageNode> {
        let node = self.cache.nominal(record.key);
        node.merge(UsagePayload::Suggest(record));
        node
    }

    pub fn resolve_key(&self, key: LocalKey) -> Result<Option<Arc<NameUsageNode>>, TaxaError> {
        if let Some(node) = self.cache.node(key).filter(|node| node.is_resolved()) {
            self.note_cache_hit(key);
            return Ok(Some(node));
        }

        let mut fresh = false;
        let resolved = self.cache.nodes().single_flight(&key, || -> Result<_, TaxaError> {
            if let Some(node) = self.cache.node(key).filter(|node| node.is_resolved()) {
                self.note_cache_hit(key);
                return Ok(Some(node));
            }
            let record = self
                .remote(&format!("usage {key}"), |source| source.get_by_key(key))?
                .flatten();
            let Some(record) = record else {
                tracing::debug!(registry = %self.registry(), %key, "name usage not found");
                return Ok(None);
            };
            if record.key != key {
                tracing::debug!(requested = %key, returned = %record.key, "registry returned a different key");
            }
            let node = self.cache.nominal(key);
            fresh = node.merge(UsagePayload::Record(record)).became_resolved;
            Ok(Some(node))
        })?;

        if fresh && let Some(node) = &resolved {
            self.after_merge(node)?;
        }
        Ok(resolved)
    }

    pub fn resolve_keys(&self, keys: &str) -> Result<Vec<Arc<NameUsageNode>>, TaxaError> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for token in split_literals(keys, &self.settings.delimiter) {
            let resolved = if token.starts_with("urn:") {
                match PersistentId::parse(&token) {
                    Ok(id) => self.resolve_persistent_id(&id)?,
                    Err(err) => {
                        self.skip_key(&token, &err);
                        continue;
                    }
                }
            } else {
                match token.parse::<LocalKey>() {
                    Ok(key) => self.resolve_key(key)?,
                    Err(err) => {
                        self.skip_key(&token, &err);
                        continue;
                    }
                }
            };
            if let Some(node) = resolved
                && seen.insert(node.key())
            {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    pub fn resolve_persistent_id(
        &self,
        id: &PersistentId,
    ) -> Result<Option<Arc<NameUsageNode>>, TaxaError> {
        let PersistentId::Usage {
            registry,
            key,
            senior,
        } = *id
        else {
            tracing::debug!(%id, "namebank ids do not name a usage");
            return Ok(None);
        };
        if registry != self.registry() {
            tracing::debug!(%id, registry = %self.registry(), "persistent id belongs to another registry");
            return Ok(None);
        }
        let Some(node) = self.resolve_key(key)? else {
            return Ok(None);
        };
        if let Some(senior) = senior
            && let Some(senior) = self.resolve_key(senior)?
        {
            node.set_senior(&senior);
        }
        Ok(Some(node))
    }

    pub fn higher(&self, node: &Arc<NameUsageNode>) -> Result<Option<Arc<NameUsageNode>>, TaxaError> {
        if let Some(parent) = node.higher() {
            return Ok(Some(parent));
        }
        let Some(parent_key) = node.parent_key() else {
            return Ok(None);
        };
        let parent = self.resolve_key(parent_key)?;
        if let Some(parent) = &parent {
            node.set_higher(parent);
        }
        Ok(parent)
    }

    pub fn accepted(&self, node: &Arc<NameUsageNode>) -> Result<Option<Arc<NameUsageNode>>, TaxaError> {
        let Some(key) = node.accepted_key().filter(|key| *key != node.key()) else {
            return Ok(None);
        };
        let accepted = self.resolve_key(key)?;
        if let Some(accepted) = &accepted
            && node.is_synonym()
        {
            node.set_senior(accepted);
        }
        Ok(accepted)
    }

    pub fn basionym(&self, node: &Arc<NameUsageNode>) -> Result<Option<Arc<NameUsageNode>>, TaxaError> {
        match node.basionym_key().filter(|key| *key != node.key()) {
            Some(key) => self.resolve_key(key),
            None => Ok(None),
        }
    }

    pub fn related(&self, node: &Arc<NameUsageNode>) -> Result<Vec<Arc<NameUsageNode>>, TaxaError> {
        let key = node.key();
        self.remote_list(&format!("related {key}"), |source| source.list_related(key))?
            .into_iter()
            .filter(|record| record.key != key)
            .map(|record| self.resolve_record(record))
            .collect()
    }

    pub fn dataset(&self, key: Uuid) -> Result<Option<Arc<Dataset>>, TaxaError> {
        if let Some(dataset) = self.cache.datasets().get(&key) {
            Counters::bump(&self.counters.cache_hits);
            return Ok(Some(dataset));
        }
        self.cache.datasets().get_or_fetch(key, || {
            let record = self
                .remote(&format!("dataset {key}"), |source| source.get_dataset(key))?
                .flatten();
            Ok(record.map(|record| Arc::new(Dataset::from(record))))
        })
    }

    pub fn vernaculars(&self, node: &Arc<NameUsageNode>) -> Vec<Arc<VernacularName>> {
        let mut names: Vec<Arc<VernacularName>> = Vec::new();
        for annotation in node.annotations_of(LinkType::Vernacular) {
            for endpoint in annotation.counterparts(node) {
                if let Some(name) = endpoint.as_vernacular()
                    && !names.iter().any(|known| Arc::ptr_eq(known, name))
                {
                    names.push(Arc::clone(name));
                }
            }
        }
        names
    }

    pub(crate) fn ensure_vernaculars(&self, node: &Arc<NameUsageNode>) -> Result<(), TaxaError> {
        if !self.settings.include_vernaculars || !node.claim_vernaculars() {
            return Ok(());
        }
        let key = node.key();
        match self.remote(&format!("vernacular names {key}"), |source| {
            source.get_vernacular_names(key)
        }) {
            Ok(Some(records)) => {
                self.link_vernaculars(node, &records);
                Ok(())
            }
            Ok(None) => {
                node.unclaim_vernaculars();
                Ok(())
            }
            Err(err) => {
                node.unclaim_vernaculars();
                Err(err)
            }
        }
    }

    fn after_merge(&self, node: &Arc<NameUsageNode>) -> Result<(), TaxaError> {
        self.attach_dataset(node)?;
        self.ensure_vernaculars(node)
    }

    fn attach_dataset(&self, node: &Arc<NameUsageNode>) -> Result<(), TaxaError> {
        if !self.settings.resolve_datasets || node.dataset().is_some() {
            return Ok(());
        }
        if let Some(key) = node.dataset_key()
            && let Some(dataset) = self.dataset(key)?
        {
            node.attach_dataset(dataset);
        }
        Ok(())
    }

    fn link_vernaculars(&self, node: &Arc<NameUsageNode>, records: &[VernacularRecord]) {
        let mut names: Vec<Arc<VernacularName>> = Vec::new();
        for record in records {
            if record.vernacular_name.trim().is_empty() {
                continue;
            }
            let name = self.cache.vernacular(record);
            if !names.iter().any(|known| Arc::ptr_eq(known, &name)) {
                names.push(name);
            }
        }
        if names.is_empty() {
            return;
        }
        annotation::link(
            LinkType::Vernacular,
            vec![Endpoint::from(Arc::clone(node))],
            names.into_iter().map(Endpoint::from).collect(),
        );
    }
}
