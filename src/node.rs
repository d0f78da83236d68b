use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::annotation::{Annotation, LinkType};
use crate::domain::{LocalKey, PersistentId, Registry, TaxonomicStatus};
use crate::rank::Rank;
use crate::record::{
    DatasetRecord, NameUsageRecord, SearchResultRecord, SuggestResultRecord, VernacularRecord,
};

#[derive(Debug, Clone)]
pub enum UsagePayload {
    Record(NameUsageRecord),
    Search(SearchResultRecord),
    Suggest(SuggestResultRecord),
}

impl UsagePayload {
    pub fn key(&self) -> LocalKey {
        match self {
            UsagePayload::Record(record) => record.key,
            UsagePayload::Search(record) => record.usage.key,
            UsagePayload::Suggest(record) => record.key,
        }
    }

    fn fields(&self) -> PayloadFields<'_> {
        match self {
            UsagePayload::Record(record) => PayloadFields::from_usage(record),
            UsagePayload::Search(record) => PayloadFields::from_usage(&record.usage),
            UsagePayload::Suggest(record) => PayloadFields {
                canonical_name: record.canonical_name.as_deref(),
                scientific_name: record.scientific_name.as_deref(),
                legacy_name: None,
                rank: record.rank.as_deref(),
                status: record.status.as_deref(),
                synonym: None,
                authorship: None,
                parent_key: record.parent_key,
                accepted_key: None,
                basionym_key: None,
                nub_key: record.nub_key,
                dataset_key: None,
                num_descendants: None,
                remarks: None,
            },
        }
    }
}

struct PayloadFields<'a> {
    canonical_name: Option<&'a str>,
    scientific_name: Option<&'a str>,
    legacy_name: Option<&'a str>,
    rank: Option<&'a str>,
    status: Option<&'a str>,
    synonym: Option<bool>,
    authorship: Option<&'a str>,
    parent_key: Option<LocalKey>,
    accepted_key: Option<LocalKey>,
    basionym_key: Option<LocalKey>,
    nub_key: Option<LocalKey>,
    dataset_key: Option<Uuid>,
    num_descendants: Option<u32>,
    remarks: Option<&'a str>,
}

impl<'a> PayloadFields<'a> {
    fn from_usage(record: &'a NameUsageRecord) -> Self {
        Self {
            canonical_name: record.canonical_name.as_deref(),
            scientific_name: record.scientific_name.as_deref(),
            legacy_name: record.name.as_deref(),
            rank: record.rank.as_deref(),
            status: record.taxonomic_status.as_deref(),
            synonym: record.synonym,
            authorship: record.authorship.as_deref(),
            parent_key: record.parent_key,
            accepted_key: record.accepted_key,
            basionym_key: record.basionym_key,
            nub_key: record.nub_key,
            dataset_key: record.dataset_key,
            num_descendants: record.num_descendants,
            remarks: record.remarks.as_deref(),
        }
    }

    fn literal(&self) -> Option<&'a str> {
        [self.canonical_name, self.scientific_name, self.legacy_name]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    fn status(&self) -> Option<TaxonomicStatus> {
        self.status
            .and_then(TaxonomicStatus::from_marker)
            .or(match self.synonym {
                Some(true) => Some(TaxonomicStatus::Synonym),
                Some(false) => Some(TaxonomicStatus::Accepted),
                None => None,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub was_nominal: bool,
    pub became_resolved: bool,
}

#[derive(Default)]
struct NodeState {
    literal: Option<String>,
    rank: Option<Rank>,
    authority: Option<String>,
    status: Option<TaxonomicStatus>,
    num_descendants: Option<u32>,
    parent_key: Option<LocalKey>,
    accepted_key: Option<LocalKey>,
    basionym_key: Option<LocalKey>,
    nub_key: Option<LocalKey>,
    dataset_key: Option<Uuid>,
    dataset: Option<Arc<Dataset>>,
    remarks: Option<String>,

    record: Option<NameUsageRecord>,
    search: Option<SearchResultRecord>,
    suggest: Option<SuggestResultRecord>,

    higher: Option<Weak<NameUsageNode>>,
    lower: Option<Vec<Arc<NameUsageNode>>>,
    senior: Option<Weak<NameUsageNode>>,
    annotations: Vec<Arc<Annotation>>,
    vernaculars_claimed: bool,
    ancestors_complete: bool,
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// At most one instance exists per `(registry, key)` within a cache; compare with `Arc::ptr_eq`.
pub struct NameUsageNode {
    registry: Registry,
    key: LocalKey,
    state: RwLock<NodeState>,
}

impl std::fmt::Debug for NameUsageNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("NameUsageNode")
            .field("registry", &self.registry)
            .field("key", &self.key)
            .field("literal", &state.literal)
            .field("rank", &state.rank)
            .field("status", &state.status)
            .finish_non_exhaustive()
    }
}

impl NameUsageNode {
    pub fn nominal(registry: Registry, key: LocalKey) -> Self {
        Self {
            registry,
            key,
            state: RwLock::new(NodeState::default()),
        }
    }

    /// First writer wins: fields already set are kept, unset ones are filled.
    pub fn merge(&self, payload: UsagePayload) -> MergeOutcome {
        let mut state = self.state.write();
        let was_nominal =
            state.record.is_none() && state.search.is_none() && state.suggest.is_none();
        let was_resolved = state.record.is_some();

        {
            let fields = payload.fields();
            let registry = self.registry;
            fill(&mut state.literal, fields.literal().map(str::to_string));
            fill(
                &mut state.rank,
                fields.rank.map(|marker| Rank::from_marker(registry, marker)),
            );
            fill(&mut state.authority, non_empty(fields.authorship));
            fill(&mut state.status, fields.status());
            fill(&mut state.num_descendants, fields.num_descendants);
            fill(&mut state.parent_key, fields.parent_key);
            fill(&mut state.accepted_key, fields.accepted_key);
            fill(&mut state.basionym_key, fields.basionym_key);
            fill(&mut state.nub_key, fields.nub_key);
            fill(&mut state.dataset_key, fields.dataset_key);
            fill(&mut state.remarks, non_empty(fields.remarks));
            if fields.num_descendants == Some(0) && state.lower.is_none() {
                state.lower = Some(Vec::new());
            }
        }

        match payload {
            UsagePayload::Record(record) => fill(&mut state.record, Some(record)),
            UsagePayload::Search(record) => fill(&mut state.search, Some(record)),
            UsagePayload::Suggest(record) => fill(&mut state.suggest, Some(record)),
        }

        MergeOutcome {
            was_nominal,
            became_resolved: !was_resolved && state.record.is_some(),
        }
    }

    pub fn registry(&self) -> Registry {
        self.registry
    }

    pub fn key(&self) -> LocalKey {
        self.key
    }

    pub fn persistent_id(&self) -> PersistentId {
        let senior = if self.is_synonym() {
            self.senior_synonym().map(|senior| senior.key())
        } else {
            None
        };
        self.registry.persistent_id(self.key, senior)
    }

    pub fn is_nominal(&self) -> bool {
        let state = self.state.read();
        state.record.is_none() && state.search.is_none() && state.suggest.is_none()
    }

    pub fn is_resolved(&self) -> bool {
        self.state.read().record.is_some()
    }

    pub fn literal(&self) -> Option<String> {
        self.state.read().literal.clone()
    }

    pub fn rank(&self) -> Option<Rank> {
        self.state.read().rank
    }

    pub fn authority(&self) -> Option<String> {
        self.state.read().authority.clone()
    }

    pub fn status(&self) -> Option<TaxonomicStatus> {
        self.state.read().status
    }

    pub fn is_synonym(&self) -> bool {
        self.status().is_some_and(TaxonomicStatus::is_synonym)
    }

    pub fn num_descendants(&self) -> Option<u32> {
        self.state.read().num_descendants
    }

    pub fn parent_key(&self) -> Option<LocalKey> {
        self.state.read().parent_key
    }

    pub fn accepted_key(&self) -> Option<LocalKey> {
        self.state.read().accepted_key
    }

    pub fn basionym_key(&self) -> Option<LocalKey> {
        self.state.read().basionym_key
    }

    pub fn nub_key(&self) -> Option<LocalKey> {
        self.state.read().nub_key
    }

    pub fn dataset_key(&self) -> Option<Uuid> {
        self.state.read().dataset_key
    }

    pub fn dataset(&self) -> Option<Arc<Dataset>> {
        self.state.read().dataset.clone()
    }

    pub fn remarks(&self) -> Option<String> {
        self.state.read().remarks.clone()
    }

    pub fn record(&self) -> Option<NameUsageRecord> {
        self.state.read().record.clone()
    }

    pub fn search_view(&self) -> Option<SearchResultRecord> {
        self.state.read().search.clone()
    }

    pub fn suggest_view(&self) -> Option<SuggestResultRecord> {
        self.state.read().suggest.clone()
    }

    pub fn higher(&self) -> Option<Arc<NameUsageNode>> {
        self.state.read().higher.as_ref().and_then(Weak::upgrade)
    }

    /// `None`: children never fetched. `Some(empty)`: known leaf.
    pub fn lower(&self) -> Option<Vec<Arc<NameUsageNode>>> {
        self.state.read().lower.clone()
    }

    pub fn senior_synonym(&self) -> Option<Arc<NameUsageNode>> {
        self.state.read().senior.as_ref().and_then(Weak::upgrade)
    }

    pub fn annotations(&self) -> Vec<Arc<Annotation>> {
        self.state.read().annotations.clone()
    }

    pub fn annotations_of(&self, link_type: LinkType) -> Vec<Arc<Annotation>> {
        self.state
            .read()
            .annotations
            .iter()
            .filter(|annotation| annotation.link_type() == link_type)
            .cloned()
            .collect()
    }

    /// Set once a walk consumed the whole registry ancestor list above this node.
    pub fn ancestors_complete(&self) -> bool {
        self.state.read().ancestors_complete
    }

    pub(crate) fn set_higher(&self, parent: &Arc<NameUsageNode>) {
        let mut state = self.state.write();
        state.higher = Some(Arc::downgrade(parent));
        fill(&mut state.parent_key, Some(parent.key()));
    }

    pub(crate) fn set_higher_if_unset(&self, parent: &Arc<NameUsageNode>) {
        let mut state = self.state.write();
        if state.higher.as_ref().and_then(Weak::upgrade).is_none() {
            state.higher = Some(Arc::downgrade(parent));
            fill(&mut state.parent_key, Some(parent.key()));
        }
    }

    pub(crate) fn mark_ancestors_complete(&self) {
        self.state.write().ancestors_complete = true;
    }

    pub(crate) fn set_lower(&self, children: Vec<Arc<NameUsageNode>>) {
        self.state.write().lower = Some(children);
    }

    pub(crate) fn set_senior(&self, senior: &Arc<NameUsageNode>) {
        if senior.key() == self.key {
            return;
        }
        self.state.write().senior = Some(Arc::downgrade(senior));
    }

    pub(crate) fn attach_dataset(&self, dataset: Arc<Dataset>) {
        fill(&mut self.state.write().dataset, Some(dataset));
    }

    pub(crate) fn add_annotation(&self, annotation: Arc<Annotation>) {
        self.state.write().annotations.push(annotation);
    }

    pub(crate) fn claim_vernaculars(&self) -> bool {
        let mut state = self.state.write();
        !std::mem::replace(&mut state.vernaculars_claimed, true)
    }

    pub(crate) fn unclaim_vernaculars(&self) {
        self.state.write().vernaculars_claimed = false;
    }

    pub(crate) fn release(&self) {
        *self.state.write() = NodeState::default();
    }
}

pub struct VernacularName {
    name: String,
    language: Option<String>,
    country: Option<String>,
    source: Option<String>,
    annotations: Mutex<Vec<Arc<Annotation>>>,
}

impl std::fmt::Debug for VernacularName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VernacularName")
            .field("name", &self.name)
            .field("language", &self.language)
            .field("country", &self.country)
            .finish_non_exhaustive()
    }
}

impl VernacularName {
    pub fn from_record(record: &VernacularRecord) -> Self {
        Self {
            name: record.vernacular_name.trim().to_string(),
            language: non_empty(record.language.as_deref()),
            country: non_empty(record.country.as_deref()),
            source: non_empty(record.source.as_deref()),
            annotations: Mutex::new(Vec::new()),
        }
    }

    pub fn content_hash(record: &VernacularRecord) -> u64 {
        let mut hasher = DefaultHasher::new();
        record.vernacular_name.trim().hash(&mut hasher);
        non_empty(record.language.as_deref()).hash(&mut hasher);
        non_empty(record.country.as_deref()).hash(&mut hasher);
        hasher.finish()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn annotations(&self) -> Vec<Arc<Annotation>> {
        self.annotations.lock().clone()
    }

    pub(crate) fn add_annotation(&self, annotation: Arc<Annotation>) {
        self.annotations.lock().push(annotation);
    }

    pub(crate) fn release(&self) {
        self.annotations.lock().clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub key: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub publishing_organization_key: Option<Uuid>,
    pub license: Option<String>,
    pub doi: Option<String>,
}

impl From<DatasetRecord> for Dataset {
    fn from(record: DatasetRecord) -> Self {
        Self {
            key: record.key,
            title: record.title,
            description: record.description,
            publishing_organization_key: record.publishing_organization_key,
            license: record.license,
            doi: record.doi,
        }
    }
}
