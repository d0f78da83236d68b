#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use uuid::Uuid;

use kira_taxa::domain::{LocalKey, Registry};
use kira_taxa::error::TaxaError;
use kira_taxa::rank::Rank;
use kira_taxa::record::{
    DatasetRecord, MatchResult, NameUsageRecord, ParsedNameRecord, SearchResultRecord,
    SuggestResultRecord, VernacularRecord,
};
use kira_taxa::source::{DataSource, FuzzyMatchRequest, SearchFilters};

/// In-memory registry. Keys refer to entries of `records`; parents are root first.
/// Unless overridden in `parsed`, `parse_name` returns the trimmed literal as canonical.
#[derive(Default)]
pub struct MockSource {
    pub records: HashMap<i64, NameUsageRecord>,
    pub by_name: HashMap<String, Vec<i64>>,
    pub children: HashMap<i64, Vec<i64>>,
    pub parents: HashMap<i64, Vec<i64>>,
    pub synonyms: HashMap<i64, Vec<i64>>,
    pub combinations: HashMap<i64, Vec<i64>>,
    pub related: HashMap<i64, Vec<i64>>,
    pub vernaculars: HashMap<i64, Vec<VernacularRecord>>,
    pub search_hits: HashMap<String, Vec<SearchResultRecord>>,
    pub suggestions: HashMap<String, Vec<SuggestResultRecord>>,
    pub matches: HashMap<String, MatchResult>,
    pub parsed: HashMap<String, Vec<ParsedNameRecord>>,
    pub datasets: HashMap<Uuid, DatasetRecord>,
    pub failing: HashSet<&'static str>,
    pub fetch_delay: Option<Duration>,
    pub calls: Mutex<HashMap<&'static str, usize>>,
}

pub fn usage(key: i64, name: &str, rank: &str) -> NameUsageRecord {
    NameUsageRecord {
        key: LocalKey::new(key),
        canonical_name: Some(name.to_string()),
        scientific_name: Some(name.to_string()),
        rank: Some(rank.to_string()),
        taxonomic_status: Some("ACCEPTED".to_string()),
        ..Default::default()
    }
}

pub fn synonym_of(key: i64, name: &str, rank: &str, accepted: i64) -> NameUsageRecord {
    NameUsageRecord {
        accepted_key: Some(LocalKey::new(accepted)),
        taxonomic_status: Some("SYNONYM".to_string()),
        synonym: Some(true),
        ..usage(key, name, rank)
    }
}

pub fn vernacular(name: &str, language: &str) -> VernacularRecord {
    VernacularRecord {
        vernacular_name: name.to_string(),
        language: Some(language.to_string()),
        ..Default::default()
    }
}

impl MockSource {
    pub fn with(mut self, record: NameUsageRecord) -> Self {
        let key = record.key.value();
        if let Some(name) = record.canonical_name.clone() {
            self.by_name.entry(name).or_default().push(key);
        }
        self.records.insert(key, record);
        self
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn hit(&self, method: &'static str) -> Result<(), TaxaError> {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
        if self.failing.contains(method) {
            return Err(TaxaError::GbifHttp(format!("{method}: connection reset")));
        }
        Ok(())
    }

    fn lookup(&self, keys: Option<&Vec<i64>>) -> Vec<NameUsageRecord> {
        keys.into_iter()
            .flatten()
            .filter_map(|key| self.records.get(key).cloned())
            .collect()
    }
}

impl DataSource for MockSource {
    fn registry(&self) -> Registry {
        Registry::Gbif
    }

    fn get_by_key(&self, key: LocalKey) -> Result<Option<NameUsageRecord>, TaxaError> {
        self.hit("get_by_key")?;
        if let Some(delay) = self.fetch_delay {
            thread::sleep(delay);
        }
        Ok(self.records.get(&key.value()).cloned())
    }

    fn list_by_canonical_name(
        &self,
        name: &str,
        _rank: Option<Rank>,
    ) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.hit("list_by_canonical_name")?;
        Ok(self.lookup(self.by_name.get(name)))
    }

    fn list_children(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.hit("list_children")?;
        Ok(self.lookup(self.children.get(&key.value())))
    }

    fn list_parents(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.hit("list_parents")?;
        Ok(self.lookup(self.parents.get(&key.value())))
    }

    fn list_synonyms(&self, accepted: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.hit("list_synonyms")?;
        Ok(self.lookup(self.synonyms.get(&accepted.value())))
    }

    fn list_combinations(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.hit("list_combinations")?;
        Ok(self.lookup(self.combinations.get(&key.value())))
    }

    fn list_related(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError> {
        self.hit("list_related")?;
        Ok(self.lookup(self.related.get(&key.value())))
    }

    fn match_fuzzy(&self, request: &FuzzyMatchRequest<'_>) -> Result<MatchResult, TaxaError> {
        self.hit("match_fuzzy")?;
        Ok(self.matches.get(request.name).cloned().unwrap_or_default())
    }

    fn full_text_search(
        &self,
        query: &str,
        _filters: &SearchFilters,
    ) -> Result<Vec<SearchResultRecord>, TaxaError> {
        self.hit("full_text_search")?;
        Ok(self
            .search_hits
            .get(&query.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    fn suggest(
        &self,
        query: &str,
        _rank: Option<Rank>,
    ) -> Result<Vec<SuggestResultRecord>, TaxaError> {
        self.hit("suggest")?;
        Ok(self.suggestions.get(query).cloned().unwrap_or_default())
    }

    fn parse_name(&self, literal: &str) -> Result<Vec<ParsedNameRecord>, TaxaError> {
        self.hit("parse_name")?;
        if let Some(parsed) = self.parsed.get(literal) {
            return Ok(parsed.clone());
        }
        Ok(vec![ParsedNameRecord {
            scientific_name: Some(literal.to_string()),
            canonical_name: Some(literal.trim().to_string()),
            ..Default::default()
        }])
    }

    fn get_vernacular_names(&self, key: LocalKey) -> Result<Vec<VernacularRecord>, TaxaError> {
        self.hit("get_vernacular_names")?;
        Ok(self.vernaculars.get(&key.value()).cloned().unwrap_or_default())
    }

    fn get_dataset(&self, key: Uuid) -> Result<Option<DatasetRecord>, TaxaError> {
        self.hit("get_dataset")?;
        Ok(self.datasets.get(&key).cloned())
    }
}
