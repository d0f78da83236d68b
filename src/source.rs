use uuid::Uuid;

use crate::domain::{LocalKey, Registry};
use crate::error::TaxaError;
use crate::rank::Rank;
use crate::record::{
    DatasetRecord, MatchResult, NameUsageRecord, ParsedNameRecord, SearchResultRecord,
    SuggestResultRecord, VernacularRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AncestorOrder {
    RootFirst,
    NodeFirst,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub rank: Option<Rank>,
    pub dataset_key: Option<Uuid>,
    pub higher_taxon_key: Option<LocalKey>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuzzyMatchRequest<'a> {
    pub name: &'a str,
    pub rank: Option<Rank>,
    pub classification: Option<&'a str>,
    pub strict: bool,
    pub verbose: bool,
}

/// Absence is `Ok(None)` or an empty list; `Err` is reserved for transport and decoding failures.
pub trait DataSource: Send + Sync {
    fn registry(&self) -> Registry;

    fn ancestor_order(&self) -> AncestorOrder {
        AncestorOrder::RootFirst
    }

    fn get_by_key(&self, key: LocalKey) -> Result<Option<NameUsageRecord>, TaxaError>;

    fn list_by_canonical_name(
        &self,
        name: &str,
        rank: Option<Rank>,
    ) -> Result<Vec<NameUsageRecord>, TaxaError>;

    fn list_children(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError>;

    fn list_parents(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError>;

    fn list_synonyms(&self, accepted: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError>;

    fn list_combinations(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError>;

    fn list_related(&self, key: LocalKey) -> Result<Vec<NameUsageRecord>, TaxaError>;

    fn match_fuzzy(&self, request: &FuzzyMatchRequest<'_>) -> Result<MatchResult, TaxaError>;

    fn full_text_search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResultRecord>, TaxaError>;

    fn suggest(
        &self,
        query: &str,
        rank: Option<Rank>,
    ) -> Result<Vec<SuggestResultRecord>, TaxaError>;

    fn parse_name(&self, literal: &str) -> Result<Vec<ParsedNameRecord>, TaxaError>;

    fn get_vernacular_names(&self, key: LocalKey) -> Result<Vec<VernacularRecord>, TaxaError>;

    fn get_dataset(&self, key: Uuid) -> Result<Option<DatasetRecord>, TaxaError>;
}
