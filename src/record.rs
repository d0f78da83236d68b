use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::LocalKey;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameUsageRecord {
    pub key: LocalKey,
    #[serde(default)]
    pub parent_key: Option<LocalKey>,
    #[serde(default)]
    pub accepted_key: Option<LocalKey>,
    #[serde(default)]
    pub basionym_key: Option<LocalKey>,
    #[serde(default)]
    pub nub_key: Option<LocalKey>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub canonical_name: Option<String>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default, alias = "nameString")]
    pub name: Option<String>,
    #[serde(default)]
    pub dataset_key: Option<Uuid>,
    #[serde(default)]
    pub num_descendants: Option<u32>,
    #[serde(default)]
    pub taxonomic_status: Option<String>,
    #[serde(default)]
    pub authorship: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub synonym: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultRecord {
    #[serde(flatten)]
    pub usage: NameUsageRecord,
    #[serde(default)]
    pub vernacular_names: Vec<VernacularRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResultRecord {
    pub key: LocalKey,
    #[serde(default)]
    pub canonical_name: Option<String>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub parent_key: Option<LocalKey>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub nub_key: Option<LocalKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedNameRecord {
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub canonical_name: Option<String>,
    #[serde(default, rename = "type")]
    pub name_type: Option<String>,
    #[serde(default)]
    pub genus_or_above: Option<String>,
    #[serde(default)]
    pub specific_epithet: Option<String>,
    #[serde(default)]
    pub infra_specific_epithet: Option<String>,
    #[serde(default)]
    pub authorship: Option<String>,
    #[serde(default)]
    pub rank_marker: Option<String>,
}

impl ParsedNameRecord {
    pub fn canonical(&self) -> Option<&str> {
        self.canonical_name
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VernacularRecord {
    #[serde(default)]
    pub vernacular_name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub taxon_key: Option<LocalKey>,
    #[serde(default)]
    pub preferred: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRecord {
    pub key: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub publishing_organization_key: Option<Uuid>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default, rename = "type")]
    pub dataset_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Higherrank,
    None,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    #[serde(default)]
    pub usage_key: Option<LocalKey>,
    #[serde(default)]
    pub accepted_usage_key: Option<LocalKey>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub canonical_name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub confidence: Option<i32>,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub synonym: Option<bool>,
    #[serde(default)]
    pub alternatives: Vec<MatchResult>,
}

impl MatchResult {
    pub fn candidates(&self) -> impl Iterator<Item = &MatchResult> {
        std::iter::once(self)
            .chain(self.alternatives.iter())
            .filter(|candidate| candidate.usage_key.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_canonical_is_none() {
        let parsed = ParsedNameRecord {
            canonical_name: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(parsed.canonical(), None);
    }

    #[test]
    fn missing_match_type_keeps_keyed_candidate() {
        let result: MatchResult =
            serde_json::from_str(r#"{"usageKey": 2435099, "confidence": 98}"#).unwrap();
        assert_eq!(result.match_type, MatchType::Unknown);
        assert_eq!(result.candidates().count(), 1);
    }

    #[test]
    fn candidates_skip_keyless_matches() {
        let result = MatchResult {
            usage_key: None,
            match_type: MatchType::None,
            alternatives: vec![MatchResult {
                usage_key: Some(LocalKey::new(2435099)),
                match_type: MatchType::Fuzzy,
                ..Default::default()
            }],
            ..Default::default()
        };
        let keys: Vec<_> = result.candidates().filter_map(|c| c.usage_key).collect();
        assert_eq!(keys, vec![LocalKey::new(2435099)]);
    }
}
