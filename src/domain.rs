use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaxaError;

pub const GBIF_PREFIX: &str = "urn:lsid:gbif.org:taxon:";
pub const UBIO_PREFIX: &str = "urn:lsid:ubio.org:classificationbank:";
pub const NAMEBANK_PREFIX: &str = "urn:lsid:ubio.org:namebank:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Registry {
    Gbif,
    Ubio,
}

impl Registry {
    pub fn prefix(self) -> &'static str {
        match self {
            Registry::Gbif => GBIF_PREFIX,
            Registry::Ubio => UBIO_PREFIX,
        }
    }

    pub fn nests_synonyms(self) -> bool {
        matches!(self, Registry::Ubio)
    }

    pub fn persistent_id(self, key: LocalKey, senior: Option<LocalKey>) -> PersistentId {
        PersistentId::Usage {
            registry: self,
            key,
            senior: senior.filter(|_| self.nests_synonyms()),
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Registry::Gbif => write!(f, "gbif"),
            Registry::Ubio => write!(f, "ubio"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LocalKey(i64);

impl LocalKey {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for LocalKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalKey {
    type Err = TaxaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| TaxaError::InvalidKey(value.to_string()))
    }
}

pub fn parse_dataset_key(value: &str) -> Result<Uuid, TaxaError> {
    Uuid::parse_str(value.trim()).map_err(|_| TaxaError::InvalidDatasetKey(value.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistentId {
    Usage {
        registry: Registry,
        key: LocalKey,
        senior: Option<LocalKey>,
    },
    Namebank(LocalKey),
}

impl PersistentId {
    pub fn parse(value: &str) -> Result<Self, TaxaError> {
        let trimmed = value.trim();
        let invalid = || TaxaError::InvalidPersistentId(value.to_string());
        if let Some(rest) = trimmed.strip_prefix(GBIF_PREFIX) {
            let key = rest.parse().map_err(|_| invalid())?;
            return Ok(PersistentId::Usage {
                registry: Registry::Gbif,
                key,
                senior: None,
            });
        }
        if let Some(rest) = trimmed.strip_prefix(UBIO_PREFIX) {
            return match rest.split_once('_') {
                Some((senior, key)) => Ok(PersistentId::Usage {
                    registry: Registry::Ubio,
                    key: key.parse().map_err(|_| invalid())?,
                    senior: Some(senior.parse().map_err(|_| invalid())?),
                }),
                None => Ok(PersistentId::Usage {
                    registry: Registry::Ubio,
                    key: rest.parse().map_err(|_| invalid())?,
                    senior: None,
                }),
            };
        }
        if let Some(rest) = trimmed.strip_prefix(NAMEBANK_PREFIX) {
            return Ok(PersistentId::Namebank(rest.parse().map_err(|_| invalid())?));
        }
        Err(invalid())
    }

    pub fn local_key(&self) -> LocalKey {
        match self {
            PersistentId::Usage { key, .. } => *key,
            PersistentId::Namebank(key) => *key,
        }
    }
}

impl fmt::Display for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistentId::Usage {
                registry,
                key,
                senior: Some(senior),
            } => write!(f, "{}{senior}_{key}", registry.prefix()),
            PersistentId::Usage { registry, key, .. } => write!(f, "{}{key}", registry.prefix()),
            PersistentId::Namebank(id) => write!(f, "{NAMEBANK_PREFIX}{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomicStatus {
    Accepted,
    Doubtful,
    Synonym,
    HomotypicSynonym,
    HeterotypicSynonym,
    ProParteSynonym,
    Basionym,
    Misapplied,
}

impl TaxonomicStatus {
    pub fn from_marker(marker: &str) -> Option<Self> {
        let normalized = marker.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        let status = match normalized.as_str() {
            "ACCEPTED" | "VALID" => TaxonomicStatus::Accepted,
            "DOUBTFUL" => TaxonomicStatus::Doubtful,
            "SYNONYM" => TaxonomicStatus::Synonym,
            "HOMOTYPIC_SYNONYM" | "OBJECTIVE_SYNONYM" => TaxonomicStatus::HomotypicSynonym,
            "HETEROTYPIC_SYNONYM" | "SUBJECTIVE_SYNONYM" => TaxonomicStatus::HeterotypicSynonym,
            "PROPARTE_SYNONYM" | "PRO_PARTE_SYNONYM" => TaxonomicStatus::ProParteSynonym,
            "BASIONYM" => TaxonomicStatus::Basionym,
            "MISAPPLIED" => TaxonomicStatus::Misapplied,
            _ => return None,
        };
        Some(status)
    }

    pub fn is_synonym(self) -> bool {
        matches!(
            self,
            TaxonomicStatus::Synonym
                | TaxonomicStatus::HomotypicSynonym
                | TaxonomicStatus::HeterotypicSynonym
                | TaxonomicStatus::ProParteSynonym
                | TaxonomicStatus::Misapplied
        )
    }
}

impl fmt::Display for TaxonomicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaxonomicStatus::Accepted => "accepted",
            TaxonomicStatus::Doubtful => "doubtful",
            TaxonomicStatus::Synonym => "synonym",
            TaxonomicStatus::HomotypicSynonym => "homotypic_synonym",
            TaxonomicStatus::HeterotypicSynonym => "heterotypic_synonym",
            TaxonomicStatus::ProParteSynonym => "pro_parte_synonym",
            TaxonomicStatus::Basionym => "basionym",
            TaxonomicStatus::Misapplied => "misapplied",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchingMode {
    Exact,
    Fuzzy,
    #[value(name = "fulltext")]
    FullText,
    Suggest,
    Contains,
}

impl fmt::Display for MatchingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchingMode::Exact => write!(f, "exact"),
            MatchingMode::Fuzzy => write!(f, "fuzzy"),
            MatchingMode::FullText => write!(f, "fulltext"),
            MatchingMode::Suggest => write!(f, "suggest"),
            MatchingMode::Contains => write!(f, "contains"),
        }
    }
}

impl FromStr for MatchingMode {
    type Err = TaxaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchingMode::Exact),
            "fuzzy" => Ok(MatchingMode::Fuzzy),
            "fulltext" | "full-text" => Ok(MatchingMode::FullText),
            "suggest" => Ok(MatchingMode::Suggest),
            "contains" => Ok(MatchingMode::Contains),
            _ => Err(TaxaError::InvalidMatchingMode(value.to_string())),
        }
    }
}
