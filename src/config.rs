use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TaxaError;

pub const CONFIG_FILE: &str = "kira-taxa.json";
pub const DEFAULT_GBIF_BASE_URL: &str = "https://api.gbif.org/v1";
const MAX_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub gbif: Option<GbifEntry>,
    #[serde(default)]
    pub resolver: Option<ResolverEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GbifEntry {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub page_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ResolverEntry {
    #[serde(default)]
    pub include_vernaculars: Option<bool>,
    #[serde(default)]
    pub resolve_datasets: Option<bool>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub failure_policy: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Propagate,
    Tolerate,
}

impl std::str::FromStr for FailurePolicy {
    type Err = TaxaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(FailurePolicy::Propagate),
            "tolerate" => Ok(FailurePolicy::Tolerate),
            other => Err(TaxaError::ConfigParse(format!(
                "unknown failure_policy `{other}` (expected propagate or tolerate)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GbifSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub page_limit: usize,
}

impl Default for GbifSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GBIF_BASE_URL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            page_limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub include_vernaculars: bool,
    pub resolve_datasets: bool,
    pub locale: Option<String>,
    pub failure_policy: FailurePolicy,
    pub delimiter: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            include_vernaculars: true,
            resolve_datasets: true,
            locale: None,
            failure_policy: FailurePolicy::Propagate,
            delimiter: "|".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub gbif: GbifSettings,
    pub resolver: ResolverSettings,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, TaxaError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };

        let Some(config_path) = config_path else {
            return Self::resolve_config(Config::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| TaxaError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| TaxaError::ConfigParse(err.to_string()))?;
        tracing::debug!(path = %config_path.display(), "loaded configuration");

        Self::resolve_config(config)
    }

    pub fn user_config_path() -> Option<Utf8PathBuf> {
        ProjectDirs::from("org", "kira", "kira-taxa")
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.config_dir().join(CONFIG_FILE)).ok())
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        Self::user_config_path()
            .map(Utf8PathBuf::into_std_path_buf)
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, TaxaError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let defaults = GbifSettings::default();
        let gbif = match config.gbif {
            Some(entry) => GbifSettings {
                base_url: entry.base_url.unwrap_or(defaults.base_url),
                timeout_secs: entry.timeout_secs.unwrap_or(defaults.timeout_secs),
                max_retries: entry.max_retries.unwrap_or(defaults.max_retries),
                page_limit: entry.page_limit.unwrap_or(defaults.page_limit),
            },
            None => defaults,
        };
        if gbif.page_limit == 0 || gbif.page_limit > MAX_PAGE_LIMIT {
            return Err(TaxaError::ConfigParse(format!(
                "gbif.page_limit must be between 1 and {MAX_PAGE_LIMIT}, got {}",
                gbif.page_limit
            )));
        }
        if gbif.timeout_secs == 0 {
            return Err(TaxaError::ConfigParse(
                "gbif.timeout_secs must be positive".to_string(),
            ));
        }

        let defaults = ResolverSettings::default();
        let resolver = match config.resolver {
            Some(entry) => ResolverSettings {
                include_vernaculars: entry
                    .include_vernaculars
                    .unwrap_or(defaults.include_vernaculars),
                resolve_datasets: entry.resolve_datasets.unwrap_or(defaults.resolve_datasets),
                locale: entry
                    .locale
                    .map(|locale| locale.trim().to_string())
                    .filter(|locale| !locale.is_empty()),
                failure_policy: match entry.failure_policy {
                    Some(value) => value.parse()?,
                    None => defaults.failure_policy,
                },
                delimiter: entry
                    .delimiter
                    .filter(|value| !value.is_empty())
                    .unwrap_or(defaults.delimiter),
            },
            None => defaults,
        };

        Ok(ResolvedConfig {
            schema_version,
            gbif,
            resolver,
        })
    }
}
