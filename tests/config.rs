use std::fs;

use assert_matches::assert_matches;
use tempfile::tempdir;

use kira_taxa::config::{
    Config, ConfigLoader, FailurePolicy, GbifEntry, ResolverEntry, ResolverSettings,
    DEFAULT_GBIF_BASE_URL,
};
use kira_taxa::error::TaxaError;

#[test]
fn loads_explicit_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kira-taxa.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "gbif": { "base_url": "http://localhost:8080/v1", "page_limit": 20 },
            "resolver": { "locale": "de", "failure_policy": "tolerate", "delimiter": ";" }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.gbif.base_url, "http://localhost:8080/v1");
    assert_eq!(resolved.gbif.page_limit, 20);
    assert_eq!(resolved.gbif.max_retries, 3);
    assert_eq!(resolved.resolver.locale.as_deref(), Some("de"));
    assert_eq!(resolved.resolver.failure_policy, FailurePolicy::Tolerate);
    assert_eq!(resolved.resolver.delimiter, ";");
    assert!(resolved.resolver.include_vernaculars);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kira-taxa.json");
    fs::write(&path, "{}").unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.gbif.base_url, DEFAULT_GBIF_BASE_URL);
    assert_eq!(resolved.resolver, ResolverSettings::default());
}

#[test]
fn malformed_json_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kira-taxa.json");
    fs::write(&path, "{ \"gbif\": ").unwrap();

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, TaxaError::ConfigParse(_));
}

#[test]
fn missing_explicit_file_is_a_read_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, TaxaError::ConfigRead(missing) if missing == path);
}

#[test]
fn unknown_failure_policy_is_rejected() {
    let config = Config {
        resolver: Some(ResolverEntry {
            failure_policy: Some("retry".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, TaxaError::ConfigParse(message) if message.contains("retry"));
}

#[test]
fn oversized_page_limit_is_rejected() {
    let config = Config {
        gbif: Some(GbifEntry {
            page_limit: Some(5000),
            ..Default::default()
        }),
        ..Default::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(TaxaError::ConfigParse(_))
    );
}
