use std::fs;

use kira_taxa::domain::{LocalKey, Registry, TaxonomicStatus};
use kira_taxa::node::{NameUsageNode, UsagePayload};
use kira_taxa::rank::Rank;
use kira_taxa::record::{DatasetRecord, MatchResult, MatchType, NameUsageRecord, SearchResultRecord};
use kira_taxa::scorer;

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{name}")).unwrap()
}

#[test]
fn decode_species_record() {
    let record: NameUsageRecord =
        serde_json::from_str(&fixture("gbif_species_2435099.json")).unwrap();
    assert_eq!(record.key, LocalKey::new(2435099));
    assert_eq!(record.parent_key, Some(LocalKey::new(2435098)));
    assert_eq!(record.basionym_key, Some(LocalKey::new(5219436)));
    assert_eq!(record.num_descendants, Some(8));

    let node = NameUsageNode::nominal(Registry::Gbif, record.key);
    let outcome = node.merge(UsagePayload::Record(record));
    assert!(outcome.was_nominal);
    assert!(outcome.became_resolved);
    assert_eq!(node.literal().as_deref(), Some("Puma concolor"));
    assert_eq!(node.rank(), Some(Rank::Species));
    assert_eq!(node.status(), Some(TaxonomicStatus::Accepted));
    assert_eq!(node.authority().as_deref(), Some("(Linnaeus, 1771)"));
    assert_eq!(node.remarks(), None);
    assert_eq!(
        node.persistent_id().to_string(),
        "urn:lsid:gbif.org:taxon:2435099"
    );
}

#[test]
fn decode_search_page() {
    let raw = fixture("gbif_search_puma.json");
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let hits: Vec<SearchResultRecord> =
        serde_json::from_value(value["results"].clone()).unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].usage.canonical_name.as_deref(), Some("Puma concolor"));
    assert_eq!(hits[0].vernacular_names.len(), 2);
    assert_eq!(hits[0].vernacular_names[0].vernacular_name, "Cougar");
    assert_eq!(hits[1].usage.accepted_key, Some(LocalKey::new(2435099)));
    assert_eq!(hits[1].usage.synonym, Some(true));
    assert!(hits[1].vernacular_names.is_empty());
}

#[test]
fn decode_fuzzy_match_and_score_it() {
    let result: MatchResult = serde_json::from_str(&fixture("gbif_match_fuzzy.json")).unwrap();
    assert_eq!(result.match_type, MatchType::Fuzzy);
    assert_eq!(result.alternatives[0].match_type, MatchType::Higherrank);

    let candidates: Vec<_> = result.candidates().collect();
    assert_eq!(candidates.len(), 2);

    let primary = scorer::score("Puma concolr", LocalKey::new(2435099), candidates[0]);
    assert_eq!(primary.confidence, Some(92));
    assert_eq!(primary.name, Some(75));
    assert_eq!(primary.classification, Some(-2));
    assert_eq!(primary.accepted, Some(1));
    assert_eq!(primary.single_match, Some(5));
    assert_eq!(primary.total, Some(79));

    let genus = scorer::score("Puma concolr", LocalKey::new(2435098), candidates[1]);
    assert_eq!(genus.name, Some(-5));
    assert_eq!(genus.single_match, None);
}

#[test]
fn decode_dataset() {
    let dataset: DatasetRecord =
        serde_json::from_str(&fixture("gbif_dataset_backbone.json")).unwrap();
    assert_eq!(dataset.title.as_deref(), Some("GBIF Backbone Taxonomy"));
    assert_eq!(dataset.dataset_type.as_deref(), Some("CHECKLIST"));
    assert_eq!(dataset.doi.as_deref(), Some("10.15468/39omei"));
}
