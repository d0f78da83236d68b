mod support;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;
use uuid::Uuid;

use kira_taxa::annotation::LinkType;
use kira_taxa::config::{FailurePolicy, ResolverSettings};
use kira_taxa::domain::LocalKey;
use kira_taxa::error::TaxaError;
use kira_taxa::record::{DatasetRecord, NameUsageRecord};
use kira_taxa::resolver::Resolver;

use support::{MockSource, usage, vernacular};

const PUMA: i64 = 2435099;

fn puma_source() -> MockSource {
    MockSource::default().with(usage(PUMA, "Puma concolor", "SPECIES"))
}

fn tolerant() -> ResolverSettings {
    ResolverSettings {
        failure_policy: FailurePolicy::Tolerate,
        ..Default::default()
    }
}

#[test]
fn resolve_twice_returns_same_instance() {
    let resolver = Resolver::new(puma_source(), ResolverSettings::default());
    let first = resolver.resolve_key(LocalKey::new(PUMA)).unwrap().unwrap();
    let second = resolver.resolve_key(LocalKey::new(PUMA)).unwrap().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(resolver.source().calls("get_by_key"), 1);
    assert_eq!(resolver.stats().cache_hits, 1);
}

#[test]
fn concurrent_resolution_fetches_once() {
    let source = MockSource {
        fetch_delay: Some(Duration::from_millis(25)),
        ..puma_source()
    };
    let resolver = Resolver::new(source, ResolverSettings::default());

    let nodes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| resolver.resolve_key(LocalKey::new(PUMA))))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap().unwrap())
            .collect()
    });

    assert_eq!(resolver.source().calls("get_by_key"), 1);
    assert!(nodes.iter().all(|node| Arc::ptr_eq(node, &nodes[0])));
    assert_eq!(resolver.cache().sizes().nodes, 1);
}

#[test]
fn absent_key_resolves_to_none() {
    let resolver = Resolver::new(puma_source(), ResolverSettings::default());
    assert!(resolver.resolve_key(LocalKey::new(1)).unwrap().is_none());
    assert!(resolver.resolve_key(LocalKey::new(1)).unwrap().is_none());
    assert_eq!(resolver.source().calls("get_by_key"), 2);
}

#[test]
fn clear_forces_a_fresh_fetch() {
    let resolver = Resolver::new(puma_source(), ResolverSettings::default());
    let before = resolver.resolve_key(LocalKey::new(PUMA)).unwrap().unwrap();
    resolver.clear();
    assert_eq!(resolver.cache().sizes().nodes, 0);

    let after = resolver.resolve_key(LocalKey::new(PUMA)).unwrap().unwrap();
    assert_eq!(resolver.source().calls("get_by_key"), 2);
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.literal().as_deref(), Some("Puma concolor"));
}

#[test]
fn search_view_is_enriched_by_key_lookup() {
    let resolver = Resolver::new(puma_source(), ResolverSettings::default());
    let hit = kira_taxa::record::SearchResultRecord {
        usage: NameUsageRecord {
            key: LocalKey::new(PUMA),
            canonical_name: Some("Puma concolor".to_string()),
            ..Default::default()
        },
        vernacular_names: vec![vernacular("Cougar", "eng")],
    };
    let from_search = resolver.resolve_search_result(hit).unwrap();
    assert!(!from_search.is_resolved());
    assert_eq!(from_search.rank(), None);

    let from_key = resolver.resolve_key(LocalKey::new(PUMA)).unwrap().unwrap();
    assert!(Arc::ptr_eq(&from_search, &from_key));
    assert!(from_key.is_resolved());
    assert_eq!(from_key.rank(), Some(kira_taxa::rank::Rank::Species));
    assert_eq!(resolver.vernaculars(&from_key).len(), 1);
    assert_eq!(resolver.source().calls("get_vernacular_names"), 0);
}

#[test]
fn vernaculars_are_linked_only_when_present() {
    let mut source = puma_source().with(usage(7, "Puma", "GENUS"));
    source.vernaculars.insert(
        PUMA,
        vec![
            vernacular("Cougar", "eng"),
            vernacular("Puma", "deu"),
            vernacular("Cougar", "eng"),
        ],
    );
    let resolver = Resolver::new(source, ResolverSettings::default());

    let puma = resolver.resolve_key(LocalKey::new(PUMA)).unwrap().unwrap();
    let annotations = puma.annotations_of(LinkType::Vernacular);
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].annotatants().len(), 2);
    assert_eq!(resolver.cache().sizes().vernaculars, 2);

    let genus = resolver.resolve_key(LocalKey::new(7)).unwrap().unwrap();
    assert!(genus.annotations().is_empty());
}

#[test]
fn datasets_are_shared_between_nodes() {
    let dataset_key = Uuid::parse_str("d7dddbf4-2cf0-4f39-9b2a-bb099caae36c").unwrap();
    let with_dataset = |record: NameUsageRecord| NameUsageRecord {
        dataset_key: Some(dataset_key),
        ..record
    };
    let mut source = MockSource::default()
        .with(with_dataset(usage(1, "Puma concolor", "SPECIES")))
        .with(with_dataset(usage(2, "Puma", "GENUS")));
    source.datasets.insert(
        dataset_key,
        DatasetRecord {
            key: dataset_key,
            title: Some("GBIF Backbone Taxonomy".to_string()),
            description: None,
            publishing_organization_key: None,
            license: None,
            doi: None,
            dataset_type: Some("CHECKLIST".to_string()),
        },
    );
    let resolver = Resolver::new(source, ResolverSettings::default());

    let a = resolver.resolve_key(LocalKey::new(1)).unwrap().unwrap();
    let b = resolver.resolve_key(LocalKey::new(2)).unwrap().unwrap();
    assert!(Arc::ptr_eq(&a.dataset().unwrap(), &b.dataset().unwrap()));
    assert_eq!(resolver.source().calls("get_dataset"), 1);
}

#[test]
fn transport_errors_propagate_by_default() {
    let mut source = puma_source();
    source.failing.insert("get_by_key");
    let resolver = Resolver::new(source, ResolverSettings::default());

    let err = resolver.resolve_key(LocalKey::new(PUMA)).unwrap_err();
    assert_matches!(err, TaxaError::GbifHttp(_));
}

#[test]
fn tolerated_transport_errors_resolve_to_absent() {
    let mut source = puma_source();
    source.failing.insert("get_by_key");
    let resolver = Resolver::new(source, tolerant());

    assert!(resolver.resolve_key(LocalKey::new(PUMA)).unwrap().is_none());
    let stats = resolver.stats();
    assert_eq!(stats.transport_failures, 1);
    assert_eq!(stats.remote_fetches, 1);
}

#[test]
fn failed_vernacular_fetch_is_retried() {
    let mut source = puma_source();
    source.failing.insert("get_vernacular_names");
    let resolver = Resolver::new(source, tolerant());

    let node = resolver.resolve_key(LocalKey::new(PUMA)).unwrap().unwrap();
    assert!(node.annotations().is_empty());
    resolver.resolve_record(usage(PUMA, "Puma concolor", "SPECIES")).unwrap();
    resolver
        .exact_name_usages("Puma concolor", &Default::default())
        .unwrap();
    assert_eq!(resolver.source().calls("get_vernacular_names"), 2);
}

#[test]
fn malformed_keys_are_skipped() {
    let resolver = Resolver::new(puma_source(), ResolverSettings::default());
    let nodes = resolver
        .resolve_keys("x12 | 2435099 | urn:lsid:gbif.org:taxon:2435099 | urn:lsid:example.org:1")
        .unwrap();

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].key(), LocalKey::new(PUMA));
    assert_eq!(resolver.stats().skipped_keys, 2);
}

#[test]
fn ubio_persistent_id_carries_senior() {
    use kira_taxa::domain::{PersistentId, Registry};

    let id = Registry::Ubio.persistent_id(LocalKey::new(42), Some(LocalKey::new(7)));
    assert_eq!(id.to_string(), "urn:lsid:ubio.org:classificationbank:7_42");
    assert_eq!(PersistentId::parse(&id.to_string()).unwrap(), id);
    assert_eq!(
        Registry::Gbif
            .persistent_id(LocalKey::new(42), Some(LocalKey::new(7)))
            .to_string(),
        "urn:lsid:gbif.org:taxon:42"
    );
}

#[test]
fn lazy_cross_references() {
    let source = puma_source()
        .with(NameUsageRecord {
            parent_key: Some(LocalKey::new(2435098)),
            basionym_key: Some(LocalKey::new(PUMA)),
            ..support::synonym_of(5, "Felis concolor", "SPECIES", PUMA)
        })
        .with(usage(2435098, "Puma", "GENUS"));
    let resolver = Resolver::new(source, ResolverSettings::default());

    let synonym = resolver.resolve_key(LocalKey::new(5)).unwrap().unwrap();
    let accepted = resolver.accepted(&synonym).unwrap().unwrap();
    assert_eq!(accepted.key(), LocalKey::new(PUMA));
    assert!(Arc::ptr_eq(&synonym.senior_synonym().unwrap(), &accepted));

    let basionym = resolver.basionym(&synonym).unwrap().unwrap();
    assert!(Arc::ptr_eq(&basionym, &accepted));

    let parent = resolver.higher(&synonym).unwrap().unwrap();
    assert_eq!(parent.literal().as_deref(), Some("Puma"));
    assert!(Arc::ptr_eq(&synonym.higher().unwrap(), &parent));
}
