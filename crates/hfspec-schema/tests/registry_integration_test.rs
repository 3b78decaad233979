//! Integration tests for hfspec-schema
//!
//! These tests exercise the registry over on-disk stores and from multiple
//! threads.

use hfspec_schema::{DirectoryStore, Error, SchemaRegistry, SchemaStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
}

fn directory_registry() -> SchemaRegistry {
    SchemaRegistry::new(DirectoryStore::new(data_dir()).with_default_version("2.0.0"))
        .expect("registry over test data should build")
}

#[test]
fn test_directory_registry_preloads_defs() {
    let registry = directory_registry();
    let ids = registry.identifiers();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].version(), "2.0.0");
    assert_eq!(ids[0].name(), "defs.json");
}

#[test]
fn test_directory_registry_follows_relative_reference() -> anyhow::Result<()> {
    let registry = directory_registry();
    let histogram = registry.load_schema("histogram.json", None)?;

    let reference = histogram.root()["$ref"].as_str().unwrap_or_default();
    let resolved = registry.resolve_reference(reference, histogram.id())?;

    assert_eq!(resolved.document().id().name(), "defs.json");
    assert_eq!(resolved.target()?["required"][1], "bins");
    Ok(())
}

#[test]
fn test_directory_registry_broken_document() {
    let registry = directory_registry();
    let err = registry.load_schema("broken.json", None).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)), "got {err:?}");
    assert!(!registry
        .identifiers()
        .iter()
        .any(|id| id.name() == "broken.json"));
}

#[test]
fn test_directory_registry_missing_schema() {
    let registry = directory_registry();
    let err = registry.load_schema("model.json", None).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn test_directory_store_listing() {
    let store = DirectoryStore::new(data_dir());
    assert_eq!(store.versions(), vec!["2.0.0".to_string()]);
    assert_eq!(
        store.schema_names("2.0.0"),
        vec!["broken.json", "defs.json", "histogram.json"]
    );
}

#[test]
fn test_concurrent_first_resolution_shares_one_document() {
    let registry = Arc::new(SchemaRegistry::bundled().expect("bundled registry"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .load_schema("patchset.json", None)
                    .expect("patchset.json is bundled")
            })
        })
        .collect();

    let docs: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread should not panic"))
        .collect();

    let cached = registry.load_schema("patchset.json", None).unwrap();
    for doc in &docs {
        assert_eq!(doc.root(), cached.root());
    }
    assert_eq!(registry.len(), 2);
}
