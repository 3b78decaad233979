//! Subcommand implementations

use crate::config::CliConfig;
use anyhow::{Context, bail};
use hfspec_ir::Value;
use hfspec_schema::{DirectoryStore, SchemaRegistry};
use hfspec_utils::DigestAlgorithm;
use hfspec_validation::{
    ArrayBackendRegistry, Error as ValidationError, ValidationConfig, ValidationEngine,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info};

/// Registry over the configured schema directory, or the bundled set.
fn registry(config: &CliConfig) -> anyhow::Result<SchemaRegistry> {
    let registry = match &config.schema_dir {
        Some(dir) => {
            info!("Using schema directory: {}", dir.display());
            let mut store = DirectoryStore::new(dir);
            if let Some(version) = &config.default_version {
                store = store.with_default_version(version);
            }
            SchemaRegistry::new(store)
        }
        None => SchemaRegistry::bundled(),
    };
    registry.context("Failed to set up schema registry")
}

/// Read a JSON document, or YAML when the extension says so.
fn read_document(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse {} as YAML", path.display()))
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {} as JSON", path.display()))
    }
}

pub fn validate(config: &CliConfig, input: &Path, schema_name: &str) -> anyhow::Result<ExitCode> {
    let registry = registry(config)?;
    let engine = ValidationEngine::with_config(
        &registry,
        ArrayBackendRegistry::new(),
        ValidationConfig {
            default_version: config.default_version.clone(),
            ..ValidationConfig::default()
        },
    );

    let instance = Value::from(read_document(input)?);
    debug!("Validating {} against {}", input.display(), schema_name);

    match engine.validate_default(&instance, schema_name) {
        Ok(()) => {
            println!("{}: valid", input.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(ValidationError::InvalidSpecification(failure)) => {
            eprintln!("{}: {}", input.display(), failure);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).with_context(|| format!("Could not validate {}", input.display())),
    }
}

pub fn schema(config: &CliConfig, name: &str) -> anyhow::Result<()> {
    let registry = registry(config)?;
    let document = registry.load_schema(name, config.default_version.as_deref())?;
    println!("{}", serde_json::to_string_pretty(document.root())?);
    Ok(())
}

pub fn schemas(config: &CliConfig) -> anyhow::Result<()> {
    let registry = registry(config)?;
    let version = config
        .default_version
        .as_deref()
        .unwrap_or(registry.default_version());

    let names = registry.store().schema_names(version);
    if names.is_empty() {
        bail!("No schemas found for version {version}");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

pub fn digest(config: &CliConfig, input: &Path) -> anyhow::Result<()> {
    let algorithm: DigestAlgorithm = config.digest_algorithm.parse()?;
    let document = read_document(input)?;
    let hash = hfspec_utils::digest(&document, algorithm.as_str())
        .with_context(|| format!("Failed to digest {}", input.display()))?;
    println!("{hash}");
    Ok(())
}

pub fn options(options: Vec<(String, serde_json::Value)>) -> anyhow::Result<()> {
    let mapping: BTreeMap<_, _> = options.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(())
}
