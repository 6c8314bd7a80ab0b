//! Service registries.
//!
//! The refactoring core asks a [`ServiceRegistry`] whether an identifier the
//! directory does not know is a real service, and which class implements it.
//! Two implementations live here: a plain map, and an index built from a
//! workspace's `*.services.yml` files.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::types::ServiceDefinition;

/// Answers "is this a known service, and what implements it?".
pub trait ServiceRegistry: Send + Sync {
    fn lookup(&self, id: &str) -> Option<ServiceDefinition>;

    fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }
}

/// A registry backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryServiceRegistry {
    services: HashMap<String, ServiceDefinition>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &str, class: Option<&str>) {
        self.services.insert(
            id.to_string(),
            ServiceDefinition {
                id: id.to_string(),
                class: class.map(|c| c.trim_start_matches('\\').to_string()),
            },
        );
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_service(mut self, id: &str, class: Option<&str>) -> Self {
        self.insert(id, class);
        self
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn lookup(&self, id: &str) -> Option<ServiceDefinition> {
        self.services.get(id).cloned()
    }
}

// ─── services.yml indexing ──────────────────────────────────────────────────

/// The part of a `*.services.yml` file the index reads.
#[derive(Debug, Default, Deserialize)]
struct ServicesFile {
    #[serde(default)]
    services: Option<Mapping>,
}

/// A registry built from the `*.services.yml` files of a workspace.
#[derive(Debug, Clone, Default)]
pub struct ServicesYamlIndex {
    services: HashMap<String, ServiceDefinition>,
    files_scanned: usize,
}

impl ServicesYamlIndex {
    /// Walk `root` (honouring `.gitignore`) and index every
    /// `*.services.yml` file found.
    pub fn scan(root: &Path) -> Self {
        let mut index = Self::default();
        for entry in ignore::WalkBuilder::new(root).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("skipping unreadable workspace entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let is_services_file = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(".services.yml"));
            if !is_services_file {
                continue;
            }
            let content = match std::fs::read_to_string(entry.path()) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("failed to read {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            match parse_services_file(&content) {
                Ok(definitions) => {
                    index.files_scanned += 1;
                    for definition in definitions {
                        index.services.insert(definition.id.clone(), definition);
                    }
                }
                Err(e) => {
                    tracing::warn!("failed to parse {}: {}", entry.path().display(), e);
                }
            }
        }
        tracing::info!(
            "indexed {} service(s) from {} services.yml file(s)",
            index.services.len(),
            index.files_scanned
        );
        index
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }
}

impl ServiceRegistry for ServicesYamlIndex {
    fn lookup(&self, id: &str) -> Option<ServiceDefinition> {
        self.services.get(id).cloned()
    }
}

/// Extract service definitions from one `services.yml` file.
///
/// Reads the direct children of the top-level `services:` mapping. The
/// class comes from each service's own `class:` key; a service id that is
/// itself a class name (autowired services) implies its class. Keys
/// starting with `_` (such as `_defaults`) are skipped.
pub fn parse_services_file(content: &str) -> Result<Vec<ServiceDefinition>, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let file: ServicesFile = serde_yaml::from_str(content)?;
    let Some(services) = file.services else {
        return Ok(Vec::new());
    };

    let definitions = services
        .iter()
        .filter_map(|(key, value)| {
            let id = key.as_str()?;
            if id.starts_with('_') {
                return None;
            }
            let declared_class = match value {
                Value::Mapping(definition) => definition.get("class").and_then(Value::as_str),
                _ => None,
            };
            let class = declared_class
                .or_else(|| id.contains('\\').then_some(id))
                .map(|c| c.trim_start_matches('\\').to_string());
            Some(ServiceDefinition {
                id: id.to_string(),
                class,
            })
        })
        .collect();
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SERVICES_YML: &str = r#"parameters:
  my_module.limit: 10

services:
  _defaults:
    autowire: true
  my_module.helper:
    class: Drupal\my_module\Helper
    arguments: ['@entity_type.manager']
  my_module.inline: { class: '\Drupal\my_module\Inline' }
  Drupal\my_module\Autowired: ~
  my_module.alias: '@my_module.helper'
"#;

    #[test]
    fn test_parse_services_file() {
        let defs = parse_services_file(SERVICES_YML).unwrap();
        let ids: Vec<&str> = defs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "my_module.helper",
                "my_module.inline",
                "Drupal\\my_module\\Autowired",
                "my_module.alias"
            ]
        );
        assert_eq!(defs[0].class.as_deref(), Some("Drupal\\my_module\\Helper"));
        assert_eq!(defs[1].class.as_deref(), Some("Drupal\\my_module\\Inline"));
        assert_eq!(defs[2].class.as_deref(), Some("Drupal\\my_module\\Autowired"));
        assert_eq!(defs[3].class, None);
    }

    #[test]
    fn test_parameters_are_not_services() {
        let defs = parse_services_file(SERVICES_YML).unwrap();
        assert!(defs.iter().all(|d| d.id != "my_module.limit"));
    }

    #[test]
    fn test_class_comes_from_the_service_itself() {
        let yml = r#"services:
  my_module.built:
    factory: ['@my_module.builder', 'build']
    arguments:
      - { class: Drupal\other\Thing }
  my_module.next:
    class: Drupal\my_module\Next
"#;
        let defs = parse_services_file(yml).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].id, "my_module.built");
        assert_eq!(defs[0].class, None);
        assert_eq!(defs[1].class.as_deref(), Some("Drupal\\my_module\\Next"));
    }

    #[test]
    fn test_files_without_services() {
        assert!(parse_services_file("").unwrap().is_empty());
        assert!(parse_services_file("parameters:\n  a: 1\n").unwrap().is_empty());
        assert!(parse_services_file("services:\n").unwrap().is_empty());
        assert!(parse_services_file("services: [\n").is_err());
    }

    #[test]
    fn test_malformed_file_is_skipped_by_scan() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        fs::write(dir.path().join("broken.services.yml"), "services: [\n").expect("failed to write file");
        fs::write(dir.path().join("good.services.yml"), SERVICES_YML).expect("failed to write file");

        let index = ServicesYamlIndex::scan(dir.path());
        assert_eq!(index.files_scanned(), 1);
        assert!(index.contains("my_module.inline"));
    }

    #[test]
    fn test_scan_workspace() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let module = dir.path().join("web/modules/custom/my_module");
        fs::create_dir_all(&module).expect("failed to create dirs");
        fs::write(module.join("my_module.services.yml"), SERVICES_YML)
            .expect("failed to write services file");
        fs::write(module.join("my_module.info.yml"), "name: My module\n")
            .expect("failed to write info file");

        let index = ServicesYamlIndex::scan(dir.path());
        assert_eq!(index.files_scanned(), 1);
        assert!(index.contains("my_module.helper"));
        assert_eq!(
            index.lookup("my_module.helper").unwrap().class.as_deref(),
            Some("Drupal\\my_module\\Helper")
        );
    }

    #[test]
    fn test_in_memory_registry() {
        let registry = InMemoryServiceRegistry::new().with_service("foo.bar", Some("\\Foo\\Bar"));
        assert!(registry.contains("foo.bar"));
        assert!(!registry.contains("foo.baz"));
        assert_eq!(registry.lookup("foo.bar").unwrap().class.as_deref(), Some("Foo\\Bar"));
    }
}
