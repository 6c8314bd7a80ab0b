//! Architectural role classification.
//!
//! The refactoring core needs to know whether a class is wired through
//! `create(ContainerInterface $container)` (controllers, forms) or through
//! the plugin factory signature.  A full implementation would walk the real
//! class hierarchy; [`HeuristicClassifier`] decides from the declaration
//! text alone, which covers the direct-subclass case Drupal code mostly
//! consists of.

use std::collections::HashMap;

use crate::analyzer;
use crate::types::{ArchitecturalRole, ClassHierarchy};
use crate::util::short_name;

/// Reports the role of the class enclosing a source position.
pub trait RoleClassifier: Send + Sync {
    fn classify(&self, source: &str, line: u32) -> Option<ClassHierarchy>;
}

pub(crate) const BASE_CLASS_PARENTS: &[&str] = &[
    "ControllerBase",
    "FormBase",
    "ConfigFormBase",
    "ConfirmFormBase",
    "EntityForm",
    "ContentEntityForm",
];

const PLUGIN_PARENTS: &[&str] = &[
    "BlockBase",
    "PluginBase",
    "QueueWorkerBase",
    "ConditionPluginBase",
    "ActionBase",
    "ConfigurableActionBase",
    "ProcessPluginBase",
    "FilterBase",
];

/// Marker interface for classes instantiated through `create($container)`.
pub const CONTAINER_INJECTION_INTERFACE: &str = "ContainerInjectionInterface";
/// Marker interface for plugins instantiated through the plugin factory.
pub const CONTAINER_FACTORY_PLUGIN_INTERFACE: &str = "ContainerFactoryPluginInterface";

/// Classifies by the parent class short name, then by the marker
/// interfaces in the `implements` clause.
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier {
    extra: HashMap<String, ArchitecturalRole>,
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add parent class short name → role mappings (configured ones win
    /// over the built-in table).
    pub fn with_mappings(mut self, mappings: &HashMap<String, ArchitecturalRole>) -> Self {
        self.extra
            .extend(mappings.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    fn role_for_parent(&self, parent: &str) -> Option<ArchitecturalRole> {
        if let Some(role) = self.extra.get(parent) {
            return Some(role.clone());
        }
        if BASE_CLASS_PARENTS.contains(&parent) {
            Some(ArchitecturalRole::BaseClass)
        } else if PLUGIN_PARENTS.contains(&parent) {
            Some(ArchitecturalRole::PluginFactory)
        } else {
            None
        }
    }
}

impl RoleClassifier for HeuristicClassifier {
    fn classify(&self, source: &str, line: u32) -> Option<ClassHierarchy> {
        let info = analyzer::analyze_at(source, line)?;
        let ancestors: Vec<String> = info
            .class
            .parent
            .iter()
            .map(|p| short_name(p).to_string())
            .collect();
        let mut interfaces: Vec<String> = info
            .class
            .interfaces
            .iter()
            .map(|i| short_name(i).to_string())
            .collect();

        let by_parent = ancestors.first().and_then(|p| self.role_for_parent(p));
        let by_interface = if interfaces.iter().any(|i| i == CONTAINER_FACTORY_PLUGIN_INTERFACE) {
            Some(ArchitecturalRole::PluginFactory)
        } else if interfaces.iter().any(|i| i == CONTAINER_INJECTION_INTERFACE) {
            Some(ArchitecturalRole::BaseClass)
        } else {
            None
        };

        let role = by_parent.or(by_interface).unwrap_or_else(|| {
            ArchitecturalRole::Other(ancestors.first().cloned().unwrap_or_else(|| "plain".to_string()))
        });

        // The base-class parents already implement the marker interface.
        if role == ArchitecturalRole::BaseClass
            && ancestors.first().is_some_and(|p| BASE_CLASS_PARENTS.contains(&p.as_str()))
            && !interfaces.iter().any(|i| i == CONTAINER_INJECTION_INTERFACE)
        {
            interfaces.push(CONTAINER_INJECTION_INTERFACE.to_string());
        }

        tracing::debug!("classified {} as {}", info.class.name, role);
        Some(ClassHierarchy {
            role,
            ancestors,
            interfaces,
        })
    }
}
