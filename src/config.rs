//! User configuration.
//!
//! Read from `.drupal-di.toml` at the workspace root, or failing that from
//! `drupal-di/config.toml` in the user's configuration directory.  Every
//! field is optional; a missing or broken file means defaults.
//!
//! ```toml
//! indent = "    "
//! strict_services = true
//!
//! [base_class_roles]
//! MyModuleFormBase = "base-class"
//! MyPluginBase = "plugin-factory"
//!
//! [services."my_module.helper"]
//! interface = "Drupal\\my_module\\HelperInterface"
//! field = "helper"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::services::ServiceDirectory;
use crate::types::ArchitecturalRole;

/// File name looked up at the workspace root.
pub const CONFIG_FILE_NAME: &str = ".drupal-di.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Indentation unit used for synthesized code when the class itself
    /// gives no hint.
    pub indent: String,
    /// Drop service ids that neither the directory nor the service
    /// registry knows about.
    pub strict_services: bool,
    /// Extra parent class short name → role mappings.
    pub base_class_roles: HashMap<String, ArchitecturalRole>,
    /// Extra service directory rows, keyed by service id.
    pub services: HashMap<String, ServiceOverride>,
}

/// One configured service directory row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceOverride {
    pub interface: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            strict_services: false,
            base_class_roles: HashMap::new(),
            services: HashMap::new(),
        }
    }
}

impl Config {
    /// Load the configuration for a workspace, falling back to the user
    /// configuration file and then to defaults.  Problems are logged.
    pub fn load(workspace_root: Option<&Path>) -> Self {
        let candidates = workspace_root
            .map(|root| root.join(CONFIG_FILE_NAME))
            .into_iter()
            .chain(user_config_path());

        for path in candidates {
            match Self::try_load_from_path(&path) {
                Ok(Some(config)) => {
                    tracing::info!("loaded configuration from {}", path.display());
                    return config;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("{}; using default configuration", e);
                    return Self::default();
                }
            }
        }
        Self::default()
    }

    /// Parse the file at `path`.  `Ok(None)` when it does not exist.
    pub fn try_load_from_path(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    /// The built-in service directory extended with the configured rows.
    pub fn service_directory(&self) -> ServiceDirectory {
        let mut directory = ServiceDirectory::builtin().clone();
        let mut ids: Vec<&String> = self.services.keys().collect();
        ids.sort();
        for id in ids {
            let row = &self.services[id];
            directory.insert(id, &row.interface, row.field.as_deref(), row.description.as_deref());
        }
        directory
    }
}

/// `<config dir>/drupal-di/config.toml`, if a home directory can be found.
fn user_config_path() -> Option<PathBuf> {
    match etcetera::choose_base_strategy() {
        Ok(strategy) => Some(strategy.config_dir().join("drupal-di").join("config.toml")),
        Err(e) => {
            tracing::debug!("no user configuration directory: {}", e);
            None
        }
    }
}
