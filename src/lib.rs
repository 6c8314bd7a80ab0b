//! drupal_di_lsp: rewrite static `\Drupal` service-locator calls into
//! constructor dependency injection.
//!
//! The crate is split into a synchronous refactoring core and a thin
//! protocol layer around it:
//!
//! - [`detector`]: finds `\Drupal::service('id')` style calls
//! - [`analyzer`]: recovers class structure from raw text
//! - [`refactor`]: plans and renders the merge-aware edits
//! - [`classify`]: decides the architectural role of a class
//! - [`services`]: the service → interface directory and service registries
//! - [`config`]: user configuration
//! - [`code_action`] and `server`: the language server surface
//!
//! The core never touches global state; everything it needs is passed in.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tower_lsp::Client;
use tower_lsp::lsp_types::{MessageType, Url};

pub mod analyzer;
pub mod classify;
pub mod code_action;
pub mod config;
pub mod detector;
pub mod error;
pub mod refactor;
mod server;
pub mod services;
pub mod types;
pub mod util;

use classify::{HeuristicClassifier, RoleClassifier};
use config::Config;
use services::{InMemoryServiceRegistry, ServiceDirectory, ServiceRegistry, ServicesYamlIndex};

pub struct Backend {
    name: String,
    version: String,
    client: Option<Client>,
    /// Text of every open document, keyed by URI.
    pub(crate) open_files: RwLock<HashMap<Url, String>>,
    pub(crate) workspace_root: RwLock<Option<PathBuf>>,
    pub(crate) config: RwLock<Config>,
    /// Built-in directory plus configured rows.
    pub(crate) directory: RwLock<Arc<ServiceDirectory>>,
    /// Services declared in the workspace's `*.services.yml` files.
    pub(crate) registry: RwLock<Arc<dyn ServiceRegistry>>,
    pub(crate) classifier: RwLock<Arc<dyn RoleClassifier>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self::with_client(Some(client))
    }

    /// A backend without a client, for tests.
    pub fn new_test() -> Self {
        Self::with_client(None)
    }

    /// A test backend rooted at `root`, with its configuration and
    /// services index already loaded.
    pub fn new_test_with_workspace(root: PathBuf) -> Self {
        let backend = Self::with_client(None);
        *backend.workspace_root.write() = Some(root);
        backend.load_workspace();
        backend
    }

    fn with_client(client: Option<Client>) -> Self {
        Self {
            name: "drupal-di-lsp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            client,
            open_files: RwLock::new(HashMap::new()),
            workspace_root: RwLock::new(None),
            config: RwLock::new(Config::default()),
            directory: RwLock::new(Arc::new(ServiceDirectory::builtin().clone())),
            registry: RwLock::new(Arc::new(InMemoryServiceRegistry::new())),
            classifier: RwLock::new(Arc::new(HeuristicClassifier::new())),
        }
    }

    /// Install `config`: rebuilds the service directory and the classifier.
    pub fn configure(&self, config: Config) {
        *self.directory.write() = Arc::new(config.service_directory());
        *self.classifier.write() = Arc::new(HeuristicClassifier::new().with_mappings(&config.base_class_roles));
        *self.config.write() = config;
    }

    /// Load the configuration and index the services files of the
    /// workspace root.  Returns the number of indexed services.
    pub fn load_workspace(&self) -> usize {
        let root = self.workspace_root.read().clone();
        self.configure(Config::load(root.as_deref()));

        let Some(root) = root else {
            return 0;
        };
        let index = ServicesYamlIndex::scan(&root);
        let count = index.len();
        *self.registry.write() = Arc::new(index);
        count
    }

    /// Current text of an open document.
    pub fn document(&self, uri: &Url) -> Option<String> {
        self.open_files.read().get(uri).cloned()
    }

    pub(crate) async fn log(&self, typ: MessageType, message: String) {
        if let Some(client) = &self.client {
            client.log_message(typ, message).await;
        }
    }
}
