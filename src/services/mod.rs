/// Service knowledge: the static interface directory and the registries
/// used to validate identifiers that the directory does not know.
///
/// - **directory**: well-known service ids → interface, field name, import
/// - **registry**: the `ServiceRegistry` collaborator trait, an in-memory
///   implementation, and an index built from `*.services.yml` files
pub mod directory;
pub mod registry;

pub use directory::ServiceDirectory;
pub use registry::{InMemoryServiceRegistry, ServiceRegistry, ServicesYamlIndex};
