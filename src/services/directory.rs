//! The service-interface directory.
//!
//! A static table mapping the service ids that Drupal code most commonly
//! fetches through `\Drupal` to the interface a constructor should type
//! against, the property name the injected service is stored in, and the
//! `use` line importing the interface.  The built-in table can be extended
//! (never shrunk) from configuration.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::ServiceInterfaceInfo;
use crate::util::{camel_case, human_name, short_name};

/// `(service id, interface FQN, field name, description)`.
///
/// An empty field name means "derive it from the id"; an empty description
/// means "derive it from the id".
const BUILTIN_SERVICES: &[(&str, &str, &str, &str)] = &[
    ("access_manager", "Drupal\\Core\\Access\\AccessManagerInterface", "", ""),
    ("cache.default", "Drupal\\Core\\Cache\\CacheBackendInterface", "cache", "default cache backend"),
    ("cache.render", "Drupal\\Core\\Cache\\CacheBackendInterface", "renderCache", "render cache backend"),
    ("cache_tags.invalidator", "Drupal\\Core\\Cache\\CacheTagsInvalidatorInterface", "", "cache tags invalidator"),
    ("class_resolver", "Drupal\\Core\\DependencyInjection\\ClassResolverInterface", "", ""),
    ("config.factory", "Drupal\\Core\\Config\\ConfigFactoryInterface", "configFactory", "config factory"),
    ("config.typed", "Drupal\\Core\\Config\\TypedConfigManagerInterface", "typedConfigManager", "typed config manager"),
    ("csrf_token", "Drupal\\Core\\Access\\CsrfTokenGenerator", "csrfToken", "CSRF token generator"),
    ("current_route_match", "Drupal\\Core\\Routing\\RouteMatchInterface", "routeMatch", "current route match"),
    ("current_user", "Drupal\\Core\\Session\\AccountProxyInterface", "currentUser", "current user"),
    ("database", "Drupal\\Core\\Database\\Connection", "database", "database connection"),
    ("date.formatter", "Drupal\\Core\\Datetime\\DateFormatterInterface", "dateFormatter", "date formatter"),
    ("datetime.time", "Drupal\\Component\\Datetime\\TimeInterface", "time", "time service"),
    ("email.validator", "Drupal\\Component\\Utility\\EmailValidatorInterface", "emailValidator", "email validator"),
    ("entity.form_builder", "Drupal\\Core\\Entity\\EntityFormBuilderInterface", "entityFormBuilder", "entity form builder"),
    ("entity.repository", "Drupal\\Core\\Entity\\EntityRepositoryInterface", "entityRepository", "entity repository"),
    ("entity_display.repository", "Drupal\\Core\\Entity\\EntityDisplayRepositoryInterface", "entityDisplayRepository", "entity display repository"),
    ("entity_field.manager", "Drupal\\Core\\Entity\\EntityFieldManagerInterface", "entityFieldManager", "entity field manager"),
    ("entity_type.bundle.info", "Drupal\\Core\\Entity\\EntityTypeBundleInfoInterface", "entityTypeBundleInfo", "entity type bundle info"),
    ("entity_type.manager", "Drupal\\Core\\Entity\\EntityTypeManagerInterface", "entityTypeManager", "entity type manager"),
    ("event_dispatcher", "Symfony\\Contracts\\EventDispatcher\\EventDispatcherInterface", "eventDispatcher", "event dispatcher"),
    ("extension.list.module", "Drupal\\Core\\Extension\\ModuleExtensionList", "moduleExtensionList", "module extension list"),
    ("file_system", "Drupal\\Core\\File\\FileSystemInterface", "fileSystem", "file system"),
    ("file_url_generator", "Drupal\\Core\\File\\FileUrlGeneratorInterface", "fileUrlGenerator", "file URL generator"),
    ("flood", "Drupal\\Core\\Flood\\FloodInterface", "flood", "flood control"),
    ("form_builder", "Drupal\\Core\\Form\\FormBuilderInterface", "formBuilder", "form builder"),
    ("http_client", "GuzzleHttp\\ClientInterface", "httpClient", "HTTP client"),
    ("keyvalue", "Drupal\\Core\\KeyValueStore\\KeyValueFactoryInterface", "keyValueFactory", "key value factory"),
    ("keyvalue.expirable", "Drupal\\Core\\KeyValueStore\\KeyValueExpirableFactoryInterface", "keyValueExpirableFactory", "expirable key value factory"),
    ("language_manager", "Drupal\\Core\\Language\\LanguageManagerInterface", "languageManager", "language manager"),
    ("link_generator", "Drupal\\Core\\Utility\\LinkGeneratorInterface", "linkGenerator", "link generator"),
    ("lock", "Drupal\\Core\\Lock\\LockBackendInterface", "lock", "lock backend"),
    ("logger.factory", "Drupal\\Core\\Logger\\LoggerChannelFactoryInterface", "loggerFactory", "logger channel factory"),
    ("menu.link_tree", "Drupal\\Core\\Menu\\MenuLinkTreeInterface", "menuLinkTree", "menu link tree"),
    ("messenger", "Drupal\\Core\\Messenger\\MessengerInterface", "messenger", "messenger"),
    ("module_handler", "Drupal\\Core\\Extension\\ModuleHandlerInterface", "moduleHandler", "module handler"),
    ("password_generator", "Drupal\\Core\\Password\\PasswordGeneratorInterface", "passwordGenerator", "password generator"),
    ("path.current", "Drupal\\Core\\Path\\CurrentPathStack", "currentPath", "current path stack"),
    ("path.validator", "Drupal\\Core\\Path\\PathValidatorInterface", "pathValidator", "path validator"),
    ("path_alias.manager", "Drupal\\path_alias\\AliasManagerInterface", "aliasManager", "path alias manager"),
    ("plugin.manager.block", "Drupal\\Core\\Block\\BlockManagerInterface", "blockManager", "block plugin manager"),
    ("plugin.manager.mail", "Drupal\\Core\\Mail\\MailManagerInterface", "mailManager", "mail manager"),
    ("queue", "Drupal\\Core\\Queue\\QueueFactory", "queueFactory", "queue factory"),
    ("redirect.destination", "Drupal\\Core\\Routing\\RedirectDestinationInterface", "redirectDestination", "redirect destination"),
    ("renderer", "Drupal\\Core\\Render\\RendererInterface", "renderer", "renderer"),
    ("request_stack", "Symfony\\Component\\HttpFoundation\\RequestStack", "requestStack", "request stack"),
    ("router.admin_context", "Drupal\\Core\\Routing\\AdminContext", "adminContext", "admin context"),
    ("serializer", "Symfony\\Component\\Serializer\\SerializerInterface", "serializer", "serializer"),
    ("state", "Drupal\\Core\\State\\StateInterface", "state", "state"),
    ("string_translation", "Drupal\\Core\\StringTranslation\\TranslationInterface", "stringTranslation", "string translation"),
    ("theme.manager", "Drupal\\Core\\Theme\\ThemeManagerInterface", "themeManager", "theme manager"),
    ("theme_handler", "Drupal\\Core\\Extension\\ThemeHandlerInterface", "themeHandler", "theme handler"),
    ("token", "Drupal\\Core\\Utility\\Token", "token", "token service"),
    ("transliteration", "Drupal\\Component\\Transliteration\\TransliterationInterface", "transliteration", "transliteration"),
    ("typed_data_manager", "Drupal\\Core\\TypedData\\TypedDataManagerInterface", "typedDataManager", "typed data manager"),
    ("url_generator", "Drupal\\Core\\Routing\\UrlGeneratorInterface", "urlGenerator", "URL generator"),
    ("user.data", "Drupal\\user\\UserDataInterface", "userData", "user data"),
];

static BUILTIN: LazyLock<ServiceDirectory> = LazyLock::new(|| {
    let mut directory = ServiceDirectory::empty();
    for &(id, interface, field, description) in BUILTIN_SERVICES {
        directory.insert(
            id,
            interface,
            (!field.is_empty()).then_some(field),
            (!description.is_empty()).then_some(description),
        );
    }
    directory
});

/// Lookup table from service id to [`ServiceInterfaceInfo`].
#[derive(Debug, Clone, Default)]
pub struct ServiceDirectory {
    entries: Vec<ServiceInterfaceInfo>,
    by_id: HashMap<String, usize>,
}

impl ServiceDirectory {
    /// A directory with no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table, shared for the lifetime of the process.
    pub fn builtin() -> &'static ServiceDirectory {
        &BUILTIN
    }

    /// Add (or replace) one row.
    ///
    /// `field` defaults to the camelCase form of `id`; `description`
    /// defaults to the id with separators turned into spaces.
    pub fn insert(&mut self, id: &str, interface: &str, field: Option<&str>, description: Option<&str>) {
        let interface_fqn = interface.trim_start_matches('\\').to_string();
        let info = ServiceInterfaceInfo {
            service_id: id.to_string(),
            short_name: short_name(&interface_fqn).to_string(),
            field_name: field.map_or_else(|| camel_case(id), str::to_string),
            import_line: format!("use {};", interface_fqn),
            description: description.map_or_else(|| human_name(id), str::to_string),
            interface_fqn,
        };
        match self.by_id.get(id) {
            Some(&idx) => self.entries[idx] = info,
            None => {
                self.by_id.insert(id.to_string(), self.entries.len());
                self.entries.push(info);
            }
        }
    }

    pub fn lookup(&self, id: &str) -> Option<&ServiceInterfaceInfo> {
        self.by_id.get(id).map(|&idx| &self.entries[idx])
    }

    /// The first row (in table order) whose interface matches `fqn`.
    pub fn find_by_interface(&self, fqn: &str) -> Option<&ServiceInterfaceInfo> {
        let wanted = fqn.trim_start_matches('\\');
        self.entries
            .iter()
            .find(|e| e.interface_fqn.eq_ignore_ascii_case(wanted))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceInterfaceInfo> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let dir = ServiceDirectory::builtin();
        let renderer = dir.lookup("renderer").expect("renderer should be known");
        assert_eq!(renderer.interface_fqn, "Drupal\\Core\\Render\\RendererInterface");
        assert_eq!(renderer.short_name, "RendererInterface");
        assert_eq!(renderer.field_name, "renderer");
        assert_eq!(renderer.import_line, "use Drupal\\Core\\Render\\RendererInterface;");
    }

    #[test]
    fn test_builtin_ids_are_unique() {
        let dir = ServiceDirectory::builtin();
        assert_eq!(dir.len(), BUILTIN_SERVICES.len());
    }

    #[test]
    fn test_insert_derives_defaults() {
        let mut dir = ServiceDirectory::empty();
        dir.insert("my_module.helper", "\\Drupal\\my_module\\HelperInterface", None, None);
        let row = dir.lookup("my_module.helper").unwrap();
        assert_eq!(row.field_name, "myModuleHelper");
        assert_eq!(row.interface_fqn, "Drupal\\my_module\\HelperInterface");
        assert_eq!(row.description, "my module helper");
    }

    #[test]
    fn test_find_by_interface_prefers_table_order() {
        let dir = ServiceDirectory::builtin();
        let row = dir
            .find_by_interface("\\Drupal\\Core\\Cache\\CacheBackendInterface")
            .unwrap();
        assert_eq!(row.service_id, "cache.default");
    }
}
