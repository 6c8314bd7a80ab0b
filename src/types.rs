//! Data types used throughout the refactoring core.
//!
//! This module contains the "model" structs and enums shared by the
//! static-call detector, the class-structure analyzer, the injection
//! strategies and the edit assembler.  Everything here is plain owned data
//! describing one text snapshot; nothing is cached across requests.

use std::cell::OnceCell;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Position, Range, TextEdit};

// ─── Static calls ───────────────────────────────────────────────────────────

/// The textual form a service-locator call was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallShape {
    /// `\Drupal::service('id')`
    DirectLocator,
    /// `\Drupal::getContainer()->get('id')`, or `$container->get('id')`
    /// where `$container` was assigned from `\Drupal::getContainer()`.
    ContainerIndirect,
    /// A named helper on the `\Drupal` class, e.g. `\Drupal::messenger()`.
    NamedShortcut,
}

/// A method call that must follow the injected field for a shortcut
/// that returns something derived from the service.
///
/// `\Drupal::config('system.site')` resolves through `config.factory`
/// and becomes `$this->configFactory->get('system.site')`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortcutAccessor {
    /// The method invoked on the service (e.g. `"get"`).
    pub method: String,
    /// The verbatim argument text of the original call (may be empty).
    pub arguments: String,
}

/// One located service-locator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticServiceCall {
    /// The service container key (e.g. `"entity_type.manager"`).
    pub service_id: String,
    /// Zero-based line of the call.
    pub line: u32,
    /// Start column in UTF-16 code units.
    pub start_column: u32,
    /// End column (exclusive) in UTF-16 code units.
    pub end_column: u32,
    /// The literal text that was matched.
    pub matched_text: String,
    pub shape: CallShape,
    /// Present for shortcuts that call a method on the resolved service.
    pub accessor: Option<ShortcutAccessor>,
}

impl StaticServiceCall {
    /// The LSP range covered by the call expression.
    pub fn range(&self) -> Range {
        Range {
            start: Position {
                line: self.line,
                character: self.start_column,
            },
            end: Position {
                line: self.line,
                character: self.end_column,
            },
        }
    }
}

// ─── Service directory ──────────────────────────────────────────────────────

/// One row of the service-interface directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInterfaceInfo {
    pub service_id: String,
    /// Fully-qualified interface name without a leading `\`.
    pub interface_fqn: String,
    /// Last segment of the interface name (e.g. `"RendererInterface"`).
    pub short_name: String,
    /// camelCase property name (e.g. `"renderer"`).
    pub field_name: String,
    /// The `use` statement importing the interface.
    pub import_line: String,
    /// Human-readable service name used in doc comments (e.g. `"renderer"`).
    pub description: String,
}

/// A service definition as seen by a service registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub id: String,
    /// The implementation class, when the definition declares one.
    pub class: Option<String>,
}

// ─── Class structure ────────────────────────────────────────────────────────

/// An inclusive range of zero-based line indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: u32,
    pub end: u32,
}

impl LineSpan {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, line: u32) -> bool {
        line >= self.start && line <= self.end
    }
}

/// A top-level `use` import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    /// Fully-qualified name without a leading `\`.
    pub fqn: String,
    /// The alias from `use Foo\Bar as Baz;`, if any.
    pub alias: Option<String>,
    pub line: u32,
}

impl ImportInfo {
    /// The name this import binds in the file.
    pub fn local_name(&self) -> &str {
        self.alias
            .as_deref()
            .unwrap_or_else(|| crate::util::short_name(&self.fqn))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Trait,
    Interface,
    Enum,
    /// `new class(...) { ... }`
    Anonymous,
}

/// The class-like declaration a snapshot was taken for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDeclaration {
    pub kind: ClassKind,
    /// Short name (`"class@anonymous"` for anonymous classes).
    pub name: String,
    /// Raw parent name from the `extends` clause.
    pub parent: Option<String>,
    /// Raw names from the `implements` clause.
    pub interfaces: Vec<String>,
    /// Line of the declaration keyword.
    pub line: u32,
    /// First line of the doc comment / attributes preceding the declaration
    /// (equal to `line` when there are none).
    pub leading_line: u32,
    /// Line holding the body's opening brace.
    pub open_brace_line: u32,
    /// Line holding the body's closing brace.
    pub close_brace_line: u32,
}

/// A declared property.  Constructor-promoted parameters are recorded here
/// too since they declare a property of the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Property name WITHOUT the `$` prefix.
    pub name: String,
    pub line: u32,
    pub type_hint: Option<String>,
    pub has_doc: bool,
    pub doc: Option<LineSpan>,
    pub promoted: bool,
}

impl FieldInfo {
    /// First line belonging to this declaration (its doc comment if any).
    pub fn leading_line(&self) -> u32 {
        self.doc.map_or(self.line, |d| d.start)
    }
}

/// A method other than (and including) the constructor and factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: String,
    /// From the `function` line through the closing brace (or `;`).
    pub span: LineSpan,
    pub doc: Option<LineSpan>,
    pub is_static: bool,
}

impl MethodInfo {
    pub fn leading_line(&self) -> u32 {
        self.doc.map_or(self.span.start, |d| d.start)
    }
}

/// One constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorParam {
    /// Parameter name WITHOUT the `$` prefix.
    pub name: String,
    pub type_hint: Option<String>,
    /// Whether the parameter carries a visibility modifier.
    pub promoted: bool,
    /// The parameter exactly as written (trimmed).
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorInfo {
    pub start_line: u32,
    pub open_brace_line: u32,
    pub end_line: u32,
    pub params: Vec<ConstructorParam>,
    /// Raw lines strictly between the opening and closing brace lines.
    pub body: Vec<String>,
    pub doc: Option<LineSpan>,
    /// Whether the parameter list spans more than one line.
    pub multiline_params: bool,
    /// Whether the last parameter is followed by a trailing comma.
    pub trailing_comma: bool,
    /// Source text from the start of `start_line` through the `(` that
    /// opens the parameter list.
    pub signature_prefix: String,
    /// Source text from the `)` closing the parameter list through the `{`
    /// opening the body.
    pub signature_suffix: String,
}

impl ConstructorInfo {
    pub fn leading_line(&self) -> u32 {
        self.doc.map_or(self.start_line, |d| d.start)
    }

    pub fn param(&self, name: &str) -> Option<&ConstructorParam> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// How an existing factory method hands services to the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryShape {
    /// `return new static(...)` / `return new self(...)`.
    NewStatic {
        /// `"static"` or `"self"`.
        keyword: String,
        /// Argument expressions, trimmed, in order.
        arguments: Vec<String>,
        /// Whether the last argument is followed by a trailing comma.
        trailing_comma: bool,
        /// Line holding `return new static(`.
        return_line: u32,
        /// Line holding the `);` that ends the return statement.
        return_end_line: u32,
    },
    /// `$instance = parent::create(...); $instance->x = ...; return $instance;`
    InstanceAssign {
        /// The variable holding the instance (without `$`).
        variable: String,
        /// `(field, service id)` pairs already assigned.
        assignments: Vec<(String, String)>,
        /// Line holding `return $instance;`.
        return_line: u32,
    },
    /// Anything the recognizer does not understand.
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryInfo {
    pub start_line: u32,
    pub open_brace_line: u32,
    pub end_line: u32,
    /// Variable name of the container parameter (without `$`).
    pub container_var: String,
    /// Every `$container->get('id')` identifier, in body order.
    pub service_ids: Vec<String>,
    pub shape: FactoryShape,
    pub doc: Option<LineSpan>,
}

impl FactoryInfo {
    pub fn leading_line(&self) -> u32 {
        self.doc.map_or(self.start_line, |d| d.start)
    }
}

/// Structural snapshot of one class in one source text.
///
/// Every line index refers to the exact text the snapshot was taken from;
/// re-run the analyzer after applying any edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhpClassInfo {
    /// Top-level imports in source order.
    pub imports: Vec<ImportInfo>,
    pub namespace_line: Option<u32>,
    pub class: ClassDeclaration,
    /// Trait `use` statements inside the class body, in order.
    pub trait_uses: Vec<LineSpan>,
    /// Declared properties in source order.
    pub fields: Vec<FieldInfo>,
    /// Every method in the class body, in source order.
    pub methods: Vec<MethodInfo>,
    pub constructor: Option<ConstructorInfo>,
    pub factory: Option<FactoryInfo>,
}

impl PhpClassInfo {
    /// Whether a `use` import for `fqn` exists, ignoring a leading `\`.
    pub fn has_import(&self, fqn: &str) -> bool {
        let wanted = fqn.trim_start_matches('\\');
        self.imports
            .iter()
            .any(|i| i.fqn.eq_ignore_ascii_case(wanted))
    }

    /// The import bound to a local (short or alias) name, if any.
    pub fn import_for_local_name(&self, name: &str) -> Option<&ImportInfo> {
        self.imports.iter().find(|i| i.local_name() == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn last_import_line(&self) -> Option<u32> {
        self.imports.iter().map(|i| i.line).max()
    }

    /// Whether `line` falls inside the class body.
    pub fn body_contains(&self, line: u32) -> bool {
        line > self.class.open_brace_line && line < self.class.close_brace_line
    }

    /// The static method whose span contains `line`, if any.
    pub fn static_method_at(&self, line: u32) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.is_static && m.span.contains(line))
    }

    /// Resolve a fully-qualified name for a type as written in this file.
    pub fn resolve_type_name(&self, name: &str) -> String {
        if let Some(stripped) = name.strip_prefix('\\') {
            return stripped.to_string();
        }
        let first = name.split('\\').next().unwrap_or(name);
        match self.import_for_local_name(first) {
            Some(import) => format!("{}{}", import.fqn, &name[first.len()..]),
            None => name.to_string(),
        }
    }

    /// The property an already-injected service is stored in.
    ///
    /// Follows the existing wiring: for `$instance->x = $container->get()`
    /// factories the assignment names the field directly; for `new static()`
    /// factories the argument position selects the constructor parameter,
    /// which is either promoted or assigned to `$this->field`.
    pub fn field_for_service(&self, service_id: &str) -> Option<String> {
        let factory = self.factory.as_ref()?;
        match &factory.shape {
            FactoryShape::InstanceAssign { assignments, .. } => assignments
                .iter()
                .find(|(_, id)| id == service_id)
                .map(|(field, _)| field.clone()),
            FactoryShape::NewStatic { arguments, .. } => {
                let index = arguments
                    .iter()
                    .position(|arg| crate::analyzer::container_get_id(arg).as_deref() == Some(service_id))?;
                let param = self.constructor.as_ref()?.params.get(index)?;
                self.field_for_param(&param.name)
            }
            FactoryShape::Unrecognized => None,
        }
    }

    /// The property a constructor parameter ends up in.
    pub fn field_for_param(&self, param_name: &str) -> Option<String> {
        let ctor = self.constructor.as_ref()?;
        let param = ctor.param(param_name)?;
        if param.promoted {
            return Some(param.name.clone());
        }
        ctor.body
            .iter()
            .find_map(|line| crate::analyzer::assigned_field(line, param_name))
    }
}

// ─── Roles ──────────────────────────────────────────────────────────────────

/// The architectural role of a class, as reported by a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArchitecturalRole {
    /// Controllers and forms: `create(ContainerInterface $container)`.
    BaseClass,
    /// Plugins: `create($container, $configuration, $plugin_id, $plugin_definition)`.
    PluginFactory,
    /// Any role no strategy is registered for.
    Other(String),
}

impl ArchitecturalRole {
    pub fn as_str(&self) -> &str {
        match self {
            ArchitecturalRole::BaseClass => "base-class",
            ArchitecturalRole::PluginFactory => "plugin-factory",
            ArchitecturalRole::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ArchitecturalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ArchitecturalRole {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "base-class" | "base_class" | "controller" | "form" => ArchitecturalRole::BaseClass,
            "plugin-factory" | "plugin_factory" | "plugin" => ArchitecturalRole::PluginFactory,
            _ => ArchitecturalRole::Other(tag),
        }
    }
}

impl From<ArchitecturalRole> for String {
    fn from(role: ArchitecturalRole) -> Self {
        role.as_str().to_string()
    }
}

impl FromStr for ArchitecturalRole {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ArchitecturalRole::from(s.to_string()))
    }
}

/// What a role classifier reports about the class at a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHierarchy {
    pub role: ArchitecturalRole,
    /// Ancestor class short names, nearest first.
    pub ancestors: Vec<String>,
    /// Interface short names implemented by the class or its ancestors.
    pub interfaces: Vec<String>,
}

// ─── Edits ──────────────────────────────────────────────────────────────────

/// One textual replacement plus a description of what it does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefactoringEdit {
    pub description: String,
    pub range: Range,
    pub new_text: String,
}

impl RefactoringEdit {
    pub fn replace(description: impl Into<String>, range: Range, new_text: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            range,
            new_text: new_text.into(),
        }
    }

    /// A zero-width insertion at `(line, character)`.
    pub fn insert(
        description: impl Into<String>,
        line: u32,
        character: u32,
        new_text: impl Into<String>,
    ) -> Self {
        let at = Position { line, character };
        Self::replace(description, Range { start: at, end: at }, new_text)
    }

    pub fn is_insertion(&self) -> bool {
        self.range.start == self.range.end
    }
}

impl From<&RefactoringEdit> for TextEdit {
    fn from(edit: &RefactoringEdit) -> Self {
        TextEdit {
            range: edit.range,
            new_text: edit.new_text.clone(),
        }
    }
}

// ─── Refactoring context ────────────────────────────────────────────────────

/// The working unit of one refactor request.
///
/// The class snapshot is filled in exactly once, by the refactor operation,
/// after the source has been analyzed.
#[derive(Debug)]
pub struct DiRefactoringContext<'a> {
    pub source: &'a str,
    pub role: ArchitecturalRole,
    /// Service ids to inject.  Empty means "every service the class
    /// currently fetches statically".
    pub services: Vec<String>,
    /// Line used to pick the innermost enclosing class; the first class in
    /// the file is used when absent.
    pub cursor_line: Option<u32>,
    /// Interface short names known from the class hierarchy.
    pub known_interfaces: Vec<String>,
    snapshot: OnceCell<PhpClassInfo>,
}

impl<'a> DiRefactoringContext<'a> {
    pub fn new(source: &'a str, role: ArchitecturalRole, services: Vec<String>) -> Self {
        Self {
            source,
            role,
            services,
            cursor_line: None,
            known_interfaces: Vec::new(),
            snapshot: OnceCell::new(),
        }
    }

    pub fn with_cursor_line(mut self, line: u32) -> Self {
        self.cursor_line = Some(line);
        self
    }

    /// Seed role and interface names from a classifier result.
    pub fn with_hierarchy(mut self, hierarchy: &ClassHierarchy) -> Self {
        self.role = hierarchy.role.clone();
        self.known_interfaces = hierarchy.interfaces.clone();
        self
    }

    pub fn snapshot(&self) -> Option<&PhpClassInfo> {
        self.snapshot.get()
    }

    /// Store the analyzer snapshot.  Fails (returning the value) when one
    /// was already set.
    pub fn set_snapshot(&self, info: PhpClassInfo) -> Result<(), PhpClassInfo> {
        self.snapshot.set(info)
    }
}
