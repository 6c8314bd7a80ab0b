/// Merge-aware dependency injection refactoring.
///
/// Given a source text, the role of the class being edited and the service
/// ids to inject, [`Refactorer`] produces one [`EditBatch`] that:
///
///   - imports the interfaces the new properties are typed against,
///   - adds the role's marker interface when a factory is synthesized,
///   - declares one documented property per new service,
///   - merges new parameters into the constructor (or creates one),
///   - merges new `$container->get()` arguments into `create()` (or
///     creates it),
///   - rewrites the static `\Drupal` calls inside the class.
///
/// Services the existing factory already resolves are never emitted again,
/// so running the refactor on its own output yields an empty batch.
///
/// Sub-modules:
/// - [`strategy`]: per-role conventions and dispatch
/// - [`assembler`]: edit ordering and application
/// - `render`: text synthesis
pub mod assembler;
mod base_class;
mod plugin;
mod render;
pub mod strategy;

use std::collections::{HashMap, HashSet};

use crate::analyzer;
use crate::config::Config;
use crate::detector::{detect_static_calls, unique_service_ids};
use crate::error::RefactorError;
use crate::services::{ServiceDirectory, ServiceRegistry};
use crate::types::{
    ArchitecturalRole, ClassKind, DiRefactoringContext, FactoryShape, PhpClassInfo, RefactoringEdit,
    StaticServiceCall,
};
use crate::util::{ScannedSource, byte_index_for_column, camel_case, human_name, leading_whitespace, short_name, snake_case, utf16_len};

pub use assembler::{EditBatch, apply_edits};
pub use render::CodeStyle;
pub use strategy::{InjectionStrategy, LeadingParam, Strategy};

/// The container type every synthesized `create()` receives.
pub const CONTAINER_INTERFACE: &str = "Symfony\\Component\\DependencyInjection\\ContainerInterface";

/// Knobs that do not come from the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefactorOptions {
    /// Indentation unit for classes that give no hint of their own.
    pub indent: String,
    /// Drop ids unknown to both the directory and the registry.
    pub strict_services: bool,
}

impl Default for RefactorOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            strict_services: false,
        }
    }
}

impl From<&Config> for RefactorOptions {
    fn from(config: &Config) -> Self {
        Self {
            indent: config.indent.clone(),
            strict_services: config.strict_services,
        }
    }
}

/// How one new service is wired into the class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBinding {
    pub service_id: String,
    /// Property name.
    pub field: String,
    /// Constructor parameter name (without `$`).
    pub param: String,
    /// Type as written in code (short name or `\FQN`); `None` for
    /// services without a known interface.
    pub type_hint: Option<String>,
    /// Type used in `@var` / `@param` tags.
    pub doc_type: String,
    pub description: String,
    /// Interface to import, when the short name is free to use.
    pub import: Option<String>,
    /// Declared as a promoted constructor parameter instead of a
    /// property plus assignment.
    pub promoted: bool,
    pub readonly: bool,
}

impl ServiceBinding {
    /// The constructor parameter declaration.
    pub fn declaration(&self) -> String {
        let type_prefix = self.type_hint.as_ref().map_or(String::new(), |t| format!("{} ", t));
        if self.promoted {
            let readonly = if self.readonly { "readonly " } else { "" };
            format!("protected {}{}${}", readonly, type_prefix, self.param)
        } else {
            format!("{}${}", type_prefix, self.param)
        }
    }

    /// `$this->field = $param;` at `indent`.
    pub fn assignment(&self, indent: &str) -> String {
        format!("{}$this->{} = ${};", indent, self.field, self.param)
    }

    fn container_get(&self, container_var: &str) -> String {
        format!("${}->get('{}')", container_var, self.service_id)
    }
}

/// Services the class already receives through its factory or
/// constructor.
#[derive(Debug, Default)]
struct ExistingWiring {
    ids: Vec<String>,
    /// Service id → property it ends up in.
    fields: HashMap<String, String>,
    /// Service id → constructor parameter receiving it.
    params: HashMap<String, String>,
    /// For classes without a factory: the service id behind each
    /// constructor parameter after the role's leading ones.
    constructor_services: Vec<Option<String>>,
}

/// What happens to the constructor / factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodAction {
    Keep,
    Create,
    Merge,
}

/// Runs the refactor against a service directory and an optional
/// registry.
pub struct Refactorer<'a> {
    directory: &'a ServiceDirectory,
    registry: Option<&'a dyn ServiceRegistry>,
    options: RefactorOptions,
}

impl<'a> Refactorer<'a> {
    pub fn new(directory: &'a ServiceDirectory) -> Self {
        Self {
            directory,
            registry: None,
            options: RefactorOptions::default(),
        }
    }

    pub fn with_registry(mut self, registry: &'a dyn ServiceRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_options(mut self, options: RefactorOptions) -> Self {
        self.options = options;
        self
    }

    /// Produce the edit batch for `ctx`, or an empty batch when there is
    /// nothing to do.
    pub fn refactor(&self, ctx: &DiRefactoringContext<'_>) -> EditBatch {
        match self.try_refactor(ctx) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::debug!("refactor skipped: {}", e);
                EditBatch::empty()
            }
        }
    }

    /// Like [`refactor`](Self::refactor) but reports why nothing was
    /// produced.
    pub fn try_refactor(&self, ctx: &DiRefactoringContext<'_>) -> Result<EditBatch, RefactorError> {
        let strategy =
            Strategy::for_role(&ctx.role).ok_or_else(|| RefactorError::UnsupportedRole(ctx.role.to_string()))?;
        let info = snapshot(ctx)?;

        if !matches!(info.class.kind, ClassKind::Class | ClassKind::Anonymous) {
            return Err(RefactorError::UnsupportedClassShape(format!(
                "{} is not a class",
                info.class.name
            )));
        }
        if info.class.open_brace_line == info.class.close_brace_line {
            return Err(RefactorError::UnsupportedClassShape(
                "class body on a single line".to_string(),
            ));
        }

        let scan = ScannedSource::new(ctx.source);
        let session = Session::new(self, ctx, info, &scan, strategy);
        let edits = session.edits()?;
        if edits.is_empty() {
            return Err(RefactorError::NothingToInject);
        }
        let batch = EditBatch::assemble(edits);
        tracing::info!(
            "refactored {} ({}): {} edit(s)",
            info.class.name,
            strategy.conventions().name(),
            batch.len()
        );
        Ok(batch)
    }

    fn is_known(&self, id: &str) -> bool {
        self.directory.lookup(id).is_some() || self.registry.is_some_and(|r| r.contains(id))
    }
}

/// The analyzer snapshot for `ctx`, computed on first use.
fn snapshot<'c>(ctx: &'c DiRefactoringContext<'_>) -> Result<&'c PhpClassInfo, RefactorError> {
    if ctx.snapshot().is_none() {
        let info = match ctx.cursor_line {
            Some(line) => analyzer::analyze_at(ctx.source, line),
            None => analyzer::analyze(ctx.source),
        }
        .ok_or(RefactorError::NoEnclosingClass)?;
        if ctx.set_snapshot(info).is_err() {
            tracing::debug!("class snapshot was already set");
        }
    }
    ctx.snapshot().ok_or(RefactorError::NoEnclosingClass)
}

/// Refactor with the built-in service directory and default options.
pub fn refactor_source(source: &str, role: ArchitecturalRole, services: &[&str]) -> EditBatch {
    let ctx = DiRefactoringContext::new(source, role, services.iter().map(|s| s.to_string()).collect());
    Refactorer::new(ServiceDirectory::builtin()).refactor(&ctx)
}

// ─── Session ────────────────────────────────────────────────────────────────

/// State of one refactor request.
struct Session<'s> {
    refactorer: &'s Refactorer<'s>,
    ctx: &'s DiRefactoringContext<'s>,
    info: &'s PhpClassInfo,
    scan: &'s ScannedSource<'s>,
    conventions: &'static dyn InjectionStrategy,
    style: CodeStyle,
}

impl<'s> Session<'s> {
    fn new(
        refactorer: &'s Refactorer<'s>,
        ctx: &'s DiRefactoringContext<'s>,
        info: &'s PhpClassInfo,
        scan: &'s ScannedSource<'s>,
        strategy: Strategy,
    ) -> Self {
        Self {
            refactorer,
            ctx,
            info,
            scan,
            conventions: strategy.conventions(),
            style: CodeStyle::detect(info, scan, &refactorer.options.indent),
        }
    }

    fn edits(&self) -> Result<Vec<RefactoringEdit>, RefactorError> {
        let info = self.info;
        let calls: Vec<StaticServiceCall> = detect_static_calls(self.ctx.source)
            .into_iter()
            .filter(|c| {
                info.body_contains(c.line) && analyzer::enclosing_class_line(self.scan, c.line) == Some(info.class.line)
            })
            .collect();

        let requested = self.requested_ids(&calls);
        let wiring = self.existing_wiring();
        let new_ids: Vec<&String> = requested.iter().filter(|id| !wiring.ids.contains(id)).collect();

        let leading = self.conventions.leading_params().len();
        let promote = info.constructor.as_ref().is_some_and(|c| {
            c.params.len() > leading && c.params[leading..].iter().all(|p| p.promoted)
        });
        let readonly = promote
            && info
                .constructor
                .as_ref()
                .is_some_and(|c| c.params.iter().any(|p| p.text.contains("readonly")));

        let mut claimed: HashMap<String, String> = HashMap::new();
        let mut bindings: Vec<ServiceBinding> = Vec::new();
        for id in new_ids {
            let mut binding = self.bind(id, &mut claimed);
            if bindings.iter().any(|b| b.field == binding.field) {
                binding.field = camel_case(id);
                if bindings.iter().any(|b| b.field == binding.field) {
                    tracing::warn!("skipping {}: property name {} is taken", id, binding.field);
                    continue;
                }
                binding.param = snake_case(&binding.field);
            }
            if promote {
                binding.promoted = true;
                binding.readonly = readonly;
                binding.param = binding.field.clone();
            }
            bindings.push(binding);
        }

        let (ctor_action, factory_action) = self.method_actions(&bindings)?;

        // Call sites: inside a merged constructor they are folded into the
        // constructor text; everywhere else they are separate edits.
        let mut ctor_patches: Vec<(&StaticServiceCall, String)> = Vec::new();
        let mut call_edits = Vec::new();
        for call in calls.iter().filter(|c| requested.contains(&c.service_id)) {
            if let Some(method) = info.static_method_at(call.line) {
                tracing::debug!("leaving {} in static method {}", call.matched_text, method.name);
                continue;
            }
            let binding = bindings.iter().find(|b| b.service_id == call.service_id);
            let in_constructor = info
                .constructor
                .as_ref()
                .is_some_and(|c| call.line >= c.start_line && call.line <= c.end_line);

            let receiver = if in_constructor {
                if matches!(info.factory.as_ref().map(|f| &f.shape), Some(FactoryShape::InstanceAssign { .. })) {
                    tracing::debug!("leaving {}: properties are set after construction", call.matched_text);
                    continue;
                }
                binding
                    .map(|b| b.param.clone())
                    .or_else(|| wiring.params.get(&call.service_id).cloned())
                    .map(|p| format!("${}", p))
            } else {
                None
            };
            let receiver = match receiver {
                Some(r) => r,
                None => match binding
                    .map(|b| b.field.clone())
                    .or_else(|| wiring.fields.get(&call.service_id).cloned())
                {
                    Some(field) => format!("$this->{}", field),
                    None => {
                        tracing::debug!("no property holds {}; leaving call", call.service_id);
                        continue;
                    }
                },
            };

            let replacement = match &call.accessor {
                Some(accessor) => format!("{}->{}({})", receiver, accessor.method, accessor.arguments),
                None => receiver,
            };

            if in_constructor && ctor_action == MethodAction::Merge {
                ctor_patches.push((call, replacement));
            } else {
                call_edits.push(RefactoringEdit::replace(
                    format!("Replace {} with {}", call.matched_text, replacement),
                    call.range(),
                    replacement,
                ));
            }
        }

        let mut edits = Vec::new();
        if !bindings.is_empty() {
            let mut imports: Vec<String> = Vec::new();
            let container_type = if factory_action == MethodAction::Create {
                let (text, import) = self.type_ref(CONTAINER_INTERFACE, &mut claimed);
                imports.extend(import);
                text
            } else {
                short_name(CONTAINER_INTERFACE).to_string()
            };
            let marker = if factory_action == MethodAction::Create {
                self.marker_edit(&mut claimed, &mut imports)
            } else {
                None
            };
            imports.extend(bindings.iter().filter_map(|b| b.import.clone()));
            imports.sort();
            imports.dedup();

            edits.extend(self.import_edit(&imports));
            edits.extend(marker);
            edits.extend(self.field_edit(&bindings));
            edits.extend(self.constructor_edit(ctor_action, factory_action, &bindings, &ctor_patches));
            edits.extend(self.factory_edit(factory_action, ctor_action, &bindings, &wiring, &container_type)?);
        }
        edits.extend(call_edits);
        Ok(edits)
    }

    /// Ids to inject, in first-occurrence order.
    fn requested_ids(&self, calls: &[StaticServiceCall]) -> Vec<String> {
        let mut ids = if self.ctx.services.is_empty() {
            unique_service_ids(calls)
        } else {
            let mut seen = HashSet::new();
            self.ctx
                .services
                .iter()
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .collect()
        };
        if self.refactorer.options.strict_services {
            ids.retain(|id| {
                let known = self.refactorer.is_known(id);
                if !known {
                    tracing::debug!("dropping unknown service {}", id);
                }
                known
            });
        }
        ids
    }

    fn existing_wiring(&self) -> ExistingWiring {
        let info = self.info;
        let mut wiring = ExistingWiring::default();
        let ctor = info.constructor.as_ref();

        if let Some(factory) = &info.factory {
            wiring.ids = factory.service_ids.clone();
            if let FactoryShape::NewStatic { arguments, .. } = &factory.shape {
                for (i, arg) in arguments.iter().enumerate() {
                    let (Some(id), Some(param)) =
                        (analyzer::container_get_id(arg), ctor.and_then(|c| c.params.get(i)))
                    else {
                        continue;
                    };
                    wiring.params.insert(id.clone(), param.name.clone());
                }
            }
            for id in &factory.service_ids {
                if let Some(field) = info.field_for_service(id) {
                    wiring.fields.insert(id.clone(), field);
                } else if let Some(row) = self.refactorer.directory.lookup(id)
                    && info.field(&row.field_name).is_some()
                {
                    wiring.fields.insert(id.clone(), row.field_name.clone());
                }
            }
            return wiring;
        }

        let Some(ctor) = ctor else {
            return wiring;
        };
        let leading = self.conventions.leading_params().len();
        for param in ctor.params.iter().skip(leading) {
            let id = param
                .type_hint
                .as_deref()
                .map(|t| info.resolve_type_name(t.trim_start_matches('?')))
                .and_then(|fqn| self.refactorer.directory.find_by_interface(&fqn))
                .map(|row| row.service_id.clone());
            if let Some(id) = &id {
                wiring.ids.push(id.clone());
                wiring.params.insert(id.clone(), param.name.clone());
                if let Some(field) = info.field_for_param(&param.name) {
                    wiring.fields.insert(id.clone(), field);
                }
            }
            wiring.constructor_services.push(id);
        }
        wiring
    }

    /// A type reference usable in this file, plus the import it needs.
    fn type_ref(&self, fqn: &str, claimed: &mut HashMap<String, String>) -> (String, Option<String>) {
        let info = self.info;
        let short = short_name(fqn);
        if let Some(import) = info.imports.iter().find(|i| i.fqn.eq_ignore_ascii_case(fqn)) {
            return (import.local_name().to_string(), None);
        }
        let taken = info.import_for_local_name(short).is_some()
            || short == info.class.name
            || claimed.get(short).is_some_and(|other| !other.eq_ignore_ascii_case(fqn));
        if taken {
            return (format!("\\{}", fqn), None);
        }
        claimed.insert(short.to_string(), fqn.to_string());
        (short.to_string(), Some(fqn.to_string()))
    }

    fn bind(&self, id: &str, claimed: &mut HashMap<String, String>) -> ServiceBinding {
        if let Some(row) = self.refactorer.directory.lookup(id) {
            let (type_hint, import) = self.type_ref(&row.interface_fqn, claimed);
            return ServiceBinding {
                service_id: id.to_string(),
                field: row.field_name.clone(),
                param: snake_case(&row.field_name),
                type_hint: Some(type_hint),
                doc_type: format!("\\{}", row.interface_fqn),
                description: row.description.clone(),
                import,
                promoted: false,
                readonly: false,
            };
        }

        let class = self
            .refactorer
            .registry
            .and_then(|r| r.lookup(id))
            .and_then(|d| d.class);
        tracing::debug!("{} has no known interface; declaring an untyped property", id);
        let field = camel_case(id);
        ServiceBinding {
            service_id: id.to_string(),
            param: snake_case(&field),
            field,
            type_hint: None,
            doc_type: class.map_or_else(|| "object".to_string(), |c| format!("\\{}", c)),
            description: human_name(id),
            import: None,
            promoted: false,
            readonly: false,
        }
    }

    fn method_actions(&self, bindings: &[ServiceBinding]) -> Result<(MethodAction, MethodAction), RefactorError> {
        if bindings.is_empty() {
            return Ok((MethodAction::Keep, MethodAction::Keep));
        }
        let info = self.info;
        let leading: Vec<&str> = self.conventions.leading_params().iter().map(|p| p.variable).collect();

        match (&info.factory, &info.constructor) {
            (None, None) => Ok((MethodAction::Create, MethodAction::Create)),
            (None, Some(ctor)) => {
                if ctor.params.len() < leading.len() {
                    return Err(RefactorError::UnsupportedClassShape(
                        "constructor lacks the role's leading parameters".to_string(),
                    ));
                }
                Ok((MethodAction::Merge, MethodAction::Create))
            }
            (Some(factory), ctor) => match &factory.shape {
                FactoryShape::InstanceAssign { .. } => Ok((MethodAction::Keep, MethodAction::Merge)),
                FactoryShape::Unrecognized => Err(RefactorError::UnsupportedClassShape(
                    "create() does not return new static() or a parent::create() instance".to_string(),
                )),
                FactoryShape::NewStatic { return_line, arguments, .. } => {
                    if *return_line <= factory.open_brace_line {
                        return Err(RefactorError::UnsupportedClassShape(
                            "create() body on the signature line".to_string(),
                        ));
                    }
                    match ctor {
                        Some(ctor) if ctor.params.len() == arguments.len() => {
                            Ok((MethodAction::Merge, MethodAction::Merge))
                        }
                        Some(_) => Err(RefactorError::UnsupportedClassShape(
                            "create() arguments do not line up with the constructor parameters".to_string(),
                        )),
                        None if arguments.iter().map(String::as_str).eq(leading.iter().copied()) => {
                            Ok((MethodAction::Create, MethodAction::Merge))
                        }
                        None => Err(RefactorError::UnsupportedClassShape(
                            "create() passes arguments to an inherited constructor".to_string(),
                        )),
                    }
                }
            },
        }
    }

    // ─── Edits ──────────────────────────────────────────────────────────────

    fn import_edit(&self, fqns: &[String]) -> Option<RefactoringEdit> {
        let fqns: Vec<String> = fqns.iter().filter(|f| !self.info.has_import(f)).cloned().collect();
        if fqns.is_empty() {
            return None;
        }
        let text = render::imports(&fqns);
        let description = format!("Import {}", fqns.iter().map(|f| short_name(f)).collect::<Vec<_>>().join(", "));

        if let Some(last) = self.info.last_import_line() {
            let end = utf16_len(self.scan.raw(last));
            return Some(RefactoringEdit::insert(description, last, end, format!("\n{}", text)));
        }
        if self.info.class.kind == ClassKind::Anonymous {
            // Imports belong at the top of the file, not next to the class.
            let line = self.info.namespace_line.unwrap_or(0);
            let end = utf16_len(self.scan.raw(line));
            return Some(RefactoringEdit::insert(description, line, end, format!("\n\n{}", text)));
        }
        Some(RefactoringEdit::insert(
            description,
            self.info.class.leading_line,
            0,
            format!("{}\n\n", text),
        ))
    }

    /// Append the marker interface to the `implements` list.
    fn marker_edit(&self, claimed: &mut HashMap<String, String>, imports: &mut Vec<String>) -> Option<RefactoringEdit> {
        let info = self.info;
        let marker = self.conventions.marker_interface();
        let marker_short = short_name(marker);
        let declared = info.class.interfaces.iter().any(|i| short_name(i) == marker_short);
        let known = self.ctx.known_interfaces.iter().any(|i| i == marker_short);
        let inherited = info
            .class
            .parent
            .as_deref()
            .is_some_and(|p| self.conventions.marker_carrying_parents().contains(&short_name(p)));
        if declared || known || inherited {
            return None;
        }

        // Last header line with code before the body's opening brace.
        let header_line = (info.class.line..=info.class.open_brace_line).rev().find(|&l| {
            let code = self.scan.code(l);
            let code = if l == info.class.open_brace_line {
                code.split('{').next().unwrap_or("")
            } else {
                code
            };
            !code.trim().is_empty()
        })?;
        let code = self.scan.code(header_line);
        let head = if header_line == info.class.open_brace_line {
            code.split('{').next().unwrap_or("")
        } else {
            code
        };
        let column = utf16_len(head.trim_end());

        let (name, import) = self.type_ref(marker, claimed);
        imports.extend(import);
        let text = if info.class.interfaces.is_empty() {
            format!(" implements {}", name)
        } else {
            format!(", {}", name)
        };
        Some(RefactoringEdit::insert(
            format!("Implement {}", marker_short),
            header_line,
            column,
            text,
        ))
    }

    fn field_edit(&self, bindings: &[ServiceBinding]) -> Option<RefactoringEdit> {
        let info = self.info;
        let new_fields: Vec<&ServiceBinding> = bindings
            .iter()
            .filter(|b| !b.promoted && info.field(&b.field).is_none())
            .collect();
        if new_fields.is_empty() {
            return None;
        }
        let block = render::fields(&new_fields, &self.style);
        let description = format!(
            "Add {}",
            new_fields.iter().map(|b| format!("${}", b.field)).collect::<Vec<_>>().join(", ")
        );

        let next_is_member = |line: u32| line + 1 < info.class.close_brace_line && !self.scan.raw(line + 1).trim().is_empty();

        if let Some(trait_use) = info.trait_uses.last() {
            let end = utf16_len(self.scan.raw(trait_use.end));
            let trailer = if next_is_member(trait_use.end) { "\n" } else { "" };
            return Some(RefactoringEdit::insert(
                description,
                trait_use.end,
                end,
                format!("\n\n{}{}", block, trailer),
            ));
        }
        if let Some(first) = info.fields.iter().find(|f| !f.promoted) {
            let leading = analyzer::leading_line(self.scan, first.line).min(first.leading_line());
            return Some(RefactoringEdit::insert(description, leading, 0, format!("{}\n\n", block)));
        }

        let open = info.class.open_brace_line;
        let end = utf16_len(self.scan.raw(open));
        let next_blank = open + 1 < info.class.close_brace_line && self.scan.raw(open + 1).trim().is_empty();
        let text = if next_blank {
            format!("\n\n{}", block)
        } else if next_is_member(open) {
            format!("\n{}\n", block)
        } else {
            format!("\n{}", block)
        };
        Some(RefactoringEdit::insert(description, open, end, text))
    }

    /// Where a fresh method goes: `(line, column, text before, text after)`.
    fn fresh_method_anchor(&self, after: Option<u32>, first_of_two: bool) -> (u32, u32, &'static str, &'static str) {
        if let Some(end) = after {
            return (end, utf16_len(self.scan.raw(end)), "\n\n", "");
        }
        if let Some(first) = self.info.methods.first() {
            let leading = analyzer::leading_line(self.scan, first.span.start).min(first.leading_line());
            return (leading, 0, "", "\n\n");
        }
        let close = self.info.class.close_brace_line;
        let previous_blank = close > 0 && self.scan.raw(close - 1).trim().is_empty();
        let before = if previous_blank && first_of_two { "" } else { "\n" };
        (close, 0, before, "\n")
    }

    fn constructor_edit(
        &self,
        action: MethodAction,
        factory_action: MethodAction,
        bindings: &[ServiceBinding],
        patches: &[(&StaticServiceCall, String)],
    ) -> Option<RefactoringEdit> {
        let refs: Vec<&ServiceBinding> = bindings.iter().collect();
        match action {
            MethodAction::Keep => None,
            MethodAction::Create => {
                let text = render::fresh_constructor(&self.info.class.name, self.conventions, &refs, &self.style);
                let after = (factory_action != MethodAction::Create)
                    .then(|| self.info.factory.as_ref().map(|f| f.end_line))
                    .flatten();
                let (line, column, before, after_text) = self.fresh_method_anchor(after, true);
                Some(RefactoringEdit::insert(
                    "Add constructor",
                    line,
                    column,
                    format!("{}{}{}", before, text, after_text),
                ))
            }
            MethodAction::Merge => {
                let ctor = self.info.constructor.as_ref()?;
                let body = self.patched_constructor_body(patches);
                let text = render::merged_constructor(self.scan, ctor, &refs, body, &self.style);
                let start = ctor.leading_line();
                let end = utf16_len(self.scan.raw(ctor.end_line));
                Some(RefactoringEdit::replace(
                    "Inject services through the constructor",
                    range(start, 0, ctor.end_line, end),
                    text,
                ))
            }
        }
    }

    /// Constructor body lines with the call sites inside them rewritten.
    fn patched_constructor_body(&self, patches: &[(&StaticServiceCall, String)]) -> Vec<String> {
        let Some(ctor) = self.info.constructor.as_ref() else {
            return Vec::new();
        };
        let mut body = ctor.body.clone();
        if ctor.open_brace_line == ctor.end_line {
            for (call, replacement) in patches {
                if let Some(line) = body.first_mut() {
                    *line = line.replacen(&call.matched_text, replacement, 1);
                }
            }
            return body;
        }

        let mut sorted: Vec<&(&StaticServiceCall, String)> = patches.iter().collect();
        sorted.sort_by(|a, b| (b.0.line, b.0.start_column).cmp(&(a.0.line, a.0.start_column)));
        for (call, replacement) in sorted {
            if call.line <= ctor.open_brace_line || call.line >= ctor.end_line {
                tracing::debug!("call {} sits on a constructor signature line", call.matched_text);
                continue;
            }
            let idx = (call.line - ctor.open_brace_line - 1) as usize;
            if let Some(line) = body.get_mut(idx) {
                let start = byte_index_for_column(line, call.start_column);
                let end = byte_index_for_column(line, call.end_column);
                line.replace_range(start..end, replacement);
            }
        }
        body
    }

    fn factory_edit(
        &self,
        action: MethodAction,
        ctor_action: MethodAction,
        bindings: &[ServiceBinding],
        wiring: &ExistingWiring,
        container_type: &str,
    ) -> Result<Option<RefactoringEdit>, RefactorError> {
        let info = self.info;
        match action {
            MethodAction::Keep => Ok(None),
            MethodAction::Create => {
                let mut arguments: Vec<String> =
                    self.conventions.leading_params().iter().map(|p| p.variable.to_string()).collect();
                if info.constructor.is_some() {
                    for id in &wiring.constructor_services {
                        let Some(id) = id else {
                            return Err(RefactorError::UnsupportedClassShape(
                                "a constructor parameter has no known service".to_string(),
                            ));
                        };
                        arguments.push(format!("$container->get('{}')", id));
                    }
                }
                arguments.extend(bindings.iter().map(|b| b.container_get("container")));

                let text = render::fresh_factory(self.conventions, container_type, &arguments, &self.style);
                let after = (ctor_action != MethodAction::Create)
                    .then(|| info.constructor.as_ref().map(|c| c.end_line))
                    .flatten();
                let (line, column, before, after_text) = self.fresh_method_anchor(after, ctor_action != MethodAction::Create);
                Ok(Some(RefactoringEdit::insert(
                    "Add create() factory",
                    line,
                    column,
                    format!("{}{}{}", before, text, after_text),
                )))
            }
            MethodAction::Merge => {
                let Some(factory) = info.factory.as_ref() else {
                    return Ok(None);
                };
                let container = factory.container_var.as_str();
                match &factory.shape {
                    FactoryShape::NewStatic {
                        keyword,
                        arguments,
                        trailing_comma,
                        return_line,
                        return_end_line,
                    } => {
                        let indent = leading_whitespace(self.scan.raw(*return_line));
                        let mut all = arguments.clone();
                        all.extend(bindings.iter().map(|b| b.container_get(container)));
                        let mut text = render::return_new(indent, keyword, &all, *trailing_comma, &self.style.unit);

                        // Keep whatever followed the statement's `;`.
                        let end_raw = self.scan.raw(*return_end_line);
                        if let Some(semi) = self.scan.code(*return_end_line).rfind(';') {
                            text.push_str(end_raw.get(semi + 1..).unwrap_or(""));
                        }
                        Ok(Some(RefactoringEdit::replace(
                            "Pass services from create()",
                            range(*return_line, 0, *return_end_line, utf16_len(end_raw)),
                            text,
                        )))
                    }
                    FactoryShape::InstanceAssign {
                        variable, return_line, ..
                    } => {
                        let indent = leading_whitespace(self.scan.raw(*return_line));
                        let text: String = bindings
                            .iter()
                            .map(|b| format!("{}${}->{} = {};\n", indent, variable, b.field, b.container_get(container)))
                            .collect();
                        Ok(Some(RefactoringEdit::insert(
                            "Set services in create()",
                            *return_line,
                            0,
                            text,
                        )))
                    }
                    FactoryShape::Unrecognized => Ok(None),
                }
            }
        }
    }
}

fn range(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> tower_lsp::lsp_types::Range {
    use tower_lsp::lsp_types::{Position, Range};
    Range {
        start: Position {
            line: start_line,
            character: start_char,
        },
        end: Position {
            line: end_line,
            character: end_char,
        },
    }
}
