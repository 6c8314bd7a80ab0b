/// Static service-locator call detection.
///
/// Scans PHP source line by line and reports every place that fetches a
/// service through the global `\Drupal` accessor instead of having it
/// injected:
///
///   - `\Drupal::service('renderer')`                 → direct locator
///   - `\Drupal::getContainer()->get('renderer')`     → container indirect
///   - `$c = \Drupal::getContainer(); $c->get('x')`   → container indirect
///   - `\Drupal::entityTypeManager()`                 → named shortcut
///
/// Matching happens on the raw line but only counts when the match starts
/// in code (not inside a comment or string literal), which is decided from
/// the masked line produced by [`ScannedSource`].  Calls that span several
/// lines are not recognized.
use std::sync::LazyLock;

use memchr::memmem;
use regex::{Captures, Regex};

use crate::types::{CallShape, ShortcutAccessor, StaticServiceCall};
use crate::util::{ScannedSource, utf16_column};

/// A named helper on the `\Drupal` class that returns a container service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    /// The static method name on `\Drupal`.
    pub method: &'static str,
    pub service_id: &'static str,
    /// Method to call on the injected service to reproduce the shortcut's
    /// return value, if it is not the service itself.
    pub accessor: Option<&'static str>,
    /// Whether the shortcut's arguments are forwarded to the accessor.
    /// Shortcuts that do not forward arguments only match empty calls.
    pub forwards_arguments: bool,
}

const fn plain(method: &'static str, service_id: &'static str) -> Shortcut {
    Shortcut {
        method,
        service_id,
        accessor: None,
        forwards_arguments: false,
    }
}

const fn via(method: &'static str, service_id: &'static str, accessor: &'static str, forwards: bool) -> Shortcut {
    Shortcut {
        method,
        service_id,
        accessor: Some(accessor),
        forwards_arguments: forwards,
    }
}

/// The `\Drupal::*()` helpers that map 1:1 onto a container service.
pub const SHORTCUTS: &[Shortcut] = &[
    plain("cache", "cache.default"),
    via("config", "config.factory", "get", true),
    plain("configFactory", "config.factory"),
    plain("currentUser", "current_user"),
    plain("database", "database"),
    plain("destination", "redirect.destination"),
    plain("entityRepository", "entity.repository"),
    plain("entityTypeManager", "entity_type.manager"),
    plain("flood", "flood"),
    plain("formBuilder", "form_builder"),
    plain("httpClient", "http_client"),
    via("keyValue", "keyvalue", "get", true),
    via("keyValueExpirable", "keyvalue.expirable", "get", true),
    plain("languageManager", "language_manager"),
    plain("linkGenerator", "link_generator"),
    plain("lock", "lock"),
    via("logger", "logger.factory", "get", true),
    plain("messenger", "messenger"),
    plain("moduleHandler", "module_handler"),
    plain("pathValidator", "path.validator"),
    via("queue", "queue", "get", true),
    via("request", "request_stack", "getCurrentRequest", false),
    plain("requestStack", "request_stack"),
    plain("routeMatch", "current_route_match"),
    plain("state", "state"),
    plain("theme", "theme.manager"),
    plain("time", "datetime.time"),
    plain("token", "token"),
    plain("translation", "string_translation"),
    plain("transliteration", "transliteration"),
    plain("typedDataManager", "typed_data_manager"),
    plain("urlGenerator", "url_generator"),
];

/// Look up a shortcut by its `\Drupal` method name.
pub fn shortcut(method: &str) -> Option<&'static Shortcut> {
    SHORTCUTS.iter().find(|s| s.method == method)
}

static DIRECT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\\?Drupal::service\(\s*(?:'([^']*)'|"([^"]*)")\s*\)"#).expect("Invalid regex")
});
static CONTAINER_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\\?Drupal::getContainer\(\s*\)\s*->\s*get\(\s*(?:'([^']*)'|"([^"]*)")\s*\)"#)
        .expect("Invalid regex")
});
static SHORTCUT_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\?Drupal::(\w+)\(([^()]*)\)").expect("Invalid regex"));
static CONTAINER_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(\w+)\s*=\s*\\?Drupal::getContainer\(\s*\)\s*;").expect("Invalid regex")
});
static VARIABLE_GET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$(\w+)\s*->\s*get\(\s*(?:'([^']*)'|"([^"]*)")\s*\)"#).expect("Invalid regex")
});

static DRUPAL_FINDER: LazyLock<memmem::Finder<'static>> =
    LazyLock::new(|| memmem::Finder::new("Drupal::"));
static GET_FINDER: LazyLock<memmem::Finder<'static>> = LazyLock::new(|| memmem::Finder::new("get("));

/// A variable holding the container, and the brace depth it was assigned at.
struct ContainerVariable {
    name: String,
    depth: i32,
}

/// Find every static service-locator call in `source`, ordered by line and
/// then column.
pub fn detect_static_calls(source: &str) -> Vec<StaticServiceCall> {
    let scan = ScannedSource::new(source);
    let mut calls = Vec::new();
    let mut container_vars: Vec<ContainerVariable> = Vec::new();
    let mut depth = 0i32;

    for line_idx in 0..scan.len() {
        let raw = scan.raw(line_idx);
        let code = scan.code(line_idx);
        let mut line_calls = Vec::new();

        if DRUPAL_FINDER.find(raw.as_bytes()).is_some() {
            collect_locator_calls(line_idx, raw, code, &mut line_calls);

            for caps in CONTAINER_ASSIGN.captures_iter(raw) {
                if let Some(m) = caps.get(0)
                    && starts_in_code(raw, code, m.start())
                {
                    container_vars.retain(|v| v.name != caps[1]);
                    container_vars.push(ContainerVariable {
                        name: caps[1].to_string(),
                        depth,
                    });
                }
            }
        }

        if !container_vars.is_empty() && GET_FINDER.find(raw.as_bytes()).is_some() {
            for caps in VARIABLE_GET.captures_iter(raw) {
                let Some(m) = caps.get(0) else { continue };
                if !starts_in_code(raw, code, m.start()) {
                    continue;
                }
                if !container_vars.iter().any(|v| v.name == caps[1]) {
                    // Receiver is not traceable to the container.
                    continue;
                }
                if let Some(id) = quoted_id(&caps, 2) {
                    line_calls.push(build_call(line_idx, raw, m.start(), m.end(), id, CallShape::ContainerIndirect, None));
                }
            }
        }

        line_calls.sort_by_key(|c| c.start_column);
        line_calls.dedup_by_key(|c| c.start_column);
        calls.extend(line_calls);

        depth += scan.brace_delta(line_idx);
        container_vars.retain(|v| v.depth <= depth);
    }

    calls
}

/// Direct, container and shortcut calls on one line.
fn collect_locator_calls(line_idx: u32, raw: &str, code: &str, out: &mut Vec<StaticServiceCall>) {
    for caps in DIRECT_CALL.captures_iter(raw) {
        let Some(m) = caps.get(0) else { continue };
        if !is_drupal_reference(raw, code, m.start()) {
            continue;
        }
        if let Some(id) = quoted_id(&caps, 1) {
            out.push(build_call(line_idx, raw, m.start(), m.end(), id, CallShape::DirectLocator, None));
        }
    }

    for caps in CONTAINER_CALL.captures_iter(raw) {
        let Some(m) = caps.get(0) else { continue };
        if !is_drupal_reference(raw, code, m.start()) {
            continue;
        }
        if let Some(id) = quoted_id(&caps, 1) {
            out.push(build_call(line_idx, raw, m.start(), m.end(), id, CallShape::ContainerIndirect, None));
        }
    }

    for caps in SHORTCUT_CALL.captures_iter(raw) {
        let Some(m) = caps.get(0) else { continue };
        if !is_drupal_reference(raw, code, m.start()) {
            continue;
        }
        let Some(entry) = shortcut(&caps[1]) else {
            continue;
        };
        let arguments = caps[2].trim();
        if arguments.is_empty() == entry.forwards_arguments {
            // `\Drupal::config()` without a name, or `\Drupal::cache('bin')`
            // selecting a different service than the table entry.
            continue;
        }
        let accessor = entry.accessor.map(|method| ShortcutAccessor {
            method: method.to_string(),
            arguments: arguments.to_string(),
        });
        out.push(build_call(
            line_idx,
            raw,
            m.start(),
            m.end(),
            entry.service_id.to_string(),
            CallShape::NamedShortcut,
            accessor,
        ));
    }
}

fn build_call(
    line: u32,
    raw: &str,
    start: usize,
    end: usize,
    service_id: String,
    shape: CallShape,
    accessor: Option<ShortcutAccessor>,
) -> StaticServiceCall {
    StaticServiceCall {
        service_id,
        line,
        start_column: utf16_column(raw, start),
        end_column: utf16_column(raw, end),
        matched_text: raw[start..end].to_string(),
        shape,
        accessor,
    }
}

/// The identifier from whichever quote alternative matched, starting at
/// capture group `first`.
fn quoted_id(caps: &Captures<'_>, first: usize) -> Option<String> {
    caps.get(first)
        .or_else(|| caps.get(first + 1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Whether byte `idx` of `raw` survived masking (i.e. is code).
fn starts_in_code(raw: &str, code: &str, idx: usize) -> bool {
    let raw_byte = raw.as_bytes().get(idx);
    raw_byte.is_some() && raw_byte == code.as_bytes().get(idx)
}

/// Whether a match at `idx` is a reference to the global `Drupal` class
/// (and not e.g. `MyDrupal::` or `Foo\Drupal::`).
fn is_drupal_reference(raw: &str, code: &str, idx: usize) -> bool {
    if !starts_in_code(raw, code, idx) {
        return false;
    }
    match raw[..idx].chars().next_back() {
        Some(prev) => !(prev.is_alphanumeric() || prev == '_' || prev == '\\' || prev == '$'),
        None => true,
    }
}

/// All calls referencing one service id.
#[derive(Debug, Clone)]
pub struct ServiceCallGroup<'a> {
    pub service_id: &'a str,
    pub calls: Vec<&'a StaticServiceCall>,
}

/// Group calls by service id, keeping first-occurrence order.
pub fn group_by_service(calls: &[StaticServiceCall]) -> Vec<ServiceCallGroup<'_>> {
    let mut groups: Vec<ServiceCallGroup<'_>> = Vec::new();
    for call in calls {
        match groups.iter_mut().find(|g| g.service_id == call.service_id) {
            Some(group) => group.calls.push(call),
            None => groups.push(ServiceCallGroup {
                service_id: &call.service_id,
                calls: vec![call],
            }),
        }
    }
    groups
}

/// Unique service ids in first-occurrence order.
pub fn unique_service_ids(calls: &[StaticServiceCall]) -> Vec<String> {
    group_by_service(calls)
        .into_iter()
        .map(|g| g.service_id.to_string())
        .collect()
}
