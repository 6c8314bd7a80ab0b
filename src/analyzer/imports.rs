/// Top-level `use` import and namespace recovery.
///
/// Brace depth is tracked so that trait `use` statements inside class
/// bodies and closure `use (...)` clauses are not mistaken for imports.
///
/// With semicolon-style namespaces (`namespace Foo;`) imports live at
/// depth 0; with brace-style namespaces (`namespace Foo { ... }`) they live
/// at depth 1.  Scanning stops at the first class-like declaration.
use std::sync::LazyLock;

use regex::Regex;

use super::scope::CLASS_DECL;
use crate::types::ImportInfo;
use crate::util::ScannedSource;

static NAMESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*namespace\s+[\w\\]+\s*([;{])").expect("Invalid regex"));
static USE_STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*use\s+([^;]+);").expect("Invalid regex"));
static GROUP_USE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?([\w\\]+?)\\?\{([^}]*)\}$").expect("Invalid regex"));
static IMPORT_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\\?([\w\\]+)(?:\s+as\s+(\w+))?$").expect("Invalid regex")
});

/// Imports (in source order) and the namespace declaration line.
pub(super) fn collect_imports(scan: &ScannedSource<'_>) -> (Vec<ImportInfo>, Option<u32>) {
    let mut imports: Vec<ImportInfo> = Vec::new();
    let mut namespace_line = None;
    let mut depth: i32 = 0;
    let mut uses_brace_namespace = false;

    let mut line = 0;
    while line < scan.len() {
        let code = scan.code(line);
        let depth_at_start = depth;
        let max_import_depth = if uses_brace_namespace { 1 } else { 0 };

        if depth_at_start <= max_import_depth && CLASS_DECL.is_match(code) {
            break;
        }

        if let Some(caps) = NAMESPACE.captures(code) {
            namespace_line = Some(line);
            if &caps[1] == "{" {
                uses_brace_namespace = true;
            }
        }

        let trimmed = code.trim_start();
        let is_import = depth_at_start <= if uses_brace_namespace { 1 } else { 0 }
            && (trimmed.starts_with("use ") || trimmed.starts_with("use\t"))
            && !trimmed.starts_with("use (");

        if is_import {
            // Group imports may span several lines; join up to the `;`.
            let end = scan
                .find_code_char(line, 0, &[';'])
                .map_or(line, |(l, _, _)| l);
            let statement = (line..=end)
                .map(|l| scan.raw(l).trim())
                .collect::<Vec<_>>()
                .join(" ");
            for import in parse_use_statement(&statement, end) {
                if !imports_contains(&imports, &import.fqn) {
                    imports.push(import);
                }
            }
            for l in line..=end {
                depth += scan.brace_delta(l);
            }
            line = end + 1;
            continue;
        }

        depth += scan.brace_delta(line);
        line += 1;
    }

    (imports, namespace_line)
}

fn imports_contains(imports: &[ImportInfo], fqn: &str) -> bool {
    imports.iter().any(|i| i.fqn.eq_ignore_ascii_case(fqn))
}

/// Parse one `use ...;` statement into import rows.
///
/// Function and constant imports are ignored.
pub(super) fn parse_use_statement(statement: &str, line: u32) -> Vec<ImportInfo> {
    let Some(caps) = USE_STATEMENT.captures(statement) else {
        return Vec::new();
    };
    let body = caps[1].trim();
    if body.starts_with("function ") || body.starts_with("const ") {
        return Vec::new();
    }

    let mut imports = Vec::new();
    if let Some(group) = GROUP_USE.captures(body) {
        let prefix = group[1].trim_end_matches('\\');
        for member in group[2].split(',').map(str::trim).filter(|m| !m.is_empty()) {
            if let Some(clause) = IMPORT_CLAUSE.captures(member) {
                imports.push(ImportInfo {
                    fqn: format!("{}\\{}", prefix, &clause[1]),
                    alias: clause.get(2).map(|m| m.as_str().to_string()),
                    line,
                });
            }
        }
        return imports;
    }

    for clause in body.split(',').map(str::trim) {
        if let Some(c) = IMPORT_CLAUSE.captures(clause) {
            imports.push(ImportInfo {
                fqn: c[1].to_string(),
                alias: c.get(2).map(|m| m.as_str().to_string()),
                line,
            });
        }
    }
    imports
}
