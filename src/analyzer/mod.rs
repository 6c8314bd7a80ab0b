/// Class-structure recovery from raw PHP source text.
///
/// This module builds a [`PhpClassInfo`] snapshot without a PHP parser: the
/// source is split into lines, strings and comments are masked out, and
/// declarations are recognized with line-anchored patterns plus brace and
/// parenthesis matching.
///
/// Sub-modules:
/// - [`imports`]: top-level `use` imports and the namespace line
/// - [`scope`]: class declarations and cursor → enclosing class resolution
/// - [`members`]: the member walk over a class body
/// - [`methods`]: constructor and `create()` factory details
mod imports;
mod members;
mod methods;
mod scope;

pub use methods::{assigned_field, container_get_id};

use crate::types::{ClassDeclaration, PhpClassInfo};
use crate::util::ScannedSource;

/// Snapshot of the first class-like declaration in `source`.
pub fn analyze(source: &str) -> Option<PhpClassInfo> {
    let scan = ScannedSource::new(source);
    let decl = scope::first_declaration(&scan)?;
    analyze_class_at_decl(&scan, decl)
}

/// Snapshot of the innermost class enclosing `line`.
///
/// Returns `None` when `line` is not inside (or on the declaration of) any
/// class.
pub fn analyze_at(source: &str, line: u32) -> Option<PhpClassInfo> {
    let scan = ScannedSource::new(source);
    let decl = scope::enclosing_declaration(&scan, line)?;
    analyze_class_at_decl(&scan, decl)
}

/// Declaration line of the innermost class enclosing `line`.
pub(crate) fn enclosing_class_line(scan: &ScannedSource<'_>, line: u32) -> Option<u32> {
    scope::enclosing_declaration(scan, line)
}

/// First line of the doc comment and attributes in front of the
/// declaration on `line`.
pub(crate) fn leading_line(scan: &ScannedSource<'_>, line: u32) -> u32 {
    scope::leading_line(scan, line)
}

fn analyze_class_at_decl(scan: &ScannedSource<'_>, decl_line: u32) -> Option<PhpClassInfo> {
    let head = scope::declaration_head(scan.code(decl_line))?;
    let (open_line, open_col, c) = scan.find_code_char(decl_line, head.name_end, &['{', ';'])?;
    if c != '{' {
        return None;
    }
    let (close_line, _) = scan.matching_close(open_line, open_col, '{', '}')?;

    let header = scan.code_between((decl_line, head.name_end.saturating_sub(1)), (open_line, open_col));
    let (parent, interfaces) = scope::header_clauses(&header);
    let (imports, namespace_line) = imports::collect_imports(scan);

    let class = ClassDeclaration {
        kind: head.kind,
        name: head.name,
        parent,
        interfaces,
        line: decl_line,
        leading_line: scope::leading_line(scan, decl_line),
        open_brace_line: open_line,
        close_brace_line: close_line,
    };

    let members = if open_line == close_line {
        members::ClassMembers::default()
    } else {
        members::walk_members(scan, open_line, close_line)
    };

    tracing::trace!(
        "analyzed class {} (lines {}..={}): {} field(s), {} method(s)",
        class.name,
        class.line,
        class.close_brace_line,
        members.fields.len(),
        members.methods.len()
    );

    Some(PhpClassInfo {
        imports,
        namespace_line,
        class,
        trait_uses: members.trait_uses,
        fields: members.fields,
        methods: members.methods,
        constructor: members.constructor,
        factory: members.factory,
    })
}
