/// Text synthesis for injection artifacts.
///
/// Every function here returns replacement text only; deciding where the
/// text goes is the caller's job.  Existing text (parameter lists, bodies,
/// argument expressions, doc comments) is copied verbatim and only ever
/// extended.
use crate::types::{ConstructorInfo, PhpClassInfo};
use crate::util::{ScannedSource, leading_whitespace, utf16_len};

use super::ServiceBinding;
use super::strategy::InjectionStrategy;

/// Synthesized signatures wrap onto one parameter per line past this width.
const MAX_LINE_WIDTH: u32 = 80;

/// Indentation and brace conventions read from the class being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeStyle {
    /// Indentation of class members.
    pub member_indent: String,
    /// One level of indentation.
    pub unit: String,
    /// Whether method bodies open on their own line (PSR-12 layout).
    pub brace_on_own_line: bool,
}

impl CodeStyle {
    pub(super) fn detect(info: &PhpClassInfo, scan: &ScannedSource<'_>, default_unit: &str) -> Self {
        let class_indent = leading_whitespace(scan.raw(info.class.line));
        let first_member = info
            .trait_uses
            .iter()
            .map(|t| t.start)
            .chain(info.fields.iter().filter(|f| !f.promoted).map(|f| f.line))
            .chain(info.methods.iter().map(|m| m.span.start))
            .min();

        let (member_indent, unit) = match first_member.map(|l| leading_whitespace(scan.raw(l))) {
            Some(indent) if indent.len() > class_indent.len() && indent.starts_with(class_indent) => {
                (indent.to_string(), indent[class_indent.len()..].to_string())
            }
            _ => (format!("{}{}", class_indent, default_unit), default_unit.to_string()),
        };

        Self {
            member_indent,
            unit,
            brace_on_own_line: info.class.open_brace_line != info.class.line,
        }
    }

    pub(super) fn body_indent(&self) -> String {
        format!("{}{}", self.member_indent, self.unit)
    }

    fn open_brace(&self) -> &'static str {
        if self.brace_on_own_line { "" } else { " {" }
    }
}

fn fits(line: &str) -> bool {
    utf16_len(line) <= MAX_LINE_WIDTH
}

// ─── Imports ────────────────────────────────────────────────────────────────

/// `use` lines for `fqns`, sorted case-insensitively.
pub(super) fn imports(fqns: &[String]) -> String {
    let mut sorted: Vec<&String> = fqns.iter().collect();
    sorted.sort_by_key(|f| f.to_lowercase());
    sorted
        .iter()
        .map(|fqn| format!("use {};", fqn))
        .collect::<Vec<_>>()
        .join("\n")
}

// ─── Fields ─────────────────────────────────────────────────────────────────

/// Documented property declarations, separated by blank lines.
pub(super) fn fields(bindings: &[&ServiceBinding], style: &CodeStyle) -> String {
    let mi = &style.member_indent;
    bindings
        .iter()
        .map(|b| {
            let declaration = match &b.type_hint {
                Some(t) => format!("{mi}protected {} ${};", t, b.field),
                None => format!("{mi}protected ${};", b.field),
            };
            [
                format!("{mi}/**"),
                format!("{mi} * The {}.", b.description),
                format!("{mi} *"),
                format!("{mi} * @var {}", b.doc_type),
                format!("{mi} */"),
                declaration,
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ─── Constructor ────────────────────────────────────────────────────────────

fn param_doc(indent: &str, doc_type: &str, variable: &str, description: &str) -> [String; 2] {
    [
        format!("{indent} * @param {} {}", doc_type, variable),
        format!("{indent} *   {}", description),
    ]
}

fn binding_param_docs(indent: &str, bindings: &[&ServiceBinding]) -> Vec<String> {
    bindings
        .iter()
        .flat_map(|b| param_doc(indent, &b.doc_type, &format!("${}", b.param), &format!("The {}.", b.description)))
        .collect()
}

/// A signature laid out on one line when it fits, one parameter per line
/// otherwise.
fn signature(indent: &str, head: &str, params: &[String], style: &CodeStyle) -> Vec<String> {
    let single = format!("{indent}{head}({}){}", params.join(", "), style.open_brace());
    let mut lines = if fits(&single) || params.is_empty() {
        vec![single]
    } else {
        let mut lines = vec![format!("{indent}{head}(")];
        let last = params.len() - 1;
        for (i, p) in params.iter().enumerate() {
            let comma = if i == last { "" } else { "," };
            lines.push(format!("{indent}{}{}{}", style.unit, p, comma));
        }
        lines.push(format!("{indent}){}", style.open_brace()));
        lines
    };
    if style.brace_on_own_line {
        lines.push(format!("{indent}{{"));
    }
    lines
}

/// A new constructor taking the role's leading parameters plus `bindings`.
pub(super) fn fresh_constructor(
    class_name: &str,
    conventions: &dyn InjectionStrategy,
    bindings: &[&ServiceBinding],
    style: &CodeStyle,
) -> String {
    let mi = style.member_indent.as_str();
    let bi = style.body_indent();
    let summary = if class_name.contains('@') {
        "Constructs the object.".to_string()
    } else {
        format!("Constructs a new {} object.", class_name)
    };

    let mut lines = vec![format!("{mi}/**"), format!("{mi} * {}", summary), format!("{mi} *")];
    for lp in conventions.leading_params() {
        lines.extend(param_doc(mi, lp.doc_type, lp.variable, lp.doc_description));
    }
    lines.extend(binding_param_docs(mi, bindings));
    lines.push(format!("{mi} */"));

    let params: Vec<String> = conventions
        .leading_params()
        .iter()
        .map(|lp| lp.declaration.to_string())
        .chain(bindings.iter().map(|b| b.declaration()))
        .collect();
    lines.extend(signature(mi, "public function __construct", &params, style));

    if let Some(preamble) = conventions.constructor_preamble() {
        lines.push(format!("{bi}{}", preamble));
    }
    lines.extend(bindings.iter().filter(|b| !b.promoted).map(|b| b.assignment(&bi)));
    lines.push(format!("{mi}}}"));
    lines.join("\n")
}

/// Add `@param` lines for new parameters to an existing doc comment.
fn extend_doc(doc: Vec<String>, new_params: Vec<String>, indent: &str) -> Vec<String> {
    if new_params.is_empty() {
        return doc;
    }
    if doc.len() == 1 {
        // `/** Summary. */` becomes a block.
        let inner = doc[0]
            .trim()
            .trim_start_matches("/**")
            .trim_end_matches("*/")
            .trim()
            .to_string();
        let mut lines = vec![format!("{indent}/**")];
        if !inner.is_empty() {
            lines.push(format!("{indent} * {}", inner));
            lines.push(format!("{indent} *"));
        }
        lines.extend(new_params);
        lines.push(format!("{indent} */"));
        return lines;
    }

    let is_blank_star = |line: &str| line.trim() == "*";
    let is_tag = |line: &str| line.trim_start().starts_with("* @");
    let close = doc.len() - 1;

    let mut out = doc.clone();
    if let Some(last_param) = doc.iter().rposition(|l| l.trim_start().starts_with("* @param")) {
        let mut at = last_param + 1;
        while at < close && !is_tag(&doc[at]) && !is_blank_star(&doc[at]) {
            at += 1;
        }
        out.splice(at..at, new_params);
        return out;
    }

    let target = doc.iter().position(|l| is_tag(l)).unwrap_or(close);
    let mut block = Vec::new();
    if target > 1 && !is_blank_star(&doc[target - 1]) {
        block.push(format!("{indent} *"));
    }
    block.extend(new_params);
    if target < close {
        block.push(format!("{indent} *"));
    }
    out.splice(target..target, block);
    out
}

/// The whole constructor (doc comment through closing brace) with
/// `bindings` appended to its parameters and body.
///
/// `body` holds the current body lines, already patched for call sites.
pub(super) fn merged_constructor(
    scan: &ScannedSource<'_>,
    ctor: &ConstructorInfo,
    bindings: &[&ServiceBinding],
    body: Vec<String>,
    style: &CodeStyle,
) -> String {
    let mi = style.member_indent.as_str();
    let bi = style.body_indent();
    let mut lines: Vec<String> = Vec::new();

    if let Some(doc) = ctor.doc {
        let existing: Vec<String> = (doc.start..=doc.end).map(|l| scan.raw(l).to_string()).collect();
        lines.extend(extend_doc(existing, binding_param_docs(mi, bindings), mi));
        // Attributes between the doc comment and the signature.
        lines.extend((doc.end + 1..ctor.start_line).map(|l| scan.raw(l).to_string()));
    }

    let mut params: Vec<String> = ctor.params.iter().map(|p| p.text.clone()).collect();
    params.extend(bindings.iter().map(|b| b.declaration()));

    let prefix_lines = ctor.signature_prefix.matches('\n').count() as u32;
    let suffix_lines = ctor.signature_suffix.matches('\n').count() as u32;
    let paren_open_line = ctor.start_line + prefix_lines;
    let paren_close_line = ctor.open_brace_line - suffix_lines;

    let single = format!("{}{}{}", ctor.signature_prefix, params.join(", "), ctor.signature_suffix);
    let first_line = single.lines().next().unwrap_or("");
    if !ctor.multiline_params && (fits(first_line) || params.is_empty()) {
        lines.push(single);
    } else {
        let (param_indent, close_indent) = if ctor.multiline_params {
            let first_param = scan.raw(paren_open_line + 1);
            (
                leading_whitespace(first_param).to_string(),
                leading_whitespace(scan.raw(paren_close_line)).to_string(),
            )
        } else {
            (bi.clone(), mi.to_string())
        };
        lines.push(ctor.signature_prefix.clone());
        let last = params.len().saturating_sub(1);
        for (i, p) in params.iter().enumerate() {
            let comma = if i < last || ctor.trailing_comma { "," } else { "" };
            lines.push(format!("{}{}{}", param_indent, p, comma));
        }
        lines.push(format!("{}{}", close_indent, ctor.signature_suffix.trim_start()));
    }

    // Call sites patched into the body may already assign the property.
    let assignments: Vec<String> = bindings
        .iter()
        .filter(|b| !b.promoted)
        .map(|b| b.assignment(&bi))
        .filter(|a| !body.iter().any(|l| l.trim() == a.trim()))
        .collect();

    let one_line_body = ctor.open_brace_line == ctor.end_line;
    if one_line_body {
        lines.extend(body.into_iter().map(|l| format!("{bi}{}", l)));
    } else {
        lines.extend(body);
    }
    lines.extend(assignments);

    let close = scan.raw(ctor.end_line);
    if one_line_body || close.trim() != "}" {
        lines.push(format!("{mi}}}"));
    } else {
        lines.push(close.to_string());
    }
    lines.join("\n")
}

// ─── Factory ────────────────────────────────────────────────────────────────

/// A `return new <keyword>(...)` statement, one argument per line.
pub(super) fn return_new(indent: &str, keyword: &str, arguments: &[String], trailing_comma: bool, unit: &str) -> String {
    if arguments.is_empty() {
        return format!("{indent}return new {}();", keyword);
    }
    let mut lines = vec![format!("{indent}return new {}(", keyword)];
    let last = arguments.len() - 1;
    for (i, arg) in arguments.iter().enumerate() {
        let comma = if i < last || trailing_comma { "," } else { "" };
        lines.push(format!("{indent}{unit}{}{}", arg, comma));
    }
    lines.push(format!("{indent});"));
    lines.join("\n")
}

/// A new `create()` factory passing `arguments` to `new static()`.
pub(super) fn fresh_factory(
    conventions: &dyn InjectionStrategy,
    container_type: &str,
    arguments: &[String],
    style: &CodeStyle,
) -> String {
    let mi = style.member_indent.as_str();
    let bi = style.body_indent();
    let mut params = vec![format!("{} $container", container_type)];
    params.extend(conventions.extra_factory_params().iter().map(|p| p.to_string()));

    let mut lines = vec![
        format!("{mi}/**"),
        format!("{mi} * {{@inheritdoc}}"),
        format!("{mi} */"),
        format!("{mi}public static function create({}){}", params.join(", "), style.open_brace()),
    ];
    if style.brace_on_own_line {
        lines.push(format!("{mi}{{"));
    }
    lines.push(return_new(&bi, "static", arguments, false, &style.unit));
    lines.push(format!("{mi}}}"));
    lines.join("\n")
}
