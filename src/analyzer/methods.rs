/// Constructor and factory method recovery.
///
/// Both are located by the member walk in [`super::members`], which hands
/// over the positions of the parameter-list parentheses and the body
/// braces.  Everything here reads structure from masked text and copies
/// verbatim text from the raw lines.
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{ConstructorInfo, ConstructorParam, FactoryInfo, FactoryShape, LineSpan};
use crate::util::{ScannedSource, split_top_level_commas};

static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:#\[[^\]]*\]\s*)*((?:(?:public|protected|private|readonly)(?:\([^)]*\))?\s+)*)(?:(\??[\w\\|&()]+)\s+)?&?(?:\.\.\.)?\$(\w+)",
    )
    .expect("Invalid regex")
});
static CONTAINER_GET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$(\w+)\s*->\s*get\(\s*(?:'([^']*)'|"([^"]*)")\s*\)"#).expect("Invalid regex")
});
static CONTAINER_GET_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\$\w+\s*->\s*get\(\s*(?:'([^']*)'|"([^"]*)")\s*\)$"#).expect("Invalid regex")
});
static RETURN_NEW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\breturn\s+new\s+(static|self)\s*\(").expect("Invalid regex"));
static PARENT_CREATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\w+)\s*=\s*parent::create\s*\(").expect("Invalid regex"));
static PROPERTY_FROM_CONTAINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$(\w+)\s*->\s*(\w+)\s*=\s*\$(\w+)\s*->\s*get\(\s*(?:'([^']*)'|"([^"]*)")\s*\)"#)
        .expect("Invalid regex")
});
static RETURN_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\breturn\s+\$(\w+)\s*;").expect("Invalid regex"));
static THIS_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$this\s*->\s*(\w+)\s*=\s*\$(\w+)\s*;").expect("Invalid regex")
});

/// Where a method's pieces sit in the source, as `(line, byte column)`.
#[derive(Debug, Clone, Copy)]
pub(super) struct MethodLayout {
    pub function_line: u32,
    pub params_open: (u32, usize),
    pub params_close: (u32, usize),
    pub body_open: (u32, usize),
    pub body_close: (u32, usize),
}

/// The service id of a `$container->get('id')` expression.
pub fn container_get_id(expr: &str) -> Option<String> {
    let caps = CONTAINER_GET_EXPR.captures(expr.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// The property a `$this->field = $param;` statement on `line` stores
/// `param` in.
pub fn assigned_field(line: &str, param: &str) -> Option<String> {
    THIS_ASSIGN
        .captures_iter(line)
        .find(|caps| &caps[2] == param)
        .map(|caps| caps[1].to_string())
}

/// Split a parameter list into its entries, each as `(raw, masked)` text.
/// Also returns whether the list ends with a trailing comma.
fn split_params(
    scan: &ScannedSource<'_>,
    open: (u32, usize),
    close: (u32, usize),
) -> (Vec<(String, String)>, bool) {
    let raw = scan.raw_between(open, close);
    let code = scan.code_between(open, close);
    let parts: Vec<(String, String)> = split_top_level_commas(&raw, &code)
        .into_iter()
        .zip(split_top_level_commas(&code, &code))
        .collect();
    let trailing_comma = parts.len() > 1 && parts.last().is_some_and(|(_, c)| c.is_empty());
    let parts = parts.into_iter().filter(|(_, c)| !c.is_empty()).collect();
    (parts, trailing_comma)
}

/// Match a parameter on its masked text (comments and string contents
/// blanked) and keep the raw text verbatim.
fn parse_param(raw: &str, code: &str) -> Option<ConstructorParam> {
    let caps = PARAM.captures(code.trim())?;
    let modifiers = caps.get(1).map_or("", |m| m.as_str());
    Some(ConstructorParam {
        name: caps[3].to_string(),
        type_hint: caps.get(2).map(|m| m.as_str().to_string()),
        promoted: ["public", "protected", "private"]
            .iter()
            .any(|v| modifiers.contains(v)),
        text: raw.to_string(),
    })
}

/// Raw lines strictly inside a body.  A body opened and closed on the same
/// line yields its inner text as a single line (or nothing when empty).
fn body_lines(scan: &ScannedSource<'_>, open: (u32, usize), close: (u32, usize)) -> Vec<String> {
    if open.0 == close.0 {
        let inner = scan.raw_between(open, close);
        let inner = inner.trim();
        return if inner.is_empty() {
            Vec::new()
        } else {
            vec![inner.to_string()]
        };
    }
    (open.0 + 1..close.0).map(|l| scan.raw(l).to_string()).collect()
}

pub(super) fn parse_constructor(
    scan: &ScannedSource<'_>,
    layout: MethodLayout,
    doc: Option<LineSpan>,
) -> ConstructorInfo {
    let (parts, trailing_comma) = split_params(scan, layout.params_open, layout.params_close);
    let params = parts.iter().filter_map(|(raw, code)| parse_param(raw, code)).collect();

    let (open_line, open_col) = layout.params_open;
    let mut signature_prefix: Vec<&str> = (layout.function_line..open_line).map(|l| scan.raw(l)).collect();
    signature_prefix.push(scan.raw(open_line).get(..=open_col).unwrap_or(""));

    let (close_line, close_col) = layout.params_close;
    let (brace_line, brace_col) = layout.body_open;
    let signature_suffix = if close_line == brace_line {
        scan.raw(close_line).get(close_col..=brace_col).unwrap_or(")").to_string()
    } else {
        let mut parts = vec![scan.raw(close_line).get(close_col..).unwrap_or(")")];
        parts.extend((close_line + 1..brace_line).map(|l| scan.raw(l)));
        parts.push(scan.raw(brace_line).get(..=brace_col).unwrap_or("{"));
        parts.join("\n")
    };

    ConstructorInfo {
        start_line: layout.function_line,
        open_brace_line: brace_line,
        end_line: layout.body_close.0,
        params,
        body: body_lines(scan, layout.body_open, layout.body_close),
        doc,
        multiline_params: open_line != close_line,
        trailing_comma,
        signature_prefix: signature_prefix.join("\n"),
        signature_suffix,
    }
}

pub(super) fn parse_factory(scan: &ScannedSource<'_>, layout: MethodLayout, doc: Option<LineSpan>) -> FactoryInfo {
    let (parts, _) = split_params(scan, layout.params_open, layout.params_close);
    let container_var = parts
        .first()
        .and_then(|(raw, code)| parse_param(raw, code))
        .map_or_else(|| "container".to_string(), |p| p.name);

    let (open, close) = (layout.body_open, layout.body_close);
    let mut service_ids = Vec::new();
    for line in open.0..=close.0 {
        let raw = scan.raw(line);
        let code = scan.code(line);
        for caps in CONTAINER_GET.captures_iter(raw) {
            let Some(m) = caps.get(0) else { continue };
            if !in_code(raw, code, m.start()) || caps[1] != container_var {
                continue;
            }
            if let Some(id) = caps.get(2).or_else(|| caps.get(3)) {
                service_ids.push(id.as_str().to_string());
            }
        }
    }

    FactoryInfo {
        start_line: layout.function_line,
        open_brace_line: open.0,
        end_line: close.0,
        shape: factory_shape(scan, open, close, &container_var),
        container_var,
        service_ids,
        doc,
    }
}

fn in_code(raw: &str, code: &str, idx: usize) -> bool {
    raw.as_bytes().get(idx).is_some_and(|b| code.as_bytes().get(idx) == Some(b))
}

fn factory_shape(scan: &ScannedSource<'_>, open: (u32, usize), close: (u32, usize), container_var: &str) -> FactoryShape {
    for line in open.0..=close.0 {
        let Some(caps) = RETURN_NEW.captures(scan.code(line)) else {
            continue;
        };
        let Some(m) = caps.get(0) else { continue };
        let paren = (line, m.end() - 1);
        let Some(paren_close) = scan.matching_close(paren.0, paren.1, '(', ')') else {
            return FactoryShape::Unrecognized;
        };
        let (arguments, trailing_comma) = split_params(scan, paren, paren_close);
        return FactoryShape::NewStatic {
            keyword: caps[1].to_string(),
            arguments: arguments.into_iter().map(|(raw, _)| raw).collect(),
            trailing_comma,
            return_line: line,
            return_end_line: paren_close.0,
        };
    }

    let Some((variable, create_line)) = (open.0..=close.0).find_map(|l| {
        PARENT_CREATE
            .captures(scan.code(l))
            .map(|caps| (caps[1].to_string(), l))
    }) else {
        return FactoryShape::Unrecognized;
    };

    let mut assignments = Vec::new();
    for line in create_line..=close.0 {
        let raw = scan.raw(line);
        for caps in PROPERTY_FROM_CONTAINER.captures_iter(raw) {
            if caps[1] != variable || caps[3] != *container_var {
                continue;
            }
            if let Some(id) = caps.get(4).or_else(|| caps.get(5)) {
                assignments.push((caps[2].to_string(), id.as_str().to_string()));
            }
        }
        let returns_instance = RETURN_VARIABLE
            .captures(scan.code(line))
            .is_some_and(|c| c[1] == variable);
        if returns_instance {
            return FactoryShape::InstanceAssign {
                variable,
                assignments,
                return_line: line,
            };
        }
    }
    FactoryShape::Unrecognized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_get_id() {
        assert_eq!(
            container_get_id("$container->get('date.formatter')").as_deref(),
            Some("date.formatter")
        );
        assert_eq!(container_get_id(" $c -> get(\"renderer\") ").as_deref(), Some("renderer"));
        assert_eq!(container_get_id("$configuration"), None);
    }

    #[test]
    fn test_assigned_field() {
        assert_eq!(
            assigned_field("    $this->formatter = $date_formatter;", "date_formatter").as_deref(),
            Some("formatter")
        );
        assert_eq!(assigned_field("    $this->x = $y;", "z"), None);
    }

    #[test]
    fn test_parse_param_variants() {
        let p = parse_param(
            "protected readonly RendererInterface $renderer",
            "protected readonly RendererInterface $renderer",
        )
        .unwrap();
        assert!(p.promoted);
        assert_eq!(p.type_hint.as_deref(), Some("RendererInterface"));
        assert_eq!(p.name, "renderer");

        let p = parse_param("$plugin_id", "$plugin_id").unwrap();
        assert!(!p.promoted);
        assert_eq!(p.type_hint, None);

        let p = parse_param("?\\Foo\\Bar $bar = NULL", "?\\Foo\\Bar $bar = NULL").unwrap();
        assert_eq!(p.type_hint.as_deref(), Some("?\\Foo\\Bar"));
    }
}
