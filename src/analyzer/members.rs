/// Class body member walk.
///
/// Visits the lines between a class's braces at member depth and records
/// trait uses, properties and methods along with the doc comment that
/// precedes each of them.  Method bodies (and anything else that opens a
/// brace at member depth) are skipped as a whole.
use std::sync::LazyLock;

use regex::Regex;

use super::methods::{MethodLayout, parse_constructor, parse_factory};
use crate::types::{ConstructorInfo, FactoryInfo, FieldInfo, LineSpan, MethodInfo};
use crate::util::ScannedSource;

static TRAIT_USE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*use\s+\\?\w").expect("Invalid regex"));
static FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:#\[[^\]]*\]\s*)*((?:(?:public|protected|private|static|abstract|final)\s+)*)function\s+&?\s*(\w+)\s*\(",
    )
    .expect("Invalid regex")
});
static CONSTANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:public|protected|private|final)\s+)*const\s").expect("Invalid regex")
});
static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:#\[[^\]]*\]\s*)*(?:(?:public|protected|private|var|static|readonly)(?:\([^)]*\))?\s+)+(?:(\??[\w\\|&()]+)\s+)?\$(\w+)",
    )
    .expect("Invalid regex")
});

/// Everything the walk found in one class body.
#[derive(Debug, Default)]
pub(super) struct ClassMembers {
    pub trait_uses: Vec<LineSpan>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub constructor: Option<ConstructorInfo>,
    pub factory: Option<FactoryInfo>,
}

/// Walk the body between `open_line` and `close_line` (exclusive).
pub(super) fn walk_members(scan: &ScannedSource<'_>, open_line: u32, close_line: u32) -> ClassMembers {
    let mut members = ClassMembers::default();
    let mut pending_doc: Option<LineSpan> = None;
    let mut depth = 0i32;
    let mut line = open_line + 1;

    while line < close_line {
        if depth > 0 {
            depth += scan.brace_delta(line);
            line += 1;
            continue;
        }

        let raw = scan.raw(line);
        let code = scan.code(line);
        let trimmed = raw.trim_start();

        // ── Doc comments ──
        if trimmed.starts_with("/*") {
            let end = (line..close_line)
                .find(|&l| {
                    let text = scan.raw(l);
                    let from = if l == line { text.find("/*").map_or(0, |i| i + 2) } else { 0 };
                    text.get(from..).is_some_and(|t| t.contains("*/"))
                })
                .unwrap_or(line);
            pending_doc = trimmed.starts_with("/**").then_some(LineSpan::new(line, end));
            line = end + 1;
            continue;
        }

        // ── Attributes (kept between a doc comment and its member) ──
        if code.trim_start().starts_with("#[") {
            let col = code.len() - code.trim_start().len();
            if let Some((end_line, end_col)) = scan.matching_close(line, col, '[', ']') {
                let rest = scan.code(end_line).get(end_col + 1..).unwrap_or("");
                if rest.trim().is_empty() {
                    line = end_line + 1;
                    continue;
                }
            }
        }

        if code.trim().is_empty() {
            line += 1;
            continue;
        }

        // ── Trait uses ──
        if TRAIT_USE.is_match(code) {
            let end = match scan.find_code_char(line, 0, &[';', '{']) {
                Some((l, _, ';')) => l,
                Some((l, col, _)) => scan.matching_close(l, col, '{', '}').map_or(l, |(e, _)| e),
                None => line,
            };
            members.trait_uses.push(LineSpan::new(line, end));
            pending_doc = None;
            line = end + 1;
            continue;
        }

        // ── Methods ──
        if let Some(caps) = FUNCTION.captures(code) {
            let doc = pending_doc.take();
            let modifiers = caps.get(1).map_or("", |m| m.as_str());
            let name = caps[2].to_string();
            let Some(whole) = caps.get(0) else {
                line += 1;
                continue;
            };
            let params_open = (line, whole.end() - 1);
            let end = match method_layout(scan, line, params_open) {
                Some(layout) => {
                    let is_static = modifiers.contains("static");
                    if name.eq_ignore_ascii_case("__construct") {
                        let ctor = parse_constructor(scan, layout, doc);
                        members.fields.extend(ctor.params.iter().filter(|p| p.promoted).map(|p| FieldInfo {
                            name: p.name.clone(),
                            line: ctor.start_line,
                            type_hint: p.type_hint.clone(),
                            has_doc: false,
                            doc: None,
                            promoted: true,
                        }));
                        members.constructor.get_or_insert(ctor);
                    } else if name == "create" && is_static {
                        members.factory.get_or_insert_with(|| parse_factory(scan, layout, doc));
                    }
                    members.methods.push(MethodInfo {
                        name,
                        span: LineSpan::new(line, layout.body_close.0),
                        doc,
                        is_static,
                    });
                    layout.body_close.0
                }
                None => {
                    // Abstract or interface method: ends at its `;`.
                    let end = scan.find_code_char(line, 0, &[';']).map_or(line, |(l, _, _)| l);
                    members.methods.push(MethodInfo {
                        name,
                        span: LineSpan::new(line, end),
                        doc,
                        is_static: modifiers.contains("static"),
                    });
                    end
                }
            };
            line = end + 1;
            continue;
        }

        // ── Constants ──
        if CONSTANT.is_match(code) {
            pending_doc = None;
            line = scan.find_code_char(line, 0, &[';']).map_or(line, |(l, _, _)| l) + 1;
            continue;
        }

        // ── Properties ──
        if let Some(caps) = PROPERTY.captures(code) {
            let doc = pending_doc.take();
            members.fields.push(FieldInfo {
                name: caps[2].to_string(),
                line,
                type_hint: caps.get(1).map(|m| m.as_str().to_string()),
                has_doc: doc.is_some(),
                doc,
                promoted: false,
            });
            line = scan.find_code_char(line, 0, &[';']).map_or(line, |(l, _, _)| l) + 1;
            continue;
        }

        pending_doc = None;
        depth += scan.brace_delta(line);
        line += 1;
    }

    members
}

/// Locate the parameter list close and the body braces of a method whose
/// `(` sits at `params_open`.  `None` for body-less methods.
fn method_layout(scan: &ScannedSource<'_>, function_line: u32, params_open: (u32, usize)) -> Option<MethodLayout> {
    let params_close = scan.matching_close(params_open.0, params_open.1, '(', ')')?;
    let (l, col, c) = scan.find_code_char(params_close.0, params_close.1 + 1, &['{', ';'])?;
    if c != '{' {
        return None;
    }
    let body_close = scan.matching_close(l, col, '{', '}')?;
    Some(MethodLayout {
        function_line,
        params_open,
        params_close,
        body_open: (l, col),
        body_close,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"class Foo {
  use StringTranslationTrait;

  const LIMIT = 10;

  /**
   * The renderer.
   *
   * @var \Drupal\Core\Render\RendererInterface
   */
  protected RendererInterface $renderer;

  protected $untyped = ['a' => '{'];

  public function __construct(protected DateFormatterInterface $dateFormatter) {
    if (TRUE) {
      $x = 1;
    }
  }

  #[\Override]
  public static function create(ContainerInterface $container) {
    return new static($container->get('date.formatter'));
  }

  abstract protected function build(): array;
}
"#;

    #[test]
    fn test_walk_members() {
        let scan = ScannedSource::new(BODY);
        let members = walk_members(&scan, 0, scan.len() - 1);

        assert_eq!(members.trait_uses, vec![LineSpan::new(1, 1)]);

        let names: Vec<&str> = members.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["renderer", "untyped", "dateFormatter"]);
        assert_eq!(members.fields[0].doc, Some(LineSpan::new(5, 9)));
        assert_eq!(members.fields[0].type_hint.as_deref(), Some("RendererInterface"));
        assert!(members.fields[2].promoted);

        let methods: Vec<(&str, bool)> = members.methods.iter().map(|m| (m.name.as_str(), m.is_static)).collect();
        assert_eq!(methods, vec![("__construct", false), ("create", true), ("build", false)]);
        assert_eq!(members.methods[0].span, LineSpan::new(14, 18));

        let factory = members.factory.expect("factory");
        assert_eq!(factory.service_ids, vec!["date.formatter".to_string()]);
        assert_eq!(factory.container_var, "container");
    }
}
