//! Class declaration recognition and scope resolution.
//!
//! Finds class-like declarations (named and anonymous), the brace pair
//! delimiting their body, the doc comment / attribute block in front of
//! them, and, given a cursor line, the innermost class enclosing it.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ClassKind;
use crate::util::ScannedSource;

pub(crate) static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:final|abstract|readonly)\s+)*(class|trait|interface|enum)\s+(\w+)")
        .expect("Invalid regex")
});
static ANONYMOUS_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnew\s+(?:readonly\s+)?class\b").expect("Invalid regex"));
static EXTENDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bextends\s+(\\?[\w\\]+)").expect("Invalid regex"));
static IMPLEMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bimplements\s+([\w\\\s,]+)").expect("Invalid regex"));

/// What the declaration line itself says.
#[derive(Debug, Clone)]
pub(crate) struct DeclarationHead {
    pub kind: ClassKind,
    pub name: String,
    /// Byte column where the header text ends on the declaration line (the
    /// class name end, or the `class` keyword end for anonymous classes).
    pub name_end: usize,
}

/// Recognize a class-like declaration on one masked line.
pub(crate) fn declaration_head(code: &str) -> Option<DeclarationHead> {
    if let Some(caps) = CLASS_DECL.captures(code) {
        let kind = match &caps[1] {
            "class" => ClassKind::Class,
            "trait" => ClassKind::Trait,
            "interface" => ClassKind::Interface,
            _ => ClassKind::Enum,
        };
        let name = caps.get(2)?;
        return Some(DeclarationHead {
            kind,
            name: name.as_str().to_string(),
            name_end: name.end(),
        });
    }
    ANONYMOUS_CLASS.find(code).map(|m| DeclarationHead {
        kind: ClassKind::Anonymous,
        name: "class@anonymous".to_string(),
        name_end: m.end(),
    })
}

/// First named class-like declaration in the file, else the first
/// anonymous class.
pub(crate) fn first_declaration(scan: &ScannedSource<'_>) -> Option<u32> {
    (0..scan.len())
        .find(|&l| CLASS_DECL.is_match(scan.code(l)))
        .or_else(|| (0..scan.len()).find(|&l| ANONYMOUS_CLASS.is_match(scan.code(l))))
}

/// `extends` / `implements` clauses from the header text (the masked text
/// between the class name and the opening brace).
pub(crate) fn header_clauses(header: &str) -> (Option<String>, Vec<String>) {
    let parent = EXTENDS.captures(header).map(|c| c[1].to_string());
    let interfaces = IMPLEMENTS
        .captures(header)
        .map(|c| {
            c[1].split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    (parent, interfaces)
}

/// Walk back from a declaration over its doc comment and attributes.
pub(crate) fn leading_line(scan: &ScannedSource<'_>, decl_line: u32) -> u32 {
    let mut leading = decl_line;
    while leading > 0 {
        let prev = leading - 1;
        let trimmed = scan.raw(prev).trim();
        if trimmed.ends_with("*/") {
            // Doc comment: find the line that opened it.
            let mut start = prev;
            while !scan.raw(start).contains("/*") && start > 0 {
                start -= 1;
            }
            leading = start;
        } else if trimmed.starts_with("#[") {
            leading = prev;
        } else if trimmed.ends_with(']') {
            // Tail of a multi-line attribute.
            let Some(start) = (prev.saturating_sub(50)..prev)
                .rev()
                .find(|&l| scan.raw(l).trim_start().starts_with("#["))
            else {
                break;
            };
            leading = start;
        } else {
            break;
        }
    }
    leading
}

/// If the `{` at `(line, col)` opens a class body, the declaration line.
fn class_header_for_brace(scan: &ScannedSource<'_>, line: u32, col: usize) -> Option<u32> {
    let before = &scan.code(line)[..col];
    if declaration_head(before).is_some() {
        return Some(line);
    }
    if before.contains([';', '{', '}', '(', ')']) {
        return None;
    }
    // Brace on its own line, possibly after a multi-line header.
    let mut l = line;
    for _ in 0..4 {
        if l == 0 {
            return None;
        }
        l -= 1;
        let code = scan.code(l);
        if declaration_head(code).is_some() {
            return Some(l);
        }
        if code.contains([';', '{', '}', '(', ')']) {
            return None;
        }
    }
    None
}

/// Declaration line of the innermost class enclosing `cursor`.
///
/// Scans backward from the cursor keeping a count of closing braces seen;
/// an opening brace that is not cancelled by one of them encloses the
/// cursor, and the first such brace that opens a class body wins.
pub(crate) fn enclosing_declaration(scan: &ScannedSource<'_>, cursor: u32) -> Option<u32> {
    if cursor >= scan.len() {
        return None;
    }
    // A cursor on a declaration line refers to that class.
    if declaration_head(scan.code(cursor)).is_some() {
        return Some(cursor);
    }

    let mut unmatched_closes = 0u32;
    for line in (0..=cursor).rev() {
        let code = scan.code(line);
        for (idx, c) in code.char_indices().rev() {
            match c {
                '}' => unmatched_closes += 1,
                '{' if unmatched_closes > 0 => unmatched_closes -= 1,
                '{' => {
                    if let Some(decl) = class_header_for_brace(scan, line, idx) {
                        return Some(decl);
                    }
                }
                _ => {}
            }
        }
    }
    None
}
