/// Utility functions shared by the detector, analyzer and strategies.
///
/// This module contains helpers for UTF-16 column conversion, identifier
/// case conversion, and the code-masking line scanner that lets the rest of
/// the crate count braces and parentheses without being fooled by string
/// literals or comments.

// ─── Names ──────────────────────────────────────────────────────────────────

/// The last segment of a namespace-qualified name.
///
/// `"Drupal\\Core\\Render\\RendererInterface"` → `"RendererInterface"`.
pub fn short_name(name: &str) -> &str {
    let trimmed = name.trim_start_matches('\\');
    trimmed.rsplit('\\').next().unwrap_or(trimmed)
}

/// Convert a service id into a camelCase property name.
///
/// `"entity_type.manager"` → `"entityTypeManager"`.
pub fn camel_case(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut upper_next = false;
    for c in id.chars() {
        if !c.is_ascii_alphanumeric() {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else if out.is_empty() {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Convert a camelCase property name into a snake_case variable name.
///
/// `"entityTypeManager"` → `"entity_type_manager"`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// A service id rendered for humans: `"entity_type.manager"` →
/// `"entity type manager"`.
pub fn human_name(id: &str) -> String {
    id.split(|c: char| c == '.' || c == '_' || c == '-' || c == '\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ─── Columns ────────────────────────────────────────────────────────────────

/// Length of `s` in UTF-16 code units (the LSP column unit).
pub fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

/// Convert a byte index within `line` to a UTF-16 column.
pub fn utf16_column(line: &str, byte_index: usize) -> u32 {
    utf16_len(&line[..byte_index.min(line.len())])
}

/// Convert a UTF-16 column within `line` to a byte index, clamping to the
/// end of the line.
pub fn byte_index_for_column(line: &str, column: u32) -> usize {
    let mut units = 0u32;
    for (idx, c) in line.char_indices() {
        if units >= column {
            return idx;
        }
        units += c.len_utf16() as u32;
    }
    line.len()
}

pub fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

// ─── Code masking ───────────────────────────────────────────────────────────

/// Lexer state carried from one line to the next while masking.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MaskState {
    in_block_comment: bool,
    quote: Option<char>,
}

fn push_blank(out: &mut String, c: char) {
    for _ in 0..c.len_utf8() {
        out.push(' ');
    }
}

/// Replace comment text and string-literal contents with spaces.
///
/// The returned string has exactly the same byte length as `line` so byte
/// indices found in the mask are valid in the raw line.  Quote characters
/// themselves are kept so a masked string still reads as `'   '`.
/// Heredoc/nowdoc bodies are not recognized.
pub(crate) fn mask_line(line: &str, state: &mut MaskState) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if state.in_block_comment {
            push_blank(&mut out, c);
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                out.push(' ');
                state.in_block_comment = false;
            }
            continue;
        }

        if let Some(q) = state.quote {
            if c == '\\' {
                push_blank(&mut out, c);
                if let Some(escaped) = chars.next() {
                    push_blank(&mut out, escaped);
                }
            } else if c == q {
                out.push(c);
                state.quote = None;
            } else {
                push_blank(&mut out, c);
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                out.push(c);
                state.quote = Some(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                push_blank(&mut out, c);
                for rest in chars.by_ref() {
                    push_blank(&mut out, rest);
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str("  ");
                state.in_block_comment = true;
            }
            // `#[` opens an attribute, any other `#` a line comment.
            '#' if chars.peek() != Some(&'[') => {
                push_blank(&mut out, c);
                for rest in chars.by_ref() {
                    push_blank(&mut out, rest);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// A source text split into lines, each paired with its masked form.
///
/// Structure (braces, parentheses, declarations) is read from the masked
/// lines; text that ends up in edits is always taken from the raw lines.
pub(crate) struct ScannedSource<'a> {
    raw: Vec<&'a str>,
    code: Vec<String>,
}

impl<'a> ScannedSource<'a> {
    pub fn new(source: &'a str) -> Self {
        let raw: Vec<&str> = source.lines().collect();
        let mut state = MaskState::default();
        let code = raw.iter().map(|line| mask_line(line, &mut state)).collect();
        Self { raw, code }
    }

    pub fn len(&self) -> u32 {
        self.raw.len() as u32
    }

    pub fn raw(&self, line: u32) -> &'a str {
        self.raw.get(line as usize).copied().unwrap_or("")
    }

    pub fn code(&self, line: u32) -> &str {
        self.code.get(line as usize).map_or("", String::as_str)
    }

    /// Net `{`/`}` balance of one line.
    pub fn brace_delta(&self, line: u32) -> i32 {
        self.code(line).chars().fold(0, |depth, c| match c {
            '{' => depth + 1,
            '}' => depth - 1,
            _ => depth,
        })
    }

    /// First code character from `targets` at or after `(line, col)`.
    pub fn find_code_char(&self, line: u32, col: usize, targets: &[char]) -> Option<(u32, usize, char)> {
        for l in line..self.len() {
            let code = self.code(l);
            let from = if l == line { col.min(code.len()) } else { 0 };
            if let Some((idx, c)) = code[from..]
                .char_indices()
                .find(|(_, c)| targets.contains(c))
            {
                return Some((l, from + idx, c));
            }
        }
        None
    }

    /// Given an `open` delimiter at `(line, col)`, find the matching `close`.
    pub fn matching_close(&self, line: u32, col: usize, open: char, close: char) -> Option<(u32, usize)> {
        let mut depth = 0i32;
        for l in line..self.len() {
            let code = self.code(l);
            let from = if l == line { col.min(code.len()) } else { 0 };
            for (idx, c) in code[from..].char_indices() {
                if c == open {
                    depth += 1;
                } else if c == close {
                    depth -= 1;
                    if depth == 0 {
                        return Some((l, from + idx));
                    }
                }
            }
        }
        None
    }

    /// Raw text strictly between two positions, lines joined with `\n`.
    pub fn raw_between(&self, start: (u32, usize), end: (u32, usize)) -> String {
        Self::slice_between(start, end, |l| self.raw(l))
    }

    /// Masked text strictly between two positions, lines joined with `\n`.
    pub fn code_between(&self, start: (u32, usize), end: (u32, usize)) -> String {
        Self::slice_between(start, end, |l| self.code(l))
    }

    fn slice_between<'s>(
        start: (u32, usize),
        end: (u32, usize),
        line_at: impl Fn(u32) -> &'s str,
    ) -> String {
        let (start_line, start_col) = (start.0, start.1 + 1);
        let (end_line, end_col) = end;
        if start_line == end_line {
            let text = line_at(start_line);
            return text
                .get(start_col.min(end_col)..end_col.min(text.len()))
                .unwrap_or("")
                .to_string();
        }
        let mut parts = Vec::new();
        let first = line_at(start_line);
        parts.push(first.get(start_col.min(first.len())..).unwrap_or(""));
        for l in start_line + 1..end_line {
            parts.push(line_at(l));
        }
        let last = line_at(end_line);
        parts.push(last.get(..end_col.min(last.len())).unwrap_or(""));
        parts.join("\n")
    }
}

/// Split `text` on commas that sit outside any bracket pair, using the
/// masked `code` (same byte length) to decide where the commas are.
pub(crate) fn split_top_level_commas(text: &str, code: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (idx, c) in code.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(text.get(start..idx).unwrap_or("").trim().to_string());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(text.get(start..).unwrap_or("").trim().to_string());
    parts
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_service_ids() {
        assert_eq!(camel_case("entity_type.manager"), "entityTypeManager");
        assert_eq!(camel_case("renderer"), "renderer");
        assert_eq!(camel_case("my_custom.service"), "myCustomService");
        assert_eq!(camel_case("plugin.manager.block"), "pluginManagerBlock");
    }

    #[test]
    fn test_snake_case_from_camel() {
        assert_eq!(snake_case("entityTypeManager"), "entity_type_manager");
        assert_eq!(snake_case("renderer"), "renderer");
    }

    #[test]
    fn test_human_name() {
        assert_eq!(human_name("date.formatter"), "date formatter");
        assert_eq!(human_name("entity_type.manager"), "entity type manager");
    }

    #[test]
    fn test_short_name_strips_namespace() {
        assert_eq!(short_name("\\Drupal\\Core\\Render\\RendererInterface"), "RendererInterface");
        assert_eq!(short_name("PDO"), "PDO");
    }

    #[test]
    fn test_utf16_columns() {
        let line = "$x = 'é'; \\Drupal::service('a');";
        let byte = line.find("\\Drupal").unwrap();
        assert_eq!(utf16_column(line, byte), 10);
        assert_eq!(byte_index_for_column(line, 10), byte);
    }

    #[test]
    fn test_mask_hides_strings_and_comments() {
        let mut state = MaskState::default();
        let masked = mask_line("$a = '{'; // }", &mut state);
        assert_eq!(masked.len(), "$a = '{'; // }".len());
        assert!(!masked.contains('{'));
        assert!(!masked.contains('}'));
        assert!(masked.starts_with("$a = ' ';"));
    }

    #[test]
    fn test_mask_keeps_attributes_and_tracks_block_comments() {
        let mut state = MaskState::default();
        assert_eq!(mask_line("#[Block(id: 'x')]", &mut state), "#[Block(id: ' ')]");
        let first = mask_line("/* start {", &mut state);
        assert!(!first.contains('{'));
        let second = mask_line("end } */ {", &mut state);
        assert_eq!(second.trim(), "{");
    }

    #[test]
    fn test_split_top_level_commas_ignores_nested() {
        let text = "array $a = [1, 2], Foo $b, $c = f(1, 2)";
        let parts = split_top_level_commas(text, text);
        assert_eq!(parts, vec!["array $a = [1, 2]", "Foo $b", "$c = f(1, 2)"]);
    }

    #[test]
    fn test_matching_close_spans_lines() {
        let src = "function x(\n  $a,\n  $b\n) {\n  if (1) { }\n}\n";
        let scan = ScannedSource::new(src);
        assert_eq!(scan.matching_close(0, 10, '(', ')'), Some((3, 0)));
        assert_eq!(scan.matching_close(3, 2, '{', '}'), Some((5, 0)));
        assert_eq!(scan.raw_between((0, 10), (3, 0)), "\n  $a,\n  $b\n");
    }
}
