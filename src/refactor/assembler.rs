/// Edit batching.
///
/// Strategies emit edits in a logical order (imports, declaration, fields,
/// constructor, factory, call sites) with coordinates that all refer to the
/// original text.  The assembler turns them into an [`EditBatch`] ordered by
/// descending start position, so applying the edits one after another
/// never shifts the coordinates of an edit that is still pending.
use serde::Serialize;
use tower_lsp::lsp_types::{Position, TextEdit};

use crate::types::RefactoringEdit;
use crate::util::byte_index_for_column;

/// An ordered, deduplicated set of edits ready for sequential application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EditBatch {
    edits: Vec<RefactoringEdit>,
}

impl EditBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Order `edits` (given in emission order) for sequential application.
    ///
    /// Edits are sorted by descending start position.  Edits starting at
    /// the same position keep reverse emission order, so the text of the
    /// first-emitted edit ends up first in the result.  Exact duplicates
    /// are dropped; overlapping edits are reported but kept.
    pub fn assemble(edits: Vec<RefactoringEdit>) -> Self {
        let mut indexed: Vec<(usize, RefactoringEdit)> = Vec::with_capacity(edits.len());
        for (idx, edit) in edits.into_iter().enumerate() {
            if indexed.iter().any(|(_, e)| e.range == edit.range && e.new_text == edit.new_text) {
                tracing::debug!("dropping duplicate edit: {}", edit.description);
                continue;
            }
            indexed.push((idx, edit));
        }

        indexed.sort_by(|(ia, a), (ib, b)| {
            position_key(b.range.start)
                .cmp(&position_key(a.range.start))
                .then(ib.cmp(ia))
        });

        let edits: Vec<RefactoringEdit> = indexed.into_iter().map(|(_, e)| e).collect();
        for pair in edits.windows(2) {
            let (later, earlier) = (&pair[0], &pair[1]);
            if position_key(earlier.range.end) > position_key(later.range.start) {
                tracing::warn!(
                    "overlapping edits: '{}' and '{}'",
                    earlier.description,
                    later.description
                );
            }
        }

        Self { edits }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Edits in application order (descending position).
    pub fn edits(&self) -> &[RefactoringEdit] {
        &self.edits
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RefactoringEdit> {
        self.edits.iter()
    }

    /// Protocol text edits in ascending position order, for clients that
    /// apply every edit against the original document.  Insertions at the
    /// same position stay in emission order.
    pub fn into_text_edits(self) -> Vec<TextEdit> {
        self.edits.iter().rev().map(TextEdit::from).collect()
    }
}

impl<'a> IntoIterator for &'a EditBatch {
    type Item = &'a RefactoringEdit;
    type IntoIter = std::slice::Iter<'a, RefactoringEdit>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}

fn position_key(p: Position) -> (u32, u32) {
    (p.line, p.character)
}

/// Byte offset of an LSP position in `text`, clamped to the text.
fn offset_of(text: &str, position: Position) -> usize {
    let mut offset = 0usize;
    for _ in 0..position.line {
        match text[offset..].find('\n') {
            Some(nl) => offset += nl + 1,
            None => return text.len(),
        }
    }
    let line_end = text[offset..].find('\n').map_or(text.len(), |nl| offset + nl);
    let line = text[offset..line_end].trim_end_matches('\r');
    offset + byte_index_for_column(line, position.character)
}

/// Apply a batch to `source`, edit by edit, in batch order.
pub fn apply_edits(source: &str, batch: &EditBatch) -> String {
    let mut text = source.to_string();
    for edit in batch {
        let start = offset_of(&text, edit.range.start);
        let end = offset_of(&text, edit.range.end).max(start);
        text.replace_range(start..end, &edit.new_text);
    }
    text
}
