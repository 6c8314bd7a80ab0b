/// The `refactor.rewrite` code action.
///
/// Runs the refactor for the class under the requested range (injecting
/// every service the class fetches statically) and wraps the resulting
/// batch in a single [`CodeAction`].
use std::collections::HashMap;

use tower_lsp::lsp_types::{CodeAction, CodeActionKind, TextEdit, Url, WorkspaceEdit};

use crate::Backend;
use crate::refactor::{EditBatch, RefactorOptions, Refactorer};
use crate::types::DiRefactoringContext;

/// Title shown in the client's refactor menu.
pub const ACTION_TITLE: &str = "Inject services through the constructor";

/// Wrap `batch` in a code action editing `uri`.  `None` for an empty batch.
pub fn build_code_action(uri: &Url, batch: EditBatch) -> Option<CodeAction> {
    if batch.is_empty() {
        return None;
    }
    let edits: Vec<TextEdit> = batch.into_text_edits();
    let changes = HashMap::from([(uri.clone(), edits)]);
    Some(CodeAction {
        title: ACTION_TITLE.to_string(),
        kind: Some(CodeActionKind::REFACTOR_REWRITE),
        edit: Some(WorkspaceEdit {
            changes: Some(changes),
            ..WorkspaceEdit::default()
        }),
        ..CodeAction::default()
    })
}

/// Whether a client's `only` filter admits `refactor.rewrite` actions.
pub fn kind_requested(only: Option<&[CodeActionKind]>) -> bool {
    let wanted = CodeActionKind::REFACTOR_REWRITE;
    match only {
        None => true,
        Some(kinds) => kinds.iter().any(|k| {
            let k = k.as_str();
            wanted.as_str() == k || wanted.as_str().starts_with(&format!("{}.", k))
        }),
    }
}

impl Backend {
    /// The edit batch for the class enclosing `line` in the open document
    /// `uri`.  Empty when the document is unknown, the class has no
    /// supported role or nothing needs injecting.
    pub fn refactor_document(&self, uri: &Url, line: u32) -> EditBatch {
        // Copy everything out so no lock is held while refactoring.
        let Some(source) = self.document(uri) else {
            tracing::debug!("refactor requested for unknown document {}", uri);
            return EditBatch::empty();
        };
        let options = RefactorOptions::from(&*self.config.read());
        let directory = self.directory.read().clone();
        let registry = self.registry.read().clone();
        let classifier = self.classifier.read().clone();

        let Some(hierarchy) = classifier.classify(&source, line) else {
            tracing::debug!("no class at {}:{}", uri, line + 1);
            return EditBatch::empty();
        };
        let ctx = DiRefactoringContext::new(&source, hierarchy.role.clone(), Vec::new())
            .with_cursor_line(line)
            .with_hierarchy(&hierarchy);

        Refactorer::new(&directory)
            .with_registry(registry.as_ref())
            .with_options(options)
            .refactor(&ctx)
    }
}
