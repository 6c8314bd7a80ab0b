/// LSP server trait implementation.
///
/// This module contains the `impl LanguageServer for Backend` block,
/// which handles the protocol messages the server supports (initialize,
/// didOpen, didChange, didClose, codeAction).
use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::code_action::{build_code_action, kind_requested};

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let workspace_root = params
            .root_uri
            .as_ref()
            .and_then(|uri| uri.to_file_path().ok());
        if let Some(root) = workspace_root {
            *self.workspace_root.write() = Some(root);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(vec![CodeActionKind::REFACTOR_REWRITE]),
                        work_done_progress_options: WorkDoneProgressOptions {
                            work_done_progress: None,
                        },
                        resolve_provider: Some(false),
                    },
                )),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let has_root = self.workspace_root.read().is_some();
        let services = self.load_workspace();
        let message = if has_root {
            format!(
                "drupal-di-lsp initialized! Indexed {} service(s), {} directory entries",
                services,
                self.directory.read().len()
            )
        } else {
            "drupal-di-lsp initialized!".to_string()
        };
        self.log(MessageType::INFO, message).await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.open_files.write().insert(doc.uri.clone(), doc.text);
        self.log(MessageType::LOG, format!("Opened file: {}", doc.uri))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the whole text.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.open_files
                .write()
                .insert(params.text_document.uri, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.open_files.write().remove(&uri);
        self.log(MessageType::LOG, format!("Closed file: {}", uri))
            .await;
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        if !kind_requested(params.context.only.as_deref()) {
            return Ok(None);
        }
        let uri = params.text_document.uri;
        let batch = self.refactor_document(&uri, params.range.start.line);
        let count = batch.len();

        match build_code_action(&uri, batch) {
            Some(action) => {
                self.log(
                    MessageType::INFO,
                    format!("Offering {} edit(s) for {}", count, uri),
                )
                .await;
                Ok(Some(vec![CodeActionOrCommand::CodeAction(action)]))
            }
            None => Ok(None),
        }
    }
}
