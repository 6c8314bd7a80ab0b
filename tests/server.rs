mod common;

use common::{FRESH_BLOCK, FRESH_CONTROLLER, create_test_backend, create_workspace, open};
use drupal_di_lsp::code_action::ACTION_TITLE;
use drupal_di_lsp::refactor::{EditBatch, apply_edits};
use drupal_di_lsp::types::RefactoringEdit;
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

fn code_action_params(uri: &Url, line: u32, only: Option<Vec<CodeActionKind>>) -> CodeActionParams {
    CodeActionParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
        range: Range {
            start: Position { line, character: 0 },
            end: Position { line, character: 0 },
        },
        context: CodeActionContext {
            diagnostics: vec![],
            only,
            trigger_kind: None,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
    }
}

/// Apply protocol edits (ascending, all against the original text).
fn apply_text_edits(source: &str, edits: &[TextEdit]) -> String {
    let batch = EditBatch::assemble(
        edits
            .iter()
            .map(|e| RefactoringEdit::replace("", e.range, e.new_text.clone()))
            .collect(),
    );
    apply_edits(source, &batch)
}

fn single_action(response: Option<CodeActionResponse>) -> CodeAction {
    let mut actions = response.expect("expected a code action");
    assert_eq!(actions.len(), 1);
    match actions.remove(0) {
        CodeActionOrCommand::CodeAction(action) => action,
        other => panic!("expected a CodeAction, got {:?}", other),
    }
}

#[tokio::test]
async fn test_initialize_advertises_refactor_actions() {
    let backend = create_test_backend();
    let result = backend.initialize(InitializeParams::default()).await.unwrap();

    let info = result.server_info.expect("server info");
    assert_eq!(info.name, "drupal-di-lsp");
    assert_eq!(info.version.as_deref(), Some(env!("CARGO_PKG_VERSION")));

    assert_eq!(
        result.capabilities.text_document_sync,
        Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL))
    );
    match result.capabilities.code_action_provider {
        Some(CodeActionProviderCapability::Options(options)) => {
            assert_eq!(options.code_action_kinds, Some(vec![CodeActionKind::REFACTOR_REWRITE]));
        }
        other => panic!("unexpected code action capability {:?}", other),
    }
    assert!(result.capabilities.completion_provider.is_none());
}

#[tokio::test]
async fn test_shutdown() {
    let backend = create_test_backend();
    assert!(backend.shutdown().await.is_ok());
}

#[tokio::test]
async fn test_document_lifecycle() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///HelloController.php").unwrap();
    open(&backend, &uri, "<?php\n").await;
    assert_eq!(backend.document(&uri).as_deref(), Some("<?php\n"));

    backend
        .did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: FRESH_CONTROLLER.to_string(),
            }],
        })
        .await;
    assert_eq!(backend.document(&uri).as_deref(), Some(FRESH_CONTROLLER));

    backend
        .did_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
        })
        .await;
    assert!(backend.document(&uri).is_none());
}

#[tokio::test]
async fn test_code_action_rewrites_controller() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///HelloController.php").unwrap();
    open(&backend, &uri, FRESH_CONTROLLER).await;

    let response = backend.code_action(code_action_params(&uri, 10, None)).await.unwrap();
    let action = single_action(response);
    assert_eq!(action.title, ACTION_TITLE);
    assert_eq!(action.kind, Some(CodeActionKind::REFACTOR_REWRITE));

    let changes = action.edit.unwrap().changes.unwrap();
    let edits = &changes[&uri];
    assert_eq!(edits.len(), 5);
    let output = apply_text_edits(FRESH_CONTROLLER, edits);
    assert!(output.contains("return $this->renderer->render($build);"));
    assert!(output.contains("public static function create(ContainerInterface $container) {"));
}

#[tokio::test]
async fn test_code_action_detects_plugin_role() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///GreetingBlock.php").unwrap();
    open(&backend, &uri, FRESH_BLOCK).await;

    let response = backend
        .code_action(code_action_params(&uri, 20, Some(vec![CodeActionKind::REFACTOR])))
        .await
        .unwrap();
    let action = single_action(response);
    let changes = action.edit.unwrap().changes.unwrap();
    let edits = &changes[&uri];
    let output = apply_text_edits(FRESH_BLOCK, edits);
    assert!(output.contains("class GreetingBlock extends BlockBase implements ContainerFactoryPluginInterface {"));
    assert!(output.contains("$plugin_definition,\n      $container->get('current_user')\n    );"));
}

#[tokio::test]
async fn test_no_action_when_nothing_applies() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///HelloController.php").unwrap();
    open(&backend, &uri, FRESH_CONTROLLER).await;

    // Filtered out by kind.
    let quickfix = code_action_params(&uri, 10, Some(vec![CodeActionKind::QUICKFIX]));
    assert!(backend.code_action(quickfix).await.unwrap().is_none());

    // Outside any class.
    assert!(backend.code_action(code_action_params(&uri, 0, None)).await.unwrap().is_none());

    // Unknown document.
    let other = Url::parse("file:///Missing.php").unwrap();
    assert!(backend.code_action(code_action_params(&other, 10, None)).await.unwrap().is_none());

    // A class with no recognized role.
    let plain = Url::parse("file:///Plain.php").unwrap();
    open(&backend, &plain, "<?php\n\nclass Plain {\n\n  public function a() {\n    return \\Drupal::state();\n  }\n\n}\n").await;
    assert!(backend.code_action(code_action_params(&plain, 5, None)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_workspace_configuration_and_services() {
    let config = r#"
strict_services = true

[base_class_roles]
MyModuleControllerBase = "base-class"

[services."my_module.helper"]
interface = "Drupal\\my_module\\HelperInterface"
field = "helper"
"#;
    let services = r#"services:
  my_module.helper:
    class: Drupal\my_module\Helper
  my_module.untyped:
    class: Drupal\my_module\Untyped
"#;
    let (backend, _dir) = create_workspace(&[
        (".drupal-di.toml", config),
        ("web/modules/custom/my_module/my_module.services.yml", services),
    ]);

    let source = r#"<?php

namespace Drupal\my_module\Controller;

class HelperController extends MyModuleControllerBase {

  public function page() {
    \Drupal::service('my_module.helper')->help();
    \Drupal::service('my_module.untyped')->run();
    \Drupal::service('nobody.knows')->fail();
  }

}
"#;
    let uri = Url::parse("file:///HelperController.php").unwrap();
    open(&backend, &uri, source).await;

    let response = backend.code_action(code_action_params(&uri, 7, None)).await.unwrap();
    let action = single_action(response);
    let changes = action.edit.unwrap().changes.unwrap();
    let edits = &changes[&uri];
    let output = apply_text_edits(source, edits);

    assert!(output.contains("use Drupal\\my_module\\HelperInterface;"));
    assert!(output.contains("protected HelperInterface $helper;"));
    assert!(output.contains("$this->helper->help();"));
    assert!(output.contains("   * @var \\Drupal\\my_module\\Untyped\n"));
    assert!(output.contains("$this->myModuleUntyped->run();"));
    // Strict mode leaves services nobody declares alone.
    assert!(output.contains("\\Drupal::service('nobody.knows')->fail();"));
}
