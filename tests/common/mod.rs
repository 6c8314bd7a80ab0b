#![allow(dead_code)]

use std::fs;

use drupal_di_lsp::Backend;
use drupal_di_lsp::refactor::{EditBatch, Refactorer, apply_edits, refactor_source};
use drupal_di_lsp::services::ServiceDirectory;
use drupal_di_lsp::types::{ArchitecturalRole, DiRefactoringContext};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

pub fn create_test_backend() -> Backend {
    Backend::new_test()
}

/// Helper: create a temp workspace holding `files` (relative path,
/// content), then return a Backend rooted there with its configuration and
/// services index loaded.
pub fn create_workspace(files: &[(&str, &str)]) -> (Backend, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (rel_path, content) in files {
        let full = dir.path().join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write workspace file");
    }
    let backend = Backend::new_test_with_workspace(dir.path().to_path_buf());
    (backend, dir)
}

/// Open `text` as `uri` in the backend.
pub async fn open(backend: &Backend, uri: &Url, text: &str) {
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "php".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
}

/// Refactor with the built-in directory and return the batch together with
/// the refactored text.
pub fn refactor(source: &str, role: ArchitecturalRole, services: &[&str]) -> (EditBatch, String) {
    let batch = refactor_source(source, role, services);
    let output = apply_edits(source, &batch);
    (batch, output)
}

/// Refactor with a custom directory.
pub fn refactor_with(
    directory: &ServiceDirectory,
    source: &str,
    role: ArchitecturalRole,
    services: &[&str],
) -> (EditBatch, String) {
    let ctx = DiRefactoringContext::new(source, role, services.iter().map(|s| s.to_string()).collect());
    let batch = Refactorer::new(directory).refactor(&ctx);
    let output = apply_edits(source, &batch);
    (batch, output)
}

/// Run the refactor on its own output and assert nothing more happens.
pub fn assert_idempotent(output: &str, role: ArchitecturalRole, services: &[&str]) {
    let again = refactor_source(output, role, services);
    assert!(
        again.is_empty(),
        "second run should produce no edits, got: {:#?}\n--- input ---\n{}",
        again.edits(),
        output
    );
}

/// Number of non-overlapping occurrences of `needle` in `haystack`.
pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// A controller with no constructor, no factory and one static call.
pub const FRESH_CONTROLLER: &str = r#"<?php

namespace Drupal\my_module\Controller;

use Drupal\Core\Controller\ControllerBase;

class HelloController extends ControllerBase {

  public function build() {
    $build = ['#markup' => 'Hello'];
    return \Drupal::service('renderer')->render($build);
  }

}
"#;

/// A controller already injecting two services.
pub const WIRED_CONTROLLER: &str = r#"<?php

namespace Drupal\my_module\Controller;

use Drupal\Core\Controller\ControllerBase;
use Drupal\Core\Datetime\DateFormatterInterface;
use Drupal\Core\Session\AccountProxyInterface;
use Symfony\Component\DependencyInjection\ContainerInterface;

class ReportController extends ControllerBase {

  /**
   * The current user.
   *
   * @var \Drupal\Core\Session\AccountProxyInterface
   */
  protected $currentUser;

  /**
   * The date formatter.
   *
   * @var \Drupal\Core\Datetime\DateFormatterInterface
   */
  protected $dateFormatter;

  /**
   * Constructs a new ReportController object.
   *
   * @param \Drupal\Core\Session\AccountProxyInterface $current_user
   *   The current user.
   * @param \Drupal\Core\Datetime\DateFormatterInterface $date_formatter
   *   The date formatter.
   */
  public function __construct(AccountProxyInterface $current_user, DateFormatterInterface $date_formatter) {
    $this->currentUser = $current_user;
    $this->dateFormatter = $date_formatter;
  }

  /**
   * {@inheritdoc}
   */
  public static function create(ContainerInterface $container) {
    return new static(
      $container->get('current_user'),
      $container->get('date.formatter')
    );
  }

  public function build() {
    $date = \Drupal::service('date.formatter')->format(time());
    $build = ['#markup' => $date];
    return \Drupal::service('renderer')->render($build);
  }

}
"#;

/// A block plugin with no constructor or factory.
pub const FRESH_BLOCK: &str = r#"<?php

namespace Drupal\my_module\Plugin\Block;

use Drupal\Core\Block\BlockBase;

/**
 * Provides a greeting block.
 *
 * @Block(
 *   id = "greeting_block",
 *   admin_label = @Translation("Greeting"),
 * )
 */
class GreetingBlock extends BlockBase {

  /**
   * {@inheritdoc}
   */
  public function build() {
    $name = \Drupal::currentUser()->getDisplayName();
    return ['#markup' => $name];
  }

}
"#;
