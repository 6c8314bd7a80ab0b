mod common;

use common::{FRESH_CONTROLLER, WIRED_CONTROLLER, assert_idempotent, count, refactor};
use drupal_di_lsp::error::RefactorError;
use drupal_di_lsp::refactor::{RefactorOptions, Refactorer};
use drupal_di_lsp::services::ServiceDirectory;
use drupal_di_lsp::types::{ArchitecturalRole, DiRefactoringContext};

const FRESH_CONTROLLER_REFACTORED: &str = r#"<?php

namespace Drupal\my_module\Controller;

use Drupal\Core\Controller\ControllerBase;
use Drupal\Core\Render\RendererInterface;
use Symfony\Component\DependencyInjection\ContainerInterface;

class HelloController extends ControllerBase {

  /**
   * The renderer.
   *
   * @var \Drupal\Core\Render\RendererInterface
   */
  protected RendererInterface $renderer;

  /**
   * Constructs a new HelloController object.
   *
   * @param \Drupal\Core\Render\RendererInterface $renderer
   *   The renderer.
   */
  public function __construct(RendererInterface $renderer) {
    $this->renderer = $renderer;
  }

  /**
   * {@inheritdoc}
   */
  public static function create(ContainerInterface $container) {
    return new static(
      $container->get('renderer')
    );
  }

  public function build() {
    $build = ['#markup' => 'Hello'];
    return $this->renderer->render($build);
  }

}
"#;

const WIRED_CONTROLLER_REFACTORED: &str = r#"<?php

namespace Drupal\my_module\Controller;

use Drupal\Core\Controller\ControllerBase;
use Drupal\Core\Datetime\DateFormatterInterface;
use Drupal\Core\Session\AccountProxyInterface;
use Symfony\Component\DependencyInjection\ContainerInterface;
use Drupal\Core\Render\RendererInterface;

class ReportController extends ControllerBase {

  /**
   * The renderer.
   *
   * @var \Drupal\Core\Render\RendererInterface
   */
  protected RendererInterface $renderer;

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
   * @param \Drupal\Core\Render\RendererInterface $renderer
   *   The renderer.
   */
  public function __construct(
    AccountProxyInterface $current_user,
    DateFormatterInterface $date_formatter,
    RendererInterface $renderer
  ) {
    $this->currentUser = $current_user;
    $this->dateFormatter = $date_formatter;
    $this->renderer = $renderer;
  }

  /**
   * {@inheritdoc}
   */
  public static function create(ContainerInterface $container) {
    return new static(
      $container->get('current_user'),
      $container->get('date.formatter'),
      $container->get('renderer')
    );
  }

  public function build() {
    $date = $this->dateFormatter->format(time());
    $build = ['#markup' => $date];
    return $this->renderer->render($build);
  }

}
"#;

#[test]
fn test_fresh_controller_gets_full_wiring() {
    let (batch, output) = refactor(FRESH_CONTROLLER, ArchitecturalRole::BaseClass, &["renderer"]);
    // Imports, property, constructor, factory, one call site.
    assert_eq!(batch.len(), 5, "{:#?}", batch.edits());
    assert_eq!(output, FRESH_CONTROLLER_REFACTORED);
    assert_idempotent(&output, ArchitecturalRole::BaseClass, &["renderer"]);
    assert_idempotent(&output, ArchitecturalRole::BaseClass, &[]);
}

#[test]
fn test_empty_service_list_injects_every_detected_call() {
    let (_, output) = refactor(FRESH_CONTROLLER, ArchitecturalRole::BaseClass, &[]);
    assert_eq!(output, FRESH_CONTROLLER_REFACTORED);
}

#[test]
fn test_wired_controller_merges_new_service() {
    let services = ["date.formatter", "renderer"];
    let (batch, output) = refactor(WIRED_CONTROLLER, ArchitecturalRole::BaseClass, &services);
    // Import, property, constructor, factory, two call sites.
    assert_eq!(batch.len(), 6, "{:#?}", batch.edits());
    assert_eq!(output, WIRED_CONTROLLER_REFACTORED);
    assert_idempotent(&output, ArchitecturalRole::BaseClass, &services);
}

#[test]
fn test_merged_factory_keeps_doc_and_signature() {
    let (batch, output) = refactor(WIRED_CONTROLLER, ArchitecturalRole::BaseClass, &["renderer"]);
    let factory = batch
        .iter()
        .find(|e| e.description == "Pass services from create()")
        .expect("factory edit");
    // Only the `return new static(...)` statement is rewritten.
    assert_eq!((factory.range.start.line, factory.range.start.character), (42, 0));
    assert_eq!(factory.range.end.line, 45);
    assert!(output.contains(
        "  /**
   * {@inheritdoc}
   */
  public static function create(ContainerInterface $container) {
    return new static(
      $container->get('current_user'),
      $container->get('date.formatter'),
      $container->get('renderer')
    );
  }"
    ));
}

#[test]
fn test_wired_service_is_not_emitted_twice() {
    let (_, output) = refactor(WIRED_CONTROLLER, ArchitecturalRole::BaseClass, &["date.formatter"]);
    assert_eq!(count(&output, "$container->get('date.formatter')"), 1);
    assert_eq!(count(&output, "protected $dateFormatter;"), 1);
    assert_eq!(count(&output, "use Drupal\\Core\\Datetime\\DateFormatterInterface;"), 1);
    assert!(output.contains("$date = $this->dateFormatter->format(time());"));
    // Only the listed id is rewritten.
    assert!(output.contains("return \\Drupal::service('renderer')->render($build);"));
}

#[test]
fn test_instance_assign_factory_gets_new_assignment() {
    let source = r#"<?php

namespace Drupal\my_module\Form;

use Drupal\Core\Form\FormBase;
use Drupal\Core\Form\FormStateInterface;
use Symfony\Component\DependencyInjection\ContainerInterface;

class SettingsForm extends FormBase {

  /**
   * The messenger.
   *
   * @var \Drupal\Core\Messenger\MessengerInterface
   */
  protected $messenger;

  public static function create(ContainerInterface $container) {
    $instance = parent::create($container);
    $instance->messenger = $container->get('messenger');
    return $instance;
  }

  public function getFormId() {
    return 'settings_form';
  }

  public function buildForm(array $form, FormStateInterface $form_state) {
    $form['#markup'] = \Drupal::service('renderer')->renderPlain($form);
    return $form;
  }

  public function submitForm(array &$form, FormStateInterface $form_state) {
    \Drupal::messenger()->addStatus('Saved');
  }

}
"#;
    let (_, output) = refactor(source, ArchitecturalRole::BaseClass, &[]);

    assert!(output.contains(
        "use Symfony\\Component\\DependencyInjection\\ContainerInterface;\nuse Drupal\\Core\\Render\\RendererInterface;\n"
    ));
    assert!(output.contains(
        "  protected RendererInterface $renderer;\n\n  /**\n   * The messenger.\n"
    ));
    assert!(output.contains(
        "    $instance->messenger = $container->get('messenger');\n    $instance->renderer = $container->get('renderer');\n    return $instance;\n"
    ));
    assert!(!output.contains("__construct"));
    assert!(output.contains("$form['#markup'] = $this->renderer->renderPlain($form);"));
    assert!(output.contains("$this->messenger->addStatus('Saved');"));
    assert_idempotent(&output, ArchitecturalRole::BaseClass, &[]);
}

#[test]
fn test_constructor_without_factory() {
    let source = r#"<?php

class StateController extends ControllerBase {

  protected $state;

  public function __construct() {
    $this->state = \Drupal::state();
  }

}
"#;
    let expected = r#"<?php

use Drupal\Core\State\StateInterface;
use Symfony\Component\DependencyInjection\ContainerInterface;

class StateController extends ControllerBase {

  protected $state;

  public function __construct(StateInterface $state) {
    $this->state = $state;
  }

  /**
   * {@inheritdoc}
   */
  public static function create(ContainerInterface $container) {
    return new static(
      $container->get('state')
    );
  }

}
"#;
    let (_, output) = refactor(source, ArchitecturalRole::BaseClass, &[]);
    assert_eq!(output, expected);
    assert_idempotent(&output, ArchitecturalRole::BaseClass, &[]);
}

#[test]
fn test_promoted_constructor_keeps_promotion() {
    let source = r#"<?php

namespace Drupal\my_module\Form;

use Drupal\Core\Form\FormBase;
use Drupal\Core\State\StateInterface;
use Symfony\Component\DependencyInjection\ContainerInterface;

final class StateForm extends FormBase {

  public function __construct(
    protected readonly StateInterface $state,
  ) {}

  public static function create(ContainerInterface $container) {
    return new static(
      $container->get('state'),
    );
  }

  public function getFormId() {
    return \Drupal::service('module_handler')->moduleExists('x') ? 'a' : 'b';
  }

}
"#;
    let (_, output) = refactor(source, ArchitecturalRole::BaseClass, &[]);

    assert!(output.contains(
        "    protected readonly StateInterface $state,\n    protected readonly ModuleHandlerInterface $moduleHandler,\n  ) {"
    ));
    assert!(output.contains(
        "      $container->get('state'),\n      $container->get('module_handler'),\n    );"
    ));
    // Promoted parameters need neither a property nor an assignment.
    assert!(!output.contains("protected ModuleHandlerInterface $moduleHandler;"));
    assert!(!output.contains("$this->moduleHandler = "));
    assert!(output.contains("return $this->moduleHandler->moduleExists('x')"));
    assert_idempotent(&output, ArchitecturalRole::BaseClass, &[]);
}

#[test]
fn test_shortcut_accessor_is_preserved() {
    let source = r#"<?php

class SiteController extends ControllerBase {

  public function title() {
    return \Drupal::config('system.site')->get('name');
  }

}
"#;
    let (_, output) = refactor(source, ArchitecturalRole::BaseClass, &[]);
    assert!(output.contains("return $this->configFactory->get('system.site')->get('name');"));
    assert!(output.contains("protected ConfigFactoryInterface $configFactory;"));
    assert!(output.contains("public function __construct(ConfigFactoryInterface $config_factory) {"));
    assert!(output.contains("$container->get('config.factory')"));
}

#[test]
fn test_shortcut_and_locator_share_one_property() {
    let source = r#"<?php

class EntityController extends ControllerBase {

  public function a() {
    return \Drupal::entityTypeManager()->getStorage('node');
  }

  public function b() {
    return \Drupal::service('entity_type.manager')->getStorage('user');
  }

}
"#;
    let (_, output) = refactor(source, ArchitecturalRole::BaseClass, &[]);
    assert_eq!(count(&output, "$this->entityTypeManager->getStorage("), 2);
    assert_eq!(count(&output, "protected EntityTypeManagerInterface $entityTypeManager;"), 1);
    assert_eq!(count(&output, "$container->get('entity_type.manager')"), 1);
}

#[test]
fn test_static_methods_are_left_alone() {
    let source = r#"<?php

class StaticController extends ControllerBase {

  public static function helper() {
    return \Drupal::service('state')->get('x');
  }

  public function page() {
    return \Drupal::state()->get('y');
  }

}
"#;
    let (_, output) = refactor(source, ArchitecturalRole::BaseClass, &[]);
    assert!(output.contains("return \\Drupal::service('state')->get('x');"));
    assert!(output.contains("return $this->state->get('y');"));
    assert_idempotent(&output, ArchitecturalRole::BaseClass, &[]);
}

#[test]
fn test_taken_short_name_uses_fully_qualified_type() {
    let source = r#"<?php

namespace Drupal\my_module\Controller;

use Drupal\other\RendererInterface;

class ClashController extends ControllerBase {

  public function build() {
    return \Drupal::service('renderer')->render($x);
  }

}
"#;
    let (_, output) = refactor(source, ArchitecturalRole::BaseClass, &[]);
    assert!(output.contains("protected \\Drupal\\Core\\Render\\RendererInterface $renderer;"));
    assert!(output.contains("public function __construct(\\Drupal\\Core\\Render\\RendererInterface $renderer) {"));
    assert!(!output.contains("use Drupal\\Core\\Render\\RendererInterface;"));
    assert_eq!(count(&output, "RendererInterface;"), 1);
}

#[test]
fn test_aliased_import_is_reused() {
    let source = r#"<?php

namespace Drupal\my_module\Controller;

use Drupal\Core\Render\RendererInterface as Renderer;

class AliasController extends ControllerBase {

  public function build() {
    return \Drupal::service('renderer')->render($x);
  }

}
"#;
    let (_, output) = refactor(source, ArchitecturalRole::BaseClass, &[]);
    assert!(output.contains("protected Renderer $renderer;"));
    assert!(output.contains("public function __construct(Renderer $renderer) {"));
    assert_eq!(count(&output, "Drupal\\Core\\Render\\RendererInterface;"), 0);
}

#[test]
fn test_strict_services_drop_unknown_ids() {
    let source = r#"<?php

class CustomController extends ControllerBase {

  public function run() {
    \Drupal::service('my_custom.service')->go();
  }

}
"#;
    let ctx = DiRefactoringContext::new(source, ArchitecturalRole::BaseClass, vec!["my_custom.service".to_string()]);
    let refactorer = Refactorer::new(ServiceDirectory::builtin()).with_options(RefactorOptions {
        strict_services: true,
        ..RefactorOptions::default()
    });
    assert_eq!(refactorer.try_refactor(&ctx), Err(RefactorError::NothingToInject));
}

#[test]
fn test_errors() {
    let directory = ServiceDirectory::builtin();

    let ctx = DiRefactoringContext::new(FRESH_CONTROLLER, ArchitecturalRole::Other("entity".into()), Vec::new());
    assert_eq!(
        Refactorer::new(directory).try_refactor(&ctx),
        Err(RefactorError::UnsupportedRole("entity".to_string()))
    );

    let ctx = DiRefactoringContext::new("<?php\nfunction x() {}\n", ArchitecturalRole::BaseClass, Vec::new());
    assert_eq!(Refactorer::new(directory).try_refactor(&ctx), Err(RefactorError::NoEnclosingClass));

    let ctx = DiRefactoringContext::new("<?php\nclass A extends ControllerBase {}\n", ArchitecturalRole::BaseClass, Vec::new());
    assert!(matches!(
        Refactorer::new(directory).try_refactor(&ctx),
        Err(RefactorError::UnsupportedClassShape(_))
    ));

    let ctx = DiRefactoringContext::new(WIRED_CONTROLLER, ArchitecturalRole::BaseClass, vec!["current_user".to_string()]);
    assert_eq!(Refactorer::new(directory).try_refactor(&ctx), Err(RefactorError::NothingToInject));
}

#[test]
fn test_factory_arguments_must_line_up_with_constructor() {
    let source = r#"<?php

class OddController extends ControllerBase {

  public function __construct(StateInterface $state) {
    $this->state = $state;
  }

  public static function create(ContainerInterface $container) {
    return new static();
  }

  public function page() {
    return \Drupal::service('renderer');
  }

}
"#;
    let ctx = DiRefactoringContext::new(source, ArchitecturalRole::BaseClass, Vec::new());
    assert!(matches!(
        Refactorer::new(ServiceDirectory::builtin()).try_refactor(&ctx),
        Err(RefactorError::UnsupportedClassShape(_))
    ));
}
