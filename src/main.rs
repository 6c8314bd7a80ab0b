use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use drupal_di_lsp::Backend;
use drupal_di_lsp::analyzer;
use drupal_di_lsp::classify::{HeuristicClassifier, RoleClassifier};
use drupal_di_lsp::config::Config;
use drupal_di_lsp::refactor::{EditBatch, RefactorOptions, Refactorer, apply_edits};
use drupal_di_lsp::services::{ServiceRegistry, ServicesYamlIndex};
use drupal_di_lsp::types::{ArchitecturalRole, DiRefactoringContext};

/// Rewrites static `\Drupal` service calls into constructor injection.
///
/// Without a subcommand the language server runs on stdin/stdout.
#[derive(Debug, Parser)]
#[command(name = "drupal-di-lsp", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print (or apply) the injection edits for one PHP file.
    Refactor {
        /// The PHP file to refactor.
        file: PathBuf,

        /// Service id to inject; repeatable.  Defaults to every service the
        /// class fetches statically.
        #[arg(long = "service", value_name = "ID")]
        services: Vec<String>,

        /// Architectural role (`base-class` or `plugin-factory`).  Detected
        /// from the class declaration when omitted.
        #[arg(long)]
        role: Option<ArchitecturalRole>,

        /// One-based line inside the class to refactor.  Defaults to the
        /// first class in the file.
        #[arg(long)]
        line: Option<u32>,

        /// Workspace root used for configuration and `*.services.yml`
        /// lookup.
        #[arg(long, value_name = "DIR")]
        workspace: Option<PathBuf>,

        /// Write the refactored file instead of printing the edits.
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        None => {
            let stdin = tokio::io::stdin();
            let stdout = tokio::io::stdout();
            let (service, socket) = LspService::new(Backend::new);
            Server::new(stdin, stdout, socket).serve(service).await;
            ExitCode::SUCCESS
        }
        Some(Command::Refactor {
            file,
            services,
            role,
            line,
            workspace,
            write,
        }) => match run_refactor(file, services, role, line, workspace, write) {
            Ok(()) => ExitCode::SUCCESS,
            Err(message) => {
                eprintln!("error: {}", message);
                ExitCode::FAILURE
            }
        },
    }
}

fn run_refactor(
    file: PathBuf,
    services: Vec<String>,
    role: Option<ArchitecturalRole>,
    line: Option<u32>,
    workspace: Option<PathBuf>,
    write: bool,
) -> Result<(), String> {
    let source = fs::read_to_string(&file).map_err(|e| format!("failed to read {}: {}", file.display(), e))?;

    let config = Config::load(workspace.as_deref());
    let directory = config.service_directory();
    let registry: Option<ServicesYamlIndex> = workspace.as_deref().map(ServicesYamlIndex::scan);

    let class_line = match line {
        Some(0) => return Err("--line is one-based".to_string()),
        Some(l) => l - 1,
        None => analyzer::analyze(&source)
            .map(|info| info.class.line)
            .ok_or_else(|| format!("no class found in {}", file.display()))?,
    };

    let classifier = HeuristicClassifier::new().with_mappings(&config.base_class_roles);
    let hierarchy = classifier.classify(&source, class_line);
    let role = role
        .or_else(|| hierarchy.as_ref().map(|h| h.role.clone()))
        .ok_or_else(|| format!("no class at line {} of {}", class_line + 1, file.display()))?;

    let mut ctx = DiRefactoringContext::new(&source, role, services).with_cursor_line(class_line);
    if let Some(h) = &hierarchy {
        ctx.known_interfaces = h.interfaces.clone();
    }

    let mut refactorer = Refactorer::new(&directory).with_options(RefactorOptions::from(&config));
    if let Some(registry) = &registry {
        refactorer = refactorer.with_registry(registry as &dyn ServiceRegistry);
    }

    let batch = match refactorer.try_refactor(&ctx) {
        Ok(batch) => batch,
        Err(e) => {
            eprintln!("nothing to do: {}", e);
            EditBatch::empty()
        }
    };

    if write {
        if batch.is_empty() {
            return Ok(());
        }
        let refactored = apply_edits(&source, &batch);
        fs::write(&file, refactored).map_err(|e| format!("failed to write {}: {}", file.display(), e))?;
        eprintln!("applied {} edit(s) to {}", batch.len(), file.display());
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&batch).map_err(|e| format!("failed to encode edits: {}", e))?;
    println!("{}", json);
    Ok(())
}
