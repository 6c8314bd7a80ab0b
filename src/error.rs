use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a refactor produced no edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefactorError {
    #[error("no class encloses the requested position")]
    NoEnclosingClass,

    #[error("no injection strategy for role `{0}`")]
    UnsupportedRole(String),

    #[error("unsupported class shape: {0}")]
    UnsupportedClassShape(String),

    #[error("nothing to inject")]
    NothingToInject,
}

/// Configuration loading failures.  Never fatal: callers log them and fall
/// back to defaults.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
