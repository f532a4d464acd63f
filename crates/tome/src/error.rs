//! CLI error types.

use tome_config::ConfigError;
use tome_resolver::ResolverError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Resolver(#[from] ResolverError),

    #[error("{0}")]
    Validation(String),
}
