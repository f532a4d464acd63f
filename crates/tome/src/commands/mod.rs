//! CLI command implementations.

pub(crate) mod render;
pub(crate) mod routes;

use std::path::PathBuf;

use clap::Args;
use tome_config::{CliSettings, Config};
use tome_resolver::{PageResolver, resolver_config_from_tome_config};

use crate::error::CliError;

pub(crate) use render::RenderArgs;
pub(crate) use routes::RoutesArgs;

/// Site location arguments shared by every command.
#[derive(Args)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover tome.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pages root directory (overrides config).
    #[arg(long)]
    pages: Option<PathBuf>,

    /// Items root directory (overrides config).
    #[arg(long)]
    items: Option<PathBuf>,

    /// Partials directory (overrides config).
    #[arg(long)]
    partials: Option<PathBuf>,

    /// Shared content directory (overrides config).
    #[arg(long)]
    shared_content: Option<PathBuf>,

    /// Logical path served for `/` (overrides config).
    #[arg(long)]
    root_page: Option<String>,

    /// Disable memoization of disk reads.
    #[arg(long)]
    no_cache: bool,

    /// Only print reason phrases for failed requests.
    #[arg(long)]
    terse_errors: bool,

    /// Enable verbose output (resolver logs at info level).
    #[arg(short, long)]
    pub verbose: bool,
}

impl SiteArgs {
    /// Load configuration with command-line overrides applied.
    pub(crate) fn load_config(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            pages_dir: self.pages.clone(),
            items_dir: self.items.clone(),
            partials_dir: self.partials.clone(),
            shared_content_dir: self.shared_content.clone(),
            root_page: self.root_page.clone(),
            cache_enabled: self.no_cache.then_some(false),
            verbose_errors: self.terse_errors.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(
            pages = %config.paths_resolved.pages_dir.display(),
            items = %config.paths_resolved.items_dir.display(),
            "Loaded configuration"
        );
        Ok(config)
    }
}

/// Build a resolver for the configured site.
pub(crate) async fn build_resolver(config: &Config) -> Result<PageResolver, CliError> {
    let resolver_config = resolver_config_from_tome_config(config);
    Ok(PageResolver::new(resolver_config).await?)
}
