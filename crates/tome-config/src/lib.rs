//! Configuration management for Tome.
//!
//! Parses `tome.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Path Expansion
//!
//! Every `[paths]` value supports `~` and environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Relative paths are resolved against the directory containing the config
//! file (or the current directory when no file is found).

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override pages root directory.
    pub pages_dir: Option<PathBuf>,
    /// Override items root directory.
    pub items_dir: Option<PathBuf>,
    /// Override partials directory.
    pub partials_dir: Option<PathBuf>,
    /// Override shared content directory.
    pub shared_content_dir: Option<PathBuf>,
    /// Override root page alias.
    pub root_page: Option<String>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override diagnostic verbosity of error responses.
    pub verbose_errors: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tome.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content paths (relative strings from TOML).
    paths: PathsConfigRaw,
    /// Resolver behaviour.
    pub resolver: ResolverSettings,

    /// Resolved paths configuration (set after loading).
    #[serde(skip)]
    pub paths_resolved: PathsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw paths configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PathsConfigRaw {
    pages: Option<String>,
    items: Option<String>,
    partials: Option<String>,
    shared_content: Option<String>,
    not_found_template: Option<String>,
    root_page: Option<String>,
}

/// Resolved content paths.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    /// Root of the page tree.
    pub pages_dir: PathBuf,
    /// Root of the item tree.
    pub items_dir: PathBuf,
    /// Directory searched for template partials.
    pub partials_dir: PathBuf,
    /// Root of the shared content tree (`None` disables shared content).
    pub shared_content_dir: Option<PathBuf>,
    /// Template rendered for 404 and soft-not-found responses.
    pub not_found_template: PathBuf,
    /// Logical page path served for `/` (e.g. "/home").
    pub root_page: Option<String>,
}

/// Resolver configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverSettings {
    /// Request prefix left to the transport layer (e.g. "/resources").
    pub static_prefix: Option<String>,
    /// Include error chains and template debug info in error bodies.
    pub verbose_errors: bool,
    /// Whether disk reads are memoized.
    pub cache_enabled: bool,
    /// Upper bound for a single controller invocation.
    pub controller_timeout_ms: Option<u64>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            static_prefix: None,
            verbose_errors: true,
            cache_enabled: true,
            controller_timeout_ms: None,
        }
    }
}

impl ResolverSettings {
    /// Controller timeout as a [`Duration`].
    #[must_use]
    pub fn controller_timeout(&self) -> Option<Duration> {
        self.controller_timeout_ms.map(Duration::from_millis)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`paths.pages`").
        field: String,
        /// Error message (e.g., "${`SITE_ROOT`} not set").
        message: String,
    },
}

/// Require a logical path to be absolute (start with `/`).
fn require_logical_path(value: &str, field: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "{field} must start with '/', got {value:?}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `tome.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(pages_dir) = &settings.pages_dir {
            self.paths_resolved.pages_dir.clone_from(pages_dir);
        }
        if let Some(items_dir) = &settings.items_dir {
            self.paths_resolved.items_dir.clone_from(items_dir);
        }
        if let Some(partials_dir) = &settings.partials_dir {
            self.paths_resolved.partials_dir.clone_from(partials_dir);
        }
        if let Some(shared) = &settings.shared_content_dir {
            self.paths_resolved.shared_content_dir = Some(shared.clone());
        }
        if let Some(root_page) = &settings.root_page {
            self.paths_resolved.root_page = Some(root_page.clone());
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.resolver.cache_enabled = cache_enabled;
        }
        if let Some(verbose_errors) = settings.verbose_errors {
            self.resolver.verbose_errors = verbose_errors;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            paths: PathsConfigRaw::default(),
            resolver: ResolverSettings::default(),
            paths_resolved: PathsConfig {
                pages_dir: base.join("site/pages"),
                items_dir: base.join("site/items"),
                partials_dir: base.join("site/partials"),
                shared_content_dir: None,
                not_found_template: base.join("site/not_found.jinja"),
                root_page: None,
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand ~ and environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root_page) = &self.paths_resolved.root_page {
            require_logical_path(root_page, "paths.root_page")?;
        }
        if let Some(prefix) = &self.resolver.static_prefix {
            require_logical_path(prefix, "resolver.static_prefix")?;
        }
        if self.resolver.controller_timeout_ms == Some(0) {
            return Err(ConfigError::Validation(
                "resolver.controller_timeout_ms must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand `~` and environment variable references in path strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let paths = &mut self.paths;
        for (value, field) in [
            (&mut paths.pages, "paths.pages"),
            (&mut paths.items, "paths.items"),
            (&mut paths.partials, "paths.partials"),
            (&mut paths.shared_content, "paths.shared_content"),
            (&mut paths.not_found_template, "paths.not_found_template"),
        ] {
            if let Some(raw) = value.as_deref() {
                *value = Some(expand::expand_env(raw, field)?);
            }
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.paths_resolved = PathsConfig {
            pages_dir: resolve(self.paths.pages.as_deref(), "site/pages"),
            items_dir: resolve(self.paths.items.as_deref(), "site/items"),
            partials_dir: resolve(self.paths.partials.as_deref(), "site/partials"),
            shared_content_dir: self
                .paths
                .shared_content
                .as_deref()
                .map(|p| config_dir.join(p)),
            not_found_template: resolve(
                self.paths.not_found_template.as_deref(),
                "site/not_found.jinja",
            ),
            root_page: self.paths.root_page.clone(),
        };
    }
}
