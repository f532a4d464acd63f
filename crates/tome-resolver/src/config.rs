//! Resolver configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Resolver configuration.
#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Root of the page tree.
    pub pages_dir: PathBuf,
    /// Root of the item tree.
    pub items_dir: PathBuf,
    /// Directory searched for template partials.
    pub partials_dir: PathBuf,
    /// Root of the shared-content tree (`None` yields an empty object).
    pub shared_content_dir: Option<PathBuf>,
    /// Template rendered for unknown paths and soft not-found results.
    pub not_found_template: PathBuf,
    /// Logical path served for `/` when its directory exists.
    pub root_page: Option<String>,
    /// Request paths under this prefix are left to the transport.
    pub static_prefix: Option<String>,
    /// Include error chains and template debug info in fault bodies.
    pub verbose_errors: bool,
    /// Memoize directory listings, file bodies and path lookups.
    pub cache_enabled: bool,
    /// Upper bound on controller execution (`None` waits indefinitely).
    pub controller_timeout: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pages_dir: PathBuf::from("site/pages"),
            items_dir: PathBuf::from("site/items"),
            partials_dir: PathBuf::from("site/partials"),
            shared_content_dir: None,
            not_found_template: PathBuf::from("site/not_found.jinja"),
            root_page: None,
            static_prefix: None,
            verbose_errors: true,
            cache_enabled: true,
            controller_timeout: None,
        }
    }
}

impl ResolverConfig {
    /// Whether `path` belongs to the static prefix.
    pub(crate) fn is_static(&self, path: &str) -> bool {
        self.static_prefix.as_deref().is_some_and(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Create resolver configuration from Tome config.
///
/// # Arguments
///
/// * `config` - Loaded `tome.toml` configuration
#[must_use]
pub fn resolver_config_from_tome_config(config: &tome_config::Config) -> ResolverConfig {
    let paths = &config.paths_resolved;
    ResolverConfig {
        pages_dir: paths.pages_dir.clone(),
        items_dir: paths.items_dir.clone(),
        partials_dir: paths.partials_dir.clone(),
        shared_content_dir: paths.shared_content_dir.clone(),
        not_found_template: paths.not_found_template.clone(),
        root_page: paths.root_page.clone(),
        static_prefix: config.resolver.static_prefix.clone(),
        verbose_errors: config.resolver.verbose_errors,
        cache_enabled: config.resolver.cache_enabled,
        controller_timeout: config.resolver.controller_timeout(),
    }
}
