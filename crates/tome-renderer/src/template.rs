//! Template rendering with search paths and globals.
//!
//! Templates are rendered with `minijinja`. Includes, imports and `extends`
//! are resolved against an ordered list of directories; the first directory
//! containing the requested name wins. Names with `..` segments are never
//! resolved.
//!
//! Auto-escaping is disabled: fragments handed to templates are already
//! HTML (rendered markdown, rendered partials). Use the `e` filter for
//! untrusted values.

use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;

use minijinja::{AutoEscape, Environment, Error, ErrorKind, Value};
use serde::Serialize;
use serde_json::Map;

/// Error returned when a template fails to compile or render.
#[derive(Debug, thiserror::Error)]
#[error("failed to render template {name}: {source}")]
pub struct TemplateError {
    /// Name (usually the path) of the template that failed.
    pub name: String,
    #[source]
    source: Error,
}

impl TemplateError {
    /// Source excerpt and context dump pointing at the failing line.
    #[must_use]
    pub fn debug_info(&self) -> String {
        self.source.display_debug_info().to_string()
    }
}

/// Renders template sources against a serializable context.
///
/// A renderer is cheap to build; the resolver creates one per render call
/// with the search path and globals that apply to that call.
#[derive(Clone, Debug, Default)]
pub struct TemplateRenderer {
    search_paths: Vec<PathBuf>,
    globals: Map<String, serde_json::Value>,
}

impl TemplateRenderer {
    /// Create a renderer resolving includes against `search_paths`, in order.
    #[must_use]
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            globals: Map::new(),
        }
    }

    /// Make `globals` visible to the template and every partial it pulls in.
    ///
    /// Keys of the render context shadow globals with the same name.
    #[must_use]
    pub fn with_globals(mut self, globals: &Map<String, serde_json::Value>) -> Self {
        self.globals.clone_from(globals);
        self
    }

    /// Render `source` with `context`.
    ///
    /// # Arguments
    ///
    /// * `name` - Template name used in error messages and for relative lookups
    /// * `source` - Template source text
    /// * `context` - Render context
    pub fn render<S: Serialize>(
        &self,
        name: &str,
        source: &str,
        context: &S,
    ) -> Result<String, TemplateError> {
        let env = self.environment();
        env.render_named_str(name, source, context)
            .map_err(|source| TemplateError {
                name: name.to_owned(),
                source,
            })
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_debug(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_loader(search_path_loader(self.search_paths.clone()));
        for (key, value) in &self.globals {
            env.add_global(key.clone(), Value::from_serialize(value));
        }
        env
    }
}

/// Build a loader that looks up template names in `search_paths`, in order.
///
/// minijinja loaders are synchronous, so partials are read with blocking
/// `std::fs` calls while a template renders. Partials are small and local;
/// every other read on the request path goes through `tokio::fs`.
fn search_path_loader(
    search_paths: Vec<PathBuf>,
) -> impl Fn(&str) -> Result<Option<String>, Error> + Send + Sync + 'static {
    move |name| {
        if name.split(['/', '\\']).any(|segment| segment == "..") {
            tracing::warn!(name, "refusing template name with parent segment");
            return Ok(None);
        }

        for dir in &search_paths {
            let candidate = dir.join(name.trim_start_matches('/'));
            match std::fs::read_to_string(&candidate) {
                Ok(source) => return Ok(Some(source)),
                Err(e) if matches!(e.kind(), IoErrorKind::NotFound | IoErrorKind::IsADirectory) => {}
                Err(e) => {
                    return Err(Error::new(
                        ErrorKind::InvalidOperation,
                        format!("could not read template {}", candidate.display()),
                    )
                    .with_source(e));
                }
            }
        }
        Ok(None)
    }
}
