//! Request and per-call options.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An incoming page request, already decoded by the transport.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Request path, starting with `/`.
    pub path: String,
    /// Decoded query parameters.
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Request cookies.
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    /// Ambient values exposed to every template, partial and controller.
    #[serde(default)]
    pub globals: Map<String, Value>,
}

impl Request {
    /// Create a request for `path` with no query, cookies or globals.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Add a global value.
    #[must_use]
    pub fn with_global(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(key.into(), value.into());
        self
    }
}

/// Options that apply to a single [`resolve`](crate::PageResolver::resolve) call.
#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
    /// Resolve this path instead of the request path.
    ///
    /// The custom path also becomes the view-model's `active_path` and the
    /// path seen by the controller.
    pub custom_path: Option<String>,
    /// File name to content replacements for this call only.
    ///
    /// Applies to fragments, `template.jinja` and `controller.toml` of the
    /// resolved node. Overrides never reach the disk cache.
    pub overrides: HashMap<String, String>,
}

impl ResolveOptions {
    /// Resolve `path` instead of the request path.
    #[must_use]
    pub fn with_custom_path(mut self, path: impl Into<String>) -> Self {
        self.custom_path = Some(path.into());
        self
    }

    /// Replace the file `name` with `content` for this call.
    #[must_use]
    pub fn with_override(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), content.into());
        self
    }
}
