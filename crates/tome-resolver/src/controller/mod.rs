//! Page controllers.
//!
//! A controller runs before a node's template is rendered and decides what
//! happens to the request: redirect it, answer it directly, hand it to the
//! not-found page, or add data to the view-model.
//!
//! Controllers come from three places, in precedence order:
//!
//! 1. a `controller.toml` supplied through [`ResolveOptions`](crate::ResolveOptions)
//!    overrides (loaded through a temporary file)
//! 2. a native [`Controller`] registered with
//!    [`PageResolver::register_controller`](crate::PageResolver::register_controller)
//! 3. a `controller.toml` in the node directory
//!
//! # Script controllers
//!
//! `controller.toml` files describe rules. Top-level keys form the default
//! rule; `[[rule]]` tables are tried first, in order, and the first whose
//! `when` expression holds wins. Every string is a `minijinja` template
//! rendered with `request`, `path`, `query`, `cookies`, `globals`,
//! `controller_path` and `page_root`.
//!
//! ```toml
//! [[rule]]
//! when = "not cookies.session"
//! redirect = "/login?next={{ path }}"
//!
//! [[rule]]
//! when = "query.format == 'txt'"
//! raw = { type = "text/plain", file = "export.txt" }
//!
//! view_data = { title = "Products", user = "{{ cookies.session }}" }
//! headers = { "cache-control" = "no-store" }
//! ```

mod host;
mod script;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

pub(crate) use host::ControllerHost;
pub use script::{LoadError, ScriptController};

use crate::config::ResolverConfig;
use crate::request::Request;
use crate::resolver::PageResolver;
use crate::response::{Body, CookieValue, TEXT};

/// Request handler attached to a node.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Decide the outcome of `request`.
    ///
    /// `request.path` is the path being resolved (the custom path when one
    /// was given).
    async fn handle(
        &self,
        request: &Request,
        caps: &Capabilities<'_>,
    ) -> Result<ControllerResult, ControllerError>;
}

/// What a controller may use while handling a request.
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    /// Configuration of the resolver running the controller.
    pub config: &'a ResolverConfig,
    /// The resolver itself, for nested resolutions.
    pub resolver: &'a PageResolver,
    /// Logical path of the node the controller belongs to.
    pub controller_path: &'a str,
    /// Directory of the node.
    pub page_root: &'a Path,
}

/// Direct response produced by a controller.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Body,
}

impl RawResponse {
    /// `200 text/plain` response with `content`.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: TEXT.to_owned(),
            body: Body::Text(content.into()),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Decision taken by a controller.
#[derive(Debug)]
pub enum ControllerOutcome {
    /// Temporary redirect (302).
    Redirect(String),
    /// Permanent redirect (301).
    RedirectPermanent(String),
    /// Render the not-found page with status 404.
    SoftNotFound,
    /// Answer with this response; no template is rendered.
    Raw(RawResponse),
    /// Merge these keys into the view-model and render the template.
    Augment(Map<String, Value>),
}

/// Controller outcome plus cookie and header mutations.
///
/// Cookies and headers are applied to redirect, raw and augmented
/// responses; a soft not-found discards them.
#[derive(Debug)]
pub struct ControllerResult {
    pub outcome: ControllerOutcome,
    pub cookies: BTreeMap<String, CookieValue>,
    pub headers: BTreeMap<String, String>,
}

impl ControllerResult {
    fn from_outcome(outcome: ControllerOutcome) -> Self {
        Self {
            outcome,
            cookies: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::from_outcome(ControllerOutcome::Redirect(location.into()))
    }

    #[must_use]
    pub fn redirect_permanent(location: impl Into<String>) -> Self {
        Self::from_outcome(ControllerOutcome::RedirectPermanent(location.into()))
    }

    #[must_use]
    pub fn soft_not_found() -> Self {
        Self::from_outcome(ControllerOutcome::SoftNotFound)
    }

    #[must_use]
    pub fn raw(response: RawResponse) -> Self {
        Self::from_outcome(ControllerOutcome::Raw(response))
    }

    /// Continue to the template with `view_data` merged into the view-model.
    #[must_use]
    pub fn augment(view_data: Map<String, Value>) -> Self {
        Self::from_outcome(ControllerOutcome::Augment(view_data))
    }

    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), CookieValue::Set(value.into()));
        self
    }

    #[must_use]
    pub fn delete_cookie(mut self, name: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), CookieValue::Delete);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

impl Default for ControllerResult {
    fn default() -> Self {
        Self::augment(Map::new())
    }
}

/// Error raised while a controller handles a request.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("{0}")]
    Message(String),

    #[error("failed to evaluate {expression:?}: {source}")]
    Expression {
        expression: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ControllerError {
    /// Error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    static_assertions::assert_obj_safe!(Controller);
    static_assertions::assert_impl_all!(ControllerResult: Send);

    #[test]
    fn test_result_builders() {
        let result = ControllerResult::redirect("/home")
            .with_cookie("session", "abc")
            .delete_cookie("stale")
            .with_header("x-trace", "1");

        assert!(matches!(result.outcome, ControllerOutcome::Redirect(ref l) if l == "/home"));
        assert_eq!(result.cookies.get("session"), Some(&CookieValue::Set("abc".to_owned())));
        assert_eq!(result.cookies.get("stale"), Some(&CookieValue::Delete));
        assert_eq!(result.headers.get("x-trace").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_raw_defaults() {
        let raw = RawResponse::text("hello");
        assert_eq!(raw.status, 200);
        assert_eq!(raw.content_type, "text/plain");
        assert_eq!(raw.body.as_text(), Some("hello"));
    }

    #[test]
    fn test_default_result_augments_nothing() {
        let result = ControllerResult::default();
        assert!(matches!(result.outcome, ControllerOutcome::Augment(ref m) if m.is_empty()));
    }
}
