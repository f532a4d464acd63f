//! Construction errors and per-request faults.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tome_renderer::TemplateError;

use crate::controller::{ControllerError, LoadError};
use crate::response::ResponseDescriptor;

/// Error constructing a [`PageResolver`](crate::PageResolver).
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// A content tree root could not be walked.
    #[error("failed to index content tree {}: {source}", root.display())]
    Tree {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The not-found template could not be read.
    #[error("failed to read not-found template {}: {source}", path.display())]
    NotFoundTemplate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reason a content fragment could not be built.
#[derive(Debug, thiserror::Error)]
pub enum FragmentError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Failure while resolving a single request.
///
/// Faults never escape [`resolve`](crate::PageResolver::resolve); each is
/// turned into a terminal response.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    /// A controller supplied through call overrides failed to load.
    #[error("injected controller code failed to load: {0}")]
    InjectedCode(#[source] LoadError),

    /// The controller file of a node failed to load.
    #[error("controller at {path} failed to load: {source}")]
    ControllerLoad {
        path: String,
        #[source]
        source: LoadError,
    },

    /// A controller returned an error.
    #[error("controller at {path} failed: {source}")]
    Controller {
        path: String,
        #[source]
        source: ControllerError,
    },

    /// A controller exceeded the configured timeout.
    #[error("controller at {path} did not finish within {timeout:?}")]
    ControllerTimeout { path: String, timeout: Duration },

    /// A content fragment or shared-content file could not be built.
    #[error("failed to build fragment {}: {source}", path.display())]
    Fragment {
        path: PathBuf,
        #[source]
        source: FragmentError,
    },

    /// The node template or the not-found template failed to render.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A node has no template and its controller did not short-circuit.
    #[error(
        "page path {} does not have a template and controller did not return raw content",
        path.display()
    )]
    Configuration { path: PathBuf },
}

impl Fault {
    /// HTTP status reported for this fault.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::InjectedCode(_) => 400,
            Self::ControllerLoad { .. }
            | Self::Controller { .. }
            | Self::ControllerTimeout { .. }
            | Self::Fragment { .. }
            | Self::Template(_)
            | Self::Configuration { .. } => 500,
        }
    }

    /// Full description including template debug info when available.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let mut out = self.to_string();
        let template = match self {
            Self::Template(e)
            | Self::Fragment {
                source: FragmentError::Template(e),
                ..
            } => Some(e),
            _ => None,
        };
        if let Some(info) = template.map(TemplateError::debug_info)
            && !info.is_empty()
        {
            out.push_str("\n\n");
            out.push_str(&info);
        }
        out
    }

    /// Terminal response for this fault.
    ///
    /// Verbose bodies carry the [`diagnostic`](Self::diagnostic); terse
    /// bodies only the reason phrase.
    #[must_use]
    pub fn into_response(self, verbose: bool) -> ResponseDescriptor {
        let status = self.status();
        let body = if verbose {
            self.diagnostic()
        } else {
            reason_phrase(status).to_owned()
        };
        ResponseDescriptor::text(status, body)
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}
