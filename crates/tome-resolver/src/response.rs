//! Response descriptors handed back to the transport.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// Content type of rendered pages.
pub const HTML: &str = "text/html; charset=utf-8";

/// Content type of raw controller output and fault bodies.
pub const TEXT: &str = "text/plain";

/// A byte stream served without buffering (e.g. a file opened by a controller).
pub struct ContentStream(Pin<Box<dyn AsyncRead + Send>>);

impl ContentStream {
    /// Wrap an async reader.
    pub fn new(reader: impl AsyncRead + Send + 'static) -> Self {
        Self(Box::pin(reader))
    }

    /// Read the remaining stream into a string.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the content is not UTF-8.
    pub async fn read_to_string(mut self) -> io::Result<String> {
        let mut out = String::new();
        self.0.read_to_string(&mut out).await?;
        Ok(out)
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentStream(..)")
    }
}

impl AsyncRead for ContentStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.0.as_mut().poll_read(cx, buf)
    }
}

/// Response body.
#[derive(Debug, Default)]
pub enum Body {
    /// No body (redirects).
    #[default]
    Empty,
    /// Fully rendered text.
    Text(String),
    /// Stream to be copied to the client.
    Stream(ContentStream),
}

impl Body {
    /// Text content, if the body is buffered text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Empty | Self::Stream(_) => None,
        }
    }
}

/// Redirect target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    /// Target location.
    pub location: String,
    /// `301` when set, `302` otherwise.
    pub permanent: bool,
}

/// Cookie mutation requested by a controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CookieValue {
    /// Set the cookie to this value.
    Set(String),
    /// Expire the cookie.
    Delete,
}

/// Everything the transport needs to answer a request.
#[derive(Debug)]
pub struct ResponseDescriptor {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header value.
    pub content_type: String,
    /// Response body.
    pub body: Body,
    /// Set for redirect responses.
    pub redirect: Option<Redirect>,
    /// Cookie mutations.
    pub cookies: BTreeMap<String, CookieValue>,
    /// Additional response headers.
    pub headers: BTreeMap<String, String>,
}

impl ResponseDescriptor {
    /// Rendered HTML page.
    #[must_use]
    pub fn html(status: u16, content: String) -> Self {
        Self::new(status, HTML, Body::Text(content))
    }

    /// Plain text response.
    #[must_use]
    pub fn text(status: u16, content: String) -> Self {
        Self::new(status, TEXT, Body::Text(content))
    }

    /// Redirect to `location` (`301` when `permanent`, `302` otherwise).
    #[must_use]
    pub fn redirect(location: String, permanent: bool) -> Self {
        let status = if permanent { 301 } else { 302 };
        let mut response = Self::new(status, TEXT, Body::Empty);
        response.redirect = Some(Redirect {
            location,
            permanent,
        });
        response
    }

    /// Response with an arbitrary status, content type and body.
    #[must_use]
    pub fn new(status: u16, content_type: impl Into<String>, body: Body) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body,
            redirect: None,
            cookies: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }

    /// Text body, if any.
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        self.body.as_text()
    }
}
