//! Markdown and template rendering for Tome.
//!
//! This crate wraps the two rendering facilities the resolver delegates to:
//!
//! - [`MarkdownRenderer`]: CommonMark (plus GFM extensions) to HTML via
//!   `pulldown-cmark`
//! - [`TemplateRenderer`]: `minijinja` templates with an ordered search path
//!   for includes and per-request globals
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tome_renderer::{MarkdownRenderer, TemplateRenderer};
//!
//! let html = MarkdownRenderer::new().render("## Hello");
//! assert_eq!(html, "<h2>Hello</h2>\n");
//!
//! let renderer = TemplateRenderer::new(Vec::new());
//! let out = renderer
//!     .render("inline.jinja", "<p>{{ title }}</p>", &json!({ "title": "hi" }))
//!     .unwrap();
//! assert_eq!(out, "<p>hi</p>");
//! ```

mod markdown;
mod template;

pub use markdown::MarkdownRenderer;
pub use template::{TemplateError, TemplateRenderer};
