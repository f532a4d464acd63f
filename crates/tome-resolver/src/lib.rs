//! Filesystem-driven page resolution for Tome.
//!
//! A [`PageResolver`] turns a request path into a rendered page. Content
//! authors lay out two trees of directories:
//!
//! - **pages**: one directory per page; sub-paths without a directory of
//!   their own fall back to the closest ancestor page
//! - **items**: collections whose members share one template, with
//!   optional per-item subdirectories
//!
//! Each node directory may contain a `template.jinja`, a `controller.toml`
//! and any number of content fragments (`*.md`, `*.json`, `*.jinja`).
//! Fragments are assembled into a view-model, the controller may redirect,
//! short-circuit or add data, and the template renders the result.
//!
//! # Example
//!
//! ```no_run
//! use tome_resolver::{PageResolver, Request, ResolveOptions, ResolverConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = PageResolver::new(ResolverConfig::default()).await?;
//! let request = Request::new("/products/item1").with_query("q", "1");
//! if let Some(response) = resolver.resolve(&request, &ResolveOptions::default()).await {
//!     println!("{} {}", response.status, response.content_type);
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
pub mod controller;
mod error;
mod fragments;
mod fs;
mod request;
mod resolver;
mod response;
mod router;
mod shared;
mod tree;
mod view_model;

#[cfg(test)]
mod testing;

pub use cache::CacheKey;
pub use config::{ResolverConfig, resolver_config_from_tome_config};
pub use controller::{
    Capabilities, Controller, ControllerError, ControllerOutcome, ControllerResult, RawResponse,
};
pub use error::{Fault, FragmentError, ResolverError};
pub use request::{Request, ResolveOptions};
pub use resolver::PageResolver;
pub use response::{Body, ContentStream, CookieValue, Redirect, ResponseDescriptor};
pub use router::{NodeKind, ResolvedNode};
pub use tree::ContentTree;
pub use view_model::ViewModel;

/// Main template file name in a node directory.
pub const TEMPLATE_FILE: &str = "template.jinja";

/// Script controller file name in a node directory.
pub const CONTROLLER_FILE: &str = "controller.toml";
