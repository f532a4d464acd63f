//! Request resolution and rendering.
//!
//! [`PageResolver`] ties the pieces together for one request:
//!
//! 1. Paths under the static prefix are left to the transport
//! 2. Shared content is built (once per resolver)
//! 3. The request path is matched to a page or item node
//! 4. The node controller runs and may short-circuit
//! 5. Fragments are assembled and the node template is rendered
//!
//! Failures never escape [`PageResolver::resolve`]; each [`Fault`] becomes a
//! terminal response and is logged.
//!
//! # Thread Safety
//!
//! `PageResolver` is `Send + Sync`. Share it behind an `Arc` and resolve
//! requests concurrently; the disk cache is the only shared mutable state.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tome_cache::{Cache, MemoryCache, NullCache};
use tome_renderer::{MarkdownRenderer, TemplateRenderer};

use crate::cache::{CacheKey, DiskCache};
use crate::config::ResolverConfig;
use crate::controller::{
    Capabilities, Controller, ControllerError, ControllerHost, ControllerOutcome,
    ControllerResult,
};
use crate::error::{Fault, ResolverError};
use crate::fragments::{FragmentAssembler, file_source};
use crate::request::{Request, ResolveOptions};
use crate::response::{CookieValue, ResponseDescriptor};
use crate::router::{ContentRouter, ResolvedNode, content_dir, template_search_path};
use crate::shared::SharedContent;
use crate::tree::ContentTree;
use crate::view_model::ViewModel;
use crate::{CONTROLLER_FILE, TEMPLATE_FILE, fs};

/// Resolves request paths against the page and item trees.
pub struct PageResolver {
    config: ResolverConfig,
    router: ContentRouter,
    cache: DiskCache,
    controllers: ControllerHost,
    markdown: MarkdownRenderer,
    not_found_template: String,
}

impl PageResolver {
    /// Index the content trees and load the not-found template.
    ///
    /// Disk reads are memoized in memory unless `config.cache_enabled` is off.
    pub async fn new(config: ResolverConfig) -> Result<Self, ResolverError> {
        let cache: Arc<dyn Cache> = if config.cache_enabled {
            Arc::new(MemoryCache::new())
        } else {
            Arc::new(NullCache)
        };
        Self::with_cache(config, cache).await
    }

    /// Like [`new`](Self::new), memoizing disk reads in `cache`.
    pub async fn with_cache(
        config: ResolverConfig,
        cache: Arc<dyn Cache>,
    ) -> Result<Self, ResolverError> {
        let pages = index_tree(&config.pages_dir).await?;
        let items = index_tree(&config.items_dir).await?;
        let not_found_template = fs::read_text(&config.not_found_template)
            .await
            .map_err(|source| ResolverError::NotFoundTemplate {
                path: config.not_found_template.clone(),
                source,
            })?;

        tracing::info!(
            pages = pages.len(),
            items = items.len(),
            cache = config.cache_enabled,
            "Indexed content trees"
        );

        Ok(Self {
            router: ContentRouter::new(pages, items, config.root_page.clone()),
            cache: DiskCache::new(cache),
            controllers: ControllerHost::new(config.cache_enabled),
            markdown: MarkdownRenderer::new(),
            not_found_template,
            config,
        })
    }

    /// Resolver configuration.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Page tree.
    #[must_use]
    pub fn pages(&self) -> &ContentTree {
        self.router.pages()
    }

    /// Item tree.
    #[must_use]
    pub fn items(&self) -> &ContentTree {
        self.router.items()
    }

    /// Attach a native controller to the node at `logical_path`.
    ///
    /// Native controllers take precedence over `controller.toml` files.
    pub fn register_controller(
        &self,
        logical_path: impl Into<String>,
        controller: Arc<dyn Controller>,
    ) {
        self.controllers.register(logical_path.into(), controller);
    }

    /// Drop cached data for `key`.
    pub fn invalidate(&self, key: CacheKey<'_>) {
        if let CacheKey::Path(path) = key {
            self.controllers.forget_scripts(Some(path));
        }
        self.cache.invalidate(key);
    }

    /// Drop all cached data and compiled controllers.
    pub fn clear_cache(&self) {
        self.controllers.forget_scripts(None);
        self.cache.clear();
    }

    /// Resolve `request` to a response.
    ///
    /// Returns `None` for paths under the configured static prefix.
    pub async fn resolve(
        &self,
        request: &Request,
        options: &ResolveOptions,
    ) -> Option<ResponseDescriptor> {
        if self.config.is_static(&request.path) {
            return None;
        }

        let path = options.custom_path.as_deref().unwrap_or(&request.path);
        match self.render(request, path, options).await {
            Ok(response) => Some(response),
            Err(fault) => {
                tracing::error!(path, status = fault.status(), error = %fault, "Failed to resolve page");
                Some(fault.into_response(self.config.verbose_errors))
            }
        }
    }

    async fn render(
        &self,
        request: &Request,
        path: &str,
        options: &ResolveOptions,
    ) -> Result<ResponseDescriptor, Fault> {
        let shared_content = SharedContent {
            cache: &self.cache,
            markdown: &self.markdown,
            partials: &self.config.partials_dir,
        }
        .build(self.config.shared_content_dir.as_deref())
        .await?;
        let mut view = ViewModel::new(shared_content, path, &request.query);

        let logical_path = self.router.page_path(path, &self.cache).await;
        let Some(node) = self.router.select(path, &logical_path) else {
            tracing::debug!(path, logical_path, "No content node");
            return self.not_found(&view, request);
        };
        tracing::debug!(path, node = %node.root.display(), "Selected content node");
        view.page_root_path = Some(node.root.clone());

        let listing = self
            .cache
            .listing(&node.root)
            .await
            .map_err(|e| Fault::Fragment {
                path: node.root.clone(),
                source: e.into(),
            })?;
        let has_template = options.overrides.contains_key(TEMPLATE_FILE)
            || listing.iter().any(|name| name == TEMPLATE_FILE);

        let mut cookies = BTreeMap::new();
        let mut headers = BTreeMap::new();
        if let Some(controller) = self.controller(&node, &listing, options).await? {
            let result = self.run_controller(controller.as_ref(), request, path, &node).await?;
            let terminal = match result.outcome {
                ControllerOutcome::Redirect(location) => {
                    Some(ResponseDescriptor::redirect(location, false))
                }
                ControllerOutcome::RedirectPermanent(location) => {
                    Some(ResponseDescriptor::redirect(location, true))
                }
                ControllerOutcome::SoftNotFound => return self.not_found(&view, request),
                ControllerOutcome::Raw(raw) => {
                    Some(ResponseDescriptor::new(raw.status, raw.content_type, raw.body))
                }
                ControllerOutcome::Augment(view_data) => {
                    view.augment(view_data);
                    None
                }
            };
            cookies = result.cookies;
            headers = result.headers;

            if let Some(response) = terminal {
                return Ok(with_mutations(response, cookies, headers));
            }
        }

        if !has_template {
            return Err(Fault::Configuration { path: node.root });
        }

        let content_dir = content_dir(&node).await;
        FragmentAssembler {
            cache: &self.cache,
            markdown: &self.markdown,
            partials: &self.config.partials_dir,
            globals: &request.globals,
            overrides: &options.overrides,
        }
        .assemble(&content_dir, &mut view)
        .await?;

        let html = self.render_template(&node, request, options, &view).await?;
        Ok(with_mutations(ResponseDescriptor::html(200, html), cookies, headers))
    }

    /// Controller of `node`: injected source, native registration, then disk.
    async fn controller(
        &self,
        node: &ResolvedNode,
        listing: &[String],
        options: &ResolveOptions,
    ) -> Result<Option<Arc<dyn Controller>>, Fault> {
        if let Some(source) = options.overrides.get(CONTROLLER_FILE) {
            let script: Arc<dyn Controller> = self
                .controllers
                .load_source(source)
                .await
                .map_err(Fault::InjectedCode)?;
            return Ok(Some(script));
        }

        if let Some(native) = self.controllers.native(&node.logical_path) {
            return Ok(Some(native));
        }

        if listing.iter().any(|name| name == CONTROLLER_FILE) {
            let path = node.root.join(CONTROLLER_FILE);
            let script: Arc<dyn Controller> = self
                .controllers
                .load_script(&path)
                .await
                .map_err(|source| Fault::ControllerLoad {
                    path: node.logical_path.clone(),
                    source,
                })?;
            return Ok(Some(script));
        }

        Ok(None)
    }

    async fn run_controller(
        &self,
        controller: &dyn Controller,
        request: &Request,
        path: &str,
        node: &ResolvedNode,
    ) -> Result<ControllerResult, Fault> {
        let request = Request {
            path: path.to_owned(),
            ..request.clone()
        };
        let caps = Capabilities {
            config: &self.config,
            resolver: self,
            controller_path: &node.logical_path,
            page_root: &node.root,
        };

        let handle = AssertUnwindSafe(controller.handle(&request, &caps)).catch_unwind();
        let handled = match self.config.controller_timeout {
            Some(timeout) => tokio::time::timeout(timeout, handle).await.map_err(|_| {
                Fault::ControllerTimeout {
                    path: node.logical_path.clone(),
                    timeout,
                }
            })?,
            None => handle.await,
        };
        handled
            .unwrap_or_else(|payload| Err(ControllerError::msg(panic_message(payload.as_ref()))))
            .map_err(|source| Fault::Controller {
                path: node.logical_path.clone(),
                source,
            })
    }

    async fn render_template(
        &self,
        node: &ResolvedNode,
        request: &Request,
        options: &ResolveOptions,
        view: &ViewModel,
    ) -> Result<String, Fault> {
        let path = node.root.join(TEMPLATE_FILE);
        let source = file_source(&self.cache, &path, &options.overrides)
            .await
            .map_err(|e| Fault::Fragment {
                path: path.clone(),
                source: e.into(),
            })?
            .ok_or_else(|| Fault::Configuration {
                path: node.root.clone(),
            })?;

        let renderer = TemplateRenderer::new(template_search_path(node, &self.config.partials_dir))
            .with_globals(&request.globals);
        Ok(renderer.render(&path.to_string_lossy(), &source, view)?)
    }

    fn not_found(&self, view: &ViewModel, request: &Request) -> Result<ResponseDescriptor, Fault> {
        let renderer = TemplateRenderer::new(vec![self.config.partials_dir.clone()])
            .with_globals(&request.globals);
        let html = renderer.render(
            &self.config.not_found_template.to_string_lossy(),
            &self.not_found_template,
            view,
        )?;
        Ok(ResponseDescriptor::html(404, html))
    }
}

async fn index_tree(root: &std::path::Path) -> Result<ContentTree, ResolverError> {
    ContentTree::index(root)
        .await
        .map_err(|source| ResolverError::Tree {
            root: root.to_path_buf(),
            source,
        })
}

/// Describe a caught controller panic.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause");
    format!("panicked: {detail}")
}

fn with_mutations(
    mut response: ResponseDescriptor,
    cookies: BTreeMap<String, CookieValue>,
    headers: BTreeMap<String, String>,
) -> ResponseDescriptor {
    response.cookies = cookies;
    response.headers = headers;
    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::controller::RawResponse;
    use crate::response::{Body, HTML, Redirect};
    use crate::testing::{Site, body};

    static_assertions::assert_impl_all!(PageResolver: Send, Sync);

    async fn get(resolver: &PageResolver, path: &str) -> ResponseDescriptor {
        resolver
            .resolve(&Request::new(path), &ResolveOptions::default())
            .await
            .unwrap()
    }

    struct Failing;

    #[async_trait]
    impl Controller for Failing {
        async fn handle(
            &self,
            _request: &Request,
            _caps: &Capabilities<'_>,
        ) -> Result<ControllerResult, ControllerError> {
            Err(ControllerError::msg("exploded"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl Controller for Panicking {
        async fn handle(
            &self,
            request: &Request,
            _caps: &Capabilities<'_>,
        ) -> Result<ControllerResult, ControllerError> {
            panic!("no handler for {}", request.path)
        }
    }

    struct EchoPath;

    #[async_trait]
    impl Controller for EchoPath {
        async fn handle(
            &self,
            request: &Request,
            caps: &Capabilities<'_>,
        ) -> Result<ControllerResult, ControllerError> {
            let content = format!("{}|{}", request.path, caps.controller_path);
            Ok(ControllerResult::raw(RawResponse::text(content)))
        }
    }

    struct Nested;

    #[async_trait]
    impl Controller for Nested {
        async fn handle(
            &self,
            _request: &Request,
            caps: &Capabilities<'_>,
        ) -> Result<ControllerResult, ControllerError> {
            let inner = caps
                .resolver
                .resolve(&Request::new("/home"), &ResolveOptions::default())
                .await
                .ok_or_else(|| ControllerError::msg("no response"))?;
            let text = inner.text_body().unwrap_or_default().to_owned();
            Ok(ControllerResult::raw(
                RawResponse::text(format!("nested: {text}")).with_content_type(HTML),
            ))
        }
    }

    struct Slow;

    #[async_trait]
    impl Controller for Slow {
        async fn handle(
            &self,
            _request: &Request,
            _caps: &Capabilities<'_>,
        ) -> Result<ControllerResult, ControllerError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ControllerResult::default())
        }
    }

    #[tokio::test]
    async fn test_renders_page_with_fragments() {
        let site = Site::new();
        site.write(
            "pages/home/template.jinja",
            "{{ content.h1 }}{{ content.data.title }}|{{ content.greeting }}|{{ active_path }}|{{ query.q }}",
        )
        .write("pages/home/h1.md", "# hello")
        .write("pages/home/data.json", r#"{ "title": "test" }"#)
        .write("pages/home/greeting.jinja", "{{ glory }} {{ content.data.title }}");
        let resolver = site.resolver().await;

        let request = Request::new("/home")
            .with_query("q", "1")
            .with_global("glory", "halleluljah");
        let response = resolver
            .resolve(&request, &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, HTML);
        assert_eq!(response.redirect, None);
        assert_eq!(body(response).await, "<h1>hello</h1>\ntest|halleluljah test|/home|1");
    }

    #[tokio::test]
    async fn test_sub_path_served_by_closest_page() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "{{ active_path }}");
        let resolver = site.resolver().await;

        let response = get(&resolver, "/home/deeper/still").await;

        assert_eq!(response.status, 200);
        assert_eq!(body(response).await, "/home/deeper/still");
    }

    #[tokio::test]
    async fn test_page_beats_item_at_same_path() {
        let site = Site::new();
        site.write("pages/products/item1/template.jinja", "page")
            .write("items/products/template.jinja", "item")
            .write("items/products/item1/name.md", "item1");
        let resolver = site.resolver().await;

        assert_eq!(body(get(&resolver, "/products/item1").await).await, "page");
    }

    #[tokio::test]
    async fn test_item_prefers_own_directory() {
        let site = Site::new();
        site.write("items/products/template.jinja", "{{ content.title }}")
            .write("items/products/title.json", r#""Generic""#)
            .write("items/products/item2/title.json", r#""Item two""#)
            .mkdir("items/products/item2/variant");
        let resolver = site.resolver().await;

        assert_eq!(body(get(&resolver, "/products/item2").await).await, "Item two");
        // No `variant` directory under the collection root: root fragments apply
        assert_eq!(body(get(&resolver, "/products/item2/variant").await).await, "Generic");
    }

    #[tokio::test]
    async fn test_item_template_can_include_item_files() {
        let site = Site::new();
        site.write(
            "items/products/template.jinja",
            r#"{% include "extra.jinja" %}"#,
        )
        .write("items/products/item1/extra.jinja", "item extra");
        let resolver = site.resolver().await;

        let response = get(&resolver, "/products/item1").await;
        assert_eq!(body(response).await, "item extra");
    }

    #[tokio::test]
    async fn test_root_alias() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "home");

        let aliased = PageResolver::new(ResolverConfig {
            root_page: Some("/home".to_owned()),
            ..site.config()
        })
        .await
        .unwrap();
        assert_eq!(body(get(&aliased, "/").await).await, "home");

        let plain = site.resolver().await;
        assert_eq!(get(&plain, "/").await.status, 404);
    }

    #[tokio::test]
    async fn test_unknown_path_renders_not_found() {
        let site = Site::new();
        let resolver = site.resolver().await;

        let response = get(&resolver, "/missing/page").await;

        assert_eq!(response.status, 404);
        assert_eq!(response.content_type, HTML);
        assert_eq!(body(response).await, "not found: /missing/page");
    }

    #[tokio::test]
    async fn test_static_prefix_left_to_transport() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "home");
        let resolver = PageResolver::new(ResolverConfig {
            static_prefix: Some("/resources".to_owned()),
            ..site.config()
        })
        .await
        .unwrap();

        let options = ResolveOptions::default();
        assert!(resolver.resolve(&Request::new("/resources/app.css"), &options).await.is_none());
        assert!(resolver.resolve(&Request::new("/home"), &options).await.is_some());
    }

    #[tokio::test]
    async fn test_redirect_carries_cookies_and_headers() {
        let site = Site::new();
        site.write(
            "pages/login/controller.toml",
            r#"
            redirect = "/home?from={{ path }}"
            cookie = { seen = "yes", old = false }
            headers = { "x-reason" = "login" }
            "#,
        );
        let resolver = site.resolver().await;

        let response = get(&resolver, "/login").await;

        assert_eq!(response.status, 302);
        assert_eq!(
            response.redirect,
            Some(Redirect {
                location: "/home?from=/login".to_owned(),
                permanent: false,
            })
        );
        assert_eq!(response.cookies.get("seen"), Some(&CookieValue::Set("yes".to_owned())));
        assert_eq!(response.cookies.get("old"), Some(&CookieValue::Delete));
        assert_eq!(response.headers.get("x-reason").map(String::as_str), Some("login"));
        assert!(matches!(response.body, Body::Empty));
    }

    #[tokio::test]
    async fn test_permanent_redirect() {
        let site = Site::new();
        site.write("pages/old/controller.toml", r#"redirect_permanent = "/new""#)
            .write("pages/old/template.jinja", "never rendered");
        let resolver = site.resolver().await;

        let response = get(&resolver, "/old").await;

        assert_eq!(response.status, 301);
        assert_eq!(response.redirect.map(|r| r.location).as_deref(), Some("/new"));
    }

    #[tokio::test]
    async fn test_soft_not_found() {
        let site = Site::new();
        site.write(
            "pages/hidden/controller.toml",
            "soft_not_found = true\ncookie = { a = \"b\" }",
        )
        .write("pages/hidden/template.jinja", "never rendered");
        let resolver = site.resolver().await;

        let response = get(&resolver, "/hidden").await;

        assert_eq!(response.status, 404);
        assert_eq!(response.redirect, None);
        assert!(response.cookies.is_empty());
        assert_eq!(body(response).await, "not found: /hidden");
    }

    #[tokio::test]
    async fn test_raw_without_template() {
        let site = Site::new();
        site.write(
            "pages/api/controller.toml",
            r#"raw = { content = "X", type = "text/plain" }"#,
        );
        let resolver = site.resolver().await;

        let response = get(&resolver, "/api").await;

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "text/plain");
        assert_eq!(body(response).await, "X");
    }

    #[tokio::test]
    async fn test_raw_stream() {
        let site = Site::new();
        site.write(
            "pages/download/controller.toml",
            r#"raw = { file = "data.csv", type = "text/csv" }"#,
        )
        .write("pages/download/data.csv", "a,b");
        let resolver = site.resolver().await;

        let response = get(&resolver, "/download").await;

        assert_eq!(response.content_type, "text/csv");
        assert!(matches!(response.body, Body::Stream(_)));
        assert_eq!(body(response).await, "a,b");
    }

    #[tokio::test]
    async fn test_injected_controller() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "{{ title }}");
        let resolver = site.resolver().await;

        let options =
            ResolveOptions::default().with_override(CONTROLLER_FILE, r#"view_data = { title = "injected" }"#);
        let response = resolver.resolve(&Request::new("/home"), &options).await.unwrap();

        assert_eq!(body(response).await, "injected");
    }

    #[tokio::test]
    async fn test_malformed_injected_controller_is_bad_request() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "home");
        let options = ResolveOptions::default().with_override(CONTROLLER_FILE, "redirect = ");

        let verbose = site.resolver().await;
        let response = verbose.resolve(&Request::new("/home"), &options).await.unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(response.content_type, "text/plain");
        assert!(body(response).await.contains("injected controller"));

        let terse = PageResolver::new(ResolverConfig {
            verbose_errors: false,
            ..site.config()
        })
        .await
        .unwrap();
        let response = terse.resolve(&Request::new("/home"), &options).await.unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(body(response).await, "Bad Request");
    }

    #[tokio::test]
    async fn test_failing_controller_is_server_error() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "home");
        let resolver = site.resolver().await;
        resolver.register_controller("/home", Arc::new(Failing));

        let response = get(&resolver, "/home").await;

        assert_eq!(response.status, 500);
        assert_eq!(body(response).await, "controller at /home failed: exploded");
    }

    #[tokio::test]
    async fn test_panicking_controller_is_server_error() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "home")
            .write("pages/about/template.jinja", "about");
        let resolver = Arc::new(site.resolver().await);
        resolver.register_controller("/home", Arc::new(Panicking));

        let shared = Arc::clone(&resolver);
        let response = tokio::spawn(async move { get(&shared, "/home").await })
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        let text = body(response).await;
        assert_eq!(text, "controller at /home failed: panicked: no handler for /home");

        // The resolver keeps serving other pages
        assert_eq!(body(get(&resolver, "/about").await).await, "about");
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"static cause"), "panicked: static cause");
        assert_eq!(panic_message(&"owned".to_owned()), "panicked: owned");
        assert_eq!(panic_message(&42_u8), "panicked: unknown cause");
    }

    #[tokio::test]
    async fn test_broken_controller_file_is_server_error() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "home")
            .write("pages/home/controller.toml", "unknown = 1");
        let resolver = site.resolver().await;

        let response = get(&resolver, "/home").await;

        assert_eq!(response.status, 500);
        assert!(body(response).await.contains("controller.toml"));
    }

    #[tokio::test]
    async fn test_augment_without_template_names_node() {
        let site = Site::new();
        site.write("pages/empty/controller.toml", r#"view_data = { a = "b" }"#);
        let resolver = site.resolver().await;

        let response = get(&resolver, "/empty").await;

        assert_eq!(response.status, 500);
        let text = body(response).await;
        assert!(text.contains(&site.path("pages/empty").display().to_string()));
        assert!(text.contains("does not have a template"));
    }

    #[tokio::test]
    async fn test_node_without_template_or_controller() {
        let site = Site::new();
        site.mkdir("pages/bare");
        let resolver = site.resolver().await;

        assert_eq!(get(&resolver, "/bare").await.status, 500);
    }

    #[tokio::test]
    async fn test_template_error_names_template() {
        let site = Site::new();
        site.write("pages/home/template.jinja", r#"{% include "missing.jinja" %}"#);
        let resolver = site.resolver().await;

        let response = get(&resolver, "/home").await;

        assert_eq!(response.status, 500);
        let text = body(response).await;
        assert!(text.contains(&site.path("pages/home/template.jinja").display().to_string()));
    }

    #[tokio::test]
    async fn test_overrides_apply_to_one_call() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "{{ content.h1 }}")
            .write("pages/home/h1.md", "# disk");
        let resolver = site.resolver().await;

        let options = ResolveOptions::default()
            .with_override(TEMPLATE_FILE, "[{{ content.h1 }}]")
            .with_override("h1.md", "# injected");
        for _ in 0..2 {
            let response = resolver.resolve(&Request::new("/home"), &options).await.unwrap();
            assert_eq!(body(response).await, "[<h1>injected</h1>\n]");
        }

        assert_eq!(body(get(&resolver, "/home").await).await, "<h1>disk</h1>\n");
    }

    #[tokio::test]
    async fn test_template_override_counts_as_template() {
        let site = Site::new();
        site.mkdir("pages/draft");
        let resolver = site.resolver().await;

        let options = ResolveOptions::default().with_override(TEMPLATE_FILE, "draft");
        let response = resolver.resolve(&Request::new("/draft"), &options).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(body(response).await, "draft");
    }

    #[tokio::test]
    async fn test_repeated_resolution_is_identical() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "{{ content.h1 }}{{ content.list }}")
            .write("pages/home/h1.md", "# hello")
            .write("pages/home/list.jinja", "{{ content.h1 | length }}");
        let resolver = site.resolver().await;

        let first = body(get(&resolver, "/home").await).await;
        let second = body(get(&resolver, "/home").await).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_custom_path_and_controller_path() {
        let site = Site::new();
        site.mkdir("items/bar/foo");
        let resolver = site.resolver().await;
        resolver.register_controller("/bar", Arc::new(EchoPath));

        let options = ResolveOptions::default().with_custom_path("/bar/foo");
        let response = resolver.resolve(&Request::new("/ignored"), &options).await.unwrap();

        assert_eq!(body(response).await, "/bar/foo|/bar");
    }

    #[tokio::test]
    async fn test_native_controller_beats_controller_file() {
        let site = Site::new();
        site.write("pages/bar/controller.toml", r#"redirect = "/elsewhere""#);
        let resolver = site.resolver().await;
        resolver.register_controller("/bar", Arc::new(EchoPath));

        let response = get(&resolver, "/bar/baz").await;

        assert_eq!(response.status, 200);
        assert_eq!(body(response).await, "/bar/baz|/bar");
    }

    #[tokio::test]
    async fn test_controller_resolves_nested_page() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "home").mkdir("pages/outer");
        let resolver = site.resolver().await;
        resolver.register_controller("/outer", Arc::new(Nested));

        let response = get(&resolver, "/outer").await;

        assert_eq!(response.content_type, HTML);
        assert_eq!(body(response).await, "nested: home");
    }

    #[tokio::test]
    async fn test_controller_timeout() {
        let site = Site::new();
        site.mkdir("pages/slow");
        let resolver = PageResolver::new(ResolverConfig {
            controller_timeout: Some(Duration::from_millis(10)),
            ..site.config()
        })
        .await
        .unwrap();
        resolver.register_controller("/slow", Arc::new(Slow));

        let response = get(&resolver, "/slow").await;

        assert_eq!(response.status, 500);
        assert!(body(response).await.contains("did not finish"));
    }

    #[tokio::test]
    async fn test_controller_view_data_wins() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "{{ active_path }}")
            .write("pages/home/controller.toml", r#"view_data = { active_path = "/override" }"#);
        let resolver = site.resolver().await;

        assert_eq!(body(get(&resolver, "/home").await).await, "/override");
    }

    #[tokio::test]
    async fn test_augment_keeps_cookies_and_headers() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "home").write(
            "pages/home/controller.toml",
            "cookie = { visited = \"1\" }\nheaders = { \"cache-control\" = \"no-store\" }",
        );
        let resolver = site.resolver().await;

        let response = get(&resolver, "/home").await;

        assert_eq!(response.status, 200);
        assert_eq!(response.cookies.get("visited"), Some(&CookieValue::Set("1".to_owned())));
        assert_eq!(
            response.headers.get("cache-control").map(String::as_str),
            Some("no-store")
        );
    }

    #[tokio::test]
    async fn test_globals_reach_template_and_partials() {
        let site = Site::new();
        site.write("pages/home/template.jinja", r#"{{ glory }} {% include "nav.jinja" %}"#)
            .write("partials/nav.jinja", "{{ glory }}");
        let resolver = site.resolver().await;

        let request = Request::new("/home").with_global("glory", "halleluljah");
        let response = resolver
            .resolve(&request, &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(body(response).await, "halleluljah halleluljah");
    }

    #[tokio::test]
    async fn test_shared_content_in_view() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "{{ shared_content.footer }}")
            .write("shared/footer.md", "footer");
        let resolver = PageResolver::new(ResolverConfig {
            shared_content_dir: Some(site.path("shared")),
            ..site.config()
        })
        .await
        .unwrap();

        assert_eq!(body(get(&resolver, "/home").await).await, "<p>footer</p>\n");
    }

    #[tokio::test]
    async fn test_invalidate_rereads_file() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "{{ content.h1 }}")
            .write("pages/home/h1.md", "# one");
        let resolver = site.resolver().await;
        assert_eq!(body(get(&resolver, "/home").await).await, "<h1>one</h1>\n");

        site.write("pages/home/h1.md", "# two");
        assert_eq!(body(get(&resolver, "/home").await).await, "<h1>one</h1>\n");

        resolver.invalidate(CacheKey::Path(&site.path("pages/home/h1.md")));
        assert_eq!(body(get(&resolver, "/home").await).await, "<h1>two</h1>\n");
    }

    #[tokio::test]
    async fn test_clear_cache_reloads_controllers() {
        let site = Site::new();
        site.write("pages/home/controller.toml", r#"redirect = "/a""#);
        let resolver = site.resolver().await;
        assert_eq!(get(&resolver, "/home").await.status, 302);

        site.write("pages/home/controller.toml", r#"redirect_permanent = "/b""#);
        resolver.clear_cache();
        assert_eq!(get(&resolver, "/home").await.status, 301);
    }

    #[tokio::test]
    async fn test_cache_disabled_reads_disk_every_time() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "{{ content.h1 }}")
            .write("pages/home/h1.md", "# one");
        let resolver = PageResolver::new(ResolverConfig {
            cache_enabled: false,
            ..site.config()
        })
        .await
        .unwrap();
        assert_eq!(body(get(&resolver, "/home").await).await, "<h1>one</h1>\n");

        site.write("pages/home/h1.md", "# two");
        assert_eq!(body(get(&resolver, "/home").await).await, "<h1>two</h1>\n");
    }

    #[tokio::test]
    async fn test_construction_errors() {
        let site = Site::new();

        let missing_pages = PageResolver::new(ResolverConfig {
            pages_dir: site.path("nope"),
            ..site.config()
        })
        .await;
        assert!(matches!(missing_pages, Err(ResolverError::Tree { .. })));

        let missing_not_found = PageResolver::new(ResolverConfig {
            not_found_template: site.path("nope.jinja"),
            ..site.config()
        })
        .await;
        assert!(matches!(missing_not_found, Err(ResolverError::NotFoundTemplate { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_resolution() {
        let site = Site::new();
        site.write("pages/home/template.jinja", "{{ active_path }}");
        let resolver = Arc::new(site.resolver().await);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move {
                    let request = Request::new(format!("/home/{i}"));
                    let response = resolver
                        .resolve(&request, &ResolveOptions::default())
                        .await
                        .unwrap();
                    body(response).await
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), format!("/home/{i}"));
        }
        assert!(site.root().exists());
    }
}
