//! Request path to content node resolution.

use std::path::{Path, PathBuf};

use crate::cache::DiskCache;
use crate::fs;
use crate::tree::ContentTree;

/// Kind of content node a request resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A page directory.
    Page,
    /// A member of an item collection.
    Item {
        /// Basename of the requested path; names the optional item subdirectory.
        name: String,
    },
}

/// Content node selected for a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedNode {
    /// Node directory (the collection root for items).
    pub root: PathBuf,
    /// Page or item.
    pub kind: NodeKind,
    /// Registered logical path the request matched.
    pub logical_path: String,
}

impl ResolvedNode {
    /// Item-specific subdirectory, for item nodes.
    #[must_use]
    pub fn item_dir(&self) -> Option<PathBuf> {
        match &self.kind {
            NodeKind::Item { name } => Some(self.root.join(name)),
            NodeKind::Page => None,
        }
    }
}

/// Matches request paths against the page and item trees.
#[derive(Debug)]
pub(crate) struct ContentRouter {
    pages: ContentTree,
    items: ContentTree,
    root_page: Option<String>,
}

impl ContentRouter {
    pub(crate) fn new(pages: ContentTree, items: ContentTree, root_page: Option<String>) -> Self {
        Self {
            pages,
            items,
            root_page,
        }
    }

    pub(crate) fn pages(&self) -> &ContentTree {
        &self.pages
    }

    pub(crate) fn items(&self) -> &ContentTree {
        &self.items
    }

    /// Logical page prefix for `url_path`.
    ///
    /// Climbs towards the root one segment at a time until the page tree has
    /// an entry or a single segment remains; the last candidate is returned
    /// either way. `/` is replaced by the root page when its directory is
    /// readable.
    pub(crate) async fn page_path(&self, url_path: &str, cache: &DiskCache) -> String {
        if let Some(hit) = cache.page_path(url_path) {
            return hit;
        }

        let candidate = self.climb(url_path);
        let resolved = if candidate == "/"
            && let Some(alias) = &self.root_page
            && fs::can_read(&self.pages.root().join(alias.trim_start_matches('/'))).await
        {
            alias.clone()
        } else {
            candidate.to_owned()
        };

        tracing::debug!(url_path, logical_path = %resolved, "Resolved page path");
        cache.set_page_path(url_path, &resolved);
        resolved
    }

    fn climb<'a>(&self, url_path: &'a str) -> &'a str {
        let mut candidate = url_path;
        while !self.pages.contains(candidate) {
            match candidate.rfind('/') {
                Some(index) if index > 0 => candidate = &candidate[..index],
                _ => break,
            }
        }
        candidate
    }

    /// Select the node serving `requested` given its resolved page prefix.
    ///
    /// An exact item entry wins unless a page is registered at the same path.
    pub(crate) fn select(&self, requested: &str, logical_path: &str) -> Option<ResolvedNode> {
        if self.items.contains(requested) && !self.pages.contains(requested) {
            let root = self.items.get(logical_path)?;
            return Some(ResolvedNode {
                root: root.to_path_buf(),
                kind: NodeKind::Item {
                    name: basename(requested).to_owned(),
                },
                logical_path: logical_path.to_owned(),
            });
        }

        self.pages.get(logical_path).map(|root| ResolvedNode {
            root: root.to_path_buf(),
            kind: NodeKind::Page,
            logical_path: logical_path.to_owned(),
        })
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Directory fragments are read from: the item subdirectory when readable.
pub(crate) async fn content_dir(node: &ResolvedNode) -> PathBuf {
    if let Some(item_dir) = node.item_dir()
        && fs::is_readable_dir(&item_dir).await
    {
        return item_dir;
    }
    node.root.clone()
}

/// Main template search path: node, item subdirectory, partials.
pub(crate) fn template_search_path(node: &ResolvedNode, partials: &Path) -> Vec<PathBuf> {
    let mut paths = vec![node.root.clone()];
    paths.extend(node.item_dir());
    paths.push(partials.to_path_buf());
    paths
}
