//! Logical path index over a content directory.

use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::fs::read_entries;

/// Mapping from logical path prefix (e.g. `/products/item1`) to directory.
///
/// Every directory below the root is registered under its `/`-joined
/// relative path. The root itself is not an entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentTree {
    root: PathBuf,
    entries: BTreeMap<String, PathBuf>,
}

impl ContentTree {
    /// Walk `root` and index every non-hidden directory below it.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` or one of its subdirectories cannot be read.
    pub async fn index(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let mut entries = BTreeMap::new();
        index_directory(&root, "", &mut entries).await?;
        Ok(Self { root, entries })
    }

    /// Root directory of the tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory registered for `logical_path`.
    #[must_use]
    pub fn get(&self, logical_path: &str) -> Option<&Path> {
        self.entries.get(logical_path).map(PathBuf::as_path)
    }

    /// Whether `logical_path` is registered.
    #[must_use]
    pub fn contains(&self, logical_path: &str) -> bool {
        self.entries.contains_key(logical_path)
    }

    /// Registered entries in logical path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(path, dir)| (path.as_str(), dir.as_path()))
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no directory is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn index_directory<'a>(
    dir: &'a Path,
    prefix: &'a str,
    entries: &'a mut BTreeMap<String, PathBuf>,
) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        for entry in read_entries(dir).await? {
            if !entry.is_dir {
                continue;
            }
            let logical = format!("{prefix}/{}", entry.name);
            let path = dir.join(&entry.name);
            index_directory(&path, &logical, entries).await?;
            entries.insert(logical, path);
        }
        Ok(())
    })
}
