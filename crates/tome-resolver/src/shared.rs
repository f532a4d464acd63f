//! Shared content: fragments available to every page.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde_json::{Map, Value};
use tome_renderer::{MarkdownRenderer, TemplateRenderer};

use crate::cache::DiskCache;
use crate::error::{FragmentError, Fault};
use crate::fs;

type BuildFuture<'a> = Pin<Box<dyn Future<Output = Result<Map<String, Value>, Fault>> + Send + 'a>>;

/// Builds the nested shared-content object from a directory tree.
///
/// Directories become nested objects, files are keyed by stem. Partials
/// render without data or request globals so the result can be cached
/// across requests.
pub(crate) struct SharedContent<'a> {
    pub cache: &'a DiskCache,
    pub markdown: &'a MarkdownRenderer,
    pub partials: &'a Path,
}

impl SharedContent<'_> {
    /// Shared content under `root`, or an empty object when there is none.
    pub(crate) async fn build(&self, root: Option<&Path>) -> Result<Value, Fault> {
        let Some(root) = root else {
            return Ok(Value::Object(Map::new()));
        };
        if let Some(value) = self.cache.shared(root) {
            return Ok(value);
        }

        let value = Value::Object(self.build_dir(root).await?);
        self.cache.set_shared(root, &value);
        Ok(value)
    }

    fn build_dir<'a>(&'a self, dir: &'a Path) -> BuildFuture<'a> {
        Box::pin(async move {
            let entries = fs::read_entries(dir).await.map_err(|e| Fault::Fragment {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;

            let mut result = Map::new();
            for entry in entries {
                let path = dir.join(&entry.name);
                if entry.is_dir {
                    let nested = self.build_dir(&path).await?;
                    result.insert(entry.name, Value::Object(nested));
                    continue;
                }

                let Some((stem, extension)) = entry.name.rsplit_once('.') else {
                    continue;
                };
                if !matches!(extension, "md" | "json" | "jinja") {
                    continue;
                }
                let value = self
                    .build_file(&path, extension)
                    .await
                    .map_err(|source| Fault::Fragment {
                        path: path.clone(),
                        source,
                    })?;
                result.insert(stem.to_owned(), value);
            }
            Ok(result)
        })
    }

    async fn build_file(&self, path: &Path, extension: &str) -> Result<Value, FragmentError> {
        let source = fs::read_text(path).await?;
        Ok(match extension {
            "md" => Value::String(self.markdown.render(&source)),
            "json" => serde_json::from_str(&source)?,
            _ => {
                let renderer = TemplateRenderer::new(vec![self.partials.to_path_buf()]);
                let name = path.to_string_lossy();
                Value::String(renderer.render(&name, &source, &Map::new())?)
            }
        })
    }
}
