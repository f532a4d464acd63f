//! Content fragments of a node directory.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde_json::{Map, Value};
use tome_renderer::{MarkdownRenderer, TemplateRenderer};

use crate::cache::DiskCache;
use crate::error::{Fault, FragmentError};
use crate::view_model::ViewModel;
use crate::{CONTROLLER_FILE, TEMPLATE_FILE};

/// Fragment file names of `listing` in processing order.
///
/// Markdown and JSON come before partials so partials can use them; the
/// sort is stable, so ties keep listing order.
pub(crate) fn fragment_order(listing: &[String]) -> Vec<&str> {
    let mut names: Vec<&str> = listing
        .iter()
        .map(String::as_str)
        .filter(|name| *name != TEMPLATE_FILE && *name != CONTROLLER_FILE)
        .filter(|name| matches!(extension(name), Some("md" | "json" | "jinja")))
        .collect();
    names.sort_by_key(|name| extension(name) == Some("jinja"));
    names
}

fn extension(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Content of `path`: call override, then cache, then disk.
///
/// Overrides are matched by file name and never cached.
pub(crate) async fn file_source(
    cache: &DiskCache,
    path: &Path,
    overrides: &HashMap<String, String>,
) -> io::Result<Option<String>> {
    if let Some(content) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| overrides.get(name))
    {
        return Ok(Some(content.clone()));
    }
    cache.file(path).await
}

/// Reads node fragments into a [`ViewModel`].
pub(crate) struct FragmentAssembler<'a> {
    pub cache: &'a DiskCache,
    pub markdown: &'a MarkdownRenderer,
    pub partials: &'a Path,
    pub globals: &'a Map<String, Value>,
    pub overrides: &'a HashMap<String, String>,
}

impl FragmentAssembler<'_> {
    /// Add every fragment of `dir` to `view.content`, keyed by file stem.
    pub(crate) async fn assemble(&self, dir: &Path, view: &mut ViewModel) -> Result<(), Fault> {
        let listing = self.cache.listing(dir).await.map_err(|e| Fault::Fragment {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let partials = TemplateRenderer::new(vec![self.partials.to_path_buf()]).with_globals(self.globals);

        for name in fragment_order(&listing) {
            let path = dir.join(name);
            let source = file_source(self.cache, &path, self.overrides)
                .await
                .map_err(|e| Fault::Fragment {
                    path: path.clone(),
                    source: e.into(),
                })?;
            // Unreadable and empty files contribute nothing
            let Some(source) = source.filter(|s| !s.is_empty()) else {
                tracing::debug!(path = %path.display(), "Skipping empty or unreadable fragment");
                continue;
            };

            let value = self
                .convert(&path, &source, &partials, view)
                .map_err(|source| Fault::Fragment {
                    path: path.clone(),
                    source,
                })?;
            let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
            view.content.insert(stem.to_owned(), value);
        }
        Ok(())
    }

    fn convert(
        &self,
        path: &Path,
        source: &str,
        partials: &TemplateRenderer,
        view: &ViewModel,
    ) -> Result<Value, FragmentError> {
        Ok(match path.extension().and_then(|e| e.to_str()) {
            Some("md") => Value::String(self.markdown.render(source)),
            Some("json") => serde_json::from_str(source)?,
            _ => Value::String(partials.render(&path.to_string_lossy(), source, view)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tome_cache::MemoryCache;

    use super::*;

    fn names(listing: &[&str]) -> Vec<String> {
        listing.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn test_partials_ordered_last() {
        let listing = names(&[
            "b.jinja",
            "a.md",
            "template.jinja",
            "controller.toml",
            "c.jinja",
            "d.json",
            "notes.txt",
            "e.md",
        ]);

        assert_eq!(
            fragment_order(&listing),
            vec!["a.md", "d.json", "e.md", "b.jinja", "c.jinja"]
        );
    }

    #[test]
    fn test_order_independent_of_listing_order() {
        let forward = names(&["x.jinja", "y.md"]);
        let backward = names(&["y.md", "x.jinja"]);

        assert_eq!(fragment_order(&forward), fragment_order(&backward));
    }

    struct Fixture {
        dir: tempfile::TempDir,
        cache: DiskCache,
        markdown: MarkdownRenderer,
        globals: Map<String, Value>,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(dir.path().join("node")).unwrap();
            std::fs::create_dir_all(dir.path().join("partials")).unwrap();
            for (name, content) in files {
                std::fs::write(dir.path().join(name), content).unwrap();
            }
            let mut globals = Map::new();
            globals.insert("glory".to_owned(), json!("halleluljah"));
            Self {
                dir,
                cache: DiskCache::new(Arc::new(MemoryCache::new())),
                markdown: MarkdownRenderer::new(),
                globals,
            }
        }

        async fn assemble(&self, overrides: &HashMap<String, String>) -> Result<ViewModel, Fault> {
            let partials = self.dir.path().join("partials");
            let assembler = FragmentAssembler {
                cache: &self.cache,
                markdown: &self.markdown,
                partials: &partials,
                globals: &self.globals,
                overrides,
            };
            let mut view = ViewModel::new(json!({}), "/node", &BTreeMap::new());
            assembler
                .assemble(&self.dir.path().join("node"), &mut view)
                .await?;
            Ok(view)
        }
    }

    #[tokio::test]
    async fn test_converts_each_kind() {
        let fixture = Fixture::new(&[
            ("partials/sig.jinja", "by {{ glory }}"),
            ("node/h1.md", "# hello"),
            ("node/data.json", r#"{ "n": 1 }"#),
            (
                "node/summary.jinja",
                r#"{{ content.h1 }}{{ content.data.n }} {% include "sig.jinja" %}"#,
            ),
            ("node/template.jinja", "{{ never }}"),
        ]);

        let view = fixture.assemble(&HashMap::new()).await.unwrap();

        assert_eq!(
            Value::Object(view.content),
            json!({
                "h1": "<h1>hello</h1>\n",
                "data": { "n": 1 },
                "summary": "<h1>hello</h1>\n1 by halleluljah",
            })
        );
    }

    #[tokio::test]
    async fn test_override_wins_over_cache() {
        let fixture = Fixture::new(&[("node/h1.md", "# disk")]);

        let first = fixture.assemble(&HashMap::new()).await.unwrap();
        assert_eq!(first.content["h1"], json!("<h1>disk</h1>\n"));

        let mut overrides = HashMap::new();
        overrides.insert("h1.md".to_owned(), "# injected".to_owned());
        for _ in 0..2 {
            let view = fixture.assemble(&overrides).await.unwrap();
            assert_eq!(view.content["h1"], json!("<h1>injected</h1>\n"));
        }

        // The override never reached the cache
        let last = fixture.assemble(&HashMap::new()).await.unwrap();
        assert_eq!(last.content["h1"], json!("<h1>disk</h1>\n"));
    }

    #[tokio::test]
    async fn test_empty_file_is_skipped() {
        let fixture = Fixture::new(&[("node/empty.json", "")]);
        let view = fixture.assemble(&HashMap::new()).await.unwrap();
        assert!(view.content.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_is_fragment_fault() {
        let fixture = Fixture::new(&[("node/bad.json", "{ nope")]);
        let fault = fixture.assemble(&HashMap::new()).await.unwrap_err();

        assert!(matches!(
            fault,
            Fault::Fragment {
                source: FragmentError::Json(_),
                ..
            }
        ));
        assert!(fault.to_string().contains("bad.json"));
    }

    #[tokio::test]
    async fn test_partial_error_is_fragment_fault() {
        let fixture = Fixture::new(&[("node/broken.jinja", r#"{% include "missing.jinja" %}"#)]);
        let fault = fixture.assemble(&HashMap::new()).await.unwrap_err();

        assert!(matches!(
            fault,
            Fault::Fragment {
                source: FragmentError::Template(_),
                ..
            }
        ));
    }
}
