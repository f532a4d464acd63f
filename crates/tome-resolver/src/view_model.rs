//! Per-request data handed to templates.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};

/// Template context built fresh for every request.
///
/// Serializes as a flat object: the named fields first, then any keys
/// merged in by a controller. Controller keys win on conflict.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ViewModel {
    /// Nested object built from the shared-content tree.
    pub shared_content: Value,
    /// Fragments of the node, keyed by file stem.
    pub content: Map<String, Value>,
    /// Path being rendered.
    pub active_path: String,
    /// Query parameters of the request.
    pub query: BTreeMap<String, String>,
    /// Node directory, once a node has been selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_root_path: Option<PathBuf>,
    /// Controller-supplied keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ViewModel {
    pub(crate) fn new(
        shared_content: Value,
        active_path: &str,
        query: &BTreeMap<String, String>,
    ) -> Self {
        Self {
            shared_content,
            active_path: active_path.to_owned(),
            query: query.clone(),
            ..Self::default()
        }
    }

    /// Merge controller view data.
    pub(crate) fn augment(&mut self, data: Map<String, Value>) {
        self.extra.extend(data);
    }
}
