//! Controller lookup and loading.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::{Controller, LoadError, ScriptController};

/// Native controller registry plus memoized script loading.
pub(crate) struct ControllerHost {
    native: RwLock<HashMap<String, Arc<dyn Controller>>>,
    scripts: RwLock<HashMap<PathBuf, Arc<ScriptController>>>,
    memoize: bool,
}

impl ControllerHost {
    pub(crate) fn new(memoize: bool) -> Self {
        Self {
            native: RwLock::new(HashMap::new()),
            scripts: RwLock::new(HashMap::new()),
            memoize,
        }
    }

    pub(crate) fn register(&self, logical_path: String, controller: Arc<dyn Controller>) {
        match self.native.write() {
            Ok(mut native) => {
                native.insert(logical_path, controller);
            }
            Err(_) => {
                tracing::warn!(path = logical_path, "controller lock poisoned, registration dropped");
            }
        }
    }

    pub(crate) fn native(&self, logical_path: &str) -> Option<Arc<dyn Controller>> {
        self.native
            .read()
            .ok()
            .and_then(|native| native.get(logical_path).cloned())
    }

    /// Load the script at `path`, compiling it at most once.
    pub(crate) async fn load_script(&self, path: &Path) -> Result<Arc<ScriptController>, LoadError> {
        if self.memoize
            && let Some(script) = self
                .scripts
                .read()
                .ok()
                .and_then(|scripts| scripts.get(path).cloned())
        {
            return Ok(script);
        }

        let script = Arc::new(ScriptController::load(path).await?);
        tracing::debug!(path = %path.display(), "Loaded controller");
        if self.memoize
            && let Ok(mut scripts) = self.scripts.write()
        {
            scripts.insert(path.to_path_buf(), Arc::clone(&script));
        }
        Ok(script)
    }

    /// Drop the compiled script for `path`, or every script when `None`.
    pub(crate) fn forget_scripts(&self, path: Option<&Path>) {
        if let Ok(mut scripts) = self.scripts.write() {
            match path {
                Some(path) => {
                    scripts.remove(path);
                }
                None => scripts.clear(),
            }
        }
    }

    /// Load a script from source text by way of a temporary file.
    ///
    /// The file is removed once the script is compiled; nothing is memoized.
    pub(crate) async fn load_source(&self, source: &str) -> Result<Arc<ScriptController>, LoadError> {
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| LoadError::Io { path, source }
        };

        let file = tempfile::Builder::new()
            .prefix("tome-controller-")
            .suffix(".toml")
            .tempfile()
            .map_err(io_error(&std::env::temp_dir()))?;
        tokio::fs::write(file.path(), source)
            .await
            .map_err(io_error(file.path()))?;

        let script = ScriptController::load(file.path()).await?;
        Ok(Arc::new(script))
    }
}
