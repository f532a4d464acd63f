//! Async filesystem helpers.

use std::io;
use std::path::Path;

use tokio::fs;

/// A directory entry, hidden entries excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub name: String,
    pub is_dir: bool,
}

/// List `dir` in name order, skipping entries whose name starts with `.`.
pub(crate) async fn read_entries(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        // Follow symlinks so linked content directories are indexed
        let is_dir = fs::metadata(entry.path())
            .await
            .is_ok_and(|meta| meta.is_dir());
        entries.push(Entry { name, is_dir });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Whether `path` exists and can be opened.
pub(crate) async fn can_read(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::read_dir(path).await.is_ok(),
        Ok(_) => fs::File::open(path).await.is_ok(),
        Err(_) => false,
    }
}

/// Whether `path` is a readable directory.
pub(crate) async fn is_readable_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|meta| meta.is_dir()) && can_read(path).await
}

/// Read `path` as UTF-8. Non-UTF-8 content is an `InvalidData` error.
pub(crate) async fn read_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path).await?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
