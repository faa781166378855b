use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker stored in a site's feed field after probing found nothing.
pub const NO_FEED_SENTINEL: &str = "NO_RSS_FEED";

/// Errors from loading or saving the site list.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Error reading JSON file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error parsing JSON file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Error marshaling JSON: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Error writing JSON file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One website entry of the site list.
///
/// Serialized as `{"url": ..., "rss": ...}`. Keys this tool does not know
/// about are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub url: String,

    /// Discovered feed URL, [`NO_FEED_SENTINEL`], or unset.
    #[serde(rename = "rss", default, skip_serializing_if = "feed_is_unset")]
    pub feed: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Site {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            feed: None,
            extra: serde_json::Map::new(),
        }
    }

    /// True when the feed is unset, empty or the sentinel.
    pub fn needs_probe(&self) -> bool {
        match self.feed.as_deref() {
            None | Some("") => true,
            Some(feed) => feed == NO_FEED_SENTINEL,
        }
    }
}

fn feed_is_unset(feed: &Option<String>) -> bool {
    feed.as_deref().map_or(true, str::is_empty)
}

/// Reads the site list from a JSON array file.
pub async fn load_sites(path: &Path) -> Result<Vec<Site>, StoreError> {
    let data = tokio::fs::read(path).await.map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let sites: Vec<Site> = serde_json::from_slice(&data).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), sites = sites.len(), "Loaded site list");
    Ok(sites)
}

/// Renders the site list as pretty-printed JSON with 2-space indentation.
pub fn render_sites(sites: &[Site]) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(sites).map_err(StoreError::Serialize)
}

/// Writes the site list back to `path`, replacing it atomically.
///
/// The JSON is written to a sibling temp file, synced, then renamed over the
/// target, so an interrupted run never leaves a truncated site list behind.
pub async fn save_sites(path: &Path, sites: &[Site]) -> Result<(), StoreError> {
    let data = render_sites(sites)?;
    let target = path.to_path_buf();

    match tokio::task::spawn_blocking(move || atomic_write(&target, &data)).await {
        Ok(result) => result,
        Err(e) => Err(StoreError::Write {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        }),
    }
}

fn atomic_write(dst: &Path, data: &[u8]) -> Result<(), StoreError> {
    let write_err = |source: std::io::Error| StoreError::Write {
        path: dst.to_path_buf(),
        source,
    };

    // Unpredictable temp name so nothing can pre-create it as a symlink
    use std::time::{SystemTime, UNIX_EPOCH};
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let file_name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sites.json".to_string());
    let temp_path = dst.with_file_name(format!(".{file_name}.tmp.{random_suffix:016x}"));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(write_err)?;

    let written = temp_file
        .write_all(data)
        .and_then(|()| temp_file.write_all(b"\n"))
        .and_then(|()| temp_file.sync_all());
    drop(temp_file);

    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(write_err(e));
    }

    // Keep the permissions of the file being replaced
    if let Ok(meta) = std::fs::metadata(dst) {
        let _ = std::fs::set_permissions(&temp_path, meta.permissions());
    }

    // On Windows, rename fails if destination exists, so remove it first
    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = std::fs::remove_file(dst) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(write_err(e));
        }
    }

    if let Err(e) = std::fs::rename(&temp_path, dst) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(write_err(e));
    }

    tracing::debug!(path = %dst.display(), bytes = data.len(), "Saved site list");
    Ok(())
}
