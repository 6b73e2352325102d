use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::CachedResponse;
use crate::error::Result;

/// Stores each cache entry as one JSON file under a root directory.
///
/// Filenames are the SHA-256 hex digest of the fully resolved request URL,
/// so a key maps to the same file across runs and API keys embedded in URLs
/// never show up in directory listings.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// XDG cache directory for the app (`~/.cache/mkthist` on Linux), or
    /// `None` when no home directory can be determined.
    pub fn default_root() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "mkthist")
            .map(|dirs| dirs.cache_dir().to_path_buf())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.json", hex::encode(digest)))
    }

    /// Reads the entry for `key`. A missing file, unreadable file or
    /// malformed JSON all read as `None` and the caller refetches.
    pub fn read(&self, key: &str) -> Option<CachedResponse> {
        let path = self.path_for(key);
        let contents = fs::read_to_string(&path).ok()?;

        match serde_json::from_str(&contents) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Discarding unreadable cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Persists `entry` under `key`, creating the cache root on demand.
    ///
    /// The entry goes to a temp file first and is renamed into place, so an
    /// interrupted process cannot leave a torn entry under the real key.
    pub fn write(&self, key: &str, entry: &CachedResponse) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        let path = self.path_for(key);
        let json = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
