//! Persisted upload URLs for resumable uploads.
//!
//! A JSON object file mapping content fingerprints to upload session
//! URLs. Every mutation is a read-modify-write under a per-file lock and
//! lands through a temp file + rename, so concurrent uploads of
//! different content in one process never lose each other's entries.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::Mutex;

use super::error::{StorageError, StorageResult};

/// One lock per store file, shared by every `UrlStore` in the process.
static FILE_LOCKS: Lazy<DashMap<PathBuf, Arc<Mutex<()>>>> = Lazy::new(DashMap::new);

/// Fingerprint of upload content: SHA-256 over the length and bytes.
#[must_use]
pub fn fingerprint(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((content.len() as u64).to_be_bytes());
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// File-backed map of fingerprint to upload URL.
#[derive(Debug, Clone)]
pub struct UrlStore {
    path: PathBuf,
}

impl UrlStore {
    /// Open a store at `path`; the file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Arc<Mutex<()>> {
        FILE_LOCKS
            .entry(self.path.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn read_map(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read(&self.path).await {
            Ok(raw) if raw.is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                StorageError::configuration(format!(
                    "corrupt upload URL store {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec_pretty(map)
            .map_err(|e| StorageError::operation(format!("encode upload URL store: {e}")))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, raw).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Upload URL recorded for `fingerprint`.
    pub async fn get(&self, fingerprint: &str) -> StorageResult<Option<String>> {
        let lock = self.lock();
        let _guard = lock.lock().await;
        Ok(self.read_map().await?.remove(fingerprint))
    }

    /// Record `url` for `fingerprint`, replacing any previous entry.
    pub async fn set(&self, fingerprint: &str, url: &str) -> StorageResult<()> {
        let lock = self.lock();
        let _guard = lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(fingerprint.to_string(), url.to_string());
        self.write_map(&map).await
    }

    /// Drop the entry for `fingerprint`; missing entries are ignored.
    pub async fn remove(&self, fingerprint: &str) -> StorageResult<()> {
        let lock = self.lock();
        let _guard = lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(fingerprint).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}
