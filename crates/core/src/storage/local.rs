//! Local filesystem driver.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use mediakit_shared::{DriverKind, LocalOptions, MediaConfig};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::config::Location;
use super::driver::{StorageDriver, StoredObject, TransferResult, leaf_name};
use super::error::{StorageError, StorageResult};
use crate::naming::{
    ALTERNATIVE_TOKEN_LEN, alternative_name, clean_name, create_file_name, is_contained,
    join_name, random_hex, split_name,
};

/// Upper bound on alternatives tried when a name is taken on disk.
const MAX_ALTERNATIVES: usize = 100;

/// Stores content verbatim under a root directory.
#[derive(Debug, Clone)]
pub struct LocalDriver {
    root: PathBuf,
    base_url: String,
    location: Location,
    name_uuid_len: Option<usize>,
}

impl LocalDriver {
    /// Create a driver rooted at `root`, serving URLs under `base_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
            location: Location::identity(),
            name_uuid_len: None,
        }
    }

    /// Build from tag options, falling back to the media defaults.
    #[must_use]
    pub fn from_options(options: &LocalOptions, media: &MediaConfig) -> Self {
        let root = options.root.clone().unwrap_or_else(|| media.root.clone());
        let base_url = options
            .base_url
            .clone()
            .unwrap_or_else(|| media.base_url.clone());

        Self::new(root, base_url)
            .with_location(Location::from(options.location.clone()))
            .with_name_uuid_len(options.name_uuid_len)
    }

    /// Set the location rule.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Set the random prefix length.
    #[must_use]
    pub fn with_name_uuid_len(mut self, len: Option<usize>) -> Self {
        self.name_uuid_len = len;
        self
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a stored name.
    fn path(&self, name: &str) -> StorageResult<PathBuf> {
        let name = clean_name(name);
        if !is_contained(&name) || name == "." {
            return Err(StorageError::invalid_key(name));
        }
        Ok(self.root.join(name))
    }

    /// Filesystem-level collision avoidance: keep `name` if free,
    /// otherwise append a random token to its stem until free.
    async fn fs_available_name(&self, name: String) -> StorageResult<String> {
        let mut candidate = name.clone();
        for _ in 0..MAX_ALTERNATIVES {
            if !fs::try_exists(self.path(&candidate)?).await? {
                return Ok(candidate);
            }
            candidate = alternative_name(&name, &random_hex(ALTERNATIVE_TOKEN_LEN));
        }
        Err(StorageError::NameCollisionExhausted {
            name,
            attempts: MAX_ALTERNATIVES,
        })
    }

    /// Create `name` exclusively and write `content` into it.
    ///
    /// Returns `Ok(false)` if the file appeared after the name was chosen.
    async fn write_new(&self, name: &str, content: &[u8]) -> StorageResult<bool> {
        let path = self.path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let written = async {
            file.write_all(content).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }
        Ok(true)
    }
}

impl StorageDriver for LocalDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Local
    }

    async fn get_available_name(&self, name: &str) -> StorageResult<String> {
        let name = name.replace('\\', "/");
        let (dir, leaf) = split_name(&name);
        let name = join_name(dir, &create_file_name(leaf, self.name_uuid_len));
        let name = clean_name(&self.location.apply(&name));
        if !is_contained(&name) {
            return Err(StorageError::invalid_key(name));
        }
        self.fs_available_name(name).await
    }

    async fn save(&self, name: &str, content: Bytes) -> StorageResult<TransferResult> {
        let available = self.get_available_name(name).await?;

        let mut candidate = available.clone();
        for _ in 0..MAX_ALTERNATIVES {
            if self.write_new(&candidate, &content).await? {
                debug!(stored_name = %candidate, size = content.len(), "Stored local file");
                return Ok(TransferResult::complete(candidate));
            }
            candidate = alternative_name(&available, &random_hex(ALTERNATIVE_TOKEN_LEN));
        }

        Err(StorageError::NameCollisionExhausted {
            name: available,
            attempts: MAX_ALTERNATIVES,
        })
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(fs::try_exists(self.path(name)?).await?)
    }

    async fn url(&self, name: &str) -> StorageResult<String> {
        if !fs::try_exists(self.path(name)?).await? {
            return Err(StorageError::not_found(clean_name(name)));
        }
        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            clean_name(name).trim_start_matches('/')
        ))
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        match fs::remove_file(self.path(name)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(stored_name = %name, "Local file already gone, nothing to delete");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn retrieve(&self, name: &str) -> StorageResult<StoredObject> {
        match fs::read(self.path(name)?).await {
            Ok(content) => Ok(StoredObject {
                content: Bytes::from(content),
                filename: leaf_name(name),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(name)),
            Err(e) => Err(e.into()),
        }
    }
}
