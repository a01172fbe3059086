//! Driver trait and the per-kind dispatch enum.

use std::future::Future;

use bytes::Bytes;
use mediakit_shared::DriverKind;

use super::error::StorageResult;
use super::local::LocalDriver;
use super::object_store::ObjectStoreDriver;
use super::resumable::ResumableUploadDriver;

/// Outcome of the transfer step of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// Backend acknowledged every byte.
    Complete,
    /// Session opened but the transfer did not finish.
    Failed {
        /// Why the transfer stopped.
        reason: String,
    },
}

/// Result of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Name the content was stored under; may differ from the request.
    pub stored_name: String,
    /// Whether the transfer finished.
    pub status: TransferStatus,
}

impl TransferResult {
    /// A finished transfer.
    #[must_use]
    pub fn complete(stored_name: impl Into<String>) -> Self {
        Self {
            stored_name: stored_name.into(),
            status: TransferStatus::Complete,
        }
    }

    /// A transfer that stopped after the session was opened.
    #[must_use]
    pub fn failed(stored_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stored_name: stored_name.into(),
            status: TransferStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    /// True when the backend holds the whole content.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == TransferStatus::Complete
    }
}

/// Content read back from a backend.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Original bytes.
    pub content: Bytes,
    /// Leaf of the stored name.
    pub filename: String,
}

/// Backend-specific storage operations.
///
/// Operations a backend does not offer fail with
/// [`StorageError::Unsupported`](super::StorageError::Unsupported).
pub trait StorageDriver: Send + Sync {
    /// Kind of backend.
    fn kind(&self) -> DriverKind;

    /// Derive a name that is free at the time of the call.
    fn get_available_name(
        &self,
        name: &str,
    ) -> impl Future<Output = StorageResult<String>> + Send;

    /// Resolve a free name for `name` and transfer `content` under it.
    fn save(
        &self,
        name: &str,
        content: Bytes,
    ) -> impl Future<Output = StorageResult<TransferResult>> + Send;

    /// Check whether a stored name is occupied.
    fn exists(&self, name: &str) -> impl Future<Output = StorageResult<bool>> + Send;

    /// Public URL of a stored name; an absent name is `NotFound`.
    fn url(&self, name: &str) -> impl Future<Output = StorageResult<String>> + Send;

    /// Remove a stored name; removing a missing name succeeds.
    fn delete(&self, name: &str) -> impl Future<Output = StorageResult<()>> + Send;

    /// Read a stored name back.
    fn retrieve(&self, name: &str) -> impl Future<Output = StorageResult<StoredObject>> + Send;
}

/// A configured driver, dispatched on its declared kind.
#[derive(Debug)]
pub enum Driver {
    /// Local filesystem.
    Local(LocalDriver),
    /// S3-compatible object storage.
    ObjectStore(ObjectStoreDriver),
    /// Resumable upload endpoint.
    Resumable(ResumableUploadDriver),
}

impl StorageDriver for Driver {
    fn kind(&self) -> DriverKind {
        match self {
            Self::Local(d) => d.kind(),
            Self::ObjectStore(d) => d.kind(),
            Self::Resumable(d) => d.kind(),
        }
    }

    async fn get_available_name(&self, name: &str) -> StorageResult<String> {
        match self {
            Self::Local(d) => d.get_available_name(name).await,
            Self::ObjectStore(d) => d.get_available_name(name).await,
            Self::Resumable(d) => d.get_available_name(name).await,
        }
    }

    async fn save(&self, name: &str, content: Bytes) -> StorageResult<TransferResult> {
        match self {
            Self::Local(d) => d.save(name, content).await,
            Self::ObjectStore(d) => d.save(name, content).await,
            Self::Resumable(d) => d.save(name, content).await,
        }
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        match self {
            Self::Local(d) => d.exists(name).await,
            Self::ObjectStore(d) => d.exists(name).await,
            Self::Resumable(d) => d.exists(name).await,
        }
    }

    async fn url(&self, name: &str) -> StorageResult<String> {
        match self {
            Self::Local(d) => d.url(name).await,
            Self::ObjectStore(d) => d.url(name).await,
            Self::Resumable(d) => d.url(name).await,
        }
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        match self {
            Self::Local(d) => d.delete(name).await,
            Self::ObjectStore(d) => d.delete(name).await,
            Self::Resumable(d) => d.delete(name).await,
        }
    }

    async fn retrieve(&self, name: &str) -> StorageResult<StoredObject> {
        match self {
            Self::Local(d) => d.retrieve(name).await,
            Self::ObjectStore(d) => d.retrieve(name).await,
            Self::Resumable(d) => d.retrieve(name).await,
        }
    }
}

/// Leaf of a stored name, used as the download filename.
pub(crate) fn leaf_name(name: &str) -> String {
    crate::naming::split_name(name).1.to_string()
}
