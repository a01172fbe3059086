//! Media facade implementation.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use super::types::{Disposition, MediaFile, MediaUpload, SavedObject, StoredObjectReference};
use crate::naming::{clean_name, split_name};
use crate::storage::{DriverRegistry, Location, StorageDriver, StorageResult};

/// Place `name` under `destination`, then normalize it.
#[must_use]
pub fn generate_filename(name: &str, destination: Option<&Location>) -> String {
    let name = name.replace('\\', "/");
    match destination {
        Some(location) => clean_name(&location.apply(&name)),
        None => clean_name(&name),
    }
}

/// Save, locate and read media by tag.
#[derive(Debug, Clone)]
pub struct MediaFacade {
    registry: Arc<DriverRegistry>,
}

impl MediaFacade {
    /// Create a facade over `registry`.
    #[must_use]
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        Self { registry }
    }

    /// Registry used for resolution.
    #[must_use]
    pub fn registry(&self) -> &Arc<DriverRegistry> {
        &self.registry
    }

    /// Store `content` for `tag`.
    ///
    /// The returned reference carries the stored name, which may differ
    /// from `name`. A resumable transfer that stops midway is reported in
    /// `status`, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot be built, no free name is
    /// found, or the backend rejects the write.
    pub async fn save(
        &self,
        tag: &str,
        name: &str,
        content: Bytes,
        destination: Option<&Location>,
    ) -> StorageResult<SavedObject> {
        let original_filename = split_name(&name.replace('\\', "/")).1.to_string();
        let target = generate_filename(name, destination);
        let driver = self.registry.resolve(tag)?;

        let result = driver.save(&target, content).await?;
        if result.is_complete() {
            info!(tag = %tag, stored_name = %result.stored_name, "Media saved");
        } else {
            warn!(tag = %tag, stored_name = %result.stored_name, "Media saved incompletely");
        }

        Ok(SavedObject {
            reference: StoredObjectReference {
                tag: tag.to_string(),
                stored_name: result.stored_name,
                original_filename,
            },
            status: result.status,
        })
    }

    /// Save several uploads in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first save error; earlier entries stay stored.
    pub async fn save_many(
        &self,
        uploads: impl IntoIterator<Item = MediaUpload>,
    ) -> StorageResult<Vec<SavedObject>> {
        let mut saved = Vec::new();
        for upload in uploads {
            let object = self
                .save(
                    &upload.tag,
                    &upload.name,
                    upload.content,
                    upload.destination.as_ref(),
                )
                .await?;
            saved.push(object);
        }
        Ok(saved)
    }

    /// Public URL of `stored_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver has no URLs or signing fails.
    pub async fn url(&self, tag: &str, stored_name: &str) -> StorageResult<String> {
        self.registry.resolve(tag)?.url(stored_name).await
    }

    /// Public URL of a stored reference.
    ///
    /// # Errors
    ///
    /// See [`url`](Self::url).
    pub async fn url_for(&self, reference: &StoredObjectReference) -> StorageResult<String> {
        self.url(&reference.tag, &reference.stored_name).await
    }

    /// Whether `stored_name` is occupied.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot check existence.
    pub async fn exists(&self, tag: &str, stored_name: &str) -> StorageResult<bool> {
        self.registry.resolve(tag)?.exists(stored_name).await
    }

    /// Remove `stored_name`; a missing object is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend delete fails.
    pub async fn delete(&self, tag: &str, stored_name: &str) -> StorageResult<()> {
        self.registry.resolve(tag)?.delete(stored_name).await?;
        info!(tag = %tag, stored_name = %stored_name, "Media deleted");
        Ok(())
    }

    /// Read `stored_name` for inline display.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is missing or the driver cannot read.
    pub async fn retrieve(&self, tag: &str, stored_name: &str) -> StorageResult<MediaFile> {
        self.read(tag, stored_name, Disposition::Inline).await
    }

    /// Read `stored_name` as an attachment.
    ///
    /// # Errors
    ///
    /// See [`retrieve`](Self::retrieve).
    pub async fn download(&self, tag: &str, stored_name: &str) -> StorageResult<MediaFile> {
        self.read(tag, stored_name, Disposition::Attachment).await
    }

    async fn read(
        &self,
        tag: &str,
        stored_name: &str,
        disposition: Disposition,
    ) -> StorageResult<MediaFile> {
        let object = self.registry.resolve(tag)?.retrieve(stored_name).await?;
        Ok(MediaFile {
            content: object.content,
            filename: object.filename,
            disposition,
        })
    }

    /// Stored name to fall back on when an owner has no file for `tag`.
    #[must_use]
    pub fn default_name(&self, tag: &str) -> Option<String> {
        self.registry.default_name(tag)
    }
}
