//! Tag to driver resolution.

use std::sync::{Arc, PoisonError, RwLock};

use mediakit_shared::{MediaConfig, StorageOption, StorageOptions};
use reqwest::Client;
use tracing::debug;

use super::driver::Driver;
use super::error::StorageResult;
use super::local::LocalDriver;
use super::object_store::ObjectStoreDriver;
use super::resumable::ResumableUploadDriver;

/// Builds a fresh driver for a tag on every call.
///
/// Only the option set and an HTTP connection pool are held; drivers are
/// never cached, so [`replace_options`](Self::replace_options) takes
/// effect on the next [`resolve`](Self::resolve).
#[derive(Debug)]
pub struct DriverRegistry {
    options: RwLock<Arc<StorageOptions>>,
    media: MediaConfig,
    client: Client,
}

impl DriverRegistry {
    /// Create a registry over `options`, with `media` as the local fallback.
    #[must_use]
    pub fn new(options: StorageOptions, media: MediaConfig) -> Self {
        Self {
            options: RwLock::new(Arc::new(options)),
            media,
            client: Client::new(),
        }
    }

    /// Use a specific HTTP client for resumable drivers.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn snapshot(&self) -> Arc<StorageOptions> {
        Arc::clone(&self.options.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Option configured for `tag`, or the local fallback.
    #[must_use]
    pub fn option(&self, tag: &str) -> StorageOption {
        self.snapshot()
            .get(tag)
            .cloned()
            .unwrap_or_else(StorageOption::fallback)
    }

    /// Swap the whole option set.
    pub fn replace_options(&self, options: StorageOptions) {
        *self.options.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(options);
    }

    /// Default stored name configured for `tag`.
    #[must_use]
    pub fn default_name(&self, tag: &str) -> Option<String> {
        self.option(tag).default_name().map(str::to_string)
    }

    /// Media fallback settings.
    #[must_use]
    pub fn media(&self) -> &MediaConfig {
        &self.media
    }

    /// Build the driver for `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag's options cannot build a driver.
    pub fn resolve(&self, tag: &str) -> StorageResult<Driver> {
        let option = self.option(tag);
        debug!(tag = %tag, driver = %option.kind(), "Resolving storage driver");

        let driver = match &option {
            StorageOption::Local(options) => {
                Driver::Local(LocalDriver::from_options(options, &self.media))
            }
            StorageOption::ObjectStore(options) => {
                Driver::ObjectStore(ObjectStoreDriver::from_options(options)?)
            }
            StorageOption::Resumable(options) => Driver::Resumable(
                ResumableUploadDriver::from_options(options, self.client.clone())?,
            ),
        };
        Ok(driver)
    }
}
