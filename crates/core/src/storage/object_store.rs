//! S3-compatible object storage driver using Apache OpenDAL.
//!
//! Content is gzipped before upload and tagged `Content-Encoding: gzip`.
//! URLs are presigned, then stripped of every signature parameter so
//! callers get a stable reference; access control is left to the bucket
//! policy.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Apache OpenDAL                              │
//! │                   (Unified Storage API)                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ op.write_with("key", gz)   │ op.presign_read("key", duration)   │
//! │ op.read("key")             │ op.stat("key")                     │
//! │ op.delete("key")           │                                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Name probing (`stat` then `write`) is not atomic: two writers that
//! generate the same candidate at the same moment can both see it free.

use std::time::Duration;

use bytes::Bytes;
use mediakit_shared::{DriverKind, ObjectStoreOptions};
use opendal::{ErrorKind, Operator, services};
use tracing::{debug, info};
use url::Url;

use super::config::Location;
use super::driver::{StorageDriver, StoredObject, TransferResult, leaf_name};
use super::error::{StorageError, StorageResult};
use crate::compression::{GZIP_ENCODING, compress, decompress};
use crate::naming::{clean_name, create_file_name, is_contained, safe_join};

/// Query parameters removed from presigned URLs, compared lowercased.
pub const SIGNATURE_PARAMS: &[&str] = &[
    "x-amz-algorithm",
    "x-amz-credential",
    "x-amz-date",
    "x-amz-expires",
    "x-amz-signedheaders",
    "x-amz-signature",
    "x-amz-security-token",
    "awsaccesskeyid",
    "expires",
    "signature",
];

/// Stores gzipped content in an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct ObjectStoreDriver {
    operator: Operator,
    bucket: String,
    location: Location,
    name_uuid_len: Option<usize>,
    presign_ttl: Duration,
    max_name_attempts: usize,
}

impl ObjectStoreDriver {
    /// Create a driver backed by the S3 service described in `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the S3 operator cannot be built.
    pub fn from_options(options: &ObjectStoreOptions) -> StorageResult<Self> {
        let operator = Self::create_operator(options)?;
        Ok(Self::with_operator(operator, options))
    }

    /// Create a driver over an existing operator.
    #[must_use]
    pub fn with_operator(operator: Operator, options: &ObjectStoreOptions) -> Self {
        Self {
            operator,
            bucket: options.bucket.clone(),
            location: Location::from(options.location.clone()),
            name_uuid_len: options.name_uuid_len,
            presign_ttl: Duration::from_secs(options.presign_ttl_secs),
            max_name_attempts: options.max_name_attempts.max(1),
        }
    }

    /// Set the location rule.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create OpenDAL operator from options. Unset credentials, region and
    /// endpoint are left to the S3 service's environment loading.
    fn create_operator(options: &ObjectStoreOptions) -> StorageResult<Operator> {
        let mut builder = services::S3::default().bucket(&options.bucket);
        if let Some(endpoint) = &options.endpoint {
            builder = builder.endpoint(endpoint);
        }
        if let Some(region) = &options.region {
            builder = builder.region(region);
        }
        if let Some(access_key_id) = &options.access_key_id {
            builder = builder.access_key_id(access_key_id);
        }
        if let Some(secret_access_key) = &options.secret_access_key {
            builder = builder.secret_access_key(secret_access_key);
        }
        if let Some(root) = &options.root {
            builder = builder.root(root);
        }

        Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish()
            .pipe(Ok)
    }

    /// Next candidate key for a cleaned name.
    fn candidate(&self, cleaned: &str) -> StorageResult<String> {
        let key = safe_join(&self.location.apply(&create_file_name(cleaned, self.name_uuid_len)));
        let key = clean_name(&key);
        if !is_contained(&key) || key == "." {
            return Err(StorageError::invalid_key(key));
        }
        Ok(key)
    }

    /// Presign a read of `key` and strip the signature from the result.
    async fn presigned_url(&self, key: &str) -> StorageResult<String> {
        let presigned = self
            .operator
            .presign_read(key, self.presign_ttl)
            .await
            .map_err(|e| key_error(e, key))?;

        strip_signature_params(&presigned.uri().to_string())
    }
}

impl StorageDriver for ObjectStoreDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::ObjectStore
    }

    async fn get_available_name(&self, name: &str) -> StorageResult<String> {
        let cleaned = clean_name(name);
        if !is_contained(&cleaned) {
            return Err(StorageError::invalid_key(cleaned));
        }

        for attempt in 1..=self.max_name_attempts {
            let key = self.candidate(&cleaned)?;
            if !self.exists(&key).await? {
                return Ok(key);
            }
            debug!(key = %key, attempt, "Object key taken, generating another");
        }

        Err(StorageError::NameCollisionExhausted {
            name: cleaned,
            attempts: self.max_name_attempts,
        })
    }

    async fn save(&self, name: &str, content: Bytes) -> StorageResult<TransferResult> {
        let key = self.get_available_name(name).await?;
        let compressed = compress(&content)?;
        let compressed_len = compressed.len();

        if self
            .operator
            .info()
            .full_capability()
            .write_with_content_encoding
        {
            self.operator
                .write_with(&key, compressed)
                .content_encoding(GZIP_ENCODING)
                .await
                .map_err(|e| key_error(e, &key))?;
        } else {
            debug!(key = %key, "Backend cannot record content encoding, writing without it");
            self.operator
                .write(&key, compressed)
                .await
                .map_err(|e| key_error(e, &key))?;
        }

        info!(
            bucket = %self.bucket,
            key = %key,
            size = content.len(),
            compressed_size = compressed_len,
            "Uploaded object"
        );
        Ok(TransferResult::complete(key))
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        match self.operator.stat(&safe_join(name)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                debug!(key = %name, error = %e, "Metadata lookup failed, treating as absent");
                Ok(false)
            }
        }
    }

    async fn url(&self, name: &str) -> StorageResult<String> {
        let key = safe_join(name);
        self.operator
            .stat(&key)
            .await
            .map_err(|e| key_error(e, &key))?;
        self.presigned_url(&key).await
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let key = safe_join(name);
        self.operator
            .delete(&key)
            .await
            .map_err(|e| key_error(e, &key))
    }

    async fn retrieve(&self, name: &str) -> StorageResult<StoredObject> {
        let key = safe_join(name);
        let raw = self
            .operator
            .read(&key)
            .await
            .map_err(|e| key_error(e, &key))?;

        Ok(StoredObject {
            content: decompress(raw.to_bytes())?,
            filename: leaf_name(&key),
        })
    }
}

/// Convert an OpenDAL error, naming the key on not-found.
fn key_error(err: opendal::Error, key: &str) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound => StorageError::not_found(key),
        ErrorKind::Unsupported => StorageError::unsupported(DriverKind::ObjectStore, "operation"),
        _ => StorageError::from(err),
    }
}

/// Remove signature and credential parameters from a presigned URL.
///
/// Parameter names are matched case-insensitively against
/// [`SIGNATURE_PARAMS`]; an emptied query is dropped entirely.
pub fn strip_signature_params(url: &str) -> StorageResult<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| StorageError::operation(format!("invalid URL: {e}")))?;

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !SIGNATURE_PARAMS.contains(&key.to_ascii_lowercase().as_str()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }

    Ok(parsed.into())
}

/// Extension trait for pipe operator.
trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> Pipe for T {}
