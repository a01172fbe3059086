//! Resumable upload driver speaking the tus 1.0.0 protocol.
//!
//! A save runs in three phases:
//!
//! 1. **Negotiate**: `POST` the upload-creation endpoint with a candidate
//!    filename. `409 Conflict` means the name is taken: a fresh candidate
//!    is generated, and once `rename_tries` conflicts have been spent the
//!    random prefix grows by one character and the budget resets. Any
//!    other failure is returned to the caller.
//! 2. **Transfer**: `PATCH` the session in `chunk_size` pieces. Transport
//!    errors and 5xx responses are retried `retries` times, `retry_delay`
//!    apart.
//! 3. **Complete**: a transfer failure is logged and reported as
//!    [`TransferStatus::Failed`](super::TransferStatus::Failed) rather
//!    than an error; the session URL stays in the store so a later save
//!    of the same content resumes from the last acknowledged offset.
//!
//! Upload URLs are persisted only when `storing_file` is configured.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use mediakit_shared::{DriverKind, ResumableOptions};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use tokio_retry2::strategy::FixedInterval;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, info, warn};
use url::Url;

use super::driver::{StorageDriver, StoredObject, TransferResult};
use super::error::{StorageError, StorageResult};
use super::url_store::{UrlStore, fingerprint};
use crate::naming::{clean_name, create_file_name, effective_suffix_len, is_contained};

/// Protocol version sent in `Tus-Resumable`.
pub const TUS_VERSION: &str = "1.0.0";

/// Widest random prefix tried before giving up on a name.
pub const MAX_SUFFIX_LEN: usize = 64;

const TUS_RESUMABLE: &str = "Tus-Resumable";
const UPLOAD_LENGTH: &str = "Upload-Length";
const UPLOAD_OFFSET: &str = "Upload-Offset";
const UPLOAD_METADATA: &str = "Upload-Metadata";
const UPLOAD_CHECKSUM: &str = "Upload-Checksum";
const OFFSET_OCTET_STREAM: &str = "application/offset+octet-stream";

/// Uploads content to a tus endpoint.
#[derive(Debug, Clone)]
pub struct ResumableUploadDriver {
    client: Client,
    endpoint: Url,
    headers: HeaderMap,
    name_uuid_len: Option<usize>,
    rename_tries: usize,
    store: Option<UrlStore>,
    chunk_size: usize,
    retries: usize,
    retry_delay: Duration,
    upload_checksum: bool,
}

/// Session picked back up from the store.
struct ResumedSession {
    url: Url,
    filename: String,
    offset: u64,
}

impl ResumableUploadDriver {
    /// Create a driver from tag options.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL or a configured header is invalid.
    pub fn from_options(options: &ResumableOptions, client: Client) -> StorageResult<Self> {
        let endpoint = Url::parse(&options.url).map_err(|e| {
            StorageError::configuration(format!("invalid upload endpoint '{}': {e}", options.url))
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                StorageError::configuration(format!("invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                StorageError::configuration(format!("invalid value for header '{name}': {e}"))
            })?;
            headers.insert(name, value);
        }

        Ok(Self {
            client,
            endpoint,
            headers,
            name_uuid_len: options.name_uuid_len,
            rename_tries: options.rename_tries.max(1),
            store: options.storing_file.clone().map(UrlStore::new),
            chunk_size: options.chunk_size.max(1),
            retries: options.retries,
            retry_delay: Duration::from_millis(options.retry_delay),
            upload_checksum: options.upload_checksum,
        })
    }

    /// Open an upload session for `filename`.
    ///
    /// Returns `None` when the endpoint reports the name as taken.
    async fn create_session(&self, filename: &str, length: usize) -> StorageResult<Option<Url>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .header(TUS_RESUMABLE, TUS_VERSION)
            .header(UPLOAD_LENGTH, length.to_string())
            .header(
                UPLOAD_METADATA,
                format!("filename {}", STANDARD.encode(filename)),
            )
            .send()
            .await
            .map_err(|e| StorageError::negotiation(e.to_string()))?;

        match response.status() {
            StatusCode::CONFLICT => Ok(None),
            status if status.is_success() => {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| StorageError::negotiation("response has no Location header"))?;
                let session = self.endpoint.join(location).map_err(|e| {
                    StorageError::negotiation(format!("invalid Location '{location}': {e}"))
                })?;
                Ok(Some(session))
            }
            status => Err(StorageError::negotiation(format!(
                "upload creation rejected with {status}"
            ))),
        }
    }

    /// Open a session, renaming on conflict and widening the random
    /// prefix each time `rename_tries` conflicts are used up.
    async fn negotiate(&self, name: &str, length: usize) -> StorageResult<(String, Url)> {
        let base = clean_name(name);
        if !is_contained(&base) {
            return Err(StorageError::invalid_key(base));
        }

        let mut suffix_len = effective_suffix_len(self.name_uuid_len);
        let mut budget = self.rename_tries;
        let mut attempts = 0;

        loop {
            let candidate = create_file_name(base.as_str(), Some(suffix_len));
            attempts += 1;

            if let Some(session) = self.create_session(&candidate, length).await? {
                debug!(filename = %candidate, session = %session, "Upload session opened");
                return Ok((candidate, session));
            }

            budget -= 1;
            debug!(filename = %candidate, budget, "Upload name taken");
            if budget == 0 {
                if suffix_len >= MAX_SUFFIX_LEN {
                    return Err(StorageError::NameCollisionExhausted {
                        name: base,
                        attempts,
                    });
                }
                suffix_len += 1;
                budget = self.rename_tries;
                info!(suffix_len, "Rename budget spent, widening name prefix");
            }
        }
    }

    /// Pick up a stored session for `fp`, dropping it if the endpoint no
    /// longer knows it.
    async fn resume_session(
        &self,
        store: &UrlStore,
        fp: &str,
    ) -> StorageResult<Option<ResumedSession>> {
        let Some(stored) = store.get(fp).await? else {
            return Ok(None);
        };
        let Ok(url) = Url::parse(&stored) else {
            store.remove(fp).await?;
            return Ok(None);
        };

        let response = match self
            .client
            .head(url.clone())
            .headers(self.headers.clone())
            .header(TUS_RESUMABLE, TUS_VERSION)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(session = %url, error = %e, "Could not query stored upload session");
                return Ok(None);
            }
        };

        let offset = header_u64(response.headers(), UPLOAD_OFFSET);
        let filename = response
            .headers()
            .get(UPLOAD_METADATA)
            .and_then(|v| v.to_str().ok())
            .and_then(metadata_filename);

        match (response.status().is_success(), offset, filename) {
            (true, Some(offset), Some(filename)) => {
                info!(session = %url, offset, "Resuming upload");
                Ok(Some(ResumedSession {
                    url,
                    filename,
                    offset,
                }))
            }
            _ => {
                debug!(session = %url, status = %response.status(), "Stored upload session unusable");
                store.remove(fp).await?;
                Ok(None)
            }
        }
    }

    /// Send one chunk starting at `offset`; returns the new offset.
    async fn patch_chunk(
        &self,
        session: &Url,
        content: &Bytes,
        offset: u64,
    ) -> Result<u64, RetryError<StorageError>> {
        let start = usize::try_from(offset)
            .map_err(|_| RetryError::Permanent(StorageError::operation("offset overflow")))?;
        let end = content.len().min(start.saturating_add(self.chunk_size));
        let chunk = content.slice(start..end);

        let mut request = self
            .client
            .patch(session.clone())
            .headers(self.headers.clone())
            .header(TUS_RESUMABLE, TUS_VERSION)
            .header(UPLOAD_OFFSET, offset.to_string())
            .header(CONTENT_TYPE, OFFSET_OCTET_STREAM);
        if self.upload_checksum {
            let digest = Sha256::digest(&chunk);
            request = request.header(UPLOAD_CHECKSUM, format!("sha256 {}", STANDARD.encode(digest)));
        }

        let response = match request.body(chunk).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(session = %session, offset, error = %e, "Chunk upload failed, will retry");
                return Err(RetryError::Transient {
                    err: StorageError::operation(e.to_string()),
                    retry_after: None,
                });
            }
        };

        let status = response.status();
        if status.is_server_error() {
            warn!(session = %session, offset, %status, "Chunk rejected, will retry");
            return Err(RetryError::Transient {
                err: StorageError::operation(format!("chunk at offset {offset} failed with {status}")),
                retry_after: None,
            });
        }
        if !status.is_success() {
            return Err(RetryError::Permanent(StorageError::operation(format!(
                "chunk at offset {offset} rejected with {status}"
            ))));
        }

        match header_u64(response.headers(), UPLOAD_OFFSET) {
            Some(next) if next > offset => Ok(next),
            _ => Err(RetryError::Permanent(StorageError::operation(format!(
                "server did not advance past offset {offset}"
            )))),
        }
    }

    /// Upload `content` from `offset` to the end.
    async fn transfer(&self, session: &Url, content: &Bytes, mut offset: u64) -> StorageResult<()> {
        let total = content.len() as u64;
        while offset < total {
            let strategy = FixedInterval::new(self.retry_delay).take(self.retries);
            offset = Retry::spawn(strategy, || self.patch_chunk(session, content, offset)).await?;
        }
        Ok(())
    }
}

impl StorageDriver for ResumableUploadDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Resumable
    }

    async fn get_available_name(&self, name: &str) -> StorageResult<String> {
        let base = clean_name(name);
        if !is_contained(&base) {
            return Err(StorageError::invalid_key(base));
        }
        Ok(create_file_name(base.as_str(), self.name_uuid_len))
    }

    async fn save(&self, name: &str, content: Bytes) -> StorageResult<TransferResult> {
        let fp = self.store.as_ref().map(|_| fingerprint(&content));

        let resumed = match (&self.store, &fp) {
            (Some(store), Some(fp)) => self.resume_session(store, fp).await?,
            _ => None,
        };

        let (filename, session, offset) = if let Some(resumed) = resumed {
            (resumed.filename, resumed.url, resumed.offset)
        } else {
            let (filename, session) = self.negotiate(name, content.len()).await?;
            if let (Some(store), Some(fp)) = (&self.store, &fp) {
                store.set(fp, session.as_str()).await?;
            }
            (filename, session, 0)
        };

        match self.transfer(&session, &content, offset).await {
            Ok(()) => {
                if let (Some(store), Some(fp)) = (&self.store, &fp) {
                    if let Err(e) = store.remove(fp).await {
                        warn!(error = %e, "Could not clear finished upload from store");
                    }
                }
                info!(filename = %filename, session = %session, size = content.len(), "Upload complete");
                Ok(TransferResult::complete(filename))
            }
            Err(e) => {
                warn!(
                    filename = %filename,
                    session = %session,
                    error = %e,
                    "Upload transfer failed"
                );
                Ok(TransferResult::failed(filename, e.to_string()))
            }
        }
    }

    async fn exists(&self, _name: &str) -> StorageResult<bool> {
        Err(StorageError::unsupported(DriverKind::Resumable, "exists"))
    }

    async fn url(&self, _name: &str) -> StorageResult<String> {
        Err(StorageError::unsupported(DriverKind::Resumable, "url"))
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        debug!(stored_name = %name, "Resumable uploads cannot be deleted, ignoring");
        Ok(())
    }

    async fn retrieve(&self, _name: &str) -> StorageResult<StoredObject> {
        Err(StorageError::unsupported(DriverKind::Resumable, "retrieve"))
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Filename from an `Upload-Metadata` header (`key b64,key b64`).
fn metadata_filename(metadata: &str) -> Option<String> {
    metadata.split(',').find_map(|pair| {
        let mut parts = pair.trim().splitn(2, ' ');
        if parts.next()? != "filename" {
            return None;
        }
        let decoded = STANDARD.decode(parts.next()?.trim()).ok()?;
        String::from_utf8(decoded).ok()
    })
}
