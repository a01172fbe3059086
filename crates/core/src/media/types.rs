//! Media facade types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::storage::{Location, TransferStatus};

/// Everything needed to find a stored object again.
///
/// Owned by whoever tracks the media; the storage layer never persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObjectReference {
    /// Tag whose driver holds the object.
    pub tag: String,
    /// Backend-relative name, forward slashes only.
    pub stored_name: String,
    /// Filename the caller uploaded.
    pub original_filename: String,
}

/// Outcome of a facade save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedObject {
    /// Where the content went.
    pub reference: StoredObjectReference,
    /// Whether the backend received all of it.
    pub status: TransferStatus,
}

impl SavedObject {
    /// True when the backend holds the whole content.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == TransferStatus::Complete
    }
}

/// How a retrieved file should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Shown in place.
    Inline,
    /// Offered as a download.
    Attachment,
}

impl Disposition {
    /// `Content-Disposition` type token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

/// Content read back through the facade.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Original bytes.
    pub content: Bytes,
    /// Leaf of the stored name.
    pub filename: String,
    /// Presentation hint for the HTTP boundary.
    pub disposition: Disposition,
}

impl MediaFile {
    /// `Content-Disposition` header value.
    #[must_use]
    pub fn content_disposition(&self) -> String {
        let filename = self.filename.replace(['"', '\\'], "_");
        format!("{}; filename=\"{filename}\"", self.disposition.as_str())
    }
}

/// One entry of a batch save.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    /// Tag to save under.
    pub tag: String,
    /// Requested filename.
    pub name: String,
    /// Bytes to store.
    pub content: Bytes,
    /// Optional placement ahead of driver naming.
    pub destination: Option<Location>,
}
