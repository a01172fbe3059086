//! Pluggable media storage backends.
//!
//! Every backend implements [`StorageDriver`]; [`Driver`] wraps the three
//! concrete drivers and dispatches on the declared [`DriverKind`]. The
//! [`DriverRegistry`] turns a tag into a freshly built driver.
//!
//! ```text
//! ┌──────────────┐   resolve(tag)   ┌──────────────────────────────────────┐
//! │ MediaFacade  │ ───────────────► │ DriverRegistry (tag -> StorageOption) │
//! └──────────────┘                  └──────────────────────────────────────┘
//!                                          │
//!              ┌───────────────────────────┼──────────────────────────────┐
//!              ▼                           ▼                              ▼
//!        LocalDriver              ObjectStoreDriver             ResumableUploadDriver
//!        (tokio::fs)              (OpenDAL S3, gzip)            (tus over reqwest)
//! ```
//!
//! [`DriverKind`]: mediakit_shared::DriverKind

mod config;
mod driver;
mod error;
mod local;
mod object_store;
mod registry;
mod resumable;
mod url_store;

pub use config::{Location, NameTransform};
pub use driver::{Driver, StorageDriver, StoredObject, TransferResult, TransferStatus};
pub use error::{StorageError, StorageResult};
pub use local::LocalDriver;
pub use object_store::{ObjectStoreDriver, SIGNATURE_PARAMS, strip_signature_params};
pub use registry::DriverRegistry;
pub use resumable::{MAX_SUFFIX_LEN, ResumableUploadDriver, TUS_VERSION};
pub use url_store::{UrlStore, fingerprint};
