//! Tag-level media operations.
//!
//! [`MediaFacade`] resolves a driver per call through the
//! [`DriverRegistry`](crate::storage::DriverRegistry) and delegates; it
//! keeps no state between calls.

mod service;
mod types;

pub use service::{MediaFacade, generate_filename};
pub use types::{Disposition, MediaFile, MediaUpload, SavedObject, StoredObjectReference};
