//! Storage core for Mediakit.
//!
//! This crate turns a logical tag into a storage backend and runs media
//! operations against it. It has no web dependencies.
//!
//! # Modules
//!
//! - `naming` - Collision-resistant filename derivation and path cleaning
//! - `compression` - gzip content encoding for remote backends
//! - `storage` - Driver trait, the local / object-store / resumable drivers and the registry
//! - `media` - Tag-level facade over the registry

pub mod compression;
pub mod media;
pub mod naming;
pub mod storage;

pub use media::{MediaFacade, MediaFile, SavedObject, StoredObjectReference};
pub use storage::{DriverRegistry, Location, StorageDriver, StorageError, StorageResult};
