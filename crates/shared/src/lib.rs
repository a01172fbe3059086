//! Shared configuration records and errors for Mediakit.
//!
//! This crate provides the types every other crate agrees on:
//! - Application and per-tag storage configuration
//! - Application-wide error types

pub mod config;
pub mod error;

pub use config::{
    AppConfig, DriverKind, LocalOptions, MediaConfig, ObjectStoreOptions, ResumableOptions,
    ServerConfig, StorageOption, StorageOptions,
};
pub use error::{AppError, AppResult};
