//! Application configuration management.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Local media configuration.
    #[serde(default)]
    pub media: MediaConfig,
    /// Storage options keyed by tag.
    #[serde(default)]
    pub storage: StorageOptions,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Defaults for the local filesystem backend.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Directory local media is written under.
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
    /// Public base URL local media is served from.
    #[serde(default = "default_media_base_url")]
    pub base_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            base_url: default_media_base_url(),
        }
    }
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_media_base_url() -> String {
    "/media/".to_string()
}

/// Storage options keyed by tag.
pub type StorageOptions = HashMap<String, StorageOption>;

/// Backend kind a tag is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// Local filesystem.
    Local,
    /// S3-compatible object storage.
    ObjectStore,
    /// Resumable (tus) upload endpoint.
    Resumable,
}

impl DriverKind {
    /// Configuration name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::ObjectStore => "object-store",
            Self::Resumable => "resumable",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage option for one tag: `{ driver = "...", configs = { ... } }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "driver", content = "configs", rename_all = "kebab-case")]
pub enum StorageOption {
    /// Local filesystem backend.
    Local(LocalOptions),
    /// S3-compatible object storage backend.
    ObjectStore(ObjectStoreOptions),
    /// Resumable upload backend.
    Resumable(ResumableOptions),
}

impl StorageOption {
    /// Option used for tags with no configuration.
    #[must_use]
    pub fn fallback() -> Self {
        Self::Local(LocalOptions::default())
    }

    /// Kind of driver this option builds.
    #[must_use]
    pub const fn kind(&self) -> DriverKind {
        match self {
            Self::Local(_) => DriverKind::Local,
            Self::ObjectStore(_) => DriverKind::ObjectStore,
            Self::Resumable(_) => DriverKind::Resumable,
        }
    }

    /// Stored name used when an owner has no file of its own.
    #[must_use]
    pub fn default_name(&self) -> Option<&str> {
        match self {
            Self::Local(o) => o.default.as_deref(),
            Self::ObjectStore(o) => o.default.as_deref(),
            Self::Resumable(o) => o.default.as_deref(),
        }
    }
}

/// Local filesystem backend options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalOptions {
    /// Root directory, falls back to `media.root`.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Public base URL, falls back to `media.base_url`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Literal path prefix applied to every name.
    #[serde(default)]
    pub location: Option<String>,
    /// Length of the random name prefix.
    #[serde(default)]
    pub name_uuid_len: Option<usize>,
    /// Default stored name.
    #[serde(default)]
    pub default: Option<String>,
}

/// S3-compatible object storage options.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStoreOptions {
    /// Bucket name.
    pub bucket: String,
    /// Literal key prefix applied to every name.
    #[serde(default)]
    pub location: Option<String>,
    /// Length of the random name prefix.
    #[serde(default)]
    pub name_uuid_len: Option<usize>,
    /// Endpoint URL, resolved from the environment when absent.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Region, resolved from the environment when absent.
    #[serde(default)]
    pub region: Option<String>,
    /// Access key ID, resolved from the environment when absent.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key, resolved from the environment when absent.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Root inside the bucket.
    #[serde(default)]
    pub root: Option<String>,
    /// Presigned download URL TTL in seconds.
    #[serde(default = "default_presign_ttl")]
    pub presign_ttl_secs: u64,
    /// Upper bound on name candidates checked per save.
    #[serde(default = "default_max_name_attempts")]
    pub max_name_attempts: usize,
    /// Default stored name.
    #[serde(default)]
    pub default: Option<String>,
}

impl ObjectStoreOptions {
    /// Create options for a bucket with default settings.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            location: None,
            name_uuid_len: None,
            endpoint: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            root: None,
            presign_ttl_secs: default_presign_ttl(),
            max_name_attempts: default_max_name_attempts(),
            default: None,
        }
    }
}

fn default_presign_ttl() -> u64 {
    3600 // 1 hour
}

fn default_max_name_attempts() -> usize {
    16
}

/// Resumable upload backend options.
#[derive(Debug, Clone, Deserialize)]
pub struct ResumableOptions {
    /// Upload creation endpoint.
    pub url: String,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Length of the random name prefix.
    #[serde(default)]
    pub name_uuid_len: Option<usize>,
    /// Conflicts tolerated before the name prefix is widened.
    #[serde(default = "default_rename_tries")]
    pub rename_tries: usize,
    /// File that persists upload URLs; resumption is off when unset.
    #[serde(default)]
    pub storing_file: Option<PathBuf>,
    /// Bytes sent per PATCH request.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Retries per chunk.
    #[serde(default = "default_retries")]
    pub retries: usize,
    /// Delay between chunk retries in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
    /// Send an `Upload-Checksum` header with every chunk.
    #[serde(default)]
    pub upload_checksum: bool,
    /// Default stored name.
    #[serde(default)]
    pub default: Option<String>,
}

impl ResumableOptions {
    /// Create options for an endpoint with default settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            name_uuid_len: None,
            rename_tries: default_rename_tries(),
            storing_file: None,
            chunk_size: default_chunk_size(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            upload_checksum: false,
            default: None,
        }
    }
}

fn default_rename_tries() -> usize {
    3
}

fn default_chunk_size() -> usize {
    5 * 1024 * 1024 // 5 MiB
}

fn default_retries() -> usize {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("MEDIAKIT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_storage_option_local() {
        let option: StorageOption = serde_json::from_str(
            r#"{"driver": "local", "configs": {"location": "docs", "name_uuid_len": 4}}"#,
        )
        .expect("valid option");

        assert_eq!(option.kind(), DriverKind::Local);
        let StorageOption::Local(local) = option else {
            panic!("expected local option");
        };
        assert_eq!(local.location.as_deref(), Some("docs"));
        assert_eq!(local.name_uuid_len, Some(4));
        assert!(local.root.is_none());
    }

    #[test]
    fn test_storage_option_object_store_defaults() {
        let option: StorageOption = serde_json::from_str(
            r#"{"driver": "object-store", "configs": {"bucket": "media-bucket"}}"#,
        )
        .expect("valid option");

        let StorageOption::ObjectStore(store) = option else {
            panic!("expected object-store option");
        };
        assert_eq!(store.bucket, "media-bucket");
        assert_eq!(store.presign_ttl_secs, 3600);
        assert_eq!(store.max_name_attempts, 16);
    }

    #[test]
    fn test_storage_option_resumable_defaults() {
        let option: StorageOption = serde_json::from_str(
            r#"{"driver": "resumable", "configs": {"url": "http://localhost:1080/files/", "headers": {"Authorization": "Bearer t"}}}"#,
        )
        .expect("valid option");

        let StorageOption::Resumable(resumable) = option else {
            panic!("expected resumable option");
        };
        assert_eq!(resumable.rename_tries, 3);
        assert_eq!(resumable.chunk_size, 5 * 1024 * 1024);
        assert_eq!(resumable.retries, 3);
        assert_eq!(resumable.retry_delay, 1000);
        assert!(!resumable.upload_checksum);
        assert!(resumable.storing_file.is_none());
        assert_eq!(
            resumable.headers.get("Authorization").map(String::as_str),
            Some("Bearer t")
        );
    }

    #[test]
    fn test_object_store_requires_bucket() {
        let result: Result<StorageOption, _> =
            serde_json::from_str(r#"{"driver": "object-store", "configs": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_driver_rejected() {
        let result: Result<StorageOption, _> =
            serde_json::from_str(r#"{"driver": "cf", "configs": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_fallback_is_local() {
        let option = StorageOption::fallback();
        assert_eq!(option.kind(), DriverKind::Local);
        assert!(option.default_name().is_none());
    }

    #[rstest]
    #[case(DriverKind::Local, "local")]
    #[case(DriverKind::ObjectStore, "object-store")]
    #[case(DriverKind::Resumable, "resumable")]
    fn test_driver_kind_display(#[case] kind: DriverKind, #[case] expected: &str) {
        assert_eq!(kind.to_string(), expected);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("MEDIAKIT__SERVER__PORT", Some("9090")),
                ("MEDIAKIT__MEDIA__BASE_URL", Some("https://cdn.example.com/media/")),
            ],
            || {
                let config = AppConfig::load().expect("config loads");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.media.base_url, "https://cdn.example.com/media/");
                assert!(config.storage.is_empty());
            },
        );
    }
}
