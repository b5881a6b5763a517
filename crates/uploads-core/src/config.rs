//! Configuration module
//!
//! Configuration is read once at startup from the environment (optionally via a
//! `.env` file). The storage mode is derived from it and never changes afterwards:
//! a complete set of S3 credentials plus a bucket name selects the S3 backend,
//! anything less falls back to the local filesystem.

use std::env;
use std::path::{Path, PathBuf};

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 3000;
const LOCAL_STORAGE_PATH: &str = "uploads";
const MAX_UPLOAD_SIZE_BYTES: usize = 10 * 1024 * 1024;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Base configuration for the HTTP service
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
}

/// Storage configuration
///
/// Every S3 field is optional; empty values are normalized to `None` when read.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub aws_region: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub s3_bucket_name: Option<String>,
    pub local_storage_path: PathBuf,
}

/// Complete S3 credential set. Only constructed when every required value is present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S3Credentials {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub bucket: String,
}

#[derive(Clone, Debug)]
pub struct UploadsConfig {
    pub base: BaseConfig,
    pub storage: StorageConfig,
    pub max_upload_size_bytes: usize,
    pub http_concurrency_limit: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<UploadsConfig>);

impl Config {
    fn as_uploads(&self) -> &UploadsConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        // A missing .env file is fine; real deployments set variables directly.
        let _ = dotenvy::dotenv();
        let config = UploadsConfig::from_lookup(|name| env::var(name).ok())?;
        Ok(Config(Box::new(config)))
    }

    /// Local-mode configuration rooted at `base_path`.
    pub fn local(base_path: impl Into<PathBuf>) -> Self {
        Config(Box::new(UploadsConfig {
            base: BaseConfig::default(),
            storage: StorageConfig {
                aws_region: None,
                aws_access_key_id: None,
                aws_secret_access_key: None,
                aws_session_token: None,
                s3_bucket_name: None,
                local_storage_path: base_path.into(),
            },
            max_upload_size_bytes: MAX_UPLOAD_SIZE_BYTES,
            http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
        }))
    }

    /// S3-mode configuration from a complete credential set.
    pub fn s3(credentials: S3Credentials) -> Self {
        let mut config = Self::local(LOCAL_STORAGE_PATH);
        let storage = &mut config.0.storage;
        storage.aws_region = Some(credentials.region);
        storage.aws_access_key_id = Some(credentials.access_key_id);
        storage.aws_secret_access_key = Some(credentials.secret_access_key);
        storage.aws_session_token = credentials.session_token;
        storage.s3_bucket_name = Some(credentials.bucket);
        config
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_uploads().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_uploads().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.as_uploads().base.environment
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.as_uploads().max_upload_size_bytes
    }

    /// Maximum number of requests served at once
    pub fn http_concurrency_limit(&self) -> usize {
        self.as_uploads().http_concurrency_limit
    }

    pub fn local_storage_path(&self) -> &Path {
        &self.as_uploads().storage.local_storage_path
    }

    /// The S3 credential set, if complete. The session token is never required.
    pub fn s3_credentials(&self) -> Option<S3Credentials> {
        let storage = &self.as_uploads().storage;
        Some(S3Credentials {
            region: storage.aws_region.clone()?,
            access_key_id: storage.aws_access_key_id.clone()?,
            secret_access_key: storage.aws_secret_access_key.clone()?,
            session_token: storage.aws_session_token.clone(),
            bucket: storage.s3_bucket_name.clone()?,
        })
    }

    /// Storage mode derived from the credential set.
    pub fn storage_backend(&self) -> StorageBackend {
        if self.s3_credentials().is_some() {
            StorageBackend::S3
        } else {
            StorageBackend::Local
        }
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
        }
    }
}

impl UploadsConfig {
    /// Build configuration from a variable lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let config = UploadsConfig {
            base: BaseConfig {
                server_port: parse_or(non_empty("SERVER_PORT"), "SERVER_PORT", SERVER_PORT)?,
                environment: non_empty("ENVIRONMENT")
                    .or_else(|| non_empty("APP_ENV"))
                    .unwrap_or_else(|| "development".to_string()),
            },
            storage: StorageConfig {
                aws_region: non_empty("AWS_REGION"),
                aws_access_key_id: non_empty("AWS_ACCESS_KEY_ID"),
                aws_secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY"),
                aws_session_token: non_empty("AWS_SESSION_TOKEN"),
                s3_bucket_name: non_empty("AWS_S3_BUCKET_NAME"),
                local_storage_path: non_empty("LOCAL_STORAGE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(LOCAL_STORAGE_PATH)),
            },
            max_upload_size_bytes: parse_or(
                non_empty("MAX_UPLOAD_SIZE_BYTES"),
                "MAX_UPLOAD_SIZE_BYTES",
                MAX_UPLOAD_SIZE_BYTES,
            )?,
            http_concurrency_limit: parse_or(
                non_empty("HTTP_CONCURRENCY_LIMIT"),
                "HTTP_CONCURRENCY_LIMIT",
                HTTP_CONCURRENCY_LIMIT,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT must be greater than 0"));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MAX_UPLOAD_SIZE_BYTES must be greater than 0"
            ));
        }

        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!(
                "HTTP_CONCURRENCY_LIMIT must be greater than 0"
            ));
        }

        if self.storage.local_storage_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("LOCAL_STORAGE_PATH must not be empty"));
        }

        Ok(())
    }
}

/// Parse an optional variable, using `default` when it is unset.
fn parse_or<T>(value: Option<String>, name: &str, default: T) -> Result<T, anyhow::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {} {}: {}", name, raw, e)),
        None => Ok(default),
    }
}
