//! Uploads Storage Library
//!
//! This crate provides the storage abstraction and its two implementations:
//! an S3 object store and a local filesystem tree.
//!
//! # Storage key format
//!
//! Keys are backend-relative and live in one of two fixed namespaces:
//!
//! - **Avatars**: `avatars/{uuid}.{ext}`
//! - **Attachments**: `attachments/{segment}/.../{uuid}-{original_name}`
//!
//! Folder segments are sanitized to `[a-z0-9_-]`. Keys must not start with `/`
//! or contain `..` components. Key generation is centralized in the `keys`
//! module so both backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{
    ByteStream, Storage, StorageError, StorageResult, StoredObject, DEFAULT_CONTENT_TYPE,
};
pub use uploads_core::StorageBackend;
