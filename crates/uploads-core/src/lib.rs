//! Uploads Core Library
//!
//! This crate provides the domain models, error types, configuration and hooks
//! shared by every uploads component.

pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, S3Credentials};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{CleanupReporter, DeleteFailure, NoOpCleanupReporter};
pub use models::{AttachmentKind, FileBlob, StoredAttachment};
pub use storage_types::StorageBackend;
