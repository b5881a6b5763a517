//! Uploads Services Library
//!
//! This crate provides the `StorageGateway`, the single entry point callers use
//! to store, stream and delete uploaded files without knowing which storage
//! backend is active.

pub mod gateway;
pub mod reference;

pub use gateway::{create_gateway, GatewayError, GatewayResult, StorageGateway};
pub use reference::{external_reference, parse_reference, ReferenceShape};
pub use uploads_processing::ProcessingError;
pub use uploads_storage::{Storage, StorageBackend, StorageError, StoredObject};
