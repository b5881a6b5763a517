//! Domain models

pub mod upload;

pub use upload::{AttachmentKind, FileBlob, StoredAttachment};
