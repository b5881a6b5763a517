//! Uploads Processing Library
//!
//! Image transformations applied before a file is stored. Only avatars are
//! transformed; attachments are stored byte-for-byte.

#[cfg(feature = "image")]
pub mod avatar;

#[cfg(feature = "image")]
pub use avatar::{AvatarImage, AvatarTransformer, ProcessingError};
