use std::fmt::{Display, Formatter, Result as FmtResult};

/// Storage backend types
///
/// Selected once from configuration at startup. `S3` is the remote object
/// store, `Local` the filesystem fallback used when credentials are incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}
