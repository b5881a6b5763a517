use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An uploaded file held in memory for the duration of one store operation.
#[derive(Debug, Clone)]
pub struct FileBlob {
    pub data: Bytes,
    /// Declared MIME type
    pub content_type: String,
    /// Filename as supplied by the client
    pub original_name: String,
}

impl FileBlob {
    pub fn new(
        data: impl Into<Bytes>,
        content_type: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            original_name: original_name.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Display classification of an attachment. Purely metadata; bytes are never transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttachmentKind {
    Image,
    File,
}

impl AttachmentKind {
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image/") {
            AttachmentKind::Image
        } else {
            AttachmentKind::File
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "IMAGE",
            AttachmentKind::File => "FILE",
        }
    }
}

/// Result of storing an attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAttachment {
    pub url: String,
    pub kind: AttachmentKind,
    pub original_name: String,
}
