//! External references
//!
//! Callers never see storage keys directly. They receive a reference whose shape
//! encodes the backend that produced it:
//!
//! - S3: `/uploads/file/{key}`
//! - Local: `/uploads/{key}`
//!
//! Each key segment is percent-encoded, so a reference is always a valid URL
//! path even when the original filename contains `?`, `#`, `%` or spaces.
//!
//! Older S3 references were absolute object URLs (`https://bucket.s3.../{key}`);
//! those are still accepted when deleting.

use uploads_storage::StorageBackend;

pub const UPLOADS_PREFIX: &str = "/uploads/";
pub const REMOTE_PREFIX: &str = "/uploads/file/";

/// Reference returned to callers for a stored key.
pub fn external_reference(backend: StorageBackend, key: &str) -> String {
    let path = encode_key(key);
    match backend {
        StorageBackend::S3 => format!("{}{}", REMOTE_PREFIX, path),
        StorageBackend::Local => format!("{}{}", UPLOADS_PREFIX, path),
    }
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-decode a reference path. Input that is not valid percent-encoded
/// UTF-8 is taken literally.
fn decode_key(path: &str) -> String {
    urlencoding::decode(path)
        .map(|key| key.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Shape of a reference, independent of the active backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceShape {
    /// `/uploads/file/{key}`
    Remote { key: String },
    /// `http(s)://host/{key}`
    LegacyUrl { key: String },
    /// Anything else; the key is the reference minus a leading `/uploads/`
    Local { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed reference {reference}: {reason}")]
pub struct MalformedReference {
    pub reference: String,
    pub reason: String,
}

/// Classify a reference and recover the storage key it points at.
pub fn parse_reference(reference: &str) -> Result<ReferenceShape, MalformedReference> {
    let malformed = |reason: &str| MalformedReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    };

    if let Some(key) = reference.strip_prefix(REMOTE_PREFIX) {
        return Ok(ReferenceShape::Remote {
            key: decode_key(key),
        });
    }

    if reference.starts_with("http://") || reference.starts_with("https://") {
        let uri: http::Uri = reference
            .parse()
            .map_err(|e: http::uri::InvalidUri| malformed(&e.to_string()))?;
        let path = uri.path().trim_start_matches('/');
        let key = urlencoding::decode(path)
            .map_err(|e| malformed(&e.to_string()))?
            .into_owned();
        if key.is_empty() {
            return Err(malformed("URL has no object path"));
        }
        return Ok(ReferenceShape::LegacyUrl { key });
    }

    Ok(ReferenceShape::Local {
        key: local_key(reference),
    })
}

/// Local storage key for a reference: the decoded reference minus a leading `/uploads/`.
pub fn local_key(reference: &str) -> String {
    decode_key(reference.strip_prefix(UPLOADS_PREFIX).unwrap_or(reference))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_reference_shapes() {
        assert_eq!(
            external_reference(StorageBackend::S3, "avatars/a.webp"),
            "/uploads/file/avatars/a.webp"
        );
        assert_eq!(
            external_reference(StorageBackend::Local, "avatars/a.webp"),
            "/uploads/avatars/a.webp"
        );
        assert_eq!(
            external_reference(StorageBackend::Local, "attachments/p/t/id-n.txt"),
            "/uploads/attachments/p/t/id-n.txt"
        );
    }

    #[test]
    fn test_references_parse_back_to_keys() {
        for key in ["avatars/a.webp", "attachments/p/t/id-notes.txt"] {
            assert_eq!(
                parse_reference(&external_reference(StorageBackend::S3, key)).unwrap(),
                ReferenceShape::Remote {
                    key: key.to_string()
                }
            );
            assert_eq!(
                parse_reference(&external_reference(StorageBackend::Local, key)).unwrap(),
                ReferenceShape::Local {
                    key: key.to_string()
                }
            );
        }
    }

    #[test]
    fn test_legacy_url() {
        let shape = parse_reference(
            "https://bucket.s3.eu-west-1.amazonaws.com/attachments/p/id-my%20notes.txt",
        )
        .unwrap();
        assert_eq!(
            shape,
            ReferenceShape::LegacyUrl {
                key: "attachments/p/id-my notes.txt".to_string()
            }
        );

        let shape = parse_reference("http://localhost:9000/avatars/a.webp").unwrap();
        assert_eq!(
            shape,
            ReferenceShape::LegacyUrl {
                key: "avatars/a.webp".to_string()
            }
        );
    }

    #[test]
    fn test_legacy_url_without_path_is_malformed() {
        assert!(parse_reference("https://bucket.s3.amazonaws.com/").is_err());
        assert!(parse_reference("https://exa mple.com/a").is_err());
    }

    #[test]
    fn test_reserved_characters_are_encoded() {
        let key = "attachments/p/0b1c-report #1 what?100%.txt";

        let remote = external_reference(StorageBackend::S3, key);
        assert_eq!(
            remote,
            "/uploads/file/attachments/p/0b1c-report%20%231%20what%3F100%25.txt"
        );
        assert!(remote.parse::<http::Uri>().is_ok());
        assert_eq!(
            parse_reference(&remote).unwrap(),
            ReferenceShape::Remote {
                key: key.to_string()
            }
        );

        let local = external_reference(StorageBackend::Local, key);
        assert!(local.parse::<http::Uri>().is_ok());
        assert_eq!(local_key(&local), key);
    }

    #[test]
    fn test_local_key() {
        assert_eq!(local_key("/uploads/avatars/a.webp"), "avatars/a.webp");
        assert_eq!(local_key("avatars/a.webp"), "avatars/a.webp");
    }
}
