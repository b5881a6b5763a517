//! Shared key generation for storage backends.
//!
//! Key format: `avatars/{uuid}.{ext}` for avatars and
//! `attachments/{segments}/{uuid}-{original_name}` for attachments.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

pub const AVATARS_NAMESPACE: &str = "avatars";
pub const ATTACHMENTS_NAMESPACE: &str = "attachments";

/// Sanitize one user-supplied folder name.
///
/// Lower-cases the input and replaces every character outside `[a-z0-9_-]` with `_`.
/// An empty segment becomes `_` so that the joined key never has empty components.
pub fn sanitize_segment(segment: &str) -> String {
    let sanitized: String = segment
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Sanitize and join folder segments with `/`.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| sanitize_segment(s.as_ref()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Generate a fresh avatar key with the given file extension.
pub fn generate_avatar_key(extension: &str) -> String {
    format!("{}/{}.{}", AVATARS_NAMESPACE, Uuid::new_v4(), extension)
}

/// Generate a unique attachment filename that keeps the original name readable.
///
/// Only the final path component of `original_name` is kept, so client-supplied
/// directory parts can never leak into the key.
pub fn generate_attachment_filename(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect::<String>();

    let base = match base.as_str() {
        "" | "." | ".." => "file".to_string(),
        _ => base,
    };

    format!("{}-{}", Uuid::new_v4(), base)
}

/// Attachment key for `filename` below the given folder segments.
pub fn attachment_key<S: AsRef<str>>(segments: &[S], filename: &str) -> String {
    if segments.is_empty() {
        format!("{}/{}", ATTACHMENTS_NAMESPACE, filename)
    } else {
        format!(
            "{}/{}/{}",
            ATTACHMENTS_NAMESPACE,
            join_segments(segments),
            filename
        )
    }
}

/// Key prefix covering every attachment below the given folder segments.
///
/// Returns `None` for an empty segment list: the whole namespace is never a folder.
pub fn attachment_prefix<S: AsRef<str>>(segments: &[S]) -> Option<String> {
    if segments.is_empty() {
        return None;
    }
    Some(format!(
        "{}/{}/",
        ATTACHMENTS_NAMESPACE,
        join_segments(segments)
    ))
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }

    if key.starts_with('/') || key.starts_with('\\') || key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }

    if key.split(['/', '\\']).any(|part| part == "..") {
        return Err(StorageError::InvalidKey(
            "Storage key resolves outside storage directory".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_clean_segment(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("Project A"), "project_a");
        assert_eq!(sanitize_segment("Task#1"), "task_1");
        assert_eq!(sanitize_segment("../"), "___");
        assert_eq!(sanitize_segment("keep-this_one"), "keep-this_one");
        assert_eq!(sanitize_segment(""), "_");
    }

    #[test]
    fn test_sanitized_segments_only_contain_safe_characters() {
        let hostile = [
            "../../etc",
            "Über Größe",
            "a/b\\c",
            "  spaces  ",
            "UPPER",
            "%2e%2e",
            "名前",
        ];
        for input in hostile {
            let out = sanitize_segment(input);
            assert!(is_clean_segment(&out), "{:?} -> {:?}", input, out);
        }

        let joined = join_segments(&hostile);
        assert_eq!(joined.split('/').count(), hostile.len());
        assert!(joined.split('/').all(is_clean_segment));
    }

    #[test]
    fn test_attachment_key_layout() {
        let key = attachment_key(&["Project A", "Task#1"], "id-notes.txt");
        assert_eq!(key, "attachments/project_a/task_1/id-notes.txt");

        let segments: [&str; 0] = [];
        assert_eq!(attachment_key(&segments, "f.txt"), "attachments/f.txt");
    }

    #[test]
    fn test_attachment_prefix() {
        assert_eq!(
            attachment_prefix(&["Project A"]).as_deref(),
            Some("attachments/project_a/")
        );
        let segments: [String; 0] = [];
        assert_eq!(attachment_prefix(&segments), None);
    }

    #[test]
    fn test_generated_names_are_unique() {
        let a = generate_avatar_key("webp");
        let b = generate_avatar_key("webp");
        assert_ne!(a, b);
        assert!(a.starts_with("avatars/"));
        assert!(a.ends_with(".webp"));

        let f = generate_attachment_filename("notes.txt");
        let (id, name) = f.split_at(36);
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(name, "-notes.txt");
    }

    #[test]
    fn test_attachment_filename_drops_directories() {
        let f = generate_attachment_filename("../../etc/passwd");
        assert!(f.ends_with("-passwd"));
        assert!(!f.contains('/'));

        let f = generate_attachment_filename("C:\\Users\\me\\report.pdf");
        assert!(f.ends_with("-report.pdf"));

        let f = generate_attachment_filename("..");
        assert!(f.ends_with("-file"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("avatars/a.webp").is_ok());
        assert!(validate_key("attachments/x/id-my..notes.txt").is_ok());
        assert!(matches!(validate_key(""), Err(StorageError::InvalidKey(_))));
        assert!(matches!(
            validate_key("/etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            validate_key("avatars/../../etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            validate_key("avatars\\..\\secret"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
