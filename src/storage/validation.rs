//! Path validation
//!
//! Resolves untrusted virtual paths against the storage root and performs
//! security checks. This is the trust boundary for every file operation:
//! nothing below `storage` touches the filesystem with a path that did not
//! come out of [`resolve_virtual_path`].

use std::path::{Path, PathBuf};

use crate::error::PathError;

/// Reserved name that addresses the storage root itself.
///
/// Clients may send `""`, `"/"` or this alias to mean the top-level folder.
pub const ROOT_ALIAS: &str = "root";

/// A validated path inside the storage root.
///
/// Invariant: `real_path` is the storage root itself or a descendant of it.
/// Instances are only produced by [`resolve_virtual_path`]; the fields are
/// immutable after construction.
#[derive(Debug, Clone)]
pub struct StoredPath {
    virtual_path: String,
    real_path: PathBuf,
}

impl StoredPath {
    /// Normalized root-relative path, `/`-separated, empty for the root.
    pub fn virtual_path(&self) -> &str {
        &self.virtual_path
    }

    /// Absolute (root-joined) path for filesystem calls.
    pub fn real_path(&self) -> &Path {
        &self.real_path
    }

    /// True when this path addresses the storage root itself.
    pub fn is_root(&self) -> bool {
        self.virtual_path.is_empty()
    }

    /// Virtual path as shown to clients, with a leading `/`.
    pub fn display_path(&self) -> String {
        format!("/{}", self.virtual_path)
    }
}

/// Resolves a client-supplied relative path against the storage root.
///
/// Normalization is purely lexical: `.` and empty segments collapse, `..`
/// pops the previous segment, and popping past the top fails with
/// [`PathError::Escape`]. No filesystem access happens here, so targets
/// that do not exist yet (upload destinations) resolve fine. Symlinks under
/// the root are not inspected; a link pointing outside the root that a later
/// filesystem call traverses is a known residual risk.
///
/// Backslashes are treated as separators so Windows-style input cannot
/// smuggle a separator through as part of a name.
pub fn resolve_virtual_path(root: &Path, user_path: &str) -> Result<StoredPath, PathError> {
    if user_path.chars().any(|c| c.is_ascii_control()) {
        return Err(PathError::Invalid(
            "path contains control characters".into(),
        ));
    }

    let trimmed = user_path.trim();
    if trimmed.is_empty() || trimmed == "/" || trimmed == ROOT_ALIAS {
        return Ok(StoredPath {
            virtual_path: String::new(),
            real_path: root.to_path_buf(),
        });
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in trimmed.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::Escape(user_path.to_string()));
                }
            }
            name => segments.push(name),
        }
    }

    let mut real_path = root.to_path_buf();
    for segment in &segments {
        real_path.push(segment);
    }

    Ok(StoredPath {
        virtual_path: segments.join("/"),
        real_path,
    })
}

/// Sanitizes a client-supplied filename down to a bare basename.
///
/// Anything before the last path separator is discarded, control characters
/// are stripped, and names that come out empty (or are `.`/`..`) are
/// rejected rather than repaired.
pub fn sanitize_filename(filename: &str) -> Result<String, PathError> {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("");

    let cleaned: String = basename
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(PathError::Invalid(filename.to_string()));
    }

    Ok(cleaned)
}

/// Validates a single new folder name.
///
/// Unlike [`sanitize_filename`] this rejects instead of repairs: a name with
/// a separator in it is an error, not a nested create.
pub fn validate_folder_name(name: &str) -> Result<(), PathError> {
    if name.trim().is_empty() {
        return Err(PathError::Invalid("empty folder name".into()));
    }
    if name == ROOT_ALIAS {
        return Err(PathError::Invalid(format!("'{}' is reserved", name)));
    }
    if name == "." || name == ".." {
        return Err(PathError::Invalid(name.to_string()));
    }
    if name.contains(['/', '\\']) {
        return Err(PathError::Invalid(format!(
            "folder name contains a path separator: {}",
            name
        )));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err(PathError::Invalid(
            "folder name contains control characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> &'static Path {
        Path::new("/srv/haven/uploads")
    }

    #[test]
    fn test_resolve_plain_paths() {
        let resolved = resolve_virtual_path(root(), "docs/photos").unwrap();
        assert_eq!(resolved.virtual_path(), "docs/photos");
        assert_eq!(resolved.real_path(), root().join("docs/photos"));
        assert!(!resolved.is_root());
    }

    #[test]
    fn test_root_aliases_resolve_to_root() {
        for alias in ["", "/", "root", "  "] {
            let resolved = resolve_virtual_path(root(), alias).unwrap();
            assert!(resolved.is_root(), "{:?} should be root", alias);
            assert_eq!(resolved.real_path(), root());
        }
    }

    #[test]
    fn test_dot_and_empty_segments_collapse() {
        let resolved = resolve_virtual_path(root(), "./a//b/./c").unwrap();
        assert_eq!(resolved.virtual_path(), "a/b/c");
    }

    #[test]
    fn test_parent_segments_stay_inside_root() {
        let resolved = resolve_virtual_path(root(), "a/b/../c").unwrap();
        assert_eq!(resolved.virtual_path(), "a/c");

        // Collapsing back to the top is the root, not an escape
        let resolved = resolve_virtual_path(root(), "a/..").unwrap();
        assert!(resolved.is_root());
    }

    #[test]
    fn test_traversal_above_root_is_rejected() {
        for attempt in [
            "..",
            "../etc/passwd",
            "a/../../b",
            "a/b/../../../c",
            "..\\..\\windows",
            "/../x",
        ] {
            match resolve_virtual_path(root(), attempt) {
                Err(PathError::Escape(_)) => {}
                other => panic!("{:?} should escape, got {:?}", attempt, other),
            }
        }
    }

    #[test]
    fn test_resolved_path_never_leaves_root() {
        // Any mix of `..` either resolves under the root or errors
        for attempt in ["x/../../..", "a/./../b/../..", "deep/../../../../../../tmp"] {
            if let Ok(resolved) = resolve_virtual_path(root(), attempt) {
                assert!(resolved.real_path().starts_with(root()));
            }
        }
    }

    #[test]
    fn test_control_characters_rejected() {
        assert!(matches!(
            resolve_virtual_path(root(), "a\0b"),
            Err(PathError::Invalid(_))
        ));
        assert!(matches!(
            resolve_virtual_path(root(), "a\nb"),
            Err(PathError::Invalid(_))
        ));
    }

    #[test]
    fn test_backslashes_are_separators() {
        let resolved = resolve_virtual_path(root(), "a\\b\\c").unwrap();
        assert_eq!(resolved.virtual_path(), "a/b/c");
    }

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_filename("/etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini").unwrap(), "boot.ini");
        assert_eq!(sanitize_filename("a/b/c.txt").unwrap(), "c.txt");
    }

    #[test]
    fn test_sanitize_filename_rejects_unusable_names() {
        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename(".").is_err());
        assert!(sanitize_filename("dir/").is_err());
        assert!(sanitize_filename("\t\r\n").is_err());
    }

    #[test]
    fn test_validate_folder_name() {
        assert!(validate_folder_name("photos").is_ok());
        assert!(validate_folder_name("my docs").is_ok());
        assert!(validate_folder_name("").is_err());
        assert!(validate_folder_name("root").is_err());
        assert!(validate_folder_name("a/b").is_err());
        assert!(validate_folder_name("a\\b").is_err());
        assert!(validate_folder_name("..").is_err());
    }
}
