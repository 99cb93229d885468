//! Storage result types
//!
//! Defines result structures returned by file store operations.

use std::path::PathBuf;

/// Result of a folder listing operation
///
/// Child names are sorted ascending; folders and files are reported
/// separately.
#[derive(Debug, Clone)]
pub struct FolderListing {
    pub virtual_path: String,
    pub folders: Vec<String>,
    pub files: Vec<String>,
}

/// Result of a file upload operation
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Sanitized filename the content was stored under.
    pub name: String,
    /// Virtual path of the owning folder (empty for the root).
    pub virtual_folder: String,
    /// Size in bytes as written.
    pub size: u64,
}

/// Result of a folder creation operation
#[derive(Debug, Clone)]
pub struct CreatedFolder {
    pub virtual_path: String,
    pub real_path: PathBuf,
}
