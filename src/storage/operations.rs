//! Storage operations
//!
//! File system operations for the browsable file store: list, create
//! folder, upload, download and delete, all confined to a single storage
//! root. Every operation resolves its target through path validation
//! before touching the filesystem and fails the whole call on a bad path.

use log::{error, info, warn};
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::StorageError;
use crate::storage::policy::{self, UploadContext};
use crate::storage::results::{CreatedFolder, FolderListing, StoredFile};
use crate::storage::validation::{
    StoredPath, resolve_virtual_path, sanitize_filename, validate_folder_name,
};

/// File store rooted at a single directory.
///
/// Operations on distinct paths are independent; concurrent writers to the
/// same path race with last-writer-wins at the final rename. The struct
/// holds no state beyond the root, so it is cheap to clone per request.
#[derive(Debug, Clone)]
pub struct FileRepository {
    root: PathBuf,
}

impl FileRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root this repository is confined to.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn resolve(&self, user_path: &str) -> Result<StoredPath, StorageError> {
        Ok(resolve_virtual_path(&self.root, user_path)?)
    }

    /// Lists the direct children of a folder, folders and files separately,
    /// each sorted by name.
    ///
    /// `create_missing` controls what happens when the directory does not
    /// exist yet: `true` creates it (the browse-first-visit convention),
    /// `false` fails with `NotFound`. Reads never create anything unless
    /// asked to.
    pub fn list_folder(
        &self,
        path: &str,
        create_missing: bool,
    ) -> Result<FolderListing, StorageError> {
        let target = self.resolve(path)?;

        if !target.real_path().is_dir() {
            if !create_missing {
                return Err(StorageError::NotFound(target.display_path()));
            }
            fs::create_dir_all(target.real_path())?;
            info!(
                "Created folder on first visit {} (real: {})",
                target.display_path(),
                target.real_path().display()
            );
        }

        let mut folders = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(target.real_path())? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => folders.push(name),
                Ok(_) => files.push(name),
                Err(e) => {
                    warn!("Skipping unreadable entry {}: {}", name, e);
                }
            }
        }
        folders.sort();
        files.sort();

        info!(
            "Listed folder {} (real: {}) - {} folders, {} files",
            target.display_path(),
            target.real_path().display(),
            folders.len(),
            files.len()
        );

        Ok(FolderListing {
            virtual_path: target.virtual_path().to_string(),
            folders,
            files,
        })
    }

    /// Creates a single new folder under `parent_path`.
    pub fn create_folder(
        &self,
        parent_path: &str,
        name: &str,
    ) -> Result<CreatedFolder, StorageError> {
        validate_folder_name(name).map_err(|_| StorageError::InvalidName(name.to_string()))?;

        let parent = self.resolve(parent_path)?;
        let real_path = parent.real_path().join(name);
        let virtual_path = if parent.is_root() {
            name.to_string()
        } else {
            format!("{}/{}", parent.virtual_path(), name)
        };

        if real_path.is_dir() {
            return Err(StorageError::AlreadyExists(format!("/{}", virtual_path)));
        }

        fs::create_dir_all(&real_path)?;

        info!(
            "Created folder /{} (real: {})",
            virtual_path,
            real_path.display()
        );

        Ok(CreatedFolder {
            virtual_path,
            real_path,
        })
    }

    /// Stores `content` as `filename` inside the folder at `path`.
    ///
    /// The filename is reduced to a sanitized basename and its extension is
    /// checked against the policy for `context` before any write happens.
    /// The destination folder is created if absent. Content streams to a
    /// temporary sibling which is renamed over any existing file, so an
    /// overwrite is last-writer-wins and a failed upload never leaves a
    /// half-written file under the final name.
    pub fn upload_file(
        &self,
        path: &str,
        filename: &str,
        content: &mut impl io::Read,
        context: UploadContext,
    ) -> Result<StoredFile, StorageError> {
        let target = self.resolve(path)?;

        let name = sanitize_filename(filename)
            .map_err(|_| StorageError::InvalidName(filename.to_string()))?;

        let verdict = policy::classify(&name, context);
        if !verdict.is_permitted() {
            info!(
                "Rejected upload of {} into {}: extension not allowed",
                name,
                target.display_path()
            );
            return Err(StorageError::ExtensionNotAllowed(name));
        }

        fs::create_dir_all(target.real_path())?;

        let final_path = target.real_path().join(&name);
        let temp_path = target.real_path().join(format!("{}.part", name));

        let size = {
            let mut temp_file = fs::File::create(&temp_path)?;
            match io::copy(content, &mut temp_file) {
                Ok(size) => size,
                Err(e) => {
                    drop(temp_file);
                    if let Err(cleanup) = fs::remove_file(&temp_path) {
                        warn!(
                            "Failed to remove partial upload {}: {}",
                            temp_path.display(),
                            cleanup
                        );
                    }
                    error!(
                        "Upload of {} into {} failed mid-stream: {}",
                        name,
                        target.display_path(),
                        e
                    );
                    return Err(StorageError::Io(e));
                }
            }
        };

        fs::rename(&temp_path, &final_path)?;

        info!(
            "Stored file {} ({} bytes) in {} (real: {})",
            name,
            size,
            target.display_path(),
            final_path.display()
        );

        Ok(StoredFile {
            name,
            virtual_folder: target.virtual_path().to_string(),
            size,
        })
    }

    /// Opens a stored file for reading.
    ///
    /// Returns the open handle so the caller can stream the content out
    /// without buffering it here.
    pub fn download_file(&self, path: &str, filename: &str) -> Result<fs::File, StorageError> {
        let target = self.resolve(path)?;
        let name = sanitize_filename(filename)
            .map_err(|_| StorageError::InvalidName(filename.to_string()))?;
        let file_path = target.real_path().join(&name);

        if !file_path.is_file() {
            return Err(StorageError::NotFound(format!(
                "{}/{}",
                target.display_path().trim_end_matches('/'),
                name
            )));
        }

        let file = fs::File::open(&file_path)?;

        info!(
            "Opened file {} for download (real: {})",
            name,
            file_path.display()
        );

        Ok(file)
    }

    /// Deletes exactly one stored file.
    pub fn delete_file(&self, path: &str, filename: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        let name = sanitize_filename(filename)
            .map_err(|_| StorageError::InvalidName(filename.to_string()))?;
        let file_path = target.real_path().join(&name);

        if !file_path.is_file() {
            return Err(StorageError::NotFound(format!(
                "{}/{}",
                target.display_path().trim_end_matches('/'),
                name
            )));
        }

        fs::remove_file(&file_path)?;

        info!("Deleted file {} (real: {})", name, file_path.display());

        Ok(())
    }

    /// Recursively deletes a folder and everything under it.
    ///
    /// Refuses the storage root itself: wiping the whole store through the
    /// folder API is always a caller bug.
    pub fn delete_folder(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;

        if target.is_root() {
            return Err(StorageError::Forbidden(
                "refusing to delete the storage root".into(),
            ));
        }

        if !target.real_path().is_dir() {
            return Err(StorageError::NotFound(target.display_path()));
        }

        fs::remove_dir_all(target.real_path())?;

        info!(
            "Deleted folder {} and all contents (real: {})",
            target.display_path(),
            target.real_path().display()
        );

        Ok(())
    }
}
