//! Extension policy
//!
//! Classifies filenames by extension before an upload is accepted. Two
//! fixed, compiled-in tables drive the decision: a deny-set of extensions
//! that are never stored (executables, scripts, macro documents, libraries,
//! system files, scriptable image formats) and an allow-set of raster image
//! formats used for image-only destinations such as wallpapers.
//!
//! The two contexts are deliberately asymmetric: general uploads are
//! default-allow (only the deny-set blocks), image-only uploads are
//! default-deny (only the allow-set passes).

/// Extensions that are never accepted, in any context.
const DENIED_EXTENSIONS: &[&str] = &[
    // Executables
    "exe", "bat", "cmd", "sh", "bin", "msi", "com", "scr",
    // Scripts and code
    "php", "py", "pl", "cgi", "js", "asp", "jsp", "rb",
    // Documents with macros
    "docm", "xlsm", "pptm",
    // Libraries and links
    "dll", "so", "dylib", "lnk",
    // Configuration and system files
    "ini", "conf", "sys", "drv", "inf",
    // Images with embedded code
    "svg", "ico",
];

/// Raster image extensions accepted by image-only destinations.
const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Which policy table applies to an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadContext {
    /// General file uploads: anything not explicitly denied passes.
    General,
    /// Image-only uploads: only the explicit allow-set passes.
    ImageOnly,
}

/// Verdict for a single filename under a given context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionVerdict {
    /// Extension is on the deny-set, or outside the allow-set in an
    /// image-only context.
    Denied,
    /// Extension is on the explicit allow-set.
    Allowed,
    /// Extension is on neither table; permitted by omission under
    /// [`UploadContext::General`].
    Unrestricted,
}

impl ExtensionVerdict {
    /// Whether an upload with this verdict may proceed.
    ///
    /// `classify` already folds the context in, so everything short of
    /// `Denied` is storable.
    pub fn is_permitted(self) -> bool {
        !matches!(self, ExtensionVerdict::Denied)
    }
}

/// Extracts the extension as the substring after the last `.`, lowercased.
///
/// `None` when there is no dot or nothing follows it.
fn extension_of(filename: &str) -> Option<String> {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

/// Classifies a filename for the given upload context.
///
/// Pure function over the static tables; `Denied` always wins. A filename
/// without an extension is `Unrestricted` for general uploads and `Denied`
/// for image-only uploads.
pub fn classify(filename: &str, context: UploadContext) -> ExtensionVerdict {
    let extension = extension_of(filename);

    match context {
        UploadContext::General => match extension {
            Some(ext) if DENIED_EXTENSIONS.contains(&ext.as_str()) => ExtensionVerdict::Denied,
            Some(ext) if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) => {
                ExtensionVerdict::Allowed
            }
            _ => ExtensionVerdict::Unrestricted,
        },
        UploadContext::ImageOnly => match extension {
            Some(ext) if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) => {
                ExtensionVerdict::Allowed
            }
            _ => ExtensionVerdict::Denied,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExtensionVerdict::*;
    use UploadContext::*;

    #[test]
    fn test_denied_extensions_blocked_in_both_contexts() {
        for name in ["setup.exe", "run.sh", "macro.docm", "logo.svg", "x.dll"] {
            assert_eq!(classify(name, General), Denied, "{}", name);
            assert_eq!(classify(name, ImageOnly), Denied, "{}", name);
        }
    }

    #[test]
    fn test_deny_check_is_case_insensitive() {
        assert_eq!(classify("TROJAN.EXE", General), Denied);
        assert_eq!(classify("photo.PNG", ImageOnly), Allowed);
    }

    #[test]
    fn test_images_allowed_in_both_contexts() {
        for name in ["photo.png", "pic.jpg", "scan.jpeg", "anim.gif"] {
            assert_eq!(classify(name, General), Allowed, "{}", name);
            assert_eq!(classify(name, ImageOnly), Allowed, "{}", name);
        }
    }

    #[test]
    fn test_contexts_disagree_on_plain_documents() {
        // Permitted by omission in general uploads, refused for image-only
        assert_eq!(classify("notes.txt", General), Unrestricted);
        assert!(classify("notes.txt", General).is_permitted());
        assert_eq!(classify("notes.txt", ImageOnly), Denied);

        assert_eq!(classify("archive.tar.gz", General), Unrestricted);
        assert_eq!(classify("archive.tar.gz", ImageOnly), Denied);
    }

    #[test]
    fn test_no_extension_splits_by_context() {
        assert_eq!(classify("README", General), Unrestricted);
        assert!(classify("README", General).is_permitted());
        assert_eq!(classify("README", ImageOnly), Denied);
        // A trailing dot is not an extension
        assert_eq!(classify("weird.", General), Unrestricted);
    }

    #[test]
    fn test_only_last_extension_counts() {
        // The final segment decides, not an inner one
        assert_eq!(classify("report.exe.txt", General), Unrestricted);
        assert_eq!(classify("photo.txt.png", ImageOnly), Allowed);
    }
}
