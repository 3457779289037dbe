//! Directory walking implementation using walkdir.

use super::filter::{is_hidden, ImageFilter};
use super::{CorpusScanner, ImageRef, ScanResult, EMBEDDING_EXTENSIONS, HASH_EXTENSIONS};
use crate::error::ScanError;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Accepted extensions, lowercase without the dot
    pub extensions: Vec<String>,
}

impl ScanConfig {
    /// Accept the hash strategy's formats
    pub fn for_hashing() -> Self {
        Self::with_extensions(HASH_EXTENSIONS)
    }

    /// Accept the embedding strategy's formats
    pub fn for_embedding() -> Self {
        Self::with_extensions(EMBEDDING_EXTENSIONS)
    }

    fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: true,
            max_depth: None,
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::for_hashing()
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let extensions: Vec<&str> = config.extensions.iter().map(String::as_str).collect();
        let filter = ImageFilter::new(&extensions).with_hidden(config.include_hidden);
        Self { config, filter }
    }
}

impl CorpusScanner for WalkDirScanner {
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut images = Vec::new();
        let mut errors = Vec::new();

        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let include_hidden = self.filter.includes_hidden();
        let entries = walker.into_iter().filter_entry(|entry| {
            // Prune hidden directories, but never the root itself
            include_hidden
                || entry.depth() == 0
                || !entry.file_type().is_dir()
                || !is_hidden(entry.path())
        });

        for entry_result in entries {
            match entry_result {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        continue;
                    }
                    let path = entry.path();
                    if self.filter.should_include(path) {
                        images.push(ImageRef::new(path));
                    }
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();

                    let error = if e.io_error().map(|e| e.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path }
                    } else {
                        ScanError::ReadDirectory {
                            path,
                            source: std::io::Error::other(e.to_string()),
                        }
                    };

                    warn!("{}", error);
                    errors.push(error);
                }
            }
        }

        debug!(root = %root.display(), found = images.len(), "scan complete");

        Ok(ScanResult { images, errors })
    }
}
