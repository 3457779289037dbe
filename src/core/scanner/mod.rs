//! # Scanner Module
//!
//! Discovers the image corpus under a source directory.
//!
//! ## Accepted Formats
//! - Hash strategy: JPEG (.jpg, .jpeg), PNG (.png)
//! - Embedding strategy: additionally BMP (.bmp), TIFF (.tiff)
//!
//! Matching is case-insensitive. Discovery order is the walk order with
//! entries sorted by file name, so the same tree always yields the same
//! sequence. The clusterer depends on that order.
//!
//! ## Example
//! ```rust,ignore
//! use image_grouper::core::scanner::{CorpusScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::for_hashing());
//! let result = scanner.scan(Path::new("/Users/photos"))?;
//! ```

mod filter;
mod walker;

pub use filter::ImageFilter;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions accepted by the hash strategy
pub const HASH_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Extensions accepted by the embedding strategy
pub const EMBEDDING_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff"];

/// One discovered input image.
///
/// Identity is the path; `name` is derived from it (the file stem) and
/// is what group directories are named after.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    path: PathBuf,
    name: String,
}

impl ImageRef {
    /// Wrap a path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// Path to the image on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem, e.g. `IMG_0042` for `/photos/IMG_0042.jpg`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full base name including the extension
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanResult {
    /// Images in discovery order
    pub images: Vec<ImageRef>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for corpus scanners
///
/// Implement this trait to create custom scanners (e.g., for testing).
pub trait CorpusScanner: Send + Sync {
    /// Walk `root` and return every accepted image in stable order
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError>;
}
