//! # Error Module
//!
//! Error types for the image grouper.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Fatal vs. skippable** - only the target root is fatal; everything
//!   else is collected by the pipeline and the run continues

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum GrouperError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Materialization error: {0}")]
    Materialize(#[from] MaterializeError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while discovering the corpus
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while fingerprinting a single image.
///
/// Always non-fatal: the image is dropped from the run.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to open image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Feature extraction failed for {path}: {reason}")]
    Inference { path: PathBuf, reason: String },

    #[error("Embedding has {actual} dimensions, model produces {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl ExtractError {
    /// Fill in `path` on an error raised below the file level (resizing,
    /// preprocessing) where the path was not known yet.
    pub fn at(self, path: &Path) -> Self {
        let known = |p: PathBuf| {
            if p.as_os_str().is_empty() {
                path.to_path_buf()
            } else {
                p
            }
        };
        match self {
            ExtractError::Decode { path: p, reason } => ExtractError::Decode {
                path: known(p),
                reason,
            },
            ExtractError::EmptyImage { path: p } => ExtractError::EmptyImage { path: known(p) },
            ExtractError::Inference { path: p, reason } => ExtractError::Inference {
                path: known(p),
                reason,
            },
            other => other,
        }
    }
}

/// Errors loading a feature model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model {model} not found at {path}. Download the ONNX export or pass --models-dir")]
    NotFound { model: String, path: PathBuf },

    #[error("Failed to load model {path}: {reason}")]
    Load { path: PathBuf, reason: String },
}

/// Errors while writing the grouped directory tree
#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Cannot create target directory {path}: {source}")]
    TargetRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the external renaming service
#[derive(Error, Debug)]
pub enum RenameError {
    #[error("Labeling request failed: {0}")]
    Request(String),

    #[error("Labeling service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Labeling service returned no usable label")]
    EmptyLabel,

    #[error("Failed to read representative image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rename {from} to {to}: {source}")]
    Filesystem {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for RenameError {
    fn from(err: reqwest::Error) -> Self {
        RenameError::Request(err.to_string())
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, GrouperError>;
