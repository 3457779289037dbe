//! # Core Module
//!
//! The UI-agnostic grouping engine.
//!
//! ## Modules
//! - `scanner` - Discovers images in directories
//! - `fingerprint` - Perceptual hashes and neural embeddings
//! - `similarity` - Decides whether two fingerprints belong together
//! - `clusterer` - Greedy representative-anchored grouping
//! - `materializer` - Copies groups into an output tree
//! - `renamer` - Optional labeling of group directories
//! - `pipeline` - Orchestrates the full workflow

pub mod clusterer;
pub mod fingerprint;
pub mod materializer;
pub mod pipeline;
pub mod renamer;
pub mod scanner;
pub mod similarity;

// Re-export commonly used types
pub use clusterer::{ClusteringResult, Group};
pub use fingerprint::{Fingerprint, FingerprintExtractor, FingerprintKind};
pub use materializer::{MaterializeReport, MaterializedGroup};
pub use scanner::ImageRef;
pub use similarity::{CosineOracle, HammingOracle, SimilarityOracle};
