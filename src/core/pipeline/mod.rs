//! # Pipeline Module
//!
//! Orchestrates the full grouping workflow.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Discover images in the source directory, in stable order
//! 2. **Extract** - Fingerprint every image (skipping unreadable ones)
//! 3. **Compare** - Precompute the similarity matrix (embedding strategy)
//! 4. **Cluster** - Representative-anchored greedy grouping
//! 5. **Materialize** - Copy groups into `Group_*` / `Unique` directories
//! 6. **Rename** - Optionally relabel group directories
//!
//! ## Parallelism
//! Uses rayon for extraction, the similarity matrix and file copies.
//! Clustering is sequential because its result depends on visit order.

mod diagnostics;
mod executor;

pub use diagnostics::{hash_distances, DistanceReport};
pub use executor::{
    FingerprintStrategy, Pipeline, PipelineBuilder, PipelineConfig, PipelineResult,
};
