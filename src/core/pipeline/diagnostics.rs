//! Hash every image in a directory without grouping anything.
//!
//! Used to pick a Hamming threshold: look at the distances between images
//! that should and should not end up together.

use crate::core::fingerprint::{HashAlgorithmKind, HashExtractor, HashFingerprint};
use crate::core::scanner::{CorpusScanner, ImageRef, ScanConfig, WalkDirScanner};
use crate::core::similarity::{pairwise_distances, PairDistance};
use crate::error::GrouperError;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// Hashes and pairwise distances for one directory
#[derive(Debug, Serialize)]
pub struct DistanceReport {
    pub algorithm: HashAlgorithmKind,
    pub hashes: Vec<(ImageRef, HashFingerprint)>,
    pub pairs: Vec<PairDistance>,
    pub errors: Vec<String>,
}

/// Hash `dir` and compute every pairwise distance.
pub fn hash_distances(
    dir: &Path,
    algorithm: HashAlgorithmKind,
    include_hidden: bool,
) -> Result<DistanceReport, GrouperError> {
    let config = ScanConfig {
        include_hidden,
        ..ScanConfig::for_hashing()
    };
    let scan = WalkDirScanner::new(config).scan(dir)?;
    let mut errors: Vec<String> = scan.errors.iter().map(|e| e.to_string()).collect();

    let extractor = HashExtractor::new(algorithm);
    let results: Vec<_> = scan
        .images
        .par_iter()
        .map(|image| (image, extractor.hash_file(image)))
        .collect();

    let mut hashes = Vec::with_capacity(results.len());
    for (image, result) in results {
        match result {
            Ok(hash) => hashes.push((image.clone(), hash)),
            Err(e) => {
                warn!("Skipping {}: {}", image.path().display(), e);
                errors.push(e.to_string());
            }
        }
    }

    let pairs = pairwise_distances(&hashes);
    Ok(DistanceReport {
        algorithm,
        hashes,
        pairs,
        errors,
    })
}
