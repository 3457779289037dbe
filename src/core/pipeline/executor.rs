//! Pipeline execution implementation.

use crate::core::clusterer::{cluster_with_matrix, Clusterer, ClusteringResult};
use crate::core::fingerprint::embedding::resolve_models_dir;
use crate::core::fingerprint::{
    EmbeddingExtractor, EmbeddingFingerprint, FeatureModel, Fingerprint, FingerprintExtractor,
    FingerprintKind, HashAlgorithmKind, HashExtractor, HashFingerprint, Provider,
};
use crate::core::materializer::{MaterializeReport, Materializer};
use crate::core::renamer::{RenameReport, Renamer};
use crate::core::scanner::{CorpusScanner, ImageRef, ScanConfig, WalkDirScanner};
use crate::core::similarity::{
    CosineOracle, HammingOracle, SimilarityMatrix, DEFAULT_COSINE_THRESHOLD,
    DEFAULT_HAMMING_THRESHOLD,
};
use crate::error::GrouperError;
use crate::events::{NullReporter, PipelineEvent, PipelinePhase, PipelineSummary, ProgressReporter};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// How images are fingerprinted and compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintStrategy {
    /// Perceptual hash, Hamming distance
    Hash(HashAlgorithmKind),
    /// Learned embedding, cosine similarity
    Embedding(FeatureModel),
}

impl FingerprintStrategy {
    pub fn kind(&self) -> FingerprintKind {
        match self {
            FingerprintStrategy::Hash(_) => FingerprintKind::Hash,
            FingerprintStrategy::Embedding(_) => FingerprintKind::Embedding,
        }
    }

    /// Threshold used when none is configured
    pub fn default_threshold(&self) -> f64 {
        match self {
            FingerprintStrategy::Hash(_) => f64::from(DEFAULT_HAMMING_THRESHOLD),
            FingerprintStrategy::Embedding(_) => f64::from(DEFAULT_COSINE_THRESHOLD),
        }
    }

    /// Scanner settings with this strategy's accepted extensions
    pub fn scan_config(&self) -> ScanConfig {
        match self {
            FingerprintStrategy::Hash(_) => ScanConfig::for_hashing(),
            FingerprintStrategy::Embedding(_) => ScanConfig::for_embedding(),
        }
    }
}

impl Default for FingerprintStrategy {
    fn default() -> Self {
        FingerprintStrategy::Hash(HashAlgorithmKind::default())
    }
}

/// Result of pipeline execution
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    /// The partition, in discovery order of representatives
    pub clustering: ClusteringResult,
    /// Output tree; `None` when nothing was discovered
    pub materialized: Option<MaterializeReport>,
    /// Renaming outcome; `None` when the stage was skipped
    pub renamed: Option<RenameReport>,
    /// Images discovered in the source tree
    pub total_images: usize,
    /// Images that produced a fingerprint
    pub fingerprinted: usize,
    /// Non-fatal errors from every phase
    pub errors: Vec<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory to read images from
    pub source: PathBuf,
    /// Directory the grouped tree is written to
    pub target: PathBuf,
    pub strategy: FingerprintStrategy,
    /// Similarity threshold; the strategy default when `None`
    pub threshold: Option<f64>,
    /// Where ONNX models live (embedding strategy)
    pub models_dir: Option<PathBuf>,
    /// Inference device (embedding strategy)
    pub provider: Provider,
    /// Credential for the labeling service; renaming is skipped without it
    pub api_key: Option<String>,
    /// Include hidden files and directories (on by default)
    pub include_hidden: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            target: PathBuf::new(),
            strategy: FingerprintStrategy::default(),
            threshold: None,
            models_dir: None,
            provider: Provider::default(),
            api_key: None,
            include_hidden: true,
        }
    }
}

impl PipelineConfig {
    /// The configured threshold, or the strategy default
    pub fn effective_threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.strategy.default_threshold())
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    extractor: Option<Box<dyn FingerprintExtractor>>,
    renamer: Option<Renamer>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            extractor: None,
            renamer: None,
        }
    }

    /// Set the source directory
    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.source = source.into();
        self
    }

    /// Set the target directory
    pub fn target(mut self, target: impl Into<PathBuf>) -> Self {
        self.config.target = target.into();
        self
    }

    /// Set the fingerprint strategy
    pub fn strategy(mut self, strategy: FingerprintStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set the similarity threshold
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = Some(threshold);
        self
    }

    /// Set the models directory
    pub fn models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.models_dir = Some(dir.into());
        self
    }

    /// Set the inference provider
    pub fn provider(mut self, provider: Provider) -> Self {
        self.config.provider = provider;
        self
    }

    /// Set the labeling credential
    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.config.api_key = key;
        self
    }

    /// Include hidden files and directories; pass `false` to skip them
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    /// Use a specific extractor instead of the one the strategy implies.
    /// Its kind must match the strategy.
    pub fn extractor(mut self, extractor: Box<dyn FingerprintExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Use a specific renamer instead of one built from the credential
    pub fn renamer(mut self, renamer: Renamer) -> Self {
        self.renamer = Some(renamer);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            extractor: self.extractor,
            renamer: self.renamer,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Threshold test resolved from the configuration
enum Oracle {
    Hamming(HammingOracle),
    Cosine(CosineOracle),
}

/// The grouping pipeline
pub struct Pipeline {
    config: PipelineConfig,
    extractor: Option<Box<dyn FingerprintExtractor>>,
    renamer: Option<Renamer>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline without progress reporting
    pub fn run(&self) -> Result<PipelineResult, GrouperError> {
        self.run_with_progress(&NullReporter)
    }

    /// Run the pipeline, reporting checkpoints to `reporter`.
    ///
    /// Fails only on invalid configuration, a missing model, or a target
    /// root that cannot be created. Everything else is recorded in
    /// [`PipelineResult::errors`].
    pub fn run_with_progress(
        &self,
        reporter: &dyn ProgressReporter,
    ) -> Result<PipelineResult, GrouperError> {
        let start_time = Instant::now();
        let mut errors = Vec::new();

        reporter.pipeline(PipelineEvent::Started);

        let oracle = self.oracle()?;
        if !self.config.source.is_dir() {
            return Err(GrouperError::Config(format!(
                "Source directory does not exist: {}",
                self.config.source.display()
            )));
        }

        // Phase 1: Scanning
        reporter.pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Scanning,
        });

        let mut scan_config = self.config.strategy.scan_config();
        scan_config.include_hidden = self.config.include_hidden;
        let scan_result = WalkDirScanner::new(scan_config).scan(&self.config.source)?;
        errors.extend(scan_result.errors.iter().map(|e| e.to_string()));

        let images = scan_result.images;
        let total_images = images.len();
        info!(
            "Found {} images in {}",
            total_images,
            self.config.source.display()
        );

        if images.is_empty() {
            let result = PipelineResult {
                clustering: ClusteringResult::default(),
                materialized: None,
                renamed: None,
                total_images: 0,
                fingerprinted: 0,
                errors,
                duration_ms: start_time.elapsed().as_millis() as u64,
            };
            self.complete(&result, reporter);
            return Ok(result);
        }

        let loaded;
        let extractor: &dyn FingerprintExtractor = match &self.extractor {
            Some(extractor) => extractor.as_ref(),
            None => {
                loaded = self.load_extractor()?;
                loaded.as_ref()
            }
        };
        if extractor.kind() != self.config.strategy.kind() {
            return Err(GrouperError::Config(format!(
                "{} extractor cannot serve the {} strategy",
                extractor.kind(),
                self.config.strategy.kind()
            )));
        }

        let materializer = Materializer::new(&self.config.target);
        materializer.prepare_root()?;

        // Phase 2: Extracting
        reporter.pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Extracting,
        });
        let fingerprints = extract_all(&images, extractor, reporter, &mut errors);
        let fingerprinted = fingerprints.len();

        // Phase 3: Comparing and clustering
        let clustering = match &oracle {
            Oracle::Hamming(hamming) => {
                reporter.pipeline(PipelineEvent::PhaseChanged {
                    phase: PipelinePhase::Clustering,
                });
                reporter.report(total_images, total_images, "Grouping images...");
                Clusterer::new(hamming).cluster(&fingerprints)
            }
            Oracle::Cosine(cosine) => {
                let (refs, embeddings): (Vec<ImageRef>, Vec<EmbeddingFingerprint>) = fingerprints
                    .into_iter()
                    .filter_map(|(image, fp)| match fp {
                        Fingerprint::Embedding(e) => Some((image, e)),
                        Fingerprint::Hash(_) => None,
                    })
                    .unzip();

                reporter.pipeline(PipelineEvent::PhaseChanged {
                    phase: PipelinePhase::Comparing,
                });
                reporter.report(total_images, total_images, "Calculating similarity matrix...");
                let matrix = SimilarityMatrix::compute(&embeddings);

                reporter.pipeline(PipelineEvent::PhaseChanged {
                    phase: PipelinePhase::Clustering,
                });
                reporter.report(total_images, total_images, "Grouping images...");
                cluster_with_matrix(&refs, &matrix, cosine)
            }
        };
        info!(
            "Formed {} groups ({} with several members)",
            clustering.groups.len(),
            clustering.multi_member_groups().count()
        );

        // Phase 4: Materializing
        reporter.pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Materializing,
        });
        let materialized = materializer.materialize(&clustering, reporter);
        errors.extend(materialized.errors.iter().cloned());

        // Phase 5: Renaming (optional)
        let credential_renamer;
        let renamer = match &self.renamer {
            Some(renamer) => Some(renamer),
            None => {
                credential_renamer = Renamer::from_credential(self.config.api_key.clone());
                credential_renamer.as_ref()
            }
        };

        let renamed = match renamer {
            Some(renamer) if !materialized.groups.is_empty() => {
                reporter.pipeline(PipelineEvent::PhaseChanged {
                    phase: PipelinePhase::Renaming,
                });
                let report = renamer.rename(&materialized, reporter);
                errors.extend(report.errors.iter().cloned());
                Some(report)
            }
            Some(_) => None,
            None => {
                debug!("No labeling credential, skipping renaming");
                None
            }
        };

        let result = PipelineResult {
            clustering,
            materialized: Some(materialized),
            renamed,
            total_images,
            fingerprinted,
            errors,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };
        self.complete(&result, reporter);
        Ok(result)
    }

    fn oracle(&self) -> Result<Oracle, GrouperError> {
        let threshold = self.config.effective_threshold();
        match self.config.strategy {
            FingerprintStrategy::Hash(_) => {
                if threshold.fract() != 0.0 || threshold < 0.0 {
                    return Err(GrouperError::Config(format!(
                        "Hamming threshold must be a whole number in 0..={}, got {}",
                        HashFingerprint::BIT_WIDTH,
                        threshold
                    )));
                }
                let bits = u32::try_from(threshold as u64).map_err(|_| {
                    GrouperError::Config(format!("Hamming threshold {} is too large", threshold))
                })?;
                Ok(Oracle::Hamming(HammingOracle::new(bits)?))
            }
            FingerprintStrategy::Embedding(_) => {
                Ok(Oracle::Cosine(CosineOracle::new(threshold as f32)?))
            }
        }
    }

    fn load_extractor(&self) -> Result<Box<dyn FingerprintExtractor>, GrouperError> {
        match self.config.strategy {
            FingerprintStrategy::Hash(algorithm) => Ok(Box::new(HashExtractor::new(algorithm))),
            FingerprintStrategy::Embedding(model) => {
                let dir = resolve_models_dir(self.config.models_dir.as_deref());
                let extractor = EmbeddingExtractor::load(model, &dir, self.config.provider)?;
                Ok(Box::new(extractor))
            }
        }
    }

    fn complete(&self, result: &PipelineResult, reporter: &dyn ProgressReporter) {
        let groups = result.clustering.groups.len();
        let multi = result.clustering.multi_member_groups().count();
        let unique = result.clustering.singletons().count();

        let message = if result.total_images == 0 {
            "No images found".to_string()
        } else {
            format!("Complete: {} groups, {} unique images", multi, unique)
        };
        reporter.report(groups, groups, &message);

        reporter.pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                total_images: result.total_images,
                fingerprinted: result.fingerprinted,
                multi_member_groups: multi,
                unique_images: unique,
                duration_ms: result.duration_ms,
            },
        });
    }
}

/// Fingerprint every image in parallel, keeping discovery order.
/// Failures are logged, recorded and dropped.
fn extract_all(
    images: &[ImageRef],
    extractor: &dyn FingerprintExtractor,
    reporter: &dyn ProgressReporter,
    errors: &mut Vec<String>,
) -> Vec<(ImageRef, Fingerprint)> {
    let total = images.len();
    reporter.report(0, total, "Starting feature extraction...");

    let completed = AtomicUsize::new(0);
    let results: Vec<_> = images
        .par_iter()
        .map(|image| {
            let result = extractor.extract(image);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            reporter.report(
                done,
                total,
                &format!("Extracted features for {}", image.file_name()),
            );
            (image, result)
        })
        .collect();

    let mut fingerprints = Vec::with_capacity(results.len());
    for (image, result) in results {
        match result {
            Ok(fp) => fingerprints.push((image.clone(), fp)),
            Err(e) => {
                warn!("Skipping {}: {}", image.path().display(), e);
                errors.push(e.to_string());
            }
        }
    }

    debug!("Fingerprinted {}/{} images", fingerprints.len(), total);
    fingerprints
}
