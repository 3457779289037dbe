//! Learned-embedding fingerprints.
//!
//! A pretrained ImageNet network (classification head removed) maps each
//! image to a D-dimensional vector. Vectors are compared with cosine
//! similarity; higher means more similar.
//!
//! Inference runs through ONNX Runtime. The session needs exclusive access
//! per run, so parallel extraction serializes on a mutex around it while
//! decoding and preprocessing still happen in parallel.

mod models;
mod runtime;

pub use models::{
    resolve_models_dir, FeatureModel, IMAGENET_MEAN, IMAGENET_STD, INPUT_SIZE, MODELS_DIR_ENV,
    MODEL_INPUT_NAME,
};
pub use runtime::{create_session, Provider};

use super::decode::decode;
use super::resize::resize_and_center_crop;
use super::{Fingerprint, FingerprintExtractor, FingerprintKind};
use crate::core::scanner::ImageRef;
use crate::error::{ExtractError, ModelError};
use image::DynamicImage;
use ort::session::Session;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// A D-dimensional feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingFingerprint {
    values: Vec<f32>,
}

impl EmbeddingFingerprint {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Dimensionality D
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Cosine similarity in `[-1, 1]`: dot product over the product of norms.
    ///
    /// A zero vector has no direction and is similar to nothing (0.0).
    /// Vectors of different dimensionality are never comparable and also
    /// yield 0.0.
    pub fn cosine_similarity(&self, other: &Self) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }

        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;
        for (a, b) in self.values.iter().zip(&other.values) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom == 0.0 {
            return 0.0;
        }
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Fingerprint extractor for the embedding strategy
pub struct EmbeddingExtractor {
    model: FeatureModel,
    session: Mutex<Session>,
}

impl EmbeddingExtractor {
    /// Load `model` from `models_dir`.
    ///
    /// Fails with [`ModelError::NotFound`] when the ONNX file is missing, so
    /// callers can abort before touching the target directory.
    pub fn load(
        model: FeatureModel,
        models_dir: &Path,
        provider: Provider,
    ) -> Result<Self, ModelError> {
        let path = model.path_in(models_dir);
        if !path.is_file() {
            return Err(ModelError::NotFound {
                model: model.id().to_string(),
                path,
            });
        }

        debug!("Loading feature model {} from {}", model, path.display());
        let session = create_session(&path, provider)?;

        Ok(Self {
            model,
            session: Mutex::new(session),
        })
    }

    pub fn model(&self) -> FeatureModel {
        self.model
    }

    /// Run the network on a decoded image
    pub fn embed(
        &self,
        path: &Path,
        image: &DynamicImage,
    ) -> Result<EmbeddingFingerprint, ExtractError> {
        let input = preprocess(image, self.model).map_err(|e| e.at(path))?;
        let inference_error = |reason: String| ExtractError::Inference {
            path: path.to_path_buf(),
            reason,
        };

        let tensor = ort::value::Value::from_array(input)
            .map_err(|e| inference_error(e.to_string()))?;

        let values = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| inference_error("session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![MODEL_INPUT_NAME => tensor])
                .map_err(|e| inference_error(e.to_string()))?;

            // ResNets emit (1, D, 1, 1) and ViTs (1, D); both flatten to D
            let (_, output) = outputs
                .iter()
                .next()
                .ok_or_else(|| inference_error("model produced no outputs".to_string()))?;
            let (_, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| inference_error(e.to_string()))?;
            data.to_vec()
        };

        if values.len() != self.model.dimension() {
            return Err(ExtractError::DimensionMismatch {
                expected: self.model.dimension(),
                actual: values.len(),
            });
        }

        Ok(EmbeddingFingerprint::new(values))
    }
}

impl FingerprintExtractor for EmbeddingExtractor {
    fn extract(&self, image: &ImageRef) -> Result<Fingerprint, ExtractError> {
        let decoded = decode(image.path())?;
        self.embed(image.path(), &decoded).map(Fingerprint::Embedding)
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Embedding
    }
}

/// Resize the shorter side to the model's evaluation length, centre-crop
/// to the model input, scale to `[0, 1]`, normalize with ImageNet
/// statistics and lay out as NCHW with a batch of one.
pub fn preprocess(
    image: &DynamicImage,
    model: FeatureModel,
) -> Result<(Vec<usize>, Vec<f32>), ExtractError> {
    let size = INPUT_SIZE as usize;
    let rgb = resize_and_center_crop(image, model.resize_shorter(), INPUT_SIZE)?;

    let plane = size * size;
    let mut data = vec![0.0f32; 3 * plane];
    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            let value = f32::from(pixel[c]) / 255.0;
            data[c * plane + i] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    Ok((vec![1, 3, size, size], data))
}
