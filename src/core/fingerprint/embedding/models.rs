//! Catalog of pretrained feature models.
//!
//! Every entry is an ImageNet classifier exported to ONNX with its
//! classification head removed, so the output is the penultimate
//! representation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the models directory
pub const MODELS_DIR_ENV: &str = "IMAGE_GROUPER_MODELS_DIR";

/// Name of the image input tensor in every exported model
pub const MODEL_INPUT_NAME: &str = "input";

/// Square input resolution shared by the whole catalog
pub const INPUT_SIZE: u32 = 224;

/// ImageNet channel means (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A supported feature model. Fixes the embedding dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeatureModel {
    /// ResNet-50, fast
    #[default]
    ResNet50,
    /// ResNet-152, slower and more accurate
    ResNet152,
    /// ViT-B/16, good on textures and patterns
    VitB16,
    /// ViT-L/16, largest and slowest
    VitL16,
}

impl FeatureModel {
    /// Every model in the catalog
    pub const ALL: [FeatureModel; 4] = [
        FeatureModel::ResNet50,
        FeatureModel::ResNet152,
        FeatureModel::VitB16,
        FeatureModel::VitL16,
    ];

    /// Embedding dimensionality D
    pub fn dimension(&self) -> usize {
        match self {
            FeatureModel::ResNet50 | FeatureModel::ResNet152 => 2048,
            FeatureModel::VitB16 => 768,
            FeatureModel::VitL16 => 1024,
        }
    }

    /// Length the shorter image side is resized to before the centre
    /// crop to [`INPUT_SIZE`], matching each model's evaluation transform
    pub fn resize_shorter(&self) -> u32 {
        match self {
            FeatureModel::ResNet50 | FeatureModel::ResNet152 => 232,
            FeatureModel::VitB16 => 256,
            FeatureModel::VitL16 => 242,
        }
    }

    /// Catalog identifier, also the ONNX file stem
    pub fn id(&self) -> &'static str {
        match self {
            FeatureModel::ResNet50 => "resnet50",
            FeatureModel::ResNet152 => "resnet152",
            FeatureModel::VitB16 => "vit_b_16",
            FeatureModel::VitL16 => "vit_l_16",
        }
    }

    /// Expected file name inside the models directory
    pub fn file_name(&self) -> String {
        format!("{}.onnx", self.id())
    }

    /// Short description for listings
    pub fn description(&self) -> &'static str {
        match self {
            FeatureModel::ResNet50 => "ResNet-50 (fast)",
            FeatureModel::ResNet152 => "ResNet-152 (accurate)",
            FeatureModel::VitB16 => "ViT-B/16 (best for patterns)",
            FeatureModel::VitL16 => "ViT-L/16 (largest)",
        }
    }

    /// Look a model up by catalog identifier. Dashes and underscores are
    /// interchangeable and case is ignored.
    pub fn from_id(id: &str) -> Option<Self> {
        let wanted = id.to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|m| m.id() == wanted)
    }

    /// Path to this model's ONNX file under `models_dir`
    pub fn path_in(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(self.file_name())
    }
}

impl std::fmt::Display for FeatureModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Resolve the models directory.
///
/// Order: explicit path, `IMAGE_GROUPER_MODELS_DIR`, the platform data
/// directory (`<data_dir>/image-grouper/models`), then `./models`.
pub fn resolve_models_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }

    if let Ok(env_path) = std::env::var(MODELS_DIR_ENV) {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }

    dirs::data_dir()
        .map(|d| d.join("image-grouper").join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_match_architectures() {
        assert_eq!(FeatureModel::ResNet50.dimension(), 2048);
        assert_eq!(FeatureModel::ResNet152.dimension(), 2048);
        assert_eq!(FeatureModel::VitB16.dimension(), 768);
        assert_eq!(FeatureModel::VitL16.dimension(), 1024);
    }

    #[test]
    fn resize_lengths_cover_the_crop() {
        assert_eq!(FeatureModel::ResNet50.resize_shorter(), 232);
        assert_eq!(FeatureModel::ResNet152.resize_shorter(), 232);
        assert_eq!(FeatureModel::VitB16.resize_shorter(), 256);
        assert_eq!(FeatureModel::VitL16.resize_shorter(), 242);
        for model in FeatureModel::ALL {
            assert!(model.resize_shorter() >= INPUT_SIZE);
        }
    }

    #[test]
    fn ids_round_trip() {
        for model in FeatureModel::ALL {
            assert_eq!(FeatureModel::from_id(model.id()), Some(model));
        }
        assert_eq!(FeatureModel::from_id("VIT-B-16"), Some(FeatureModel::VitB16));
        assert_eq!(FeatureModel::from_id("alexnet"), None);
    }

    #[test]
    fn explicit_models_dir_wins() {
        let dir = resolve_models_dir(Some(Path::new("/opt/models")));
        assert_eq!(dir, PathBuf::from("/opt/models"));
        assert_eq!(
            FeatureModel::VitL16.path_in(&dir),
            PathBuf::from("/opt/models/vit_l_16.onnx")
        );
    }

    #[test]
    fn default_model_is_resnet50() {
        assert_eq!(FeatureModel::default(), FeatureModel::ResNet50);
        assert_eq!(FeatureModel::default().file_name(), "resnet50.onnx");
    }
}
