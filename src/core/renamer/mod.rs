//! # Renamer Module
//!
//! Optionally relabels materialized group directories with a short name
//! proposed by an external labeling service.
//!
//! The stage works from the [`MaterializeReport`], so it never has to guess
//! which directory belongs to which group. Every group is handled on its
//! own: a failed request or rename leaves that directory as it was and the
//! stage moves on. Without a credential the stage does not run at all.

mod gemini;

pub use gemini::{GeminiLabeler, DEFAULT_MODEL};

use crate::core::materializer::{next_free_dir, MaterializeReport};
use crate::error::RenameError;
use crate::events::ProgressReporter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable holding the labeling service credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Something that can name an image
pub trait LabelProvider: Send + Sync {
    /// Propose a short label for the image at `image`
    fn propose_label(&self, image: &Path) -> Result<String, RenameError>;
}

/// Outcome of the renaming stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenameReport {
    /// `(old, new)` directory pairs
    pub renamed: Vec<(PathBuf, PathBuf)>,
    /// One entry per group left with its original name
    pub errors: Vec<String>,
}

/// Renames group directories using a [`LabelProvider`]
pub struct Renamer {
    provider: Box<dyn LabelProvider>,
}

impl Renamer {
    pub fn new(provider: Box<dyn LabelProvider>) -> Self {
        Self { provider }
    }

    /// Gemini-backed renamer, or `None` when no usable credential is given.
    pub fn from_credential(api_key: Option<String>) -> Option<Self> {
        let key = api_key.filter(|k| !k.trim().is_empty())?;
        match GeminiLabeler::new(key.trim()) {
            Ok(labeler) => Some(Self::new(Box::new(labeler))),
            Err(e) => {
                warn!("Labeling client unavailable, skipping renaming: {}", e);
                None
            }
        }
    }

    /// Relabel every materialized group directory.
    pub fn rename(
        &self,
        materialized: &MaterializeReport,
        reporter: &dyn ProgressReporter,
    ) -> RenameReport {
        let mut report = RenameReport::default();
        let total = materialized.groups.len();
        info!("Labeling {} group directories", total);

        for (i, group) in materialized.groups.iter().enumerate() {
            reporter.report(
                i,
                total,
                &format!("Labeling group {}...", group.representative.name()),
            );

            let sample = group
                .files
                .first()
                .map(PathBuf::as_path)
                .unwrap_or_else(|| group.representative.path());

            match self.rename_one(&group.directory, sample) {
                Ok(new_dir) => {
                    debug!("Renamed {} -> {}", group.directory.display(), new_dir.display());
                    report.renamed.push((group.directory.clone(), new_dir));
                }
                Err(e) => {
                    warn!("Keeping {}: {}", group.directory.display(), e);
                    report
                        .errors
                        .push(format!("{}: {}", group.directory.display(), e));
                }
            }
        }

        report
    }

    fn rename_one(&self, directory: &Path, sample: &Path) -> Result<PathBuf, RenameError> {
        let label = sanitize_label(&self.provider.propose_label(sample)?);
        if label.is_empty() {
            return Err(RenameError::EmptyLabel);
        }

        let parent = directory.parent().unwrap_or_else(|| Path::new("."));
        let target = next_free_dir(&parent.join(&label), |p| p.exists());

        fs::rename(directory, &target).map_err(|source| RenameError::Filesystem {
            from: directory.to_path_buf(),
            to: target.clone(),
            source,
        })?;

        Ok(target)
    }
}

/// Keep ASCII alphanumerics and `-_.() `, then turn spaces into hyphens.
///
/// Surrounding whitespace is dropped first. A label made only of dots
/// would name the current or parent directory and is rejected as empty.
pub fn sanitize_label(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '-' | '_' | '.' | '(' | ')' | ' '))
        .collect::<String>()
        .replace(' ', "-");

    if cleaned.chars().all(|c| c == '.') {
        return String::new();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::materializer::MaterializedGroup;
    use crate::core::scanner::ImageRef;
    use crate::events::NullReporter;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Returns canned labels keyed by image file name
    struct StubLabels {
        labels: HashMap<String, Result<String, String>>,
    }

    impl StubLabels {
        fn new(entries: &[(&str, Result<&str, &str>)]) -> Self {
            Self {
                labels: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.map(str::to_string).map_err(str::to_string)))
                    .collect(),
            }
        }
    }

    impl LabelProvider for StubLabels {
        fn propose_label(&self, image: &Path) -> Result<String, RenameError> {
            let name = image.file_name().unwrap().to_string_lossy().into_owned();
            match self.labels.get(&name) {
                Some(Ok(label)) => Ok(label.clone()),
                Some(Err(message)) => Err(RenameError::Request(message.clone())),
                None => Err(RenameError::EmptyLabel),
            }
        }
    }

    fn materialized_group(root: &Path, index: usize, dir: &str, file: &str) -> MaterializedGroup {
        let directory = root.join(dir);
        fs::create_dir_all(&directory).unwrap();
        let copy = directory.join(file);
        fs::write(&copy, b"img").unwrap();
        MaterializedGroup {
            index,
            representative: ImageRef::new(format!("/src/{}", file)),
            directory,
            files: vec![copy],
        }
    }

    #[test]
    fn sanitize_keeps_allowed_characters() {
        assert_eq!(sanitize_label("Red Floral Dress"), "Red-Floral-Dress");
        assert_eq!(sanitize_label("  blue-jeans\n"), "blue-jeans");
        assert_eq!(sanitize_label("çanta (deri)!"), "anta-(deri)");
        assert_eq!(sanitize_label("v1.2_final"), "v1.2_final");
        assert_eq!(sanitize_label("a/b\\c"), "abc");
    }

    #[test]
    fn sanitize_rejects_dot_only_and_empty_labels() {
        assert_eq!(sanitize_label(".."), "");
        assert_eq!(sanitize_label("!!!"), "");
        assert_eq!(sanitize_label(""), "");
    }

    #[test]
    fn missing_or_blank_credential_disables_renaming() {
        assert!(Renamer::from_credential(None).is_none());
        assert!(Renamer::from_credential(Some("   ".to_string())).is_none());
        assert!(Renamer::from_credential(Some("key".to_string())).is_some());
    }

    #[test]
    fn renames_directories_to_sanitized_labels() {
        let root = TempDir::new().unwrap();
        let materialized = MaterializeReport {
            groups: vec![materialized_group(root.path(), 0, "Group_a", "a.jpg")],
            ..Default::default()
        };
        let renamer = Renamer::new(Box::new(StubLabels::new(&[("a.jpg", Ok("Red Shoes"))])));

        let report = renamer.rename(&materialized, &NullReporter);

        assert!(report.errors.is_empty());
        assert_eq!(
            report.renamed,
            vec![(root.path().join("Group_a"), root.path().join("Red-Shoes"))]
        );
        assert!(root.path().join("Red-Shoes/a.jpg").exists());
        assert!(!root.path().join("Group_a").exists());
    }

    #[test]
    fn label_collisions_get_suffixes() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("shoes")).unwrap();
        let materialized = MaterializeReport {
            groups: vec![
                materialized_group(root.path(), 0, "Group_a", "a.jpg"),
                materialized_group(root.path(), 2, "Group_b", "b.jpg"),
            ],
            ..Default::default()
        };
        let renamer = Renamer::new(Box::new(StubLabels::new(&[
            ("a.jpg", Ok("shoes")),
            ("b.jpg", Ok("shoes")),
        ])));

        let report = renamer.rename(&materialized, &NullReporter);

        assert_eq!(report.renamed[0].1, root.path().join("shoes_1"));
        assert_eq!(report.renamed[1].1, root.path().join("shoes_2"));
    }

    #[test]
    fn failed_group_keeps_its_name_and_others_continue() {
        let root = TempDir::new().unwrap();
        let materialized = MaterializeReport {
            groups: vec![
                materialized_group(root.path(), 0, "Group_a", "a.jpg"),
                materialized_group(root.path(), 1, "Group_b", "b.jpg"),
                materialized_group(root.path(), 3, "Group_c", "c.jpg"),
            ],
            ..Default::default()
        };
        let renamer = Renamer::new(Box::new(StubLabels::new(&[
            ("a.jpg", Err("timeout")),
            ("b.jpg", Ok("???")),
            ("c.jpg", Ok("lamp")),
        ])));

        let report = renamer.rename(&materialized, &NullReporter);

        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.renamed.len(), 1);
        assert!(root.path().join("Group_a").is_dir());
        assert!(root.path().join("Group_b").is_dir());
        assert!(root.path().join("lamp").is_dir());
    }
}
