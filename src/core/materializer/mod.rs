//! # Materializer Module
//!
//! Writes a clustering result to disk as a directory tree:
//!
//! ```text
//! <target>/Group_<representative>[_<n>]/<file>
//! <target>/Unique/<file>
//! ```
//!
//! Originals are never touched; every member is copied. Directory names are
//! claimed one group at a time so two groups can never race for the same
//! suffix, then the group's files are copied in parallel. A failed copy is
//! logged and recorded, and the run carries on.

mod naming;

pub use naming::{
    group_dir_name, next_free_dir, plan_file_destination, GROUP_PREFIX, MAX_GROUP_NAME_CHARS,
    UNIQUE_DIR,
};

use crate::core::clusterer::{ClusteringResult, Group};
use crate::core::scanner::ImageRef;
use crate::error::MaterializeError;
use crate::events::ProgressReporter;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A multi-member group bound to its output directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedGroup {
    /// Position of the group in the clustering result
    pub index: usize,
    pub representative: ImageRef,
    pub directory: PathBuf,
    /// Files successfully copied into `directory`
    pub files: Vec<PathBuf>,
}

/// What materialization produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializeReport {
    /// Multi-member groups in clustering order
    pub groups: Vec<MaterializedGroup>,
    /// The `Unique` directory, if any singleton was written
    pub unique_dir: Option<PathBuf>,
    /// Files copied into `Unique`
    pub unique_files: Vec<PathBuf>,
    pub files_copied: usize,
    /// Non-fatal failures (directory creation, copies)
    pub errors: Vec<String>,
}

/// A single planned copy
struct PlannedCopy {
    from: PathBuf,
    to: PathBuf,
}

/// Materializes clustering results under a target root
pub struct Materializer {
    target_root: PathBuf,
}

impl Materializer {
    pub fn new(target_root: impl Into<PathBuf>) -> Self {
        Self {
            target_root: target_root.into(),
        }
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// Create the target root if absent.
    ///
    /// This is the only fatal failure of a run and must happen before any
    /// grouping work.
    pub fn prepare_root(&self) -> Result<(), MaterializeError> {
        fs::create_dir_all(&self.target_root).map_err(|source| MaterializeError::TargetRoot {
            path: self.target_root.clone(),
            source,
        })
    }

    /// Write every group. Reports progress once per group.
    pub fn materialize(
        &self,
        clustering: &ClusteringResult,
        reporter: &dyn ProgressReporter,
    ) -> MaterializeReport {
        let mut report = MaterializeReport::default();
        let total = clustering.groups.len();
        let mut unique_planned: HashSet<String> = HashSet::new();

        for (index, group) in clustering.groups.iter().enumerate() {
            reporter.report(
                index,
                total,
                &format!("Copying group {}...", group.representative().name()),
            );

            if group.is_singleton() {
                self.write_singleton(group.representative(), &mut unique_planned, &mut report);
            } else {
                self.write_group(index, group, &mut report);
            }
        }

        debug!(
            "Materialized {} groups, {} files copied, {} errors",
            report.groups.len(),
            report.files_copied,
            report.errors.len()
        );

        report
    }

    fn write_group(&self, index: usize, group: &Group, report: &mut MaterializeReport) {
        let base = self
            .target_root
            .join(group_dir_name(group.representative().name()));
        let directory = next_free_dir(&base, |p| p.exists());

        if let Err(source) = fs::create_dir(&directory) {
            let error = MaterializeError::CreateDirectory {
                path: directory,
                source,
            };
            warn!("{}", error);
            report.errors.push(error.to_string());
            return;
        }

        let mut planned = HashSet::new();
        let copies: Vec<PlannedCopy> = group
            .members()
            .iter()
            .map(|image| PlannedCopy {
                from: image.path().to_path_buf(),
                to: plan_file_destination(&directory, &image.file_name(), &mut planned),
            })
            .collect();

        let files = execute(copies, &mut report.errors);
        report.files_copied += files.len();
        report.groups.push(MaterializedGroup {
            index,
            representative: group.representative().clone(),
            directory,
            files,
        });
    }

    fn write_singleton(
        &self,
        image: &ImageRef,
        planned: &mut HashSet<String>,
        report: &mut MaterializeReport,
    ) {
        let unique_dir = match &report.unique_dir {
            Some(dir) => dir.clone(),
            None => {
                let dir = self.target_root.join(UNIQUE_DIR);
                if let Err(source) = fs::create_dir_all(&dir) {
                    let error = MaterializeError::CreateDirectory { path: dir, source };
                    warn!("{}", error);
                    report.errors.push(error.to_string());
                    return;
                }
                report.unique_dir = Some(dir.clone());
                dir
            }
        };

        let copy = PlannedCopy {
            from: image.path().to_path_buf(),
            to: plan_file_destination(&unique_dir, &image.file_name(), planned),
        };

        let files = execute(vec![copy], &mut report.errors);
        report.files_copied += files.len();
        report.unique_files.extend(files);
    }
}

/// Run planned copies in parallel; returns the destinations that succeeded
/// in plan order and appends failures to `errors`.
fn execute(copies: Vec<PlannedCopy>, errors: &mut Vec<String>) -> Vec<PathBuf> {
    let results: Vec<Result<PathBuf, MaterializeError>> = copies
        .into_par_iter()
        .map(|copy| match fs::copy(&copy.from, &copy.to) {
            Ok(_) => Ok(copy.to),
            Err(source) => Err(MaterializeError::Copy {
                from: copy.from,
                to: copy.to,
                source,
            }),
        })
        .collect();

    let mut copied = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(path) => copied.push(path),
            Err(e) => {
                warn!("{}", e);
                errors.push(e.to_string());
            }
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clusterer::Clusterer;
    use crate::core::fingerprint::{Fingerprint, HashFingerprint};
    use crate::core::similarity::HammingOracle;
    use crate::events::NullReporter;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn write_file(dir: &Path, relative: &str, contents: &[u8]) -> ImageRef {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        ImageRef::new(path)
    }

    /// Cluster `images` with the given hash bits at threshold 5
    fn cluster(images: &[(ImageRef, u64)]) -> ClusteringResult {
        let items: Vec<(ImageRef, Fingerprint)> = images
            .iter()
            .map(|(i, bits)| (i.clone(), Fingerprint::Hash(HashFingerprint::from_bits(*bits))))
            .collect();
        let oracle = HammingOracle::new(5).unwrap();
        Clusterer::new(&oracle).cluster(&items)
    }

    fn list(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn writes_groups_and_unique_bucket() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        let one = write_file(src.path(), "one.jpg", b"1");
        let two = write_file(src.path(), "two.jpg", b"2");
        let three = write_file(src.path(), "three.jpg", b"3");
        let clustering = cluster(&[(one.clone(), 0), (two, 0b111), (three, u64::MAX)]);

        let materializer = Materializer::new(dst.path());
        let report = materializer.materialize(&clustering, &NullReporter);

        assert!(report.errors.is_empty());
        assert_eq!(report.files_copied, 3);
        assert_eq!(list(dst.path()), vec!["Group_one", "Unique"]);
        assert_eq!(list(&dst.path().join("Group_one")), vec!["one.jpg", "two.jpg"]);
        assert_eq!(list(&dst.path().join("Unique")), vec!["three.jpg"]);

        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].index, 0);
        assert_eq!(report.groups[0].representative, one);
        assert_eq!(report.groups[0].directory, dst.path().join("Group_one"));
        assert_eq!(report.unique_dir, Some(dst.path().join("Unique")));

        // originals untouched
        assert!(src.path().join("one.jpg").exists());
    }

    #[test]
    fn colliding_group_names_get_suffixes() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        let a1 = write_file(src.path(), "a/shot.jpg", b"a1");
        let a2 = write_file(src.path(), "a/shot-copy.jpg", b"a2");
        let b1 = write_file(src.path(), "b/shot.jpg", b"b1");
        let b2 = write_file(src.path(), "b/other.jpg", b"b2");
        let clustering = cluster(&[(a1, 0), (a2, 1), (b1, u64::MAX), (b2, u64::MAX - 1)]);

        let report = Materializer::new(dst.path()).materialize(&clustering, &NullReporter);

        assert_eq!(list(dst.path()), vec!["Group_shot", "Group_shot_1"]);
        assert_eq!(report.groups[1].directory, dst.path().join("Group_shot_1"));
        assert_eq!(
            fs::read(dst.path().join("Group_shot_1/shot.jpg")).unwrap(),
            b"b1"
        );
    }

    #[test]
    fn pre_existing_directory_is_not_reused() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir(dst.path().join("Group_x")).unwrap();

        let x = write_file(src.path(), "x.png", b"x");
        let y = write_file(src.path(), "y.png", b"y");
        let clustering = cluster(&[(x, 0), (y, 0)]);

        let report = Materializer::new(dst.path()).materialize(&clustering, &NullReporter);

        assert_eq!(report.groups[0].directory, dst.path().join("Group_x_1"));
        assert!(list(&dst.path().join("Group_x")).is_empty());
    }

    #[test]
    fn same_base_name_in_one_group_is_disambiguated() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        let a = write_file(src.path(), "2023/beach.jpg", b"first");
        let b = write_file(src.path(), "2024/beach.jpg", b"second");
        let clustering = cluster(&[(a, 0), (b, 0)]);

        let report = Materializer::new(dst.path()).materialize(&clustering, &NullReporter);

        let dir = dst.path().join("Group_beach");
        assert_eq!(list(&dir), vec!["beach.jpg", "beach_1.jpg"]);
        assert_eq!(fs::read(dir.join("beach_1.jpg")).unwrap(), b"second");
        assert_eq!(report.files_copied, 2);
    }

    #[test]
    fn unique_bucket_disambiguates_across_singletons() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        let a = write_file(src.path(), "x/solo.jpg", b"a");
        let b = write_file(src.path(), "y/solo.jpg", b"b");
        let clustering = cluster(&[(a, 0), (b, u64::MAX)]);

        let report = Materializer::new(dst.path()).materialize(&clustering, &NullReporter);

        assert!(report.groups.is_empty());
        assert_eq!(list(&dst.path().join("Unique")), vec!["solo.jpg", "solo_1.jpg"]);
        assert_eq!(report.unique_files.len(), 2);
    }

    #[test]
    fn no_unique_dir_without_singletons() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        let a = write_file(src.path(), "a.jpg", b"a");
        let b = write_file(src.path(), "b.jpg", b"b");
        let clustering = cluster(&[(a, 0), (b, 0)]);

        let report = Materializer::new(dst.path()).materialize(&clustering, &NullReporter);

        assert!(report.unique_dir.is_none());
        assert!(!dst.path().join("Unique").exists());
    }

    #[test]
    fn copy_failure_is_recorded_and_run_continues() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        let real = write_file(src.path(), "real.jpg", b"r");
        let gone = write_file(src.path(), "gone.jpg", b"g");
        let other = write_file(src.path(), "other.jpg", b"o");
        fs::remove_file(gone.path()).unwrap();
        let clustering = cluster(&[(real, 0), (gone, 0), (other, u64::MAX)]);

        let report = Materializer::new(dst.path()).materialize(&clustering, &NullReporter);

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("gone.jpg"));
        assert_eq!(report.files_copied, 2);
        assert_eq!(list(&dst.path().join("Group_real")), vec!["real.jpg"]);
        assert_eq!(list(&dst.path().join("Unique")), vec!["other.jpg"]);
    }

    #[test]
    fn progress_is_reported_per_group() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        let images: Vec<(ImageRef, u64)> = [0, u64::MAX, 0xFFFF_FFFF]
            .into_iter()
            .enumerate()
            .map(|(i, bits)| (write_file(src.path(), &format!("{}.jpg", i), b"x"), bits))
            .collect();
        let clustering = cluster(&images);
        assert_eq!(clustering.groups.len(), 3);

        let calls = Mutex::new(Vec::new());
        let reporter = |current: usize, total: usize, message: &str| {
            calls.lock().unwrap().push((current, total, message.to_string()));
        };
        Materializer::new(dst.path()).materialize(&clustering, &reporter);

        let calls = calls.into_inner().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, 0);
        assert!(calls.iter().all(|(_, total, _)| *total == 3));
        assert!(calls[2].2.contains("2"));
    }

    #[test]
    fn prepare_root_creates_nested_target() {
        let dst = TempDir::new().unwrap();
        let root = dst.path().join("deep/nested/out");

        Materializer::new(&root).prepare_root().unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn prepare_root_fails_when_path_is_a_file() {
        let dst = TempDir::new().unwrap();
        let file = dst.path().join("occupied");
        fs::write(&file, b"not a dir").unwrap();

        let result = Materializer::new(&file).prepare_root();
        assert!(matches!(result, Err(MaterializeError::TargetRoot { .. })));
    }
}
