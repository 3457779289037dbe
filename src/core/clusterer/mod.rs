//! # Clusterer Module
//!
//! Partitions the corpus into groups with a single-pass,
//! representative-anchored greedy assignment.
//!
//! ## Algorithm
//! Images are visited in discovery order. Each image is compared only
//! against the *representative* (first member) of every open group, in
//! group creation order, and joins the first group that passes the
//! threshold test. If none does, it opens a new group.
//!
//! ## Known Limitations
//! - **Order dependent**: reordering the input can change the partition.
//! - **Not transitive**: two members of one group are only guaranteed to be
//!   similar to the representative, not to each other.
//! - **Not monotone in the threshold**: a looser threshold can pull an image
//!   into an early group, and the images it would have anchored may then
//!   scatter into more groups than before.
//!
//! Downstream directory layouts depend on this exact behaviour, so it is
//! kept as is rather than replaced by single-link or centroid clustering.

use crate::core::fingerprint::Fingerprint;
use crate::core::scanner::ImageRef;
use crate::core::similarity::{CosineOracle, SimilarityMatrix, SimilarityOracle};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An ordered, non-empty set of images. The first member is the
/// representative and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    members: Vec<ImageRef>,
}

impl Group {
    fn new(representative: ImageRef) -> Self {
        Self {
            members: vec![representative],
        }
    }

    /// The comparison anchor of the group
    pub fn representative(&self) -> &ImageRef {
        &self.members[0]
    }

    /// All members in insertion order, representative first
    pub fn members(&self) -> &[ImageRef] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; a group holds at least its representative
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Exactly one member
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Groups in the order their representatives were first encountered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub groups: Vec<Group>,
}

impl ClusteringResult {
    /// Images across all groups
    pub fn total_images(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    /// Groups with two or more members
    pub fn multi_member_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(|g| !g.is_singleton())
    }

    /// Images that matched nothing
    pub fn singletons(&self) -> impl Iterator<Item = &ImageRef> {
        self.groups
            .iter()
            .filter(|g| g.is_singleton())
            .map(Group::representative)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Greedy partition of `0..count`.
///
/// `similar(rep, candidate)` is asked only for representatives of groups
/// opened earlier. Returns member indices per group.
pub fn greedy_partition(
    count: usize,
    mut similar: impl FnMut(usize, usize) -> bool,
) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for candidate in 0..count {
        let home = groups
            .iter_mut()
            .find(|members| similar(members[0], candidate));

        match home {
            Some(members) => members.push(candidate),
            None => groups.push(vec![candidate]),
        }
    }

    groups
}

/// Clusters fingerprinted images with a similarity oracle
pub struct Clusterer<'a> {
    oracle: &'a dyn SimilarityOracle,
}

impl<'a> Clusterer<'a> {
    pub fn new(oracle: &'a dyn SimilarityOracle) -> Self {
        Self { oracle }
    }

    /// Partition `items`, which must be in discovery order.
    pub fn cluster(&self, items: &[(ImageRef, Fingerprint)]) -> ClusteringResult {
        let partition = greedy_partition(items.len(), |rep, candidate| {
            self.oracle.is_similar(&items[rep].1, &items[candidate].1)
        });

        let result = build(partition, |i| items[i].0.clone());
        debug!(
            "Clustered {} images into {} groups ({})",
            items.len(),
            result.groups.len(),
            self.oracle.description()
        );
        result
    }
}

/// Partition `images` using a precomputed cosine matrix.
///
/// `matrix` must be indexed in the same order as `images`.
pub fn cluster_with_matrix(
    images: &[ImageRef],
    matrix: &SimilarityMatrix,
    oracle: &CosineOracle,
) -> ClusteringResult {
    let partition = greedy_partition(images.len(), |rep, candidate| {
        oracle.passes(matrix.get(rep, candidate))
    });

    let result = build(partition, |i| images[i].clone());
    debug!(
        "Clustered {} images into {} groups ({})",
        images.len(),
        result.groups.len(),
        oracle.description()
    );
    result
}

fn build(partition: Vec<Vec<usize>>, image_at: impl Fn(usize) -> ImageRef) -> ClusteringResult {
    let groups = partition
        .into_iter()
        .filter_map(|indices| {
            let mut indices = indices.into_iter();
            let mut group = Group::new(image_at(indices.next()?));
            group.members.extend(indices.map(&image_at));
            Some(group)
        })
        .collect();

    ClusteringResult { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::{EmbeddingFingerprint, HashFingerprint};
    use crate::core::similarity::HammingOracle;

    fn hashed(name: &str, bits: u64) -> (ImageRef, Fingerprint) {
        (
            ImageRef::new(format!("/photos/{}.jpg", name)),
            Fingerprint::Hash(HashFingerprint::from_bits(bits)),
        )
    }

    fn names(group: &Group) -> Vec<&str> {
        group.members().iter().map(ImageRef::name).collect()
    }

    /// Unit vector at the given cosine to (1, 0)
    fn at_cosine(cos: f32) -> EmbeddingFingerprint {
        EmbeddingFingerprint::new(vec![cos, (1.0 - cos * cos).sqrt()])
    }

    #[test]
    fn empty_input_gives_no_groups() {
        let oracle = HammingOracle::default();
        let result = Clusterer::new(&oracle).cluster(&[]);
        assert!(result.is_empty());
        assert_eq!(result.total_images(), 0);
    }

    #[test]
    fn hamming_example_splits_outlier() {
        // d(1,2)=3, d(1,3)=20, d(2,3)=19
        let h3 = 0b11 | (((1u64 << 18) - 1) << 3);
        assert_eq!(h3.count_ones(), 20);
        assert_eq!((h3 ^ 0b111).count_ones(), 19);
        let items = vec![hashed("one", 0), hashed("two", 0b111), hashed("three", h3)];

        let oracle = HammingOracle::new(5).unwrap();
        let result = Clusterer::new(&oracle).cluster(&items);

        assert_eq!(result.groups.len(), 2);
        assert_eq!(names(&result.groups[0]), vec!["one", "two"]);
        assert_eq!(result.groups[0].representative().name(), "one");
        assert_eq!(names(&result.groups[1]), vec!["three"]);
        assert_eq!(result.singletons().count(), 1);
        assert_eq!(result.multi_member_groups().count(), 1);
    }

    #[test]
    fn cosine_example_anchors_on_first_image() {
        let images: Vec<ImageRef> = ["one", "two", "three", "four"]
            .iter()
            .map(|n| ImageRef::new(format!("/photos/{}.png", n)))
            .collect();
        let embeddings = vec![at_cosine(1.0), at_cosine(0.99), at_cosine(0.80), at_cosine(0.96)];
        let matrix = SimilarityMatrix::compute(&embeddings);

        let oracle = CosineOracle::new(0.95).unwrap();
        let result = cluster_with_matrix(&images, &matrix, &oracle);

        assert_eq!(result.groups.len(), 2);
        assert_eq!(names(&result.groups[0]), vec!["one", "two", "four"]);
        assert_eq!(names(&result.groups[1]), vec!["three"]);
    }

    #[test]
    fn matrix_and_oracle_paths_agree() {
        let embeddings = vec![
            at_cosine(1.0),
            at_cosine(0.5),
            at_cosine(0.97),
            at_cosine(0.45),
            at_cosine(0.2),
        ];
        let items: Vec<(ImageRef, Fingerprint)> = embeddings
            .iter()
            .enumerate()
            .map(|(i, e)| {
                (
                    ImageRef::new(format!("/p/{}.png", i)),
                    Fingerprint::Embedding(e.clone()),
                )
            })
            .collect();
        let images: Vec<ImageRef> = items.iter().map(|(i, _)| i.clone()).collect();

        let oracle = CosineOracle::new(0.9).unwrap();
        let direct = Clusterer::new(&oracle).cluster(&items);
        let via_matrix =
            cluster_with_matrix(&images, &SimilarityMatrix::compute(&embeddings), &oracle);

        assert_eq!(direct, via_matrix);
    }

    #[test]
    fn first_matching_group_wins() {
        // "c" is within threshold of both representatives: d(a,c)=3, d(b,c)=5
        let items = vec![hashed("a", 0), hashed("b", 0xFF), hashed("c", 0x07)];
        let oracle = HammingOracle::new(8).unwrap();
        let result = Clusterer::new(&oracle).cluster(&items);

        assert_eq!(result.groups.len(), 2);
        assert_eq!(names(&result.groups[0]), vec!["a", "c"]);
        assert_eq!(names(&result.groups[1]), vec!["b"]);
    }

    #[test]
    fn assignment_depends_on_order() {
        // a=0, b has 4 bits set, c has 8 bits set (superset of b)
        let a = hashed("a", 0);
        let b = hashed("b", 0x0F);
        let c = hashed("c", 0xFF);
        let oracle = HammingOracle::new(5).unwrap();

        let forward = Clusterer::new(&oracle).cluster(&[a.clone(), b.clone(), c.clone()]);
        assert_eq!(forward.groups.len(), 2);

        let shuffled = Clusterer::new(&oracle).cluster(&[b, a, c]);
        assert_eq!(shuffled.groups.len(), 1);
        // a and c share a group although d(a, c) = 8
        assert_eq!(names(&shuffled.groups[0]), vec!["b", "a", "c"]);
    }

    #[test]
    fn every_image_lands_in_exactly_one_group() {
        let items: Vec<_> = (0..20u64)
            .map(|i| hashed(&format!("img{}", i), i.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
            .collect();
        let oracle = HammingOracle::new(30).unwrap();
        let result = Clusterer::new(&oracle).cluster(&items);

        assert_eq!(result.total_images(), items.len());
        for (image, _) in &items {
            let homes = result
                .groups
                .iter()
                .filter(|g| g.members().contains(image))
                .count();
            assert_eq!(homes, 1);
        }
    }

    #[test]
    fn looser_threshold_can_produce_more_groups() {
        // b is 5 bits from a; c and d are 4 bits from b on opposite sides
        let b = 0b1_1111u64;
        let c = b | (0b1111 << 5);
        let d = b | (0b1111 << 9);
        let items = vec![hashed("a", 0), hashed("b", b), hashed("c", c), hashed("d", d)];

        let strict = HammingOracle::new(5).unwrap();
        let loose = HammingOracle::new(6).unwrap();

        assert_eq!(Clusterer::new(&strict).cluster(&items).groups.len(), 2);
        assert_eq!(Clusterer::new(&loose).cluster(&items).groups.len(), 3);
    }

    #[test]
    fn greedy_partition_only_consults_representatives() {
        let mut asked = Vec::new();
        let groups = greedy_partition(4, |rep, candidate| {
            asked.push((rep, candidate));
            candidate % 2 == rep % 2
        });

        assert_eq!(groups, vec![vec![0, 2], vec![1, 3]]);
        assert!(asked.iter().all(|(rep, _)| *rep == 0 || *rep == 1));
    }
}
