//! Dense pairwise cosine-similarity matrix for the embedding strategy.
//!
//! Memory is O(N²). Each cell is a pure function of two embeddings, so rows
//! are computed independently in parallel.

use crate::core::fingerprint::EmbeddingFingerprint;
use rayon::prelude::*;

/// Row-major N x N matrix of cosine similarities
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    cells: Vec<f32>,
}

impl SimilarityMatrix {
    /// Compute every pairwise similarity.
    ///
    /// The diagonal is set to 1.0 and the matrix is symmetric.
    pub fn compute(embeddings: &[EmbeddingFingerprint]) -> Self {
        let size = embeddings.len();

        let cells: Vec<f32> = (0..size)
            .into_par_iter()
            .flat_map_iter(|i| {
                let row = &embeddings[i];
                embeddings.iter().enumerate().map(move |(j, other)| {
                    if i == j {
                        1.0
                    } else {
                        row.cosine_similarity(other)
                    }
                })
            })
            .collect();

        Self { size, cells }
    }

    /// Number of rows (and columns)
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Similarity of images `i` and `j`
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.cells[i * self.size + j]
    }

    /// One row of the matrix
    pub fn row(&self, i: usize) -> &[f32] {
        &self.cells[i * self.size..(i + 1) * self.size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> EmbeddingFingerprint {
        EmbeddingFingerprint::new(values.to_vec())
    }

    #[test]
    fn empty_input_gives_empty_matrix() {
        let matrix = SimilarityMatrix::compute(&[]);
        assert!(matrix.is_empty());
        assert_eq!(matrix.len(), 0);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let embeddings = vec![emb(&[1.0, 0.0]), emb(&[0.6, 0.8]), emb(&[0.0, 1.0])];
        let matrix = SimilarityMatrix::compute(&embeddings);

        assert_eq!(matrix.len(), 3);
        for i in 0..3 {
            assert_eq!(matrix.get(i, i), 1.0);
            for j in 0..3 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
        assert!((matrix.get(0, 1) - 0.6).abs() < 1e-6);
        assert!((matrix.get(1, 2) - 0.8).abs() < 1e-6);
        assert!(matrix.get(0, 2).abs() < 1e-6);
    }

    #[test]
    fn rows_are_contiguous() {
        let embeddings = vec![emb(&[1.0, 0.0]), emb(&[0.0, 1.0])];
        let matrix = SimilarityMatrix::compute(&embeddings);

        assert_eq!(matrix.row(0).len(), 2);
        assert_eq!(matrix.row(1)[1], 1.0);
    }
}
