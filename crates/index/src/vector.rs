//! Vector index abstraction and the exact inner-product index.
//!
//! Vectors are normalized on insert and queries are normalized before
//! search, so the inner product is cosine similarity. Builder and query
//! engine both go through this module, which keeps the metric consistent.

use newsdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Trait for similarity-search structures.
///
/// Positions returned by `search` are insertion positions, which the
/// caller maps back to article ids.
pub trait VectorIndex: Send + Sync {
    /// Dimensionality of stored vectors.
    fn dimensions(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-k positions by descending similarity; ties by ascending position.
    fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<(usize, f32)>>;
}

/// Exhaustive inner-product index over unit vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }

    /// Append a vector; returns its position.
    pub fn add(&mut self, vector: &[f32]) -> AppResult<usize> {
        self.check_dimensions(vector)?;
        let position = self.len();
        self.vectors.extend(normalized(vector));
        Ok(position)
    }

    /// Stored (normalized) vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimensions)?;
        self.vectors.get(start..start + self.dimensions)
    }

    fn check_dimensions(&self, vector: &[f32]) -> AppResult<()> {
        if vector.len() != self.dimensions {
            return Err(AppError::EmbeddingMismatch(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

impl VectorIndex for FlatIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.vectors.len() / self.dimensions
        }
    }

    fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<(usize, f32)>> {
        self.check_dimensions(query)?;
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query = normalized(query);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, v)| (position, dot(&query, v)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        Ok(scored)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalized(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
