//! Distance metrics for vector similarity calculation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ProximaError, Result};
use crate::simd;

/// Distance metrics for vector similarity calculation.
///
/// Every metric is framed as a distance: lower values mean more similar,
/// so results from any metric sort the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    /// Cosine distance (1 - cosine similarity).
    #[default]
    Cosine,
    /// Euclidean (L2) distance.
    Euclidean,
    /// Negated dot product (higher dot product means smaller distance).
    Dot,
}

impl DistanceMetric {
    /// Calculate the distance between two vectors using this metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(ProximaError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }

        let result = match self {
            DistanceMetric::Cosine => {
                let dot = simd::dot_product(a, b);
                let norm_a = simd::sum_of_squares(a).sqrt();
                let norm_b = simd::sum_of_squares(b).sqrt();

                if norm_a == 0.0 || norm_b == 0.0 {
                    1.0 // Maximum distance for zero vectors
                } else {
                    1.0 - (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
                }
            }
            DistanceMetric::Euclidean => simd::squared_l2_distance(a, b).sqrt(),
            DistanceMetric::Dot => -simd::dot_product(a, b),
        };

        Ok(result)
    }

    /// Get the name of this distance metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Dot => "dot",
        }
    }

    /// Parse a distance metric from a string.
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "dot" | "dot_product" => Ok(DistanceMetric::Dot),
            _ => Err(ProximaError::invalid_argument(format!(
                "Unknown distance metric: {s}"
            ))),
        }
    }

    /// Wire tag used by the persistence codec.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            DistanceMetric::Cosine => 1,
            DistanceMetric::Euclidean => 2,
            DistanceMetric::Dot => 3,
        }
    }

    /// Inverse of [`DistanceMetric::tag`].
    pub(crate) fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(DistanceMetric::Cosine),
            2 => Ok(DistanceMetric::Euclidean),
            3 => Ok(DistanceMetric::Dot),
            _ => Err(ProximaError::corrupt(format!(
                "Unknown distance metric tag: {tag}"
            ))),
        }
    }

    /// Calculate distances between a query vector and multiple vectors,
    /// in parallel when the batch is large enough to amortize the overhead.
    pub fn batch_distance(&self, query: &[f32], vectors: &[&[f32]]) -> Result<Vec<f32>> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        if vectors.len() < 100 {
            return vectors
                .iter()
                .map(|v| self.distance(query, v))
                .collect::<Result<Vec<_>>>();
        }

        vectors
            .par_iter()
            .map(|v| self.distance(query, v))
            .collect::<Result<Vec<_>>>()
    }
}
