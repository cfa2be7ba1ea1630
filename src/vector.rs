//! Core vector data structure.

use serde::{Deserialize, Serialize};

use crate::error::{ProximaError, Result};

/// A dense vector of f32 components.
///
/// Dimensionality is fixed per index instance; every vector handed to an
/// index must match the index's dimension exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    /// The vector components.
    pub data: Vec<f32>,
}

impl Vector {
    /// Create a new vector from raw components.
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Get the dimensionality of this vector.
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Calculate the L2 norm (magnitude) of this vector.
    pub fn norm(&self) -> f32 {
        crate::simd::sum_of_squares(&self.data).sqrt()
    }

    /// Normalize this vector to unit length.
    ///
    /// Zero vectors are left unchanged.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for value in &mut self.data {
                *value /= norm;
            }
        }
    }

    /// Get a normalized copy of this vector.
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        normalized.normalize();
        normalized
    }

    /// Check if this vector contains any NaN or infinite values.
    pub fn is_valid(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Validate that this vector has the expected dimension.
    pub fn validate_dimension(&self, expected: usize) -> Result<()> {
        if self.data.len() != expected {
            return Err(ProximaError::DimensionMismatch {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Vector::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_creation() {
        let vector = Vector::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(vector.dimension(), 3);
        assert_eq!(vector.data, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_vector_norm() {
        let vector = Vector::new(vec![3.0, 4.0]);
        assert!((vector.norm() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_vector_normalize() {
        let mut vector = Vector::new(vec![3.0, 4.0]);
        vector.normalize();
        assert!((vector.norm() - 1.0).abs() < 1e-6);
        assert!((vector.data[0] - 0.6).abs() < 1e-6);
        assert!((vector.data[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_normalize() {
        let mut vector = Vector::new(vec![0.0, 0.0]);
        vector.normalize();
        assert_eq!(vector.data, vec![0.0, 0.0]);
    }

    #[test]
    fn test_vector_validity() {
        assert!(Vector::new(vec![1.0, -2.5]).is_valid());
        assert!(!Vector::new(vec![1.0, f32::NAN]).is_valid());
        assert!(!Vector::new(vec![f32::INFINITY, 0.0]).is_valid());
    }

    #[test]
    fn test_validate_dimension() {
        let vector = Vector::new(vec![1.0, 2.0]);
        assert!(vector.validate_dimension(2).is_ok());

        let err = vector.validate_dimension(3).unwrap_err();
        match err {
            crate::error::ProximaError::DimensionMismatch { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            _ => panic!("Expected dimension mismatch"),
        }
    }
}
