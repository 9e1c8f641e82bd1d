use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    /// True when the box lacks a positive, finite area.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    /// Compute Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Distances are only meaningful between embeddings of the same model and dimension.
    ///
    /// An untagged embedding is comparable with any embedding of the same length.
    pub fn is_comparable_with(&self, other: &Embedding) -> bool {
        if self.values.len() != other.values.len() {
            return false;
        }
        match (&self.model_version, &other.model_version) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(values: Vec<f32>, version: &str) -> Embedding {
        Embedding {
            values,
            model_version: Some(version.to_string()),
        }
    }

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Embedding::new(vec![0.3, -0.2, 0.9]);
        assert!(a.euclidean_distance(&a).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_known_value() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_comparable_same_version() {
        let a = tagged(vec![1.0, 0.0], "w600k_r50");
        let b = tagged(vec![0.0, 1.0], "w600k_r50");
        assert!(a.is_comparable_with(&b));
    }

    #[test]
    fn test_not_comparable_across_versions() {
        let a = tagged(vec![1.0, 0.0], "w600k_r50");
        let b = tagged(vec![1.0, 0.0], "glint360k_r100");
        assert!(!a.is_comparable_with(&b));
    }

    #[test]
    fn test_not_comparable_across_dimensions() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert!(!a.is_comparable_with(&b));
    }

    #[test]
    fn test_degenerate_box() {
        let mut face = BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            confidence: 0.9,
            landmarks: None,
        };
        assert!(!face.is_degenerate());
        face.width = 0.0;
        assert!(face.is_degenerate());
        face.width = f32::NAN;
        assert!(face.is_degenerate());
    }
}
