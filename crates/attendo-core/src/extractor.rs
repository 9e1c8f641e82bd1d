//! Embedding extraction: image in, detected faces and their embeddings out.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::transport::ContrastGain;
use crate::types::{BoundingBox, Embedding};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

/// Failures of the embedding model itself. "No face" is never an error.
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Detect faces and turn each into an embedding.
///
/// Implementations hold inference sessions, hence `&mut self`.
pub trait FaceExtractor: Send {
    /// Detect face regions, highest confidence first.
    fn detect(
        &mut self,
        image: &RgbImage,
        upsample: u32,
    ) -> Result<Vec<BoundingBox>, ExtractorError>;

    /// Embed one detected region; `Ok(None)` if the region is unusable.
    fn encode(
        &mut self,
        image: &RgbImage,
        face: &BoundingBox,
    ) -> Result<Option<Embedding>, ExtractorError>;

    /// Detect and embed every face, dropping regions that cannot be embedded.
    fn detect_and_encode(
        &mut self,
        image: &RgbImage,
        upsample: u32,
    ) -> Result<Vec<(BoundingBox, Embedding)>, ExtractorError> {
        let faces = self.detect(image, upsample)?;
        let mut encoded = Vec::with_capacity(faces.len());
        for face in faces {
            if let Some(embedding) = self.encode(image, &face)? {
                encoded.push((face, embedding));
            }
        }
        Ok(encoded)
    }
}

/// Detect on `image`; if nothing is found and a retry gain is given, detect
/// once more on a contrast-enhanced copy. Returned boxes are valid for
/// `image` itself since the enhancement keeps geometry.
pub fn detect_with_retry(
    extractor: &mut dyn FaceExtractor,
    image: &RgbImage,
    upsample: u32,
    retry_gain: Option<ContrastGain>,
) -> Result<Vec<BoundingBox>, ExtractorError> {
    let faces = extractor.detect(image, upsample)?;
    match retry_gain {
        Some(gain) if faces.is_empty() => {
            tracing::debug!("no face on first pass, retrying with enhanced contrast");
            extractor.detect(&gain.apply(image), upsample)
        }
        _ => Ok(faces),
    }
}

/// SCRFD detection + ArcFace recognition.
pub struct OnnxExtractor {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxExtractor {
    /// Model file names inside the model directory.
    pub const DETECTOR_FILE: &'static str = "det_10g.onnx";
    pub const RECOGNIZER_FILE: &'static str = "w600k_r50.onnx";

    pub fn load(detector_path: &str, recognizer_path: &str) -> Result<Self, ExtractorError> {
        let detector = FaceDetector::load(detector_path)?;
        let recognizer = FaceRecognizer::load(recognizer_path)?;
        Ok(Self {
            detector,
            recognizer,
        })
    }

    /// Load both models from one directory using the standard file names.
    pub fn load_from_dir(model_dir: &Path) -> Result<Self, ExtractorError> {
        let detector = model_dir.join(Self::DETECTOR_FILE);
        let recognizer = model_dir.join(Self::RECOGNIZER_FILE);
        Self::load(&detector.to_string_lossy(), &recognizer.to_string_lossy())
    }
}

impl FaceExtractor for OnnxExtractor {
    fn detect(
        &mut self,
        image: &RgbImage,
        upsample: u32,
    ) -> Result<Vec<BoundingBox>, ExtractorError> {
        Ok(self.detector.detect(image, upsample)?)
    }

    fn encode(
        &mut self,
        image: &RgbImage,
        face: &BoundingBox,
    ) -> Result<Option<Embedding>, ExtractorError> {
        Ok(self.recognizer.extract(image, face)?)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedExtractor;
    use super::*;
    use image::Rgb;

    #[test]
    fn test_detect_and_encode_drops_unusable_regions() {
        let mut img = RgbImage::new(6, 1);
        img.put_pixel(0, 0, Rgb([200, 10, 20]));
        img.put_pixel(2, 0, Rgb([200, 10, 255]));
        img.put_pixel(4, 0, Rgb([200, 30, 40]));
        img.put_pixel(5, 0, Rgb([200, 90, 90]));

        let mut extractor = ScriptedExtractor::new();
        let faces = extractor.detect_and_encode(&img, 1).unwrap();

        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].1.values, vec![0.1, 0.2]);
        assert_eq!(faces[1].0.x, 4.0);
        assert_eq!(faces[1].0.width, 2.0);
    }

    #[test]
    fn test_detect_and_encode_no_face_is_empty() {
        let img = RgbImage::new(4, 4);
        let mut extractor = ScriptedExtractor::new();
        assert!(extractor.detect_and_encode(&img, 1).unwrap().is_empty());
    }

    #[test]
    fn test_detect_with_retry_finds_dim_face() {
        let img = RgbImage::from_pixel(4, 1, Rgb([60, 10, 10]));
        let mut extractor = ScriptedExtractor::new();
        extractor.min_red = 100;

        let faces = detect_with_retry(&mut extractor, &img, 2, None).unwrap();
        assert!(faces.is_empty());

        let gain = ContrastGain { alpha: 2.0, beta: 0.0 };
        let faces = detect_with_retry(&mut extractor, &img, 2, Some(gain)).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(extractor.detect_calls, 3);
        assert_eq!(extractor.upsamples, vec![2, 2, 2]);
    }

    #[test]
    fn test_load_reports_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxExtractor::load_from_dir(dir.path()).err().unwrap();
        assert!(matches!(
            err,
            ExtractorError::Detector(DetectorError::ModelNotFound(_))
        ));
    }
}
