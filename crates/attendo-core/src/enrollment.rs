//! Enrollment guard: a reference image must contain exactly one usable face.

use crate::extractor::{detect_with_retry, ExtractorError, FaceExtractor};
use crate::transport::{ContrastGain, ENROLL_RETRY_GAIN};
use crate::types::{BoundingBox, Embedding};
use image::RgbImage;

/// Default detection upsample for enrollment (better small-face recall).
pub const DEFAULT_ENROLL_UPSAMPLE: u32 = 2;

/// Why an enrollment image was refused, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No face even after the contrast-enhanced retry.
    NoFace,
    /// More than one face; carries the detected count.
    MultipleFaces(usize),
    /// A single face was found but could not be embedded (blur, lighting).
    Unusable,
}

/// Outcome of validating an enrollment image.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollmentCheck {
    Accepted {
        face: BoundingBox,
        embedding: Embedding,
    },
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy)]
pub struct EnrollmentGuard {
    pub upsample: u32,
    pub retry_gain: ContrastGain,
}

impl Default for EnrollmentGuard {
    fn default() -> Self {
        Self {
            upsample: DEFAULT_ENROLL_UPSAMPLE,
            retry_gain: ENROLL_RETRY_GAIN,
        }
    }
}

impl EnrollmentGuard {
    /// Check that `image` holds exactly one face that can be embedded.
    ///
    /// The embedding is taken from `image` even when the face was only found
    /// on the enhanced copy, matching what a gallery reload computes.
    pub fn validate_for_enrollment(
        &self,
        extractor: &mut dyn FaceExtractor,
        image: &RgbImage,
    ) -> Result<EnrollmentCheck, ExtractorError> {
        let faces = detect_with_retry(extractor, image, self.upsample, Some(self.retry_gain))?;

        if faces.len() > 1 {
            tracing::info!(faces = faces.len(), "enrollment rejected: multiple faces");
            return Ok(EnrollmentCheck::Rejected(RejectReason::MultipleFaces(faces.len())));
        }
        let Some(face) = faces.into_iter().next() else {
            tracing::info!("enrollment rejected: no face found");
            return Ok(EnrollmentCheck::Rejected(RejectReason::NoFace));
        };

        match extractor.encode(image, &face)? {
            Some(embedding) => Ok(EnrollmentCheck::Accepted { face, embedding }),
            None => {
                tracing::warn!(
                    confidence = face.confidence,
                    width = face.width,
                    height = face.height,
                    "enrollment rejected: face detected but encoding failed"
                );
                Ok(EnrollmentCheck::Rejected(RejectReason::Unusable))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::testing::ScriptedExtractor;
    use image::Rgb;

    fn extractor() -> ScriptedExtractor {
        let mut e = ScriptedExtractor::new();
        e.min_red = 100;
        e
    }

    fn image_with(pixels: &[(u32, [u8; 3])]) -> RgbImage {
        let mut img = RgbImage::new(8, 2);
        for &(x, color) in pixels {
            img.put_pixel(x, 0, Rgb(color));
        }
        img
    }

    #[test]
    fn test_single_face_accepted() {
        let img = image_with(&[(2, [200, 10, 20])]);
        let mut ex = extractor();

        let check = EnrollmentGuard::default()
            .validate_for_enrollment(&mut ex, &img)
            .unwrap();

        match check {
            EnrollmentCheck::Accepted { face, embedding } => {
                assert_eq!(face.x, 2.0);
                assert_eq!(embedding.values, vec![0.1, 0.2]);
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
        assert_eq!(ex.upsamples, vec![DEFAULT_ENROLL_UPSAMPLE]);
    }

    #[test]
    fn test_no_face_after_retry() {
        let img = RgbImage::new(8, 2);
        let mut ex = extractor();

        let check = EnrollmentGuard::default()
            .validate_for_enrollment(&mut ex, &img)
            .unwrap();

        assert_eq!(check, EnrollmentCheck::Rejected(RejectReason::NoFace));
        assert_eq!(ex.detect_calls, 2, "exactly one retry");
    }

    #[test]
    fn test_dim_face_found_on_retry() {
        // Red 70 is below the detector threshold; 1.5 * 70 + 20 = 125 is above.
        let img = image_with(&[(1, [70, 10, 20])]);
        let mut ex = extractor();

        let check = EnrollmentGuard::default()
            .validate_for_enrollment(&mut ex, &img)
            .unwrap();

        match check {
            EnrollmentCheck::Accepted { embedding, .. } => {
                // Encoded from the unenhanced image, not the retry copy.
                assert_eq!(embedding.values, vec![0.1, 0.2]);
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
        assert_eq!(ex.detect_calls, 2);
    }

    #[test]
    fn test_multiple_faces_rejected_even_if_encodable() {
        let img = image_with(&[(0, [200, 10, 20]), (4, [200, 30, 40])]);
        let mut ex = extractor();

        let check = EnrollmentGuard::default()
            .validate_for_enrollment(&mut ex, &img)
            .unwrap();

        assert_eq!(check, EnrollmentCheck::Rejected(RejectReason::MultipleFaces(2)));
    }

    #[test]
    fn test_multiple_faces_outranks_unusable() {
        let img = image_with(&[(0, [200, 10, 255]), (4, [200, 30, 255])]);
        let mut ex = extractor();

        let check = EnrollmentGuard::default()
            .validate_for_enrollment(&mut ex, &img)
            .unwrap();

        assert_eq!(check, EnrollmentCheck::Rejected(RejectReason::MultipleFaces(2)));
    }

    #[test]
    fn test_unusable_single_face() {
        let img = image_with(&[(3, [200, 10, 255])]);
        let mut ex = extractor();

        let check = EnrollmentGuard::default()
            .validate_for_enrollment(&mut ex, &img)
            .unwrap();

        assert_eq!(check, EnrollmentCheck::Rejected(RejectReason::Unusable));
    }
}
