//! Recognition and enrollment, from a transported image payload to a typed outcome.

use crate::enrollment::{EnrollmentCheck, EnrollmentGuard, RejectReason};
use crate::extractor::{ExtractorError, FaceExtractor};
use crate::gallery::{normalize_identity, FaceGallery, GalleryError, ReloadOptions};
use crate::matcher::{EuclideanMatcher, Matcher, DEFAULT_TOLERANCE};
use crate::transport::{decode_image_payload, ContrastGain, TransportError, PREPARE_GAIN};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Default detection upsample for recognition (latency over small-face recall).
pub const DEFAULT_RECOGNIZE_UPSAMPLE: u32 = 1;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] TransportError),
    #[error(transparent)]
    Gallery(#[from] GalleryError),
    #[error(transparent)]
    Extractor(#[from] ExtractorError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecognitionOutcome {
    Matched { identity: String, distance: f32 },
    /// A face was embedded but nobody lies within tolerance. `closest` is the
    /// smallest distance seen, if the gallery had any comparable entry.
    Unmatched { closest: Option<f32> },
    NoFaceDetected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnrollmentOutcome {
    Enrolled { identity: String, path: PathBuf },
    RejectedNoFace,
    RejectedMultipleFaces { count: usize },
    RejectedUnusable,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub tolerance: f32,
    pub recognize_upsample: u32,
    pub enroll_upsample: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            recognize_upsample: DEFAULT_RECOGNIZE_UPSAMPLE,
            enroll_upsample: crate::enrollment::DEFAULT_ENROLL_UPSAMPLE,
        }
    }
}

/// Ties the gallery, matcher and enrollment guard to one extraction policy.
pub struct FacePipeline {
    gallery: Arc<FaceGallery>,
    matcher: Box<dyn Matcher + Send + Sync>,
    tolerance: f32,
    recognize_upsample: u32,
    guard: EnrollmentGuard,
    prepare: ContrastGain,
}

impl FacePipeline {
    pub fn new(gallery: Arc<FaceGallery>, config: PipelineConfig) -> Self {
        Self {
            gallery,
            matcher: Box::new(EuclideanMatcher),
            tolerance: config.tolerance,
            recognize_upsample: config.recognize_upsample,
            guard: EnrollmentGuard {
                upsample: config.enroll_upsample,
                ..EnrollmentGuard::default()
            },
            prepare: PREPARE_GAIN,
        }
    }

    pub fn gallery(&self) -> &FaceGallery {
        &self.gallery
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Reload options that reproduce the embeddings enrollment appends.
    pub fn reload_options(&self) -> ReloadOptions {
        ReloadOptions {
            upsample: self.guard.upsample,
            gain: self.prepare,
            retry_gain: Some(self.guard.retry_gain),
        }
    }

    /// Rebuild the gallery from its directory.
    pub fn reload(&self, extractor: &mut dyn FaceExtractor) -> Result<usize, PipelineError> {
        Ok(self.gallery.reload(extractor, self.reload_options())?)
    }

    /// Identify the first embeddable face in `payload`.
    pub fn recognize(
        &self,
        extractor: &mut dyn FaceExtractor,
        payload: &str,
    ) -> Result<RecognitionOutcome, PipelineError> {
        let image = self.prepare.apply(&decode_image_payload(payload)?);

        let faces = extractor.detect(&image, self.recognize_upsample)?;
        if faces.is_empty() {
            tracing::debug!("no face in probe image");
            return Ok(RecognitionOutcome::NoFaceDetected);
        }

        let mut probe = None;
        for face in &faces {
            if let Some(embedding) = extractor.encode(&image, face)? {
                probe = Some(embedding);
                break;
            }
        }
        let Some(probe) = probe else {
            tracing::warn!(detected = faces.len(), "faces detected but none could be encoded");
            return Ok(RecognitionOutcome::NoFaceDetected);
        };

        let gallery = self.gallery.snapshot();
        let result = self.matcher.identify(&probe, &gallery, self.tolerance);
        Ok(match result.identity {
            Some(identity) => {
                let distance = result.distance.unwrap_or_default();
                tracing::info!(identity, distance, "face recognized");
                RecognitionOutcome::Matched { identity, distance }
            }
            None => {
                tracing::info!(
                    closest = ?result.distance,
                    gallery = gallery.len(),
                    "no gallery identity within tolerance"
                );
                RecognitionOutcome::Unmatched {
                    closest: result.distance,
                }
            }
        })
    }

    /// Validate `payload` and, if it holds exactly one usable face, store it
    /// under `name`. Invalid names fail before any model work.
    pub fn enroll(
        &self,
        extractor: &mut dyn FaceExtractor,
        name: &str,
        payload: &str,
    ) -> Result<EnrollmentOutcome, PipelineError> {
        let identity = normalize_identity(name)?;
        let decoded = decode_image_payload(payload)?;
        let prepared = self.prepare.apply(&decoded);

        let embedding = match self.guard.validate_for_enrollment(extractor, &prepared)? {
            EnrollmentCheck::Accepted { embedding, .. } => embedding,
            EnrollmentCheck::Rejected(reason) => {
                return Ok(match reason {
                    RejectReason::NoFace => EnrollmentOutcome::RejectedNoFace,
                    RejectReason::MultipleFaces(count) => {
                        EnrollmentOutcome::RejectedMultipleFaces { count }
                    }
                    RejectReason::Unusable => EnrollmentOutcome::RejectedUnusable,
                });
            }
        };

        // The unprepared image is stored; reload prepares it the same way.
        let path = self.gallery.enroll(&identity, &decoded, embedding)?;
        Ok(EnrollmentOutcome::Enrolled { identity, path })
    }
}
