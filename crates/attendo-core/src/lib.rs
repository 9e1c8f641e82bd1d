//! attendo-core — face attendance engine.
//!
//! SCRFD detection and ArcFace embeddings via ONNX Runtime, a directory-backed
//! gallery of known identities, nearest-identity matching, enrollment checks
//! and a once-per-day attendance gate.

pub mod alignment;
pub mod attendance;
pub mod detector;
pub mod enrollment;
pub mod extractor;
pub mod gallery;
pub mod matcher;
pub mod pipeline;
pub mod recognizer;
pub mod transport;
pub mod types;

pub use attendance::{AttendanceRecord, AttendanceStore, Decision, DedupGate, StoreError};
pub use extractor::{FaceExtractor, OnnxExtractor};
pub use gallery::{FaceGallery, GalleryEntry};
pub use matcher::{EuclideanMatcher, MatchResult, Matcher};
pub use pipeline::{EnrollmentOutcome, FacePipeline, PipelineConfig, RecognitionOutcome};
pub use types::{BoundingBox, Embedding};
