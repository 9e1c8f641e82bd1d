//! Nearest-identity matching of a probe embedding against the gallery.

use crate::gallery::GalleryEntry;
use crate::types::Embedding;

/// Default maximum Euclidean distance accepted as a positive match.
pub const DEFAULT_TOLERANCE: f32 = 0.5;

/// Result of matching a probe embedding against a gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Identity of the closest entry, present only when it lies within tolerance.
    pub identity: Option<String>,
    /// Distance to the closest comparable entry, matched or not.
    pub distance: Option<f32>,
}

impl MatchResult {
    pub fn unmatched(distance: Option<f32>) -> Self {
        Self {
            identity: None,
            distance,
        }
    }

    pub fn is_match(&self) -> bool {
        self.identity.is_some()
    }
}

/// Strategy for comparing a probe embedding against a gallery of enrolled faces.
pub trait Matcher {
    fn identify(&self, probe: &Embedding, gallery: &[GalleryEntry], tolerance: f32)
        -> MatchResult;
}

/// Euclidean distance matcher.
///
/// Scans the whole gallery and resolves by argmin over distances; the tolerance
/// check is applied to the global minimum only. A scan that stops at the first
/// entry below tolerance would hand the match to whoever was enrolled first
/// rather than to the closest face.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn identify(
        &self,
        probe: &Embedding,
        gallery: &[GalleryEntry],
        tolerance: f32,
    ) -> MatchResult {
        let mut best: Option<(usize, f32)> = None;

        for (i, entry) in gallery.iter().enumerate() {
            if !probe.is_comparable_with(&entry.embedding) {
                tracing::debug!(
                    identity = %entry.identity,
                    "skipping gallery entry from a different embedding model"
                );
                continue;
            }
            let distance = probe.euclidean_distance(&entry.embedding);
            if distance.is_nan() {
                continue;
            }
            // Strict comparison: on an exact tie the earlier entry is kept.
            let closer = match best {
                None => true,
                Some((_, best_distance)) => distance < best_distance,
            };
            if closer {
                best = Some((i, distance));
            }
        }

        match best {
            Some((idx, distance)) if distance <= tolerance => MatchResult {
                identity: Some(gallery[idx].identity.clone()),
                distance: Some(distance),
            },
            Some((_, distance)) => MatchResult::unmatched(Some(distance)),
            None => MatchResult::unmatched(None),
        }
    }
}
