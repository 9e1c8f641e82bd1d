//! Image transport: base64 payloads (bare or data-URI) to RGB bitmaps, and the
//! linear gain/bias used to prepare images before extraction.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbImage;
use thiserror::Error;

/// Gain/bias applied to every image before extraction.
pub const PREPARE_GAIN: ContrastGain = ContrastGain {
    alpha: 1.1,
    beta: 10.0,
};

/// Gain/bias for the enrollment retry pass after a first detection finds nothing.
pub const ENROLL_RETRY_GAIN: ContrastGain = ContrastGain {
    alpha: 1.5,
    beta: 20.0,
};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("image payload is empty")]
    Empty,
    #[error("malformed base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported or corrupt image encoding: {0}")]
    Image(#[from] image::ImageError),
}

/// Linear per-channel transform `saturate(|alpha * x + beta|)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastGain {
    pub alpha: f32,
    pub beta: f32,
}

impl ContrastGain {
    pub const IDENTITY: ContrastGain = ContrastGain {
        alpha: 1.0,
        beta: 0.0,
    };

    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        adjust_contrast(image, self.alpha, self.beta)
    }
}

/// Decode a base64 image, with or without a `data:image/<fmt>;base64,` header.
pub fn decode_image_payload(payload: &str) -> Result<RgbImage, TransportError> {
    let encoded = strip_data_uri(payload.trim());
    if encoded.is_empty() {
        return Err(TransportError::Empty);
    }

    // Browsers may line-wrap long payloads.
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes())?;
    if bytes.is_empty() {
        return Err(TransportError::Empty);
    }

    let decoded = image::load_from_memory(&bytes)?;
    tracing::debug!(
        width = decoded.width(),
        height = decoded.height(),
        bytes = bytes.len(),
        "decoded image payload"
    );
    Ok(decoded.to_rgb8())
}

/// Wrap raw encoded image bytes in a data-URI payload.
pub fn encode_image_payload(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Everything up to and including the first `,` is treated as the header.
fn strip_data_uri(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    }
}

/// Apply a per-channel linear gain and bias, saturating to 0..=255.
pub fn adjust_contrast(image: &RgbImage, alpha: f32, beta: f32) -> RgbImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        for c in px.0.iter_mut() {
            let v = (alpha * f32::from(*c) + beta).abs().round();
            *c = v.clamp(0.0, 255.0) as u8;
        }
    }
    out
}
