use attendo_core::enrollment::DEFAULT_ENROLL_UPSAMPLE;
use attendo_core::matcher::DEFAULT_TOLERANCE;
use attendo_core::pipeline::{PipelineConfig, DEFAULT_RECOGNIZE_UPSAMPLE};
use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing `det_10g.onnx` and `w600k_r50.onnx`.
    pub model_dir: PathBuf,
    /// Directory of reference images, one per identity.
    pub gallery_dir: PathBuf,
    /// Path to the SQLite attendance database.
    pub db_path: PathBuf,
    /// Maximum Euclidean distance accepted as a match.
    pub tolerance: f32,
    pub recognize_upsample: u32,
    pub enroll_upsample: u32,
    /// Serve on the session bus instead of the system bus.
    pub session_bus: bool,
}

impl Config {
    /// Load configuration from `ATTENDO_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("attendo");

        Self {
            model_dir: env_path("ATTENDO_MODEL_DIR").unwrap_or_else(|| data_dir.join("models")),
            gallery_dir: env_path("ATTENDO_GALLERY_DIR")
                .unwrap_or_else(|| data_dir.join("known_faces")),
            db_path: env_path("ATTENDO_DB_PATH")
                .unwrap_or_else(|| data_dir.join("attendance.db")),
            tolerance: env_f32("ATTENDO_TOLERANCE", DEFAULT_TOLERANCE),
            recognize_upsample: env_u32("ATTENDO_RECOGNIZE_UPSAMPLE", DEFAULT_RECOGNIZE_UPSAMPLE),
            enroll_upsample: env_u32("ATTENDO_ENROLL_UPSAMPLE", DEFAULT_ENROLL_UPSAMPLE),
            session_bus: std::env::var("ATTENDO_SESSION_BUS")
                .map(|v| v != "0")
                .unwrap_or(false),
        }
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            tolerance: self.tolerance,
            recognize_upsample: self.recognize_upsample,
            enroll_upsample: self.enroll_upsample,
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
