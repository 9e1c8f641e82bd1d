use crate::config::Config;
use crate::engine::{EngineError, EngineHandle};
use attendo_core::gallery::GalleryError;
use attendo_core::pipeline::PipelineError;
use attendo_core::EnrollmentOutcome;
use serde::Serialize;
use serde_json::json;
use zbus::interface;

pub const BUS_NAME: &str = "org.attendo.Attendance1";
pub const OBJECT_PATH: &str = "/org/attendo/Attendance1";

/// D-Bus interface for the attendance daemon.
///
/// Bus name: org.attendo.Attendance1
/// Object path: /org/attendo/Attendance1
pub struct AttendanceService {
    engine: EngineHandle,
    config: Config,
}

impl AttendanceService {
    pub fn new(engine: EngineHandle, config: Config) -> Self {
        Self { engine, config }
    }
}

#[interface(name = "org.attendo.Attendance1")]
impl AttendanceService {
    /// Recognize the face in a base64 image and record today's attendance.
    async fn recognize(&self, image: &str) -> zbus::fdo::Result<String> {
        tracing::debug!(bytes = image.len(), "recognize requested");
        match self.engine.recognize(image.to_string()).await {
            Ok(reply) => to_json(&reply),
            Err(e) => error_reply(e),
        }
    }

    /// Enroll `name` from a base64 image holding exactly one face.
    async fn enroll(&self, name: &str, image: &str) -> zbus::fdo::Result<String> {
        tracing::info!(name, "enroll requested");
        match self.engine.enroll(name.to_string(), image.to_string()).await {
            Ok(outcome) => Ok(enrollment_json(&outcome).to_string()),
            Err(e) => error_reply(e),
        }
    }

    /// Rebuild the gallery from its directory; returns the identity count.
    async fn reload_gallery(&self) -> zbus::fdo::Result<u32> {
        tracing::info!("gallery reload requested");
        let count = self.engine.reload().await.map_err(fault)?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Known identities as a JSON array of names.
    async fn list_identities(&self) -> zbus::fdo::Result<String> {
        to_json(&self.engine.identities())
    }

    /// Remove an identity's reference image and gallery entry.
    async fn remove_identity(&self, name: &str) -> zbus::fdo::Result<bool> {
        tracing::info!(name, "remove_identity requested");
        self.engine
            .remove_identity(name.to_string())
            .await
            .map_err(fault)
    }

    /// Today's attendance, newest first.
    async fn today_log(&self) -> zbus::fdo::Result<String> {
        let records = self.engine.today_log().await.map_err(fault)?;
        to_json(&records)
    }

    /// Full attendance history, newest first.
    async fn history(&self) -> zbus::fdo::Result<String> {
        let records = self.engine.history().await.map_err(fault)?;
        to_json(&records)
    }

    /// Delete one attendance record by id.
    async fn delete_record(&self, id: &str) -> zbus::fdo::Result<bool> {
        tracing::info!(id, "delete_record requested");
        self.engine.delete_record(id.to_string()).await.map_err(fault)
    }

    /// Return daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "engine": if self.engine.is_alive() { "running" } else { "stopped" },
            "identities": self.engine.identities().len(),
            "tolerance": self.config.tolerance,
            "recognize_upsample": self.config.recognize_upsample,
            "enroll_upsample": self.config.enroll_upsample,
            "gallery_dir": self.config.gallery_dir.display().to_string(),
            "db_path": self.config.db_path.display().to_string(),
        })
        .to_string())
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> zbus::fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

fn enrollment_json(outcome: &EnrollmentOutcome) -> serde_json::Value {
    match outcome {
        EnrollmentOutcome::Enrolled { identity, path } => json!({
            "status": "success",
            "identity": identity,
            "path": path.display().to_string(),
        }),
        EnrollmentOutcome::RejectedNoFace => json!({
            "status": "rejected_no_face",
            "message": "no face found in the image",
        }),
        EnrollmentOutcome::RejectedMultipleFaces { count } => json!({
            "status": "rejected_multiple_faces",
            "count": count,
            "message": "the image must contain exactly one face",
        }),
        EnrollmentOutcome::RejectedUnusable => json!({
            "status": "rejected_unusable",
            "message": "the face could not be encoded; try better lighting",
        }),
    }
}

/// Short machine-readable class for an engine error.
fn error_kind(e: &EngineError) -> &'static str {
    match e {
        EngineError::Pipeline(PipelineError::Decode(_)) => "invalid_image",
        EngineError::Pipeline(PipelineError::Gallery(GalleryError::InvalidName { .. }))
        | EngineError::Gallery(GalleryError::InvalidName { .. }) => "invalid_name",
        EngineError::Pipeline(PipelineError::Gallery(_)) | EngineError::Gallery(_) => "gallery",
        EngineError::Store(_) => "store",
        _ => "internal",
    }
}

/// Domain failures become an `error` outcome; only a dead engine is a D-Bus error.
fn error_reply(e: EngineError) -> zbus::fdo::Result<String> {
    if matches!(e, EngineError::ChannelClosed) {
        return Err(fault(e));
    }
    tracing::warn!(error = %e, "request failed");
    Ok(json!({
        "status": "error",
        "kind": error_kind(&e),
        "message": e.to_string(),
    })
    .to_string())
}

fn fault(e: EngineError) -> zbus::fdo::Error {
    match e {
        EngineError::Gallery(GalleryError::InvalidName { .. }) => {
            zbus::fdo::Error::InvalidArgs(e.to_string())
        }
        EngineError::Gallery(GalleryError::Io { .. })
        | EngineError::Pipeline(PipelineError::Gallery(GalleryError::Io { .. })) => {
            zbus::fdo::Error::IOError(e.to_string())
        }
        _ => zbus::fdo::Error::Failed(e.to_string()),
    }
}
