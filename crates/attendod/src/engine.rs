use crate::config::Config;
use crate::store::SqliteStore;
use attendo_core::extractor::ExtractorError;
use attendo_core::gallery::GalleryError;
use attendo_core::pipeline::PipelineError;
use attendo_core::{
    AttendanceRecord, Decision, DedupGate, EnrollmentOutcome, FaceExtractor, FaceGallery,
    FacePipeline, OnnxExtractor, RecognitionOutcome, StoreError,
};
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Gallery(#[from] GalleryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to load models: {0}")]
    Models(#[from] ExtractorError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Result of a recognition request after the attendance gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttendanceReply {
    /// Recognized and recorded for today.
    #[serde(rename = "success")]
    Recorded {
        identity: String,
        distance: f32,
        record: AttendanceRecord,
    },
    /// Recognized, but today's attendance was already on file.
    AlreadyPresent {
        identity: String,
        distance: f32,
        record: Option<AttendanceRecord>,
    },
    Unmatched {
        closest: Option<f32>,
    },
    NoFace,
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    Recognize {
        payload: String,
        reply: oneshot::Sender<Result<AttendanceReply, EngineError>>,
    },
    Enroll {
        name: String,
        payload: String,
        reply: oneshot::Sender<Result<EnrollmentOutcome, EngineError>>,
    },
    Reload {
        reply: oneshot::Sender<Result<usize, EngineError>>,
    },
    RemoveIdentity {
        name: String,
        reply: oneshot::Sender<Result<bool, EngineError>>,
    },
    TodayLog {
        reply: oneshot::Sender<Result<Vec<AttendanceRecord>, EngineError>>,
    },
    History {
        reply: oneshot::Sender<Result<Vec<AttendanceRecord>, EngineError>>,
    },
    DeleteRecord {
        id: String,
        reply: oneshot::Sender<Result<bool, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    gallery: Arc<FaceGallery>,
}

impl EngineHandle {
    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, EngineError>>) -> EngineRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Recognize the face in `payload` and record attendance on a match.
    pub async fn recognize(&self, payload: String) -> Result<AttendanceReply, EngineError> {
        self.call(|reply| EngineRequest::Recognize { payload, reply })
            .await
    }

    pub async fn enroll(
        &self,
        name: String,
        payload: String,
    ) -> Result<EnrollmentOutcome, EngineError> {
        self.call(|reply| EngineRequest::Enroll {
            name,
            payload,
            reply,
        })
        .await
    }

    pub async fn reload(&self) -> Result<usize, EngineError> {
        self.call(|reply| EngineRequest::Reload { reply }).await
    }

    pub async fn remove_identity(&self, name: String) -> Result<bool, EngineError> {
        self.call(|reply| EngineRequest::RemoveIdentity { name, reply })
            .await
    }

    pub async fn today_log(&self) -> Result<Vec<AttendanceRecord>, EngineError> {
        self.call(|reply| EngineRequest::TodayLog { reply }).await
    }

    pub async fn history(&self) -> Result<Vec<AttendanceRecord>, EngineError> {
        self.call(|reply| EngineRequest::History { reply }).await
    }

    pub async fn delete_record(&self, id: String) -> Result<bool, EngineError> {
        self.call(|reply| EngineRequest::DeleteRecord { id, reply })
            .await
    }

    /// Known identities, read from the current gallery snapshot without
    /// queueing behind model work.
    pub fn identities(&self) -> Vec<String> {
        let mut names = self.gallery.names();
        names.sort();
        names
    }

    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// State owned by the engine thread.
struct Engine {
    extractor: Box<dyn FaceExtractor>,
    pipeline: FacePipeline,
    gate: DedupGate<SqliteStore>,
}

impl Engine {
    fn recognize(&mut self, payload: &str) -> Result<AttendanceReply, EngineError> {
        let outcome = self.pipeline.recognize(self.extractor.as_mut(), payload)?;
        Ok(match outcome {
            RecognitionOutcome::Matched { identity, distance } => {
                match self.gate.record_if_absent(&identity, Local::now())? {
                    Decision::Accepted(record) => AttendanceReply::Recorded {
                        identity,
                        distance,
                        record,
                    },
                    Decision::AlreadyPresent(record) => AttendanceReply::AlreadyPresent {
                        identity,
                        distance,
                        record,
                    },
                }
            }
            RecognitionOutcome::Unmatched { closest } => AttendanceReply::Unmatched { closest },
            RecognitionOutcome::NoFaceDetected => AttendanceReply::NoFace,
        })
    }

    fn handle(&mut self, req: EngineRequest) {
        match req {
            EngineRequest::Recognize { payload, reply } => {
                let _ = reply.send(self.recognize(&payload));
            }
            EngineRequest::Enroll {
                name,
                payload,
                reply,
            } => {
                let result = self
                    .pipeline
                    .enroll(self.extractor.as_mut(), &name, &payload)
                    .map_err(EngineError::from);
                let _ = reply.send(result);
            }
            EngineRequest::Reload { reply } => {
                let result = self
                    .pipeline
                    .reload(self.extractor.as_mut())
                    .map_err(EngineError::from);
                let _ = reply.send(result);
            }
            EngineRequest::RemoveIdentity { name, reply } => {
                let result = self.pipeline.gallery().remove(&name).map_err(EngineError::from);
                let _ = reply.send(result);
            }
            EngineRequest::TodayLog { reply } => {
                let today = Local::now().date_naive();
                let result = self.gate.store().list_for_date(today).map_err(EngineError::from);
                let _ = reply.send(result);
            }
            EngineRequest::History { reply } => {
                let _ = reply.send(self.gate.store().list_all().map_err(EngineError::from));
            }
            EngineRequest::DeleteRecord { id, reply } => {
                let result = self.gate.store().delete(&id).map_err(EngineError::from);
                if let Ok(true) = result {
                    tracing::info!(id, "attendance record deleted");
                }
                let _ = reply.send(result);
            }
        }
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Loads both ONNX models, opens the attendance database and builds the
/// gallery before returning. Fails fast at startup if any of them is
/// unavailable.
pub fn spawn_engine(config: &Config) -> Result<EngineHandle, EngineError> {
    let extractor = OnnxExtractor::load_from_dir(&config.model_dir)?;
    tracing::info!(dir = %config.model_dir.display(), "face models loaded");

    let store = SqliteStore::open(&config.db_path)?;
    tracing::info!(path = %config.db_path.display(), "attendance database opened");

    let gallery = Arc::new(FaceGallery::open(&config.gallery_dir)?);
    start(Box::new(extractor), gallery, store, config)
}

fn start(
    mut extractor: Box<dyn FaceExtractor>,
    gallery: Arc<FaceGallery>,
    store: SqliteStore,
    config: &Config,
) -> Result<EngineHandle, EngineError> {
    let pipeline = FacePipeline::new(gallery.clone(), config.pipeline());
    pipeline.reload(extractor.as_mut())?;

    let mut engine = Engine {
        extractor,
        pipeline,
        gate: DedupGate::new(store),
    };

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("attendo-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                engine.handle(req);
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx, gallery })
}
