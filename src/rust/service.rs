//! Artifact lifecycle around the inference pipeline.
//!
//! A [`PredictionService`] goes through `Uninitialized -> Loading -> Ready`,
//! or ends in `Failed` if any artifact cannot be read. `Failed` is terminal:
//! the cause is kept and every later `predict` is refused with
//! [`PredictionError::ServiceUnavailable`]. Restarting the process is the only
//! recovery path.
//!
//! ```no_run
//! use shipclass::{ArtifactPaths, PredictionService};
//! use std::sync::Arc;
//!
//! let mut service = PredictionService::new(ArtifactPaths::default());
//! if let Err(e) = service.load() {
//!     eprintln!("artifacts unavailable: {e}");
//! }
//! // Read-only from here on; share without locks.
//! let service = Arc::new(service);
//! let label = service.predict(550.0, "Large Package");
//! ```

use crate::artifacts::{load_encoder, load_model, ArtifactError, ArtifactPaths};
use crate::model::Predictor;
use crate::pipeline::{FeatureVector, InferencePipeline, PredictionError};

/// Externally observable lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    Uninitialized,
    Loading,
    Ready,
    Failed { cause: String },
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to load artifact. Service cannot start. {0}")]
    Load(#[from] ArtifactError),
    #[error("Service already failed to load: {0}")]
    AlreadyFailed(String),
}

#[derive(Debug)]
enum State {
    Uninitialized(ArtifactPaths),
    /// Held only while `load` runs
    Loading,
    Ready(InferencePipeline),
    Failed(String),
}

#[derive(Debug)]
pub struct PredictionService {
    state: State,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<PredictionService>();
    }
};

impl PredictionService {
    /// Creates an unloaded service; call [`PredictionService::load`] next.
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            state: State::Uninitialized(paths),
        }
    }

    /// A service that is `Ready` with an already assembled pipeline.
    pub fn with_pipeline(pipeline: InferencePipeline) -> Self {
        Self {
            state: State::Ready(pipeline),
        }
    }

    /// Loads model, size encoder and target encoder, in that order.
    ///
    /// Only the first call does any work. Later calls return the outcome
    /// recorded by the first one without touching the filesystem again.
    pub fn load(&mut self) -> Result<(), ServiceError> {
        let paths = match std::mem::replace(&mut self.state, State::Loading) {
            State::Uninitialized(paths) => paths,
            previous => {
                self.state = previous;
                return match &self.state {
                    State::Failed(cause) => Err(ServiceError::AlreadyFailed(cause.clone())),
                    _ => Ok(()),
                };
            }
        };

        log::info!("Initializing PredictionService...");

        match Self::load_pipeline(&paths) {
            Ok(pipeline) => {
                log::info!(
                    "PredictionService initialized successfully ({} package sizes, {} product types)",
                    pipeline.package_sizes().len(),
                    pipeline.product_types().len()
                );
                self.state = State::Ready(pipeline);
                Ok(())
            }
            Err(e) => {
                log::error!("Could not initialize PredictionService: {}", e);
                self.state = State::Failed(e.to_string());
                Err(ServiceError::Load(e))
            }
        }
    }

    fn load_pipeline(paths: &ArtifactPaths) -> Result<InferencePipeline, ArtifactError> {
        log::info!("Loading model from: {:?}", paths.model);
        let model = load_model(&paths.model)?;
        if model.n_features() != FeatureVector::COLUMNS.len() {
            return Err(ArtifactError::Invalid {
                path: paths.model.clone(),
                reason: format!(
                    "model expects {} features, pipeline provides {}",
                    model.n_features(),
                    FeatureVector::COLUMNS.len()
                ),
            });
        }

        log::info!("Loading size encoder from: {:?}", paths.size_encoder);
        let size_encoder = load_encoder(&paths.size_encoder)?;

        log::info!("Loading target encoder from: {:?}", paths.type_encoder);
        let type_encoder = load_encoder(&paths.type_encoder)?;

        Ok(InferencePipeline::new(model, size_encoder, type_encoder))
    }

    pub fn status(&self) -> ServiceStatus {
        match &self.state {
            State::Uninitialized(_) => ServiceStatus::Uninitialized,
            State::Loading => ServiceStatus::Loading,
            State::Ready(_) => ServiceStatus::Ready,
            State::Failed(cause) => ServiceStatus::Failed { cause: cause.clone() },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Runs the pipeline, or refuses immediately when not `Ready`.
    pub fn predict(&self, weight: f64, size: &str) -> Result<String, PredictionError> {
        match &self.state {
            State::Ready(pipeline) => pipeline.predict(weight, size),
            State::Failed(cause) => Err(PredictionError::ServiceUnavailable {
                reason: cause.clone(),
            }),
            State::Uninitialized(_) | State::Loading => Err(PredictionError::ServiceUnavailable {
                reason: "artifacts are not loaded".into(),
            }),
        }
    }
}
