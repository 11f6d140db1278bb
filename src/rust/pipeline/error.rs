use crate::encoder::EncoderError;

/// Who is responsible for a failed prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request referenced something the system cannot accept
    Client,
    /// Artifacts are loaded but disagree with each other
    Server,
    /// Artifacts never loaded; only a restart recovers
    Unavailable,
}

/// Represents the ways a single prediction can fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    /// Weight was zero, negative or not finite
    #[error("Invalid 'package_weight_gr' value: {0} (must be greater than zero)")]
    InvalidWeight(f64),
    /// A feature value was never seen when the encoders were fitted
    #[error("Invalid or unknown '{field}' value: '{value}'")]
    InvalidFeature {
        field: &'static str,
        value: String,
        #[source]
        source: EncoderError,
    },
    /// The model emitted a class the target encoder does not know
    #[error("Model prediction is incompatible with the target encoder (class code {code})")]
    ModelEncoderMismatch {
        code: usize,
        #[source]
        source: EncoderError,
    },
    /// The model returned something other than one class code for one row
    #[error("Model returned {returned} class codes for a single row")]
    ModelOutput { returned: usize },
    #[error("Service is not available: {reason}")]
    ServiceUnavailable { reason: String },
}

impl PredictionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidWeight(_) | Self::InvalidFeature { .. } => ErrorKind::Client,
            Self::ModelEncoderMismatch { .. } | Self::ModelOutput { .. } => ErrorKind::Server,
            Self::ServiceUnavailable { .. } => ErrorKind::Unavailable,
        }
    }
}
