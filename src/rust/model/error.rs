#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Cannot fit with zero samples")]
    EmptyTrainingSet,
    #[error("Number of samples in X ({rows}) and y ({labels}) must match")]
    ShapeMismatch { rows: usize, labels: usize },
    #[error("Class code {label} is not below the sample count {n_samples}")]
    ClassOutOfRange { label: usize, n_samples: usize },
    #[error("Model is not fitted")]
    NotFitted,
}
