//! Single-row inference: encode, arrange, predict, decode.

use ndarray::Array2;

mod error;

pub use error::{ErrorKind, PredictionError};

use crate::encoder::Transformer;
use crate::model::Predictor;

/// Feature name reported when the size label is rejected.
pub const PACKAGE_SIZE_FIELD: &str = "package_size";

/// One model input row.
///
/// The model was fitted on columns in [`FeatureVector::COLUMNS`] order and
/// silently misreads a swapped row, so rows are only ever built through
/// [`FeatureVector::to_row`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub package_weight_gr: f64,
    pub package_size_code: usize,
}

impl FeatureVector {
    pub const COLUMNS: [&'static str; 2] = ["package_weight_gr", "package_size"];

    pub fn new(package_weight_gr: f64, package_size_code: usize) -> Self {
        Self { package_weight_gr, package_size_code }
    }

    /// Column values in [`FeatureVector::COLUMNS`] order.
    pub fn values(&self) -> [f64; 2] {
        [self.package_weight_gr, self.package_size_code as f64]
    }

    pub fn to_row(&self) -> Array2<f64> {
        let values = self.values();
        Array2::from_shape_fn((1, values.len()), |(_, col)| values[col])
    }
}

/// Composes a size encoder, a classifier and a target encoder into
/// `predict(weight, size) -> label`.
///
/// Every step is pure and deterministic, so failures are returned
/// immediately and never retried. The pipeline is `Send + Sync` and is meant
/// to be shared read-only behind an `Arc`.
pub struct InferencePipeline {
    model: Box<dyn Predictor>,
    size_encoder: Box<dyn Transformer>,
    type_encoder: Box<dyn Transformer>,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("n_features", &self.model.n_features())
            .field("package_sizes", &self.size_encoder.classes())
            .field("product_types", &self.type_encoder.classes())
            .finish()
    }
}

impl InferencePipeline {
    pub fn new(
        model: impl Predictor + 'static,
        size_encoder: impl Transformer + 'static,
        type_encoder: impl Transformer + 'static,
    ) -> Self {
        Self {
            model: Box::new(model),
            size_encoder: Box::new(size_encoder),
            type_encoder: Box::new(type_encoder),
        }
    }

    /// Labels the pipeline can return.
    pub fn product_types(&self) -> &[String] {
        self.type_encoder.classes()
    }

    /// Package sizes the pipeline accepts.
    pub fn package_sizes(&self) -> &[String] {
        self.size_encoder.classes()
    }

    /// Predicts the product type for one package.
    ///
    /// # Errors
    /// - `InvalidWeight` if `weight` is not a finite value above zero
    /// - `InvalidFeature` if `size` was not seen when the size encoder was fitted
    /// - `ModelOutput` if the model does not answer with exactly one class code
    /// - `ModelEncoderMismatch` if that code is unknown to the target encoder
    pub fn predict(&self, weight: f64, size: &str) -> Result<String, PredictionError> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(PredictionError::InvalidWeight(weight));
        }

        let size_code = self.size_encoder.transform(size).map_err(|source| {
            log::warn!("Unknown '{}' value: {}", PACKAGE_SIZE_FIELD, size);
            PredictionError::InvalidFeature {
                field: PACKAGE_SIZE_FIELD,
                value: size.to_string(),
                source,
            }
        })?;

        let row = FeatureVector::new(weight, size_code).to_row();
        let codes = self.model.predict(row.view());
        let code = match codes.as_slice() {
            [code] => *code,
            other => {
                log::error!("Model returned {} class codes for one row", other.len());
                return Err(PredictionError::ModelOutput { returned: other.len() });
            }
        };

        let label = self.type_encoder.inverse_transform(code).map_err(|source| {
            log::error!(
                "Model returned a class index '{}' that the target encoder does not know",
                code
            );
            PredictionError::ModelEncoderMismatch { code, source }
        })?;

        Ok(label.to_string())
    }
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<InferencePipeline>();
    }
};
