//! Predicts a product type from a package's weight and size.
//!
//! The crate covers the whole loop: synthetic data, offline training,
//! artifact files, and an HTTP service wrapping the inference pipeline.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use shipclass::{DecisionTreeClassifier, InferencePipeline, LabelEncoder};
//! use ndarray::array;
//!
//! let sizes = LabelEncoder::fit(["Small Package", "Large Package"])?;
//! let types = LabelEncoder::fit(["Smartphone", "Tablet"])?;
//!
//! let mut model = DecisionTreeClassifier::new().with_max_depth(3);
//! model.fit(
//!     &array![[220.0, 0.0], [180.0, 0.0], [550.0, 1.0], [610.0, 1.0]],
//!     &[0, 0, 1, 1],
//! )?;
//!
//! let pipeline = InferencePipeline::new(model, sizes, types);
//! assert_eq!(pipeline.predict(550.0, "Large Package")?, "Tablet");
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! A loaded [`PredictionService`] is read-only and can be shared across
//! request handlers with `Arc`, without locks.

pub mod api;
pub mod artifacts;
pub mod client;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod model;
pub mod pipeline;
pub mod service;
pub mod training;

pub use api::{create_router, ApiServer, ApiServerHandle, PredictionRequest, PredictionResponse};
pub use artifacts::{ArtifactError, ArtifactPaths};
pub use client::{ClientError, ClientResponse, PredictClient};
pub use dataset::{DatasetConfig, DatasetError, ShippingRecord};
pub use encoder::{EncoderError, LabelEncoder, Transformer};
pub use model::{DecisionTreeClassifier, ModelError, Predictor};
pub use pipeline::{ErrorKind, FeatureVector, InferencePipeline, PredictionError};
pub use service::{PredictionService, ServiceError, ServiceStatus};
pub use training::{TrainingConfig, TrainingError, TrainingReport};

/// Logs at `info` unless `RUST_LOG` says otherwise.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
