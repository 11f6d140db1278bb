//! Offline fit/evaluate loop producing the serving artifacts.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::artifacts::{save_bundle, ArtifactError, ArtifactPaths};
use crate::dataset::ShippingRecord;
use crate::encoder::{EncoderError, LabelEncoder, Transformer};
use crate::model::{DecisionTreeClassifier, ModelError};
use crate::pipeline::FeatureVector;

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("Encoding failed: {0}")]
    Encoder(#[from] EncoderError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
}

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation, in (0, 1)
    pub test_size: f64,
    pub seed: u64,
    pub max_depth: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 1,
            max_depth: Some(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainedBundle {
    pub model: DecisionTreeClassifier,
    pub size_encoder: LabelEncoder,
    pub type_encoder: LabelEncoder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub tree_depth: usize,
    pub n_leaves: usize,
    pub package_sizes: Vec<String>,
    pub product_types: Vec<String>,
}

/// Shuffles the records with `seed` and holds out `ceil(n * test_size)` rows.
pub fn train_test_split(
    records: &[ShippingRecord],
    test_size: f64,
    seed: u64,
) -> Result<(Vec<&ShippingRecord>, Vec<&ShippingRecord>), TrainingError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TrainingError::InvalidSplit(format!(
            "test size must be within (0, 1), got {}",
            test_size
        )));
    }
    let n_test = (records.len() as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= records.len() {
        return Err(TrainingError::InvalidSplit(format!(
            "{} rows cannot be split with test size {}",
            records.len(),
            test_size
        )));
    }

    let mut shuffled: Vec<&ShippingRecord> = records.iter().collect();
    shuffled.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = shuffled.split_off(n_test);
    Ok((train, shuffled))
}

fn features(records: &[&ShippingRecord], size_encoder: &LabelEncoder) -> Result<Array2<f64>, EncoderError> {
    let rows = records
        .iter()
        .map(|r| {
            size_encoder
                .transform(&r.package_size)
                .map(|code| FeatureVector::new(r.package_weight_gr, code))
        })
        .collect::<Result<Vec<FeatureVector>, EncoderError>>()?;
    let n_cols = FeatureVector::COLUMNS.len();
    Ok(Array2::from_shape_fn((rows.len(), n_cols), |(i, j)| rows[i].values()[j]))
}

/// Fits both encoders on the training split only, then the tree.
///
/// A test row with a size or product unseen in training fails the run with
/// an encoder error instead of being dropped.
pub fn train(
    records: &[ShippingRecord],
    config: &TrainingConfig,
) -> Result<(TrainedBundle, TrainingReport), TrainingError> {
    log::info!("Splitting data... Test size: {}", config.test_size);
    let (train, test) = train_test_split(records, config.test_size, config.seed)?;
    log::info!("Train rows: {}, test rows: {}", train.len(), test.len());

    log::info!("Encoding data...");
    let size_encoder = LabelEncoder::fit(train.iter().map(|r| r.package_size.as_str()))?;
    let type_encoder = LabelEncoder::fit(train.iter().map(|r| r.product_type.as_str()))?;

    let x_train = features(&train, &size_encoder)?;
    let x_test = features(&test, &size_encoder)?;
    let y_train = type_encoder.transform_many(train.iter().map(|r| r.product_type.as_str()))?;
    let y_test = type_encoder.transform_many(test.iter().map(|r| r.product_type.as_str()))?;

    log::info!("Fitting decision tree...");
    let mut model = DecisionTreeClassifier::new();
    if let Some(depth) = config.max_depth {
        model = model.with_max_depth(depth);
    }
    model.fit(&x_train, &y_train)?;

    let train_accuracy = model.score(&x_train, &y_train)?;
    let test_accuracy = model.score(&x_test, &y_test)?;
    log::info!("Train accuracy: {:.4}, test accuracy: {:.4}", train_accuracy, test_accuracy);

    let tree = model.tree().ok_or(ModelError::NotFitted)?;
    let report = TrainingReport {
        train_rows: train.len(),
        test_rows: test.len(),
        train_accuracy,
        test_accuracy,
        tree_depth: tree.depth(),
        n_leaves: tree.n_leaves(),
        package_sizes: size_encoder.classes().to_vec(),
        product_types: type_encoder.classes().to_vec(),
    };

    Ok((TrainedBundle { model, size_encoder, type_encoder }, report))
}

/// Trains and writes model, size encoder and target encoder to `paths`.
pub fn train_and_save(
    records: &[ShippingRecord],
    config: &TrainingConfig,
    paths: &ArtifactPaths,
) -> Result<TrainingReport, TrainingError> {
    let (bundle, report) = train(records, config)?;
    log::info!("Saving artifacts...");
    save_bundle(paths, &bundle.model, &bundle.size_encoder, &bundle.type_encoder)?;
    Ok(report)
}
