//! Synthetic shipping records.
//!
//! Each product has a typical package size and a mean weight. Weights get
//! Gaussian noise proportional to the mean, then a fraction of labels is
//! flipped to another product so the classes overlap.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const SMALL_PACKAGE: &str = "Small Package";
pub const LARGE_PACKAGE: &str = "Large Package";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid dataset configuration: {0}")]
    InvalidConfig(String),
}

/// One row of the dataset, in CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRecord {
    pub id: u64,
    pub package_weight_gr: f64,
    pub package_size: String,
    pub product_type: String,
}

/// With `probability`, a row of this product ships in `size` instead of the
/// pattern's usual package.
#[derive(Debug, Clone)]
pub struct SizeSwap {
    pub size: String,
    pub probability: f64,
}

#[derive(Debug, Clone)]
pub struct ProductPattern {
    pub product: String,
    pub package_size: String,
    pub mean_weight_gr: f64,
    pub size_swap: Option<SizeSwap>,
}

impl ProductPattern {
    pub fn new(product: impl Into<String>, package_size: impl Into<String>, mean_weight_gr: f64) -> Self {
        Self {
            product: product.into(),
            package_size: package_size.into(),
            mean_weight_gr,
            size_swap: None,
        }
    }

    pub fn with_size_swap(mut self, size: impl Into<String>, probability: f64) -> Self {
        self.size_swap = Some(SizeSwap { size: size.into(), probability });
        self
    }
}

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub rows: usize,
    pub seed: u64,
    /// Fraction of rows whose label is flipped to another product
    pub label_noise: f64,
    /// Weight standard deviation as a fraction of the product's mean weight
    pub weight_noise: f64,
    pub patterns: Vec<ProductPattern>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            rows: 5000,
            seed: 42,
            label_noise: 0.1,
            weight_noise: 0.25,
            patterns: vec![
                ProductPattern::new("Smartphone", SMALL_PACKAGE, 220.0),
                ProductPattern::new("Tablet", LARGE_PACKAGE, 550.0),
            ],
        }
    }
}

impl DatasetConfig {
    fn validate(&self) -> Result<(), DatasetError> {
        if self.patterns.len() < 2 {
            return Err(DatasetError::InvalidConfig("at least two product patterns are required".into()));
        }
        if self.rows < self.patterns.len() {
            return Err(DatasetError::InvalidConfig(format!(
                "{} rows cannot cover {} products",
                self.rows,
                self.patterns.len()
            )));
        }
        if !(0.0..=1.0).contains(&self.label_noise) {
            return Err(DatasetError::InvalidConfig(format!(
                "label noise must be within [0, 1], got {}",
                self.label_noise
            )));
        }
        let bad_swap = self
            .patterns
            .iter()
            .find(|p| p.size_swap.as_ref().is_some_and(|s| !(0.0..=1.0).contains(&s.probability)));
        if let Some(p) = bad_swap {
            return Err(DatasetError::InvalidConfig(format!(
                "size swap probability of '{}' must be within [0, 1]",
                p.product
            )));
        }
        if !(self.weight_noise.is_finite() && self.weight_noise >= 0.0) {
            return Err(DatasetError::InvalidConfig(format!(
                "weight noise must be a non-negative number, got {}",
                self.weight_noise
            )));
        }
        if let Some(p) = self.patterns.iter().find(|p| p.mean_weight_gr <= 0.0) {
            return Err(DatasetError::InvalidConfig(format!(
                "mean weight of '{}' must be positive",
                p.product
            )));
        }
        Ok(())
    }
}

/// Generates `config.rows` rounded down to a multiple of the product count.
///
/// Output is fully determined by the config, including the seed.
pub fn generate(config: &DatasetConfig) -> Result<Vec<ShippingRecord>, DatasetError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let per_product = config.rows / config.patterns.len();

    let mut rows: Vec<(String, f64, String)> = Vec::with_capacity(per_product * config.patterns.len());
    for pattern in &config.patterns {
        let std_dev = pattern.mean_weight_gr * config.weight_noise;
        for _ in 0..per_product {
            let size = match &pattern.size_swap {
                Some(swap) if rng.gen_bool(swap.probability) => swap.size.clone(),
                _ => pattern.package_size.clone(),
            };
            let mut weight = (sample_normal(&mut rng, pattern.mean_weight_gr, std_dev) * 100.0).round() / 100.0;
            if weight <= 0.0 {
                weight = pattern.mean_weight_gr;
            }
            rows.push((pattern.product.clone(), weight, size));
        }
    }

    let noisy = (config.rows as f64 * config.label_noise) as usize;
    log::info!("Applying label noise to {} random rows...", noisy);
    let mut labels: Vec<String> = rows.iter().map(|(product, _, _)| product.clone()).collect();
    for i in index::sample(&mut rng, rows.len(), noisy.min(rows.len())).into_vec() {
        let others: Vec<&ProductPattern> =
            config.patterns.iter().filter(|p| p.product != rows[i].0).collect();
        if let Some(pattern) = others.choose(&mut rng) {
            labels[i] = pattern.product.clone();
        }
    }

    let mut records: Vec<ShippingRecord> = rows
        .into_iter()
        .zip(labels)
        .map(|((_, weight, size), label)| ShippingRecord {
            id: 0,
            package_weight_gr: weight,
            package_size: size,
            product_type: label,
        })
        .collect();
    records.shuffle(&mut rng);
    for (i, record) in records.iter_mut().enumerate() {
        record.id = i as u64 + 1;
    }

    Ok(records)
}

/// Box-Muller draw from N(mean, std_dev).
fn sample_normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// Row count per product label, sorted by label.
pub fn class_distribution(records: &[ShippingRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.product_type.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn write_csv(path: impl AsRef<Path>, records: &[ShippingRecord]) -> Result<(), DatasetError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_csv(path: impl AsRef<Path>) -> Result<Vec<ShippingRecord>, DatasetError> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let records = reader.deserialize().collect::<Result<Vec<ShippingRecord>, _>>()?;
    Ok(records)
}
