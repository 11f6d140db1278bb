use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::encoder::LabelEncoder;
use crate::model::DecisionTreeClassifier;

pub const DEFAULT_MODEL_PATH: &str = "modelling/artifacts/model.json";
pub const DEFAULT_SIZE_ENCODER_PATH: &str = "pre_processing/data/artifacts/package_size_encoder.json";
pub const DEFAULT_TYPE_ENCODER_PATH: &str = "pre_processing/data/artifacts/product_type_encoder.json";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to deserialize {}: {source}", path.display())]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid artifact {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Locations of the three artifacts a prediction service needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub size_encoder: PathBuf,
    pub type_encoder: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from(DEFAULT_MODEL_PATH),
            size_encoder: PathBuf::from(DEFAULT_SIZE_ENCODER_PATH),
            type_encoder: PathBuf::from(DEFAULT_TYPE_ENCODER_PATH),
        }
    }
}

impl ArtifactPaths {
    pub fn new(
        model: impl Into<PathBuf>,
        size_encoder: impl Into<PathBuf>,
        type_encoder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model: model.into(),
            size_encoder: size_encoder.into(),
            type_encoder: type_encoder.into(),
        }
    }

    /// All three artifacts under one directory, using the default file names.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join("model.json"),
            size_encoder: dir.join("package_size_encoder.json"),
            type_encoder: dir.join("product_type_encoder.json"),
        }
    }

    pub fn all_exist(&self) -> bool {
        log::info!("Checking artifacts:");
        log::info!("  Model path: {:?} (exists: {})", self.model, self.model.exists());
        log::info!("  Size encoder path: {:?} (exists: {})", self.size_encoder, self.size_encoder.exists());
        log::info!("  Type encoder path: {:?} (exists: {})", self.type_encoder, self.type_encoder.exists());
        self.model.exists() && self.size_encoder.exists() && self.type_encoder.exists()
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ArtifactError::NotFound { path: path.to_path_buf() },
        _ => ArtifactError::Io { path: path.to_path_buf(), source },
    })?;
    log::debug!("Read {} bytes from {:?}", bytes.len(), path);
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Deserialize {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    log::info!("Writing {} bytes to {:?}", bytes.len(), path);
    fs::write(path, bytes).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_model(path: &Path) -> Result<DecisionTreeClassifier, ArtifactError> {
    DecisionTreeClassifier::load(path)
}

pub fn load_encoder(path: &Path) -> Result<LabelEncoder, ArtifactError> {
    LabelEncoder::load(path)
}

/// Persists a trained bundle so that [`crate::PredictionService::load`] can
/// read it back unmodified.
pub fn save_bundle(
    paths: &ArtifactPaths,
    model: &DecisionTreeClassifier,
    size_encoder: &LabelEncoder,
    type_encoder: &LabelEncoder,
) -> Result<(), ArtifactError> {
    model.save(&paths.model)?;
    size_encoder.save(&paths.size_encoder)?;
    type_encoder.save(&paths.type_encoder)?;
    Ok(())
}
