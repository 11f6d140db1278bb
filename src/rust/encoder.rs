//! Categorical label encoding.
//!
//! A [`LabelEncoder`] maps a finite vocabulary of string labels to dense codes
//! `0..k-1`. Codes are assigned by first appearance in the fitted sequence, so
//! fitting `["Small Package", "Large Package", "Small Package"]` yields
//! `Small Package -> 0` and `Large Package -> 1`.
//!
//! Encoders are immutable once fitted and are `Send + Sync`, so a single
//! instance can serve any number of concurrent readers.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::artifacts::{read_json, write_json, ArtifactError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncoderError {
    #[error("Unknown label '{0}'")]
    UnknownLabel(String),
    #[error("Unknown code {code} (encoder knows {known} classes)")]
    UnknownCode { code: usize, known: usize },
    #[error("Cannot fit an encoder on an empty label sequence")]
    EmptyFit,
}

/// Bidirectional string/code lookup used by the inference pipeline.
///
/// Implementations must be safe for unlimited concurrent read-only use.
pub trait Transformer: Send + Sync {
    /// Returns the code of a label seen at fit time.
    fn transform(&self, label: &str) -> Result<usize, EncoderError>;

    /// Returns the label behind a code in `0..classes().len()`.
    fn inverse_transform(&self, code: usize) -> Result<&str, EncoderError>;

    /// Fitted labels, indexed by code.
    fn classes(&self) -> &[String];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "EncoderDocument", try_from = "EncoderDocument")]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

/// On-disk shape: the position of a label is its code.
#[derive(Serialize, Deserialize)]
struct EncoderDocument {
    classes: Vec<String>,
}

impl From<LabelEncoder> for EncoderDocument {
    fn from(encoder: LabelEncoder) -> Self {
        Self { classes: encoder.classes }
    }
}

impl TryFrom<EncoderDocument> for LabelEncoder {
    type Error = String;

    fn try_from(doc: EncoderDocument) -> Result<Self, Self::Error> {
        let mut index = HashMap::with_capacity(doc.classes.len());
        for (code, label) in doc.classes.iter().enumerate() {
            if index.insert(label.clone(), code).is_some() {
                return Err(format!("duplicate label '{}' in encoder classes", label));
            }
        }
        Ok(Self { classes: doc.classes, index })
    }
}

impl LabelEncoder {
    /// Builds the mapping from the distinct labels of `labels`, in order of
    /// first appearance.
    pub fn fit<I, S>(labels: I) -> Result<Self, EncoderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes = Vec::new();
        let mut index = HashMap::new();
        for label in labels {
            let label = label.as_ref();
            if !index.contains_key(label) {
                index.insert(label.to_string(), classes.len());
                classes.push(label.to_string());
            }
        }

        if classes.is_empty() {
            return Err(EncoderError::EmptyFit);
        }
        Ok(Self { classes, index })
    }

    /// Encodes every label, failing on the first one outside the vocabulary.
    pub fn transform_many<I, S>(&self, labels: I) -> Result<Vec<usize>, EncoderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels.into_iter().map(|l| self.transform(l.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        write_json(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let encoder: Self = read_json(path)?;
        if encoder.is_empty() {
            return Err(ArtifactError::Invalid {
                path: path.to_path_buf(),
                reason: "encoder has no classes".into(),
            });
        }
        Ok(encoder)
    }
}

impl Transformer for LabelEncoder {
    fn transform(&self, label: &str) -> Result<usize, EncoderError> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| EncoderError::UnknownLabel(label.to_string()))
    }

    fn inverse_transform(&self, code: usize) -> Result<&str, EncoderError> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or(EncoderError::UnknownCode { code, known: self.classes.len() })
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<LabelEncoder>();
    }
};
