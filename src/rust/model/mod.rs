use ndarray::ArrayView2;

mod error;
mod tree;

pub use error::ModelError;
pub use tree::{DecisionTreeClassifier, Leaf, Node, TreeNode};

/// A pre-trained classifier treated as a black box.
///
/// Rows are feature vectors in the fixed column order the model was fitted
/// with; the result holds one class code per row. Implementations must be
/// safe for concurrent read-only prediction.
pub trait Predictor: Send + Sync {
    /// Number of feature columns expected per row.
    fn n_features(&self) -> usize;

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Vec<usize>;
}
