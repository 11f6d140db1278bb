use std::path::Path;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::Predictor;
use crate::artifacts::{read_json, write_json, ArtifactError};

/// Internal split node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Samples with `feature <= threshold` go left
    pub threshold: f64,
    pub left: Box<TreeNode>,
    pub right: Box<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub class_label: usize,
    /// Number of training samples that reached this leaf
    pub n_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Node(Node),
    Leaf(Leaf),
}

impl TreeNode {
    /// Leaves have depth 0, internal nodes 1 + max(left, right).
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 0,
            TreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 1,
            TreeNode::Node(node) => node.left.n_leaves() + node.right.n_leaves(),
        }
    }

    /// Highest feature index any split reads, `None` for a single leaf.
    pub fn max_feature_idx(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf(_) => None,
            TreeNode::Node(node) => [node.left.max_feature_idx(), node.right.max_feature_idx()]
                .into_iter()
                .flatten()
                .fold(Some(node.feature_idx), |acc, idx| acc.max(Some(idx))),
        }
    }
}

/// CART decision tree classifier using Gini impurity.
///
/// Split thresholds are midpoints between adjacent distinct feature values.
/// When several classes tie for the majority at a leaf, the smallest class
/// code wins, which keeps fitting deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    tree: Option<TreeNode>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    n_features: usize,
    n_classes: usize,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeClassifier {
    pub fn new() -> Self {
        Self {
            tree: None,
            max_depth: None,
            min_samples_split: 2,
            n_features: 0,
            n_classes: 0,
        }
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Nodes with fewer samples than this become leaves.
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.tree.is_some()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn tree(&self) -> Option<&TreeNode> {
        self.tree.as_ref()
    }

    /// Fits the tree to `x` (n_samples x n_features) and class codes `y`.
    pub fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ModelError> {
        let (n_rows, n_cols) = x.dim();
        if n_rows != y.len() {
            return Err(ModelError::ShapeMismatch { rows: n_rows, labels: y.len() });
        }
        if n_rows == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }

        // Codes come from a label encoder, so the largest one is below the sample count
        let n_classes = match y.iter().copied().max() {
            Some(label) if label < n_rows => label + 1,
            Some(label) => return Err(ModelError::ClassOutOfRange { label, n_samples: n_rows }),
            None => 0,
        };
        let mut indices: Vec<usize> = (0..n_rows).collect();
        let builder = TreeBuilder {
            x: x.view(),
            y,
            n_classes,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
        };
        let tree = builder.build(&mut indices, 0);

        log::info!(
            "Fitted decision tree on {} samples: depth {}, {} leaves",
            n_rows,
            tree.depth(),
            tree.n_leaves()
        );
        self.tree = Some(tree);
        self.n_features = n_cols;
        self.n_classes = n_classes;
        Ok(())
    }

    fn predict_row(tree: &TreeNode, row: ArrayView1<'_, f64>) -> Option<usize> {
        let mut node = tree;
        loop {
            match node {
                TreeNode::Leaf(leaf) => return Some(leaf.class_label),
                TreeNode::Node(internal) => {
                    node = if *row.get(internal.feature_idx)? <= internal.threshold {
                        &internal.left
                    } else {
                        &internal.right
                    };
                }
            }
        }
    }

    /// Fraction of rows in `x` whose prediction equals `y`.
    pub fn score(&self, x: &Array2<f64>, y: &[usize]) -> Result<f64, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        if x.nrows() != y.len() {
            return Err(ModelError::ShapeMismatch { rows: x.nrows(), labels: y.len() });
        }
        if y.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let predictions = Predictor::predict(self, x.view());
        let correct = predictions.iter().zip(y).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / y.len() as f64)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        write_json(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let model: Self = read_json(path)?;
        let invalid = |reason: String| ArtifactError::Invalid {
            path: path.to_path_buf(),
            reason,
        };

        let tree = model.tree.as_ref().ok_or_else(|| invalid("model has no fitted tree".into()))?;
        if let Some(idx) = tree.max_feature_idx().filter(|&idx| idx >= model.n_features) {
            return Err(invalid(format!(
                "split on feature {} but the model has {} features",
                idx, model.n_features
            )));
        }
        Ok(model)
    }
}

impl Predictor for DecisionTreeClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Vec<usize> {
        let Some(tree) = self.tree.as_ref() else {
            log::warn!("Predict called on an unfitted decision tree");
            return Vec::new();
        };
        if rows.ncols() < self.n_features {
            log::warn!(
                "Feature count mismatch: model was trained with {} features but input has {}",
                self.n_features,
                rows.ncols()
            );
            return Vec::new();
        }
        rows.rows()
            .into_iter()
            .map(|row| Self::predict_row(tree, row))
            .collect::<Option<Vec<usize>>>()
            .unwrap_or_default()
    }
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [usize],
    n_classes: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

struct Split {
    feature_idx: usize,
    threshold: f64,
    impurity: f64,
}

impl TreeBuilder<'_> {
    fn build(&self, indices: &mut [usize], depth: usize) -> TreeNode {
        let counts = self.class_counts(indices);
        let leaf = TreeNode::Leaf(Leaf {
            class_label: majority_class(&counts),
            n_samples: indices.len(),
        });

        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if is_pure || depth_reached || indices.len() < self.min_samples_split {
            return leaf;
        }

        let parent_impurity = gini(&counts, indices.len());
        let Some(split) = self.best_split(indices, &counts) else {
            return leaf;
        };
        if split.impurity >= parent_impurity - f64::EPSILON {
            return leaf;
        }

        let mut left: Vec<usize> = Vec::new();
        let mut right: Vec<usize> = Vec::new();
        for &i in indices.iter() {
            if self.x[[i, split.feature_idx]] <= split.threshold {
                left.push(i);
            } else {
                right.push(i);
            }
        }
        // Adjacent floats can round the midpoint onto `next`
        if left.is_empty() || right.is_empty() {
            return leaf;
        }

        TreeNode::Node(Node {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left: Box::new(self.build(&mut left, depth + 1)),
            right: Box::new(self.build(&mut right, depth + 1)),
        })
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Sweeps every feature in sorted order, moving one sample at a time from
    /// the right partition to the left one.
    fn best_split(&self, indices: &mut [usize], counts: &[usize]) -> Option<Split> {
        let n = indices.len();
        let mut best: Option<Split> = None;

        for feature_idx in 0..self.x.ncols() {
            indices.sort_by(|&a, &b| self.x[[a, feature_idx]].total_cmp(&self.x[[b, feature_idx]]));

            let mut left_counts = vec![0; self.n_classes];
            let mut right_counts = counts.to_vec();

            for k in 0..n - 1 {
                let label = self.y[indices[k]];
                left_counts[label] += 1;
                right_counts[label] -= 1;

                let here = self.x[[indices[k], feature_idx]];
                let next = self.x[[indices[k + 1], feature_idx]];
                if here == next {
                    continue;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                let impurity = (n_left as f64 * gini(&left_counts, n_left)
                    + n_right as f64 * gini(&right_counts, n_right))
                    / n as f64;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(Split {
                        feature_idx,
                        threshold: here + (next - here) / 2.0,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / total).powi(2)).sum::<f64>()
}

fn majority_class(counts: &[usize]) -> usize {
    let mut best = 0;
    for (label, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = label;
        }
    }
    best
}
