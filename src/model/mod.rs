use std::path::Path;

use thiserror::Error;

pub mod pipeline;
#[cfg(feature = "torch")]
pub mod torch;

pub use pipeline::Pipeline;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid model: {0}")]
    Invalid(String),
    #[error("feature length mismatch: got {got}, expected {expected}")]
    FeatureLength { got: usize, expected: usize },
    #[error("inference failed: {0}")]
    Inference(String),
}

/// A fitted binary classifier over a fixed, named feature layout.
///
/// Rows passed to `predict_proba` and `predict` must already be aligned to
/// `expected_columns()`. Implementations are shared across request handlers.
pub trait Classifier: Send + Sync {
    /// Ordered input columns the model was fitted on.
    fn expected_columns(&self) -> &[String];

    /// Per-class probabilities, in the model's class order.
    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ModelError>;

    /// Discrete class label.
    fn predict(&self, row: &[f64]) -> Result<i64, ModelError>;

    fn backend(&self) -> &'static str;
}

/// Load a classifier from `path`, choosing the backend by extension.
pub fn load(path: &Path) -> Result<Box<dyn Classifier>, ModelError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        #[cfg(feature = "torch")]
        "pt" | "ts" => Ok(Box::new(torch::TorchModel::load(path)?)),
        #[cfg(not(feature = "torch"))]
        "pt" | "ts" => Err(ModelError::Invalid(format!(
            "{} is a TorchScript module; rebuild with the `torch` feature",
            path.display()
        ))),
        _ => Ok(Box::new(Pipeline::load(path)?)),
    }
}

pub(crate) fn check_len(row: &[f64], expected: usize) -> Result<(), ModelError> {
    if row.len() != expected {
        return Err(ModelError::FeatureLength {
            got: row.len(),
            expected,
        });
    }
    Ok(())
}

/// Index of the largest probability; ties go to the lowest index.
pub(crate) fn argmax(p: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in p.iter().enumerate() {
        match best {
            Some(b) if p[b] >= *v => {}
            _ => best = Some(i),
        }
    }
    best
}
