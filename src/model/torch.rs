use parking_lot::Mutex;
use serde::Deserialize;
use std::{fs, path::Path};
use tch::{kind::Kind, CModule, Device, Tensor};

use super::{argmax, check_len, Classifier, ModelError};

#[derive(Deserialize)]
struct MetaJson {
    feat_list: Vec<String>,
    #[serde(default = "default_classes")]
    classes: Vec<i64>,
}

fn default_classes() -> Vec<i64> {
    vec![0, 1]
}

/// TorchScript classifier; forward maps `[1, n_features]` to `[1, n_classes]` logits.
pub struct TorchModel {
    model: Mutex<CModule>,
    device: Device,
    feat_list: Vec<String>,
    classes: Vec<i64>,
}

impl TorchModel {
    /// Loads `path` and its sidecar `<stem>.meta.json`.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let device = Device::Cpu;

        let meta_path = path.with_extension("meta.json");
        let meta_txt = fs::read_to_string(&meta_path).map_err(|source| ModelError::Io {
            path: meta_path.display().to_string(),
            source,
        })?;
        let meta: MetaJson = serde_json::from_str(&meta_txt).map_err(|source| ModelError::Parse {
            path: meta_path.display().to_string(),
            source,
        })?;
        if meta.feat_list.is_empty() {
            return Err(ModelError::Invalid("meta.feat_list is empty".into()));
        }

        let model = CModule::load_on_device(path, device)
            .map_err(|e| ModelError::Invalid(format!("failed to load TorchScript {}: {e}", path.display())))?;

        // Probe output shape with a dummy forward; expect [1, n_classes]
        let dummy = Tensor::zeros([1, meta.feat_list.len() as i64], (Kind::Float, device));
        let t = model
            .forward_ts(&[dummy])
            .map_err(|e| ModelError::Invalid(e.to_string()))?;
        let sz = t.size();
        if sz.len() != 2 || sz[0] != 1 || sz[1] as usize != meta.classes.len() {
            return Err(ModelError::Invalid(format!(
                "unexpected model output size: {sz:?} for {} classes",
                meta.classes.len()
            )));
        }

        Ok(Self {
            model: Mutex::new(model),
            device,
            feat_list: meta.feat_list,
            classes: meta.classes,
        })
    }
}

impl Classifier for TorchModel {
    fn expected_columns(&self) -> &[String] {
        &self.feat_list
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_len(row, self.feat_list.len())?;
        let x: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        let input = Tensor::from_slice(&x)
            .reshape([1, x.len() as i64])
            .to_device(self.device);

        let logits = self
            .model
            .lock()
            .forward_ts(&[input])
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let probs = logits.softmax(-1, Kind::Double);

        Ok((0..self.classes.len() as i64)
            .map(|i| probs.double_value(&[0, i]))
            .collect())
    }

    fn predict(&self, row: &[f64]) -> Result<i64, ModelError> {
        let p = self.predict_proba(row)?;
        let idx = argmax(&p).ok_or_else(|| ModelError::Inference("empty probabilities".into()))?;
        Ok(self.classes[idx])
    }

    fn backend(&self) -> &'static str {
        "torchscript"
    }
}
