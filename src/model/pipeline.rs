use serde::Deserialize;
use std::{fs, path::Path};

use super::{argmax, check_len, Classifier, ModelError};

/// Preprocessing step applied to the aligned row before the estimator.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    StandardScaler { mean: Vec<f64>, scale: Vec<f64> },
    MinMaxScaler { min: Vec<f64>, scale: Vec<f64> },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression { coef: Vec<f64>, intercept: f64 },
}

#[derive(Debug, Clone, Deserialize)]
struct PipelineJson {
    feature_names_in: Vec<String>,
    #[serde(default = "default_classes")]
    classes: Vec<i64>,
    #[serde(default)]
    steps: Vec<Step>,
    estimator: Estimator,
}

fn default_classes() -> Vec<i64> {
    vec![0, 1]
}

/// Fitted scaler(s) + logistic regression, loaded from JSON.
#[derive(Debug, Clone)]
pub struct Pipeline {
    feature_names_in: Vec<String>,
    classes: Vec<i64>,
    steps: Vec<Step>,
    estimator: Estimator,
}

impl Pipeline {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let txt = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let raw: PipelineJson = serde_json::from_str(&txt).map_err(|source| ModelError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_parts(raw.feature_names_in, raw.classes, raw.steps, raw.estimator)
    }

    pub fn from_parts(
        feature_names_in: Vec<String>,
        classes: Vec<i64>,
        steps: Vec<Step>,
        estimator: Estimator,
    ) -> Result<Self, ModelError> {
        let n = feature_names_in.len();
        if n == 0 {
            return Err(ModelError::Invalid("feature_names_in is empty".into()));
        }
        if classes.len() != 2 {
            return Err(ModelError::Invalid(format!(
                "expected 2 classes, got {}",
                classes.len()
            )));
        }
        for (i, step) in steps.iter().enumerate() {
            let (a, b) = match step {
                Step::StandardScaler { mean, scale } => (mean.len(), scale.len()),
                Step::MinMaxScaler { min, scale } => (min.len(), scale.len()),
            };
            if a != n || b != n {
                return Err(ModelError::Invalid(format!(
                    "step {i}: parameter length ({a}, {b}) != n_features ({n})"
                )));
            }
        }
        let Estimator::LogisticRegression { coef, .. } = &estimator;
        if coef.len() != n {
            return Err(ModelError::Invalid(format!(
                "coef length {} != n_features ({n})",
                coef.len()
            )));
        }
        Ok(Self {
            feature_names_in,
            classes,
            steps,
            estimator,
        })
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        let mut x = row.to_vec();
        for step in &self.steps {
            match step {
                Step::StandardScaler { mean, scale } => {
                    for ((v, m), s) in x.iter_mut().zip(mean).zip(scale) {
                        // zero-variance column: center only
                        let s = if *s == 0.0 { 1.0 } else { *s };
                        *v = (*v - m) / s;
                    }
                }
                Step::MinMaxScaler { min, scale } => {
                    for ((v, m), s) in x.iter_mut().zip(min).zip(scale) {
                        *v = *v * s + m;
                    }
                }
            }
        }
        x
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for Pipeline {
    fn expected_columns(&self) -> &[String] {
        &self.feature_names_in
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_len(row, self.feature_names_in.len())?;
        let x = self.transform(row);
        let Estimator::LogisticRegression { coef, intercept } = &self.estimator;
        let z = coef.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>() + intercept;
        let p1 = sigmoid(z);
        if !p1.is_finite() {
            return Err(ModelError::Inference(format!("non-finite decision value {z}")));
        }
        Ok(vec![1.0 - p1, p1])
    }

    fn predict(&self, row: &[f64]) -> Result<i64, ModelError> {
        let p = self.predict_proba(row)?;
        let idx = argmax(&p).ok_or_else(|| ModelError::Inference("empty probabilities".into()))?;
        Ok(self.classes[idx])
    }

    fn backend(&self) -> &'static str {
        "pipeline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    fn lr(coef: Vec<f64>, intercept: f64) -> Estimator {
        Estimator::LogisticRegression { coef, intercept }
    }

    #[test]
    fn zero_logit_is_even_odds() {
        let p = Pipeline::from_parts(names(&["a", "b"]), vec![0, 1], vec![], lr(vec![0.0, 0.0], 0.0))
            .unwrap();
        let proba = p.predict_proba(&[3.0, 4.0]).unwrap();
        assert_eq!(proba, vec![0.5, 0.5]);
        // tie resolves to the first class
        assert_eq!(p.predict(&[3.0, 4.0]).unwrap(), 0);
    }

    #[test]
    fn scaler_is_applied_before_estimator() {
        let steps = vec![Step::StandardScaler {
            mean: vec![10.0],
            scale: vec![2.0],
        }];
        let p = Pipeline::from_parts(names(&["a"]), vec![0, 1], steps, lr(vec![1.0], 0.0)).unwrap();
        // (14 - 10) / 2 = 2 -> sigmoid(2)
        let proba = p.predict_proba(&[14.0]).unwrap();
        assert!((proba[1] - sigmoid(2.0)).abs() < 1e-12);
        assert_eq!(p.predict(&[14.0]).unwrap(), 1);
        assert_eq!(p.predict(&[6.0]).unwrap(), 0);
    }

    #[test]
    fn min_max_scaler() {
        let steps = vec![Step::MinMaxScaler {
            min: vec![-1.0],
            scale: vec![0.5],
        }];
        let p = Pipeline::from_parts(names(&["a"]), vec![0, 1], steps, lr(vec![1.0], 0.0)).unwrap();
        // 4 * 0.5 - 1 = 1
        let proba = p.predict_proba(&[4.0]).unwrap();
        assert!((proba[1] - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let p = Pipeline::from_parts(names(&["a", "b"]), vec![0, 1], vec![], lr(vec![0.7, -1.3], 0.2))
            .unwrap();
        let proba = p.predict_proba(&[1.5, 0.25]).unwrap();
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&proba[1]));
    }

    #[test]
    fn wrong_row_length_is_rejected() {
        let p = Pipeline::from_parts(names(&["a", "b"]), vec![0, 1], vec![], lr(vec![1.0, 1.0], 0.0))
            .unwrap();
        let err = p.predict_proba(&[1.0]).unwrap_err();
        assert!(matches!(err, ModelError::FeatureLength { got: 1, expected: 2 }));
    }

    #[test]
    fn mismatched_shapes_fail_to_build() {
        assert!(Pipeline::from_parts(names(&["a", "b"]), vec![0, 1], vec![], lr(vec![1.0], 0.0)).is_err());
        assert!(Pipeline::from_parts(names(&["a"]), vec![0, 1, 2], vec![], lr(vec![1.0], 0.0)).is_err());
        assert!(Pipeline::from_parts(vec![], vec![0, 1], vec![], lr(vec![], 0.0)).is_err());
        let bad_step = vec![Step::StandardScaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0],
        }];
        assert!(Pipeline::from_parts(names(&["a", "b"]), vec![0, 1], bad_step, lr(vec![1.0, 1.0], 0.0)).is_err());
    }

    #[test]
    fn loads_from_json_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{
                "feature_names_in": ["age", "bmi"],
                "steps": [{{"kind": "standard_scaler", "mean": [40.0, 25.0], "scale": [10.0, 5.0]}}],
                "estimator": {{"kind": "logistic_regression", "coef": [0.5, 0.5], "intercept": -0.1}}
            }}"#
        )
        .unwrap();
        let p = Pipeline::load(f.path()).unwrap();
        assert_eq!(p.expected_columns(), &names(&["age", "bmi"])[..]);
        assert_eq!(p.classes, vec![0, 1]);
        assert_eq!(p.backend(), "pipeline");
    }

    #[test]
    fn corrupt_json_is_parse_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        let err = Pipeline::load(f.path()).unwrap_err();
        assert!(matches!(err, ModelError::Parse { .. }));
    }
}
