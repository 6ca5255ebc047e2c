use anyhow::{bail, Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::ApiError,
    features::FeatureRow,
    model::{Classifier, ModelError},
    types::{HealthOut, PatientRecord, PredictionOut},
};

/// Class-probability column holding the positive class.
const POSITIVE_CLASS: usize = 1;

#[derive(Clone)]
pub struct AppState {
    pub mdl: Arc<dyn Classifier>,
    pub log_pred: bool,
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Credentialed CORS restricted to `origins`; methods and headers are mirrored.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    if origins.iter().any(|o| o.trim() == "*") {
        bail!("wildcard CORS origin cannot be combined with credentials");
    }
    let list = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {o:?}")))
        .collect::<Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

/// Run an all-zeros row through both inference methods.
pub fn warmup(mdl: &dyn Classifier) -> Result<(), ModelError> {
    let zeros = vec![0.0; mdl.expected_columns().len()];
    mdl.predict_proba(&zeros)?;
    mdl.predict(&zeros)?;
    Ok(())
}

/// Reshape `rec` into the model's expected columns.
pub fn align_record(mdl: &dyn Classifier, rec: &PatientRecord) -> FeatureRow {
    FeatureRow::from_record(rec).align(mdl.expected_columns())
}

/// (label, positive-class probability) for an aligned row.
pub fn run_prediction(mdl: &dyn Classifier, row: &FeatureRow) -> Result<(i64, f64), ModelError> {
    let proba = mdl.predict_proba(row.values())?;
    let probability = *proba.get(POSITIVE_CLASS).ok_or_else(|| {
        ModelError::Inference(format!("expected at least 2 class probabilities, got {}", proba.len()))
    })?;
    let prediction = mdl.predict(row.values())?;
    Ok((prediction, probability))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PatientRecord>, JsonRejection>,
) -> Result<Json<PredictionOut>, ApiError> {
    let Json(rec) = payload?;

    let row = align_record(state.mdl.as_ref(), &rec);
    if state.log_pred {
        log_row(&row);
    }

    let (prediction, probability) = run_prediction(state.mdl.as_ref(), &row)?;

    if state.log_pred {
        tracing::info!(prediction, probability, "predicted");
    }
    Ok(Json(PredictionOut { prediction, probability }))
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    Json(HealthOut {
        status: "ok".to_string(),
        model: state.mdl.backend().to_string(),
        n_features: state.mdl.expected_columns().len(),
    })
}

// Debug signal so we can confirm we're not sending all-zeros
fn log_row(row: &FeatureRow) {
    let v = row.values();
    let nz = v.iter().filter(|x| **x != 0.0).count();
    let mean = if v.is_empty() { 0.0 } else { v.iter().sum::<f64>() / v.len() as f64 };
    let std = if v.len() < 2 {
        0.0
    } else {
        (v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / v.len() as f64).sqrt()
    };
    let sample: Vec<String> = row
        .columns()
        .iter()
        .zip(v)
        .take(6)
        .map(|(name, x)| format!("{name}={x:.3}"))
        .collect();
    tracing::info!(
        "recv in_dim={} nonzero={} mean={:.3} std={:.3} sample=[{}]",
        v.len(),
        nz,
        mean,
        std,
        sample.join(", ")
    );
}
