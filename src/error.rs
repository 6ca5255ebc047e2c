use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Body failed to parse or did not match the patient schema.
    #[error("{message}")]
    Validation { status: StatusCode, message: String },
    #[error(transparent)]
    Inference(#[from] ModelError),
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        ApiError::Validation {
            status: r.status(),
            message: r.body_text(),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { status, .. } => *status,
            ApiError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "prediction failed");
        } else {
            tracing::debug!(error = %self, "rejected request");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_errors_are_500() {
        let e = ApiError::from(ModelError::FeatureLength { got: 3, expected: 12 });
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.to_string().contains("got 3, expected 12"));
    }

    #[test]
    fn validation_keeps_status() {
        let e = ApiError::Validation {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "missing field `age`".into(),
        };
        assert_eq!(e.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
