//! Diabetes risk prediction service.
//!
//! Loads a fitted binary classifier once at startup and serves `POST /predict`,
//! aligning each patient record to the model's expected feature columns.

pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod server;
pub mod types;

pub use config::Config;
pub use features::FeatureRow;
pub use model::{Classifier, ModelError};
pub use server::{router, AppState};
