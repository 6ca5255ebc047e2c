use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use diabetes_predictor::{config::Config, model, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env()?;

    let model_path = cfg.resolve_model_path();
    let mdl = model::load(&model_path)
        .with_context(|| format!("failed to load model from {}", model_path.display()))?;
    tracing::info!(
        "loaded {} model from {}; feature_names_in[{}]: {:?}",
        mdl.backend(),
        model_path.display(),
        mdl.expected_columns().len(),
        mdl.expected_columns()
    );

    // Warmup so a broken artifact fails before we accept traffic
    server::warmup(mdl.as_ref()).context("warmup inference failed")?;
    tracing::info!("warmup inference ok");

    let state = server::AppState {
        mdl: Arc::from(mdl),
        log_pred: cfg.log_pred,
    };
    let cors = server::cors_layer(&cfg.cors_origins)?;
    tracing::info!("cors origins: {:?}", cfg.cors_origins);

    let app = server::router(state, cors);

    let addr = cfg.addr();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let term = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = term => {},
    }
}
