use anyhow::{bail, Context, Result};
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

pub const DEFAULT_MODEL_PATH: &str = "model/diabetes_pipeline.json";
pub const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Per-prediction debug logging (`LOG_PRED=1`).
    pub log_pred: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
            cors_origins: DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect(),
            log_pred: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key/value source; unset keys keep their defaults.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(p) = get("MODEL_PATH").filter(|s| !s.trim().is_empty()) {
            cfg.model_path = PathBuf::from(p);
        }
        if let Some(h) = get("HOST") {
            cfg.host = h
                .trim()
                .parse()
                .with_context(|| format!("invalid HOST {h:?}"))?;
        }
        if let Some(p) = get("PORT") {
            cfg.port = p
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT {p:?}"))?;
        }
        if let Some(o) = get("CORS_ORIGINS") {
            let origins: Vec<String> = o
                .split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if origins.is_empty() {
                bail!("CORS_ORIGINS is set but lists no origins");
            }
            if origins.iter().any(|o| o == "*") {
                bail!("CORS_ORIGINS cannot contain `*` when credentials are allowed");
            }
            cfg.cors_origins = origins;
        }
        cfg.log_pred = get("LOG_PRED").as_deref().map(str::trim) == Some("1");

        Ok(cfg)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Locate the model file: as given, then next to the executable.
    pub fn resolve_model_path(&self) -> PathBuf {
        if self.model_path.is_absolute() || self.model_path.exists() {
            return self.model_path.clone();
        }
        if let Ok(mut p) = std::env::current_exe() {
            p.pop(); // exe dir
            p.push(&self.model_path);
            if p.exists() {
                return p;
            }
        }
        // Fall back to the configured path; loading reports the error
        self.model_path.clone()
    }
}
