//! Service config loader (strict parsing).

pub mod schema;

use std::fs;

use taskmeter_core::error::{MeterError, Result};

pub use schema::{ServerSection, ServiceConfig};
pub use taskmeter_core::MetricsSettings;

/// Overrides `metrics.token` when set and non-empty.
pub const TOKEN_ENV: &str = "TASKMETER_METRICS_TOKEN";

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MeterError::Internal(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg: ServiceConfig = serde_yaml::from_str(s)
        .map_err(|e| MeterError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

impl ServiceConfig {
    /// Pull secrets from the environment so they can stay out of the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.metrics.token = token.trim().to_string();
                tracing::info!(var = TOKEN_ENV, "metrics token taken from environment");
            }
        }
    }
}
