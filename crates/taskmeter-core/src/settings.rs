use serde::Deserialize;

use crate::error::{MeterError, Result};

/// `metrics:` section of the service config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSettings {
    /// Master switch. When off every mutation is a no-op; exposition still renders.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Bearer secret for the exposition endpoint. Empty means nobody may read.
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_active_window_minutes")]
    pub active_window_minutes: u64,

    #[serde(default = "default_cleanup_interval_minutes")]
    pub cleanup_interval_minutes: u64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            token: String::new(),
            active_window_minutes: default_active_window_minutes(),
            cleanup_interval_minutes: default_cleanup_interval_minutes(),
        }
    }
}

impl MetricsSettings {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1440).contains(&self.active_window_minutes) {
            return Err(MeterError::BadConfig(
                "metrics.active_window_minutes must be between 1 and 1440".into(),
            ));
        }
        if !(1..=1440).contains(&self.cleanup_interval_minutes) {
            return Err(MeterError::BadConfig(
                "metrics.cleanup_interval_minutes must be between 1 and 1440".into(),
            ));
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}
fn default_active_window_minutes() -> u64 {
    15
}
fn default_cleanup_interval_minutes() -> u64 {
    5
}
