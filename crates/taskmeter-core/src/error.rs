//! Shared error type across taskmeter crates.

use thiserror::Error;

/// Stable error codes (used in logs and JSON error bodies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Mutation referenced a metric that was never registered.
    UnknownMetric,
    /// Label names did not match the metric's declared schema.
    InvalidLabel,
    /// Operation does not apply to this metric kind.
    KindMismatch,
    /// Registration rejected.
    BadRegistration,
    /// A metric could not be rendered.
    Exposition,
    /// Invalid configuration.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Auth failed.
    AuthFailed,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnknownMetric => "UNKNOWN_METRIC",
            ErrorCode::InvalidLabel => "INVALID_LABEL",
            ErrorCode::KindMismatch => "KIND_MISMATCH",
            ErrorCode::BadRegistration => "BAD_REGISTRATION",
            ErrorCode::Exposition => "EXPOSITION",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::AuthFailed => "AUTH_FAILED",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MeterError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum MeterError {
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("invalid labels for {metric}: {detail}")]
    InvalidLabel { metric: String, detail: String },
    #[error("metric {metric} is not a {expected}")]
    KindMismatch { metric: String, expected: &'static str },
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
    #[error("invalid metric {metric}: {detail}")]
    InvalidMetric { metric: String, detail: String },
    #[error("exposition failed: {0}")]
    Exposition(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("auth failed")]
    AuthFailed,
    #[error("internal: {0}")]
    Internal(String),
}

impl MeterError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeterError::UnknownMetric(_) => ErrorCode::UnknownMetric,
            MeterError::InvalidLabel { .. } => ErrorCode::InvalidLabel,
            MeterError::KindMismatch { .. } => ErrorCode::KindMismatch,
            MeterError::DuplicateMetric(_) | MeterError::InvalidMetric { .. } => {
                ErrorCode::BadRegistration
            }
            MeterError::Exposition(_) => ErrorCode::Exposition,
            MeterError::BadConfig(_) => ErrorCode::BadConfig,
            MeterError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            MeterError::AuthFailed => ErrorCode::AuthFailed,
            MeterError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub(crate) fn invalid_label(metric: &str, detail: impl Into<String>) -> Self {
        MeterError::InvalidLabel {
            metric: metric.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid_metric(metric: &str, detail: impl Into<String>) -> Self {
        MeterError::InvalidMetric {
            metric: metric.to_string(),
            detail: detail.into(),
        }
    }
}
