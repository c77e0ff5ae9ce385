//! Error types for ses-rs
//!
//! Two layers:
//! - [`ProviderError`]: a provider-style code + message pair returned to
//!   callers for rejected or failed sends (validation and synthetic failures)
//! - [`ServiceError`]: everything that can go wrong inside the service,
//!   including store faults that must never leak to callers

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stats bucket for failures that carry no provider code
pub const UNKNOWN_ERROR_CODE: &str = "unknown";

/// Provider-style error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidParameterValue,
    MessageTooLong,
    LimitExceededException,
    MessageRejected,
    EmailAddressNotVerified,
    InternalFailure,
    ThrottlingException,
    AccountSendingPausedException,
    AccessDeniedException,
    RequestExpired,
    ServiceUnavailable,
}

impl ErrorCode {
    /// Wire name of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParameterValue => "InvalidParameterValue",
            Self::MessageTooLong => "MessageTooLong",
            Self::LimitExceededException => "LimitExceededException",
            Self::MessageRejected => "MessageRejected",
            Self::EmailAddressNotVerified => "EmailAddressNotVerified",
            Self::InternalFailure => "InternalFailure",
            Self::ThrottlingException => "ThrottlingException",
            Self::AccountSendingPausedException => "AccountSendingPausedException",
            Self::AccessDeniedException => "AccessDeniedException",
            Self::RequestExpired => "RequestExpired",
            Self::ServiceUnavailable => "ServiceUnavailable",
        }
    }

    /// Whether a caller may reasonably retry after this code
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::InternalFailure
                | Self::ThrottlingException
                | Self::RequestExpired
                | Self::ServiceUnavailable
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider-style failure: stable code plus human-readable message
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ProviderError {
    code: ErrorCode,
    message: String,
}

impl ProviderError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Generic internal failure, used when infrastructure faults reach a caller
    pub fn internal() -> Self {
        Self::new(
            ErrorCode::InternalFailure,
            "Unexpected internal error occurred.",
        )
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// The provider error, if this is a typed send failure
    pub fn provider(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(e) => Some(e),
            _ => None,
        }
    }

    /// Stats bucket for this error
    pub fn stat_code(&self) -> &str {
        match self {
            Self::Provider(e) => e.code().as_str(),
            _ => UNKNOWN_ERROR_CODE,
        }
    }
}

impl From<config::ConfigError> for ServiceError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
