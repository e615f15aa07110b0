//! Configuration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("invalid config: {message}")]
    Invalid { message: String },

    #[error("parse error: {message}")]
    ParseError { message: String },

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("invalid path for {field}: {path}: {message}")]
    InvalidPath {
        field: String,
        path: String,
        message: String,
    },

    #[error("invalid listen address: {value}")]
    InvalidListen { value: String },
}

impl UserFacingError for ConfigError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("Check the path passed with --config."),
            Self::InvalidValue { .. } | Self::Invalid { .. } | Self::ParseError { .. } => {
                Some("Fix the configuration value and start again.")
            }
            Self::InvalidPath { .. } => Some("Use an absolute or resolvable directory path."),
            Self::InvalidListen { .. } => {
                Some("Use HOST:PORT or :PORT, for example `:2345` or `127.0.0.1:2345`.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "config.not_found",
            Self::Invalid { .. } => "config.invalid",
            Self::ParseError { .. } => "config.parse_error",
            Self::InvalidValue { .. } => "config.invalid_value",
            Self::InvalidPath { .. } => "config.invalid_path",
            Self::InvalidListen { .. } => "config.invalid_listen",
        };
        Some(code)
    }
}
