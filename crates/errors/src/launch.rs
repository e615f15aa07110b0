//! Vendor launch and dashboard error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LaunchError {
    #[error("failed to start {program}: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("failed to wait for vendor process: {message}")]
    WaitFailed { message: String },

    #[error("failed to signal process group {pgid}: {message}")]
    SignalFailed { pgid: i32, message: String },

    #[error("dashboard failed on {listen}: {message}")]
    Dashboard { listen: String, message: String },

    #[error("dashboard shutdown failed: {message}")]
    ShutdownFailed { message: String },

    #[error("CGI script failed: {message}")]
    Cgi { message: String },
}

impl UserFacingError for LaunchError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::SpawnFailed { .. } => {
                Some("The vendor package may be incomplete; remove it to force a fresh download.")
            }
            Self::Dashboard { .. } => Some("Pick another address with --listen."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::SpawnFailed { .. } | Self::Dashboard { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::SpawnFailed { .. } => "launch.spawn_failed",
            Self::WaitFailed { .. } => "launch.wait_failed",
            Self::SignalFailed { .. } => "launch.signal_failed",
            Self::Dashboard { .. } => "launch.dashboard",
            Self::ShutdownFailed { .. } => "launch.shutdown_failed",
            Self::Cgi { .. } => "launch.cgi",
        };
        Some(code)
    }
}
