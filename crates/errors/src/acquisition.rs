//! Package acquisition error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    #[error("package url is not supported: {url}")]
    UnsupportedScheme { url: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("cannot open package source {path}: {message}")]
    SourceUnreadable { path: String, message: String },

    #[error("transport failed for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP error {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("extraction failed: {message}")]
    Extraction { message: String },

    #[error("package archive has no member {member}")]
    MissingMember { member: String },

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}

impl UserFacingError for AcquisitionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedScheme { .. } | Self::InvalidUrl(_) => {
                Some("Use a file://, http:// or https:// package URL.")
            }
            Self::Transport { .. } | Self::HttpStatus { .. } => {
                Some("Check network access to the package URL; the next start retries.")
            }
            Self::Extraction { .. } | Self::MissingMember { .. } => {
                Some("The package archive looks damaged; the next start downloads it again.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::HttpStatus { .. }
                | Self::Extraction { .. }
                | Self::SourceUnreadable { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UnsupportedScheme { .. } => "acquisition.unsupported_scheme",
            Self::InvalidUrl(_) => "acquisition.invalid_url",
            Self::SourceUnreadable { .. } => "acquisition.source_unreadable",
            Self::Transport { .. } => "acquisition.transport",
            Self::HttpStatus { .. } => "acquisition.http_status",
            Self::Extraction { .. } => "acquisition.extraction",
            Self::MissingMember { .. } => "acquisition.missing_member",
            Self::ClientSetup(_) => "acquisition.client_setup",
        };
        Some(code)
    }
}
