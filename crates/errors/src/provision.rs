//! Provisioning error types
//!
//! Everything that can go wrong while the emulated firmware layout,
//! namespaces and effective identity are being put in place.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProvisionError {
    #[error("filesystem operation failed: {operation} on {path}: {message}")]
    Filesystem {
        operation: String,
        path: String,
        message: String,
    },

    #[error("ownership change failed on {path}: {message}")]
    Ownership { path: String, message: String },

    #[error("permission change failed on {path}: {message}")]
    Permissions { path: String, message: String },

    #[error("namespace isolation failed: {message}")]
    Namespace { message: String },

    #[error("mount failed on {target}: {message}")]
    Mount { target: String, message: String },

    #[error("privilege transition failed: {operation}: {message}")]
    PrivilegeTransition { operation: String, message: String },

    #[error("privilege guard is already held by another task")]
    GuardBusy,
}

impl ProvisionError {
    /// Build a filesystem error from an I/O failure
    pub fn filesystem(
        operation: impl Into<String>,
        path: &std::path::Path,
        err: &impl std::fmt::Display,
    ) -> Self {
        Self::Filesystem {
            operation: operation.into(),
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl UserFacingError for ProvisionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Namespace { .. } | Self::Mount { .. } => {
                Some("Run as root, or grant CAP_SYS_ADMIN to the container.")
            }
            Self::Ownership { .. } | Self::PrivilegeTransition { .. } => {
                Some("Ownership and identity changes require running as root.")
            }
            Self::GuardBusy => Some("Identity transitions cannot be nested or run concurrently."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Filesystem { .. } => "provision.filesystem",
            Self::Ownership { .. } => "provision.ownership",
            Self::Permissions { .. } => "provision.permissions",
            Self::Namespace { .. } => "provision.namespace",
            Self::Mount { .. } => "provision.mount",
            Self::PrivilegeTransition { .. } => "provision.privilege",
            Self::GuardBusy => "provision.guard_busy",
        };
        Some(code)
    }
}
