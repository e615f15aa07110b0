use serde::{Deserialize, Serialize};

use crate::EventSource;
use nasemu_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether running again might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod acquisition;
pub mod general;
pub mod launch;
pub mod provision;

pub use acquisition::*;
pub use general::*;
pub use launch::*;
pub use provision::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, debug logs)
    General(GeneralEvent),

    /// Pipeline step and privilege transition events
    Provision(ProvisionEvent),

    /// Package state checks, downloads and extraction
    Acquisition(AcquisitionEvent),

    /// Vendor process supervision
    Launch(LaunchEvent),

    /// Dashboard listener lifecycle
    Dashboard(DashboardEvent),
}

impl AppEvent {
    /// Identify the source domain for this event.
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Provision(_) => EventSource::PROVISION,
            Self::Acquisition(_) => EventSource::ACQUISITION,
            Self::Launch(_) => EventSource::LAUNCH,
            Self::Dashboard(_) => EventSource::DASHBOARD,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. })
            | Self::Provision(
                ProvisionEvent::StepFailed { .. } | ProvisionEvent::RestoreFailed { .. },
            )
            | Self::Acquisition(AcquisitionEvent::Failed { .. })
            | Self::Launch(LaunchEvent::Failed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Provision(ProvisionEvent::StepToleratedFailure { .. })
            | Self::Dashboard(DashboardEvent::ShutdownFailed { .. }) => Level::WARN,

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Acquisition(
                AcquisitionEvent::Progress { .. } | AcquisitionEvent::ArtifactChecked { .. },
            )
            | Self::Provision(ProvisionEvent::StepCompleted { .. }) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "nasemu::events::general",
            Self::Provision(_) => "nasemu::events::provision",
            Self::Acquisition(_) => "nasemu::events::acquisition",
            Self::Launch(_) => "nasemu::events::launch",
            Self::Dashboard(_) => "nasemu::events::dashboard",
        }
    }
}
