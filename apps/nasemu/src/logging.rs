//! Structured logging integration for events
//!
//! Domain events are turned into tracing records with structured fields so
//! that `--json` output can be consumed by log collectors.

use nasemu_events::{
    AcquisitionEvent, AppEvent, DashboardEvent, EventMessage, GeneralEvent, LaunchEvent,
    ProvisionEvent,
};
use tracing::{debug, error, info, trace, warn};

/// Log an `AppEvent` at its level with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;
    let level = meta.tracing_level();

    match event {
        AppEvent::Provision(provision_event) => match provision_event {
            ProvisionEvent::StepStarted { index, depth, step } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    index = index,
                    depth = depth,
                    step = %step,
                    "Step started"
                );
            }
            ProvisionEvent::StepCompleted { index, depth, step } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    index = index,
                    depth = depth,
                    step = %step,
                    "Step completed"
                );
            }
            ProvisionEvent::StepFailed {
                index,
                depth,
                step,
                failure,
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    index = index,
                    depth = depth,
                    step = %step,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Step failed"
                );
            }
            ProvisionEvent::StepToleratedFailure {
                index,
                depth,
                step,
                failure,
            } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    index = index,
                    depth = depth,
                    step = %step,
                    message = %failure.message,
                    "Step failed, continuing"
                );
            }
            ProvisionEvent::PrivilegeEntered { uid, gid } => {
                info!(source = meta.source.as_str(), uid = uid, gid = gid, "Privileges dropped");
            }
            ProvisionEvent::PrivilegeRestored { uid, gid } => {
                info!(source = meta.source.as_str(), uid = uid, gid = gid, "Privileges restored");
            }
            ProvisionEvent::RestoreFailed { message } => {
                error!(source = meta.source.as_str(), message = %message, "Privilege restore failed");
            }
        },

        AppEvent::Acquisition(acquisition_event) => match acquisition_event {
            AcquisitionEvent::AlreadyInstalled { dest, version } => {
                info!(
                    source = meta.source.as_str(),
                    dest = %dest,
                    version = %version,
                    "Package already installed"
                );
            }
            AcquisitionEvent::ArtifactChecked { path, ok, detail } => {
                debug!(
                    source = meta.source.as_str(),
                    path = %path,
                    ok = ok,
                    detail = %detail,
                    "Artifact checked"
                );
            }
            AcquisitionEvent::RefetchRequired { dest, reason } => {
                info!(
                    source = meta.source.as_str(),
                    dest = %dest,
                    reason = %reason,
                    "Package must be fetched"
                );
            }
            AcquisitionEvent::Started { url, total_bytes } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    url = %url,
                    total_bytes = ?total_bytes,
                    "Download started"
                );
            }
            AcquisitionEvent::Progress {
                url,
                bytes,
                total_bytes,
            } => {
                trace!(
                    source = meta.source.as_str(),
                    url = %url,
                    bytes = bytes,
                    total_bytes = ?total_bytes,
                    "Download progress"
                );
            }
            AcquisitionEvent::Completed { url, dest } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    url = %url,
                    dest = %dest,
                    "Package extracted"
                );
            }
            AcquisitionEvent::Failed { url, failure } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    url = %url,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Package acquisition failed"
                );
            }
        },

        AppEvent::Launch(launch_event) => match launch_event {
            LaunchEvent::Started { cmdline, pid } => {
                info!(source = meta.source.as_str(), cmdline = %cmdline, pid = pid, "start");
            }
            LaunchEvent::Exited { code, success } => {
                if *success {
                    info!(source = meta.source.as_str(), code = ?code, "cmd exited!");
                } else {
                    error!(source = meta.source.as_str(), code = ?code, "cmd exited!");
                }
            }
            LaunchEvent::InterruptSent { pgid } => {
                info!(source = meta.source.as_str(), pgid = pgid, "Interrupt sent");
            }
            LaunchEvent::Failed { cmdline, failure } => {
                error!(
                    source = meta.source.as_str(),
                    cmdline = %cmdline,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "start"
                );
            }
        },

        AppEvent::Dashboard(dashboard_event) => match dashboard_event {
            DashboardEvent::Listening { addr } => {
                info!(source = meta.source.as_str(), listen = %addr, "dashboard started");
            }
            DashboardEvent::Stopped => {
                info!(source = meta.source.as_str(), "dashboard done");
            }
            DashboardEvent::ShutdownFailed { message } => {
                warn!(source = meta.source.as_str(), message = %message, "dashboard done");
            }
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    message = %message,
                    context = ?context,
                    "Warning"
                );
            }
            GeneralEvent::Error { message, details } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    message = %message,
                    details = ?details,
                    "Error"
                );
            }
            _ => match level {
                tracing::Level::ERROR => {
                    error!(source = meta.source.as_str(), event_id = %meta.event_id, event = ?general_event, "General event");
                }
                tracing::Level::WARN => {
                    warn!(source = meta.source.as_str(), event_id = %meta.event_id, event = ?general_event, "General event");
                }
                tracing::Level::INFO => {
                    info!(source = meta.source.as_str(), event_id = %meta.event_id, event = ?general_event, "General event");
                }
                tracing::Level::DEBUG => {
                    debug!(source = meta.source.as_str(), event_id = %meta.event_id, event = ?general_event, "General event");
                }
                tracing::Level::TRACE => {
                    trace!(source = meta.source.as_str(), event_id = %meta.event_id, event = ?general_event, "General event");
                }
            },
        },
    }
}
