use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Vendor process supervision events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LaunchEvent {
    Started { cmdline: String, pid: u32 },

    /// Process exited; `code` is `None` when it was killed by a signal
    Exited { code: Option<i32>, success: bool },

    /// Cancellation reached the vendor process group
    InterruptSent { pgid: i32 },

    Failed { cmdline: String, failure: FailureContext },
}

/// Dashboard listener events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashboardEvent {
    Listening { addr: String },

    Stopped,

    ShutdownFailed { message: String },
}
