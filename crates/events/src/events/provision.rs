use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Provisioning pipeline events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProvisionEvent {
    /// A step is about to run. `depth` is 0 for top-level steps and grows
    /// inside privilege-guarded sub-pipelines.
    StepStarted {
        index: usize,
        depth: usize,
        step: String,
    },

    StepCompleted {
        index: usize,
        depth: usize,
        step: String,
    },

    /// Step failed and the pipeline aborts
    StepFailed {
        index: usize,
        depth: usize,
        step: String,
        failure: FailureContext,
    },

    /// Step failed under a warn-only policy and the pipeline continues
    StepToleratedFailure {
        index: usize,
        depth: usize,
        step: String,
        failure: FailureContext,
    },

    /// Effective identity switched for a nested pipeline
    PrivilegeEntered { uid: u32, gid: u32 },

    /// Effective identity returned to its resting value
    PrivilegeRestored { uid: u32, gid: u32 },

    RestoreFailed { message: String },
}
