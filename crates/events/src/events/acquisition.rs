use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Vendor package acquisition events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AcquisitionEvent {
    /// Install state check found a complete package; nothing is fetched
    AlreadyInstalled { dest: String, version: String },

    /// One expected artifact passed or failed its check
    ArtifactChecked {
        path: String,
        ok: bool,
        detail: String,
    },

    /// Install state check decided the package has to be fetched
    RefetchRequired { dest: String, reason: String },

    Started {
        url: String,
        total_bytes: Option<u64>,
    },

    /// Cumulative transfer progress of a network source
    Progress {
        url: String,
        bytes: u64,
        total_bytes: Option<u64>,
    },

    Completed { url: String, dest: String },

    Failed { url: String, failure: FailureContext },
}
