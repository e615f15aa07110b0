//! Install state of the vendor package

use nasemu_config::PackageLayout;
use nasemu_events::{AcquisitionEvent, AppEvent, EventEmitter, EventSender};
use std::fmt;
use std::path::{Path, PathBuf};

/// What is currently installed under the package root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    /// Version marker absent, unreadable or empty
    Missing,
    /// Marker present but an artifact is absent, not a file, or too small
    Incomplete { artifact: PathBuf, reason: String },
    /// Every artifact passed its check
    Complete { version: String },
}

impl InstallState {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "not installed"),
            Self::Incomplete { artifact, reason } => {
                write!(f, "incomplete: {} {reason}", artifact.display())
            }
            Self::Complete { version } => write!(f, "installed version {version}"),
        }
    }
}

/// Architecture suffix used in vendor file names
#[must_use]
pub fn package_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

/// Inspect `dest` against `layout`
///
/// The version is the trimmed content of the layout's version file; an
/// absent, empty or unreadable marker means nothing is installed. Each
/// expanded artifact must then exist, be a regular file and be at least
/// `min_artifact_size` bytes.
pub fn check_install_state(
    dest: &Path,
    layout: &PackageLayout,
    arch: &str,
    tx: Option<&EventSender>,
) -> InstallState {
    let version_path = dest.join(&layout.version_file);
    let version = match std::fs::read_to_string(&version_path) {
        Ok(content) => content.trim().to_string(),
        Err(e) => {
            tracing::debug!(path = %version_path.display(), error = %e, "version marker unreadable");
            return InstallState::Missing;
        }
    };
    if version.is_empty() {
        return InstallState::Missing;
    }

    for relative in layout.expand(arch, &version) {
        let path = dest.join(relative);
        let verdict = check_artifact(&path, layout.min_artifact_size);

        if let Some(tx) = tx {
            tx.emit(AppEvent::Acquisition(AcquisitionEvent::ArtifactChecked {
                path: path.display().to_string(),
                ok: verdict.is_ok(),
                detail: match &verdict {
                    Ok(size) => format!("{size} bytes"),
                    Err(reason) => reason.clone(),
                },
            }));
        }

        if let Err(reason) = verdict {
            return InstallState::Incomplete {
                artifact: path,
                reason,
            };
        }
    }

    InstallState::Complete { version }
}

fn check_artifact(path: &Path, min_size: u64) -> Result<u64, String> {
    let meta = std::fs::metadata(path).map_err(|e| e.to_string())?;
    if !meta.is_file() {
        return Err("not a regular file".to_string());
    }
    if meta.len() < min_size {
        return Err(format!("{} bytes, expected at least {min_size}", meta.len()));
    }
    Ok(meta.len())
}
