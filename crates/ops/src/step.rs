//! Provisioning steps as plain data

use nasemu_config::FailurePolicy;
use nasemu_install::AcquireRequest;
use nasemu_platform::{Identity, MountSpec, Namespaces, PropertyOption};
use std::fmt;
use std::path::PathBuf;

/// One mutation of the host, carrying its parameters
///
/// Steps do nothing by themselves; an [`crate::Executor`] interprets them in
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Create a directory and its missing ancestors
    CreateDir {
        path: PathBuf,
        options: Vec<PropertyOption>,
    },

    /// [`Step::CreateDir`] for every path, same options for each
    CreateDirs {
        paths: Vec<PathBuf>,
        options: Vec<PropertyOption>,
    },

    /// Write `lines` joined with `\n`; an existing file is kept unless
    /// `overwrite` is set
    WriteFile {
        path: PathBuf,
        lines: Vec<String>,
        overwrite: bool,
        options: Vec<PropertyOption>,
    },

    RemoveFile { path: PathBuf },

    Chown {
        path: PathBuf,
        identity: Identity,
        recursive: bool,
    },

    Chmod {
        path: PathBuf,
        mode: u32,
        recursive: bool,
    },

    Unshare(Namespaces),

    Mount {
        spec: MountSpec,
        policy: FailurePolicy,
    },

    /// Make the vendor package available
    Acquire(AcquireRequest),

    /// Run nested steps under another effective identity
    RunAs {
        identity: Identity,
        steps: Vec<Step>,
    },

    /// Hand over to the launcher; returns once it finishes
    Launch,
}

impl Step {
    /// Short name used as the event correlation id
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateDir { .. } => "create_dir",
            Self::CreateDirs { .. } => "create_dirs",
            Self::WriteFile { .. } => "write_file",
            Self::RemoveFile { .. } => "remove_file",
            Self::Chown { .. } => "chown",
            Self::Chmod { .. } => "chmod",
            Self::Unshare(_) => "unshare",
            Self::Mount { .. } => "mount",
            Self::Acquire(_) => "acquire",
            Self::RunAs { .. } => "run_as",
            Self::Launch => "launch",
        }
    }

    /// Failure policy of this step; only mounts can be relaxed
    #[must_use]
    pub fn policy(&self) -> FailurePolicy {
        match self {
            Self::Mount { policy, .. } => *policy,
            _ => FailurePolicy::Fatal,
        }
    }
}

fn write_options(f: &mut fmt::Formatter<'_>, options: &[PropertyOption]) -> fmt::Result {
    if options.is_empty() {
        return Ok(());
    }
    let rendered: Vec<String> = options.iter().map(ToString::to_string).collect();
    write!(f, " ({})", rendered.join(", "))
}

fn recursive_flag(recursive: bool) -> &'static str {
    if recursive {
        " -R"
    } else {
        ""
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir { path, options } => {
                write!(f, "mkdir {}", path.display())?;
                write_options(f, options)
            }
            Self::CreateDirs { paths, options } => {
                let rendered: Vec<String> =
                    paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "mkdir {}", rendered.join(" "))?;
                write_options(f, options)
            }
            Self::WriteFile {
                path,
                lines,
                overwrite,
                options,
            } => {
                let mode = if *overwrite { "overwrite" } else { "create" };
                write!(f, "write {} ({} lines, {mode})", path.display(), lines.len())?;
                write_options(f, options)
            }
            Self::RemoveFile { path } => write!(f, "rm {}", path.display()),
            Self::Chown {
                path,
                identity,
                recursive,
            } => write!(
                f,
                "chown{} {identity} {}",
                recursive_flag(*recursive),
                path.display()
            ),
            Self::Chmod {
                path,
                mode,
                recursive,
            } => write!(
                f,
                "chmod{} {mode:o} {}",
                recursive_flag(*recursive),
                path.display()
            ),
            Self::Unshare(namespaces) => write!(f, "unshare {namespaces}"),
            Self::Mount { spec, policy } => match policy {
                FailurePolicy::Fatal => write!(f, "mount {spec}"),
                FailurePolicy::Warn => write!(f, "mount {spec} [{policy}]"),
            },
            Self::Acquire(request) => {
                write!(f, "acquire {} -> {}", request.url, request.dest.display())?;
                if request.force {
                    write!(f, " (force)")?;
                }
                Ok(())
            }
            Self::RunAs { identity, steps } => {
                write!(f, "run as {identity} ({} steps)", steps.len())
            }
            Self::Launch => write!(f, "launch"),
        }
    }
}
