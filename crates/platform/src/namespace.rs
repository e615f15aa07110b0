//! Namespace isolation and mounts

use nasemu_errors::{Error, ProvisionError};
use nix::mount::MsFlags;
use nix::sched::CloneFlags;
use std::fmt;
use std::path::PathBuf;

/// Namespaces to detach from the parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Namespaces {
    pub mount: bool,
    pub pid: bool,
    pub uts: bool,
}

impl Namespaces {
    /// Private mount table, process tree and hostname
    pub const ISOLATED: Self = Self {
        mount: true,
        pid: true,
        uts: true,
    };

    fn clone_flags(self) -> CloneFlags {
        let mut flags = CloneFlags::empty();
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        flags
    }
}

impl fmt::Display for Namespaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [(self.mount, "mnt"), (self.pid, "pid"), (self.uts, "uts")]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect();
        write!(f, "{}", names.join("+"))
    }
}

/// Mount flags used by the provisioning plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountFlag {
    Private,
    Recursive,
    NoSuid,
    NoExec,
    NoDev,
}

impl MountFlag {
    fn ms_flag(self) -> MsFlags {
        match self {
            Self::Private => MsFlags::MS_PRIVATE,
            Self::Recursive => MsFlags::MS_REC,
            Self::NoSuid => MsFlags::MS_NOSUID,
            Self::NoExec => MsFlags::MS_NOEXEC,
            Self::NoDev => MsFlags::MS_NODEV,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Recursive => "rec",
            Self::NoSuid => "nosuid",
            Self::NoExec => "noexec",
            Self::NoDev => "nodev",
        }
    }
}

/// A single `mount(2)` call as plain data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub source: Option<String>,
    pub target: PathBuf,
    pub fstype: Option<String>,
    pub flags: Vec<MountFlag>,
}

impl MountSpec {
    /// Make every mount below `/` private so later mounts stay in this namespace
    #[must_use]
    pub fn private_root() -> Self {
        Self {
            source: None,
            target: PathBuf::from("/"),
            fstype: None,
            flags: vec![MountFlag::Private, MountFlag::Recursive],
        }
    }

    /// A fresh procfs reflecting the new PID namespace
    #[must_use]
    pub fn proc(target: impl Into<PathBuf>) -> Self {
        Self {
            source: Some("none".to_string()),
            target: target.into(),
            fstype: Some("proc".to_string()),
            flags: vec![MountFlag::NoSuid, MountFlag::NoExec, MountFlag::NoDev],
        }
    }

    fn ms_flags(&self) -> MsFlags {
        self.flags
            .iter()
            .fold(MsFlags::empty(), |acc, flag| acc | flag.ms_flag())
    }
}

impl fmt::Display for MountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags: Vec<&str> = self.flags.iter().map(|flag| flag.as_str()).collect();
        write!(
            f,
            "{} on {} type {} ({})",
            self.source.as_deref().unwrap_or("-"),
            self.target.display(),
            self.fstype.as_deref().unwrap_or("-"),
            flags.join(",")
        )
    }
}

/// Detach the calling process from the given namespaces
///
/// Unsharing the mount namespace fails with `EINVAL` once the process has
/// more than one thread, so this must run before any helper thread starts.
///
/// # Errors
///
/// Returns `ProvisionError::Namespace` when `unshare(2)` fails.
pub fn unshare(namespaces: Namespaces) -> Result<(), Error> {
    nix::sched::unshare(namespaces.clone_flags()).map_err(|e| {
        ProvisionError::Namespace {
            message: format!("unshare({namespaces}): {e}"),
        }
        .into()
    })
}

/// Perform the mount described by `spec`
///
/// # Errors
///
/// Returns `ProvisionError::Mount` when `mount(2)` fails.
pub fn mount(spec: &MountSpec) -> Result<(), Error> {
    nix::mount::mount(
        spec.source.as_deref(),
        spec.target.as_path(),
        spec.fstype.as_deref(),
        spec.ms_flags(),
        None::<&str>,
    )
    .map_err(|e| {
        ProvisionError::Mount {
            target: spec.target.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
