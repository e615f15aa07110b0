//! Filesystem mutation primitives used by the provisioning pipeline.
//!
//! Every primitive is idempotent: creating something that already exists and
//! removing something that is already gone both succeed. Creation primitives
//! accept a list of [`PropertyOption`]s that are applied to the final path in
//! order once the create succeeded; the first failing option aborts.

use crate::identity::Identity;
use nasemu_errors::{Error, ProvisionError};
use std::fmt;
use std::fs::{self, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result type for filesystem operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ownership or mode change applied after a create operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyOption {
    Chmod { mode: u32, recursive: bool },
    Chown { identity: Identity, recursive: bool },
}

impl PropertyOption {
    #[must_use]
    pub const fn chmod(mode: u32) -> Self {
        Self::Chmod {
            mode,
            recursive: false,
        }
    }

    #[must_use]
    pub const fn chmod_recursive(mode: u32) -> Self {
        Self::Chmod {
            mode,
            recursive: true,
        }
    }

    #[must_use]
    pub const fn chown(identity: Identity) -> Self {
        Self::Chown {
            identity,
            recursive: false,
        }
    }

    #[must_use]
    pub const fn chown_recursive(identity: Identity) -> Self {
        Self::Chown {
            identity,
            recursive: true,
        }
    }

    /// Apply this option to `path`
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying `chmod`/`chown`.
    pub fn apply(&self, path: &Path) -> Result<()> {
        match *self {
            Self::Chmod { mode, recursive } => chmod(path, mode, recursive),
            Self::Chown {
                identity,
                recursive,
            } => chown(path, identity, recursive),
        }
    }
}

impl fmt::Display for PropertyOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, recursive) = match self {
            Self::Chmod { mode, recursive } => (format!("chmod {mode:o}"), *recursive),
            Self::Chown {
                identity,
                recursive,
            } => (format!("chown {identity}"), *recursive),
        };
        if recursive {
            write!(f, "{name} -R")
        } else {
            write!(f, "{name}")
        }
    }
}

/// Apply options in order, stopping at the first failure
///
/// # Errors
///
/// Returns the first failing option's error.
pub fn apply_options(path: &Path, options: &[PropertyOption]) -> Result<()> {
    options.iter().try_for_each(|option| option.apply(path))
}

/// Create `path` and any missing ancestors, then apply `options`
///
/// An existing directory is not an error.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or an option fails.
pub fn create_dir_all(path: &Path, options: &[PropertyOption]) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| ProvisionError::filesystem("create_dir", path, &e))?;
    apply_options(path, options)
}

/// [`create_dir_all`] for each path in order, aborting on the first failure
///
/// # Errors
///
/// Returns the first failing directory's error.
pub fn create_dirs(paths: &[PathBuf], options: &[PropertyOption]) -> Result<()> {
    paths
        .iter()
        .try_for_each(|path| create_dir_all(path, options))
}

/// Write `lines` joined by `\n` to `path`
///
/// Parent directories are created. Without `overwrite` the file is created
/// exclusively: an existing file is left untouched and counts as success.
/// With `overwrite` the file is truncated and rewritten. Options are applied
/// afterwards in both cases.
///
/// # Errors
///
/// Returns an error if the parent cannot be created, the file cannot be
/// written, or an option fails.
pub fn write_file(
    path: &Path,
    lines: &[String],
    overwrite: bool,
    options: &[PropertyOption],
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| ProvisionError::filesystem("create_dir", parent, &e))?;
    }

    let mut open = OpenOptions::new();
    open.write(true);
    if overwrite {
        open.create(true).truncate(true);
    } else {
        open.create_new(true);
    }

    match open.open(path) {
        Ok(mut file) => {
            file.write_all(lines.join("\n").as_bytes())
                .map_err(|e| ProvisionError::filesystem("write_file", path, &e))?;
        }
        Err(e) if !overwrite && e.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(path = %path.display(), "file exists, keeping content");
        }
        Err(e) => return Err(ProvisionError::filesystem("write_file", path, &e).into()),
    }

    apply_options(path, options)
}

/// Remove a file; a missing file is success
///
/// # Errors
///
/// Returns an error for any failure other than `NotFound`.
pub fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProvisionError::filesystem("remove_file", path, &e).into()),
    }
}

/// Change ownership of `path`, optionally of its whole subtree
///
/// Symbolic links below `path` are skipped during the recursive walk.
///
/// # Errors
///
/// Returns the first entry that cannot be walked or changed.
pub fn chown(path: &Path, identity: Identity, recursive: bool) -> Result<()> {
    for_each_entry(path, recursive, |entry| {
        nix::unistd::chown(entry, Some(identity.nix_uid()), Some(identity.nix_gid())).map_err(
            |e| {
                ProvisionError::Ownership {
                    path: entry.display().to_string(),
                    message: e.to_string(),
                }
                .into()
            },
        )
    })
}

/// Change the mode of `path`, optionally of its whole subtree
///
/// Symbolic links below `path` are skipped during the recursive walk.
///
/// # Errors
///
/// Returns the first entry that cannot be walked or changed.
pub fn chmod(path: &Path, mode: u32, recursive: bool) -> Result<()> {
    for_each_entry(path, recursive, |entry| {
        fs::set_permissions(entry, Permissions::from_mode(mode)).map_err(|e| {
            ProvisionError::Permissions {
                path: entry.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    })
}

fn for_each_entry<F>(path: &Path, recursive: bool, mut f: F) -> Result<()>
where
    F: FnMut(&Path) -> Result<()>,
{
    if !recursive {
        return f(path);
    }

    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|e| ProvisionError::Filesystem {
            operation: "walk".to_string(),
            path: e
                .path()
                .unwrap_or(path)
                .display()
                .to_string(),
            message: e.to_string(),
        })?;
        if entry.depth() > 0 && entry.path_is_symlink() {
            continue;
        }
        f(entry.path())?;
    }
    Ok(())
}
