//! Effective identity and the scoped privilege transition guard

use nasemu_errors::{Error, ProvisionError};
use nix::unistd::{getegid, geteuid, setegid, seteuid, Gid, Uid};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// A numeric user/group pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

impl Identity {
    /// The resting identity of the provisioning process
    pub const ROOT: Self = Self { uid: 0, gid: 0 };

    #[must_use]
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// Both ids are zero
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.uid == 0 && self.gid == 0
    }

    /// Effective ids of the calling process
    #[must_use]
    pub fn current_effective() -> Self {
        Self {
            uid: geteuid().as_raw(),
            gid: getegid().as_raw(),
        }
    }

    pub(crate) fn nix_uid(self) -> Uid {
        Uid::from_raw(self.uid)
    }

    pub(crate) fn nix_gid(self) -> Gid {
        Gid::from_raw(self.gid)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}

/// Set while a guard is alive; effective ids are process-wide state
static GUARD_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Scoped switch of the effective uid/gid
///
/// `enter` records the current effective ids, then sets the effective gid
/// (when the target gid is non-zero) followed by the effective uid (when the
/// target uid is non-zero). Dropping the guard restores the effective uid
/// first and the effective gid second, which is the only order that works
/// when the guard dropped root privileges.
///
/// Only one guard may exist at a time. A second `enter` while one is alive
/// fails with [`ProvisionError::GuardBusy`] instead of nesting.
#[derive(Debug)]
pub struct PrivilegeGuard {
    saved: Identity,
    target: Identity,
}

impl PrivilegeGuard {
    /// Switch to `target` until the guard is dropped
    ///
    /// # Errors
    ///
    /// Returns `GuardBusy` when another guard is alive, or
    /// `PrivilegeTransition` if `setegid`/`seteuid` fails. A partial switch is
    /// undone before the error is returned.
    pub fn enter(target: Identity) -> Result<Self, Error> {
        if GUARD_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ProvisionError::GuardBusy.into());
        }

        // From here on Drop owns restoration and releasing the flag
        let guard = Self {
            saved: Identity::current_effective(),
            target,
        };

        if target.gid > 0 {
            setegid(target.nix_gid()).map_err(|e| ProvisionError::PrivilegeTransition {
                operation: format!("setegid({})", target.gid),
                message: e.to_string(),
            })?;
        }
        if target.uid > 0 {
            seteuid(target.nix_uid()).map_err(|e| ProvisionError::PrivilegeTransition {
                operation: format!("seteuid({})", target.uid),
                message: e.to_string(),
            })?;
        }

        tracing::debug!(saved = %guard.saved, target = %guard.target, "entered privilege guard");
        Ok(guard)
    }

    /// Identity that will be restored on drop
    #[must_use]
    pub fn saved(&self) -> Identity {
        self.saved
    }

    /// Whether a guard is currently alive in this process
    #[must_use]
    pub fn is_active() -> bool {
        GUARD_ACTIVE.load(Ordering::Acquire)
    }
}

impl Drop for PrivilegeGuard {
    fn drop(&mut self) {
        if let Err(e) = seteuid(self.saved.nix_uid()) {
            tracing::error!(uid = self.saved.uid, error = %e, "failed to restore effective uid");
        }
        if let Err(e) = setegid(self.saved.nix_gid()) {
            tracing::error!(gid = self.saved.gid, error = %e, "failed to restore effective gid");
        }
        GUARD_ACTIVE.store(false, Ordering::Release);
        tracing::debug!(restored = %self.saved, "left privilege guard");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // The guard flag is process-global
    static GUARD_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_enter_current_identity_roundtrip() {
        let _lock = GUARD_TEST_MUTEX.lock().unwrap();
        let before = Identity::current_effective();

        {
            let guard = PrivilegeGuard::enter(before).unwrap();
            assert_eq!(guard.saved(), before);
            assert!(PrivilegeGuard::is_active());
        }

        assert!(!PrivilegeGuard::is_active());
        assert_eq!(Identity::current_effective(), before);
    }

    #[test]
    fn test_guard_is_not_reentrant() {
        let _lock = GUARD_TEST_MUTEX.lock().unwrap();
        let current = Identity::current_effective();

        let outer = PrivilegeGuard::enter(current).unwrap();
        let inner = PrivilegeGuard::enter(current);
        assert!(matches!(
            inner,
            Err(Error::Provision(ProvisionError::GuardBusy))
        ));
        drop(outer);

        // Released after the outer guard is gone
        let again = PrivilegeGuard::enter(current).unwrap();
        drop(again);
        assert_eq!(Identity::current_effective(), current);
    }

    #[test]
    fn test_identity_helpers() {
        assert!(Identity::ROOT.is_root());
        assert!(!Identity::new(0, 100).is_root());
        assert_eq!(Identity::new(1000, 100).to_string(), "1000:100");
    }
}
