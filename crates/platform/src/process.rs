//! Process group signalling

use nasemu_errors::{Error, LaunchError};
use nix::unistd::Pid;

pub use nix::sys::signal::Signal;

/// Send `signal` to every process in the group led by `pgid`
///
/// # Errors
///
/// Returns `LaunchError::SignalFailed` when `kill(2)` fails, including when
/// the group no longer exists.
pub fn signal_process_group(pgid: u32, signal: Signal) -> Result<(), Error> {
    let raw = i32::try_from(pgid).map_err(|_| LaunchError::SignalFailed {
        pgid: -1,
        message: format!("process group id {pgid} out of range"),
    })?;

    nix::sys::signal::killpg(Pid::from_raw(raw), signal).map_err(|e| {
        LaunchError::SignalFailed {
            pgid: raw,
            message: e.to_string(),
        }
        .into()
    })
}

/// Ask a process group to shut down the way a terminal Ctrl-C would
///
/// # Errors
///
/// See [`signal_process_group`].
pub fn interrupt_process_group(pgid: u32) -> Result<(), Error> {
    signal_process_group(pgid, Signal::SIGINT)
}
