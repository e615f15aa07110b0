#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Linux platform layer for nasemu provisioning.
//!
//! This crate wraps the operating system primitives the provisioning pipeline
//! is built from:
//! - File mutation primitives with post-create ownership/mode options
//! - Mount/PID/UTS namespace isolation and mounts
//! - The scoped effective-identity guard
//! - Ordered environment sets for the vendor processes
//! - Process group signalling
//!
//! Every function here is synchronous. The pipeline calls them from a
//! current-thread runtime before any helper thread exists, which `unshare`
//! of the mount namespace requires.

pub mod env;
pub mod fs;
pub mod identity;
pub mod namespace;
pub mod process;

/// Re-export commonly used types
pub use env::EnvSet;
pub use fs::PropertyOption;
pub use identity::{Identity, PrivilegeGuard};
pub use namespace::{MountFlag, MountSpec, Namespaces};
pub use process::Signal;
