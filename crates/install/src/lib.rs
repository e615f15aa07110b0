#![warn(clippy::pedantic)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

//! Vendor package acquisition for nasemu
//!
//! This crate decides whether the vendor package has to be fetched, fetches
//! it from a file or HTTP(S) source and unpacks it into the package root:
//! - `state`: derive an [`InstallState`] from the files on disk
//! - `source`: parse a package URL into a [`PackageSource`]
//! - `extract`: the [`Extractor`] seam and the `.spk` implementation
//! - `acquire`: the [`Acquirer`] tying the three together

mod acquire;
mod extract;
mod source;
mod state;

pub use acquire::{AcquireOutcome, AcquireRequest, Acquirer, PackageAcquirer};
pub use extract::{BoxedReader, Extractor, SpkExtractor, PACKAGE_MEMBER};
pub use source::PackageSource;
pub use state::{check_install_state, package_arch, InstallState};

// Re-export EventSender for callers wiring an acquirer
pub use nasemu_events::EventSender;
