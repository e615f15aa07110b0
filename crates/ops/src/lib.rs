#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Provisioning orchestration for nasemu
//!
//! This crate describes provisioning as data and interprets it:
//! - [`Step`] and [`Pipeline`] hold the ordered mutations
//! - [`provision_plan`] builds the pipeline for a configuration
//! - [`Executor`] runs a pipeline fail-fast, switching effective identity
//!   for [`Step::RunAs`] blocks
//! - [`vendor_environment`] synthesizes the environment of vendor processes

mod env;
mod executor;
mod pipeline;
mod plan;
mod step;

pub use env::{vendor_environment, CONTAINER_MARKERS};
pub use executor::{Executor, ExecutorBuilder, Launcher};
pub use pipeline::{run_as, Pipeline};
pub use plan::{provision_plan, vendor_identity, AUTHENTICATE_CGI_SCRIPT};
pub use step::Step;
