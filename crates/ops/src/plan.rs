//! The provisioning plan

use crate::pipeline::{run_as, Pipeline};
use crate::step::Step;
use nasemu_config::{constants, Config, FailurePolicy};
use nasemu_install::AcquireRequest;
use nasemu_platform::{Identity, MountSpec, Namespaces, PropertyOption};
use std::path::PathBuf;

/// Stand-in for the firmware's session check; prints the logged-in user
pub const AUTHENTICATE_CGI_SCRIPT: &[&str] = &["#!/bin/sh", "echo admin"];

/// Identity the vendor software runs as
#[must_use]
pub fn vendor_identity(config: &Config) -> Identity {
    Identity::new(config.identity.uid, config.identity.gid)
}

/// Every step from a bare container to a running vendor client
///
/// Host files are put in place first, then the process moves into fresh
/// mount, PID and UTS namespaces with its own `/proc`. The package is
/// acquired inside the namespaces, handed to the vendor identity, and the
/// launch runs under that identity.
///
/// `config` is expected to be normalized.
#[must_use]
pub fn provision_plan(config: &Config) -> Pipeline {
    let identity = vendor_identity(config);
    let pkg_dest = PathBuf::from(constants::PKG_DEST);

    Pipeline::new()
        .then(Step::WriteFile {
            path: PathBuf::from(constants::SYNOINFO_PATH),
            lines: constants::synoinfo_lines(),
            overwrite: false,
            options: Vec::new(),
        })
        .then(Step::WriteFile {
            path: PathBuf::from(constants::AUTHENTICATE_CGI_PATH),
            lines: AUTHENTICATE_CGI_SCRIPT
                .iter()
                .map(ToString::to_string)
                .collect(),
            overwrite: false,
            options: vec![PropertyOption::chmod(0o777)],
        })
        .then(Step::RemoveFile {
            path: PathBuf::from(constants::DOCKERENV_PATH),
        })
        .then(Step::CreateDir {
            path: config.paths.data_dir.clone(),
            options: vec![
                PropertyOption::chmod_recursive(0o777),
                PropertyOption::chown_recursive(identity),
            ],
        })
        .then(Step::CreateDirs {
            paths: config.download_dirs(),
            options: vec![PropertyOption::chmod(0o777)],
        })
        .then(Step::Unshare(Namespaces::ISOLATED))
        .then(Step::Mount {
            spec: MountSpec::private_root(),
            policy: FailurePolicy::Fatal,
        })
        .then(Step::CreateDir {
            path: PathBuf::from(constants::PROC_DIR),
            options: vec![PropertyOption::chmod(0o755)],
        })
        .then(Step::Mount {
            spec: MountSpec::proc(constants::PROC_DIR),
            policy: config.isolation.proc_mount_policy,
        })
        .then(Step::Acquire(AcquireRequest {
            url: config.package.url.clone(),
            dest: pkg_dest.clone(),
            force: config.package.force,
        }))
        .then(Step::Chown {
            path: pkg_dest,
            identity,
            recursive: true,
        })
        .then(Step::CreateDir {
            path: PathBuf::from(constants::PKG_VAR_DIR),
            options: vec![
                PropertyOption::chmod_recursive(0o777),
                PropertyOption::chown_recursive(identity),
            ],
        })
        .then(run_as(identity, vec![Step::Launch]))
}
