//! Environment of the vendor processes

use nasemu_config::constants;
use nasemu_platform::EnvSet;
use std::path::{Path, PathBuf};

/// Host variables that reveal a container runtime
pub const CONTAINER_MARKERS: &[&str] = &[
    "container",
    "KUBERNETES_SERVICE_HOST",
    "KUBERNETES_PORT",
    "DOCKER_IMAGE",
    "DOCKER_TAG",
];

/// Host environment reshaped to look like a DSM package runtime
///
/// Used for the vendor launcher and for every CGI request of the dashboard.
#[must_use]
pub fn vendor_environment(data_dir: &Path, download_dirs: &[PathBuf]) -> EnvSet {
    let mut env = EnvSet::from_host();
    decorate(&mut env, data_dir, download_dirs);
    env
}

pub(crate) fn decorate(env: &mut EnvSet, data_dir: &Path, download_dirs: &[PathBuf]) {
    let downloads = download_dirs
        .iter()
        .map(|dir| dir.display().to_string())
        .collect::<Vec<_>>()
        .join(":");
    let home = data_dir.join(".drive");

    env.del(CONTAINER_MARKERS).sets([
        ("SYNOPLATFORM", constants::SYNO_PLATFORM.to_string()),
        ("SYNOPKG_PKGNAME", constants::PKG_NAME.to_string()),
        ("SYNOPKG_PKGDEST", constants::PKG_DEST.to_string()),
        (
            "SYNOPKG_DSM_VERSION_MAJOR",
            constants::DSM_VERSION_MAJOR.to_string(),
        ),
        (
            "SYNOPKG_DSM_VERSION_MINOR",
            constants::DSM_VERSION_MINOR.to_string(),
        ),
        (
            "SYNOPKG_DSM_VERSION_BUILD",
            constants::DSM_VERSION_BUILD.to_string(),
        ),
        ("DriveListen", constants::DRIVE_LISTEN.to_string()),
        ("PLATFORM", constants::PLATFORM_LABEL.to_string()),
        ("OS_VERSION", constants::OS_VERSION.to_string()),
        ("ConfigPath", data_dir.display().to_string()),
        ("HOME", home.display().to_string()),
        ("DownloadPATH", downloads),
        ("GIN_MODE", "release".to_string()),
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EnvSet {
        let mut env = EnvSet::from_entries([
            "PATH=/usr/bin",
            "container=docker",
            "HOME=/root",
            "DOCKER_TAG=latest",
            "KUBERNETES_PORT=tcp://10.0.0.1:443",
        ]);
        decorate(
            &mut env,
            Path::new("/xunlei/data"),
            &[PathBuf::from("/mnt/a"), PathBuf::from("/mnt/b")],
        );
        env
    }

    #[test]
    fn test_container_markers_removed() {
        let env = sample();
        assert_eq!(env.get("container"), None);
        assert_eq!(env.get("DOCKER_TAG"), None);
        assert_eq!(env.get("KUBERNETES_PORT"), None);
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
    }

    #[test]
    fn test_firmware_identity() {
        let env = sample();
        assert_eq!(env.get("SYNOPLATFORM"), Some("geminilake"));
        assert_eq!(env.get("SYNOPKG_PKGNAME"), Some("pan-xunlei-com"));
        assert_eq!(
            env.get("SYNOPKG_PKGDEST"),
            Some("/var/packages/pan-xunlei-com/target")
        );
        assert_eq!(env.get("SYNOPKG_DSM_VERSION_MAJOR"), Some("7"));
        assert_eq!(env.get("SYNOPKG_DSM_VERSION_MINOR"), Some("2"));
        assert_eq!(env.get("SYNOPKG_DSM_VERSION_BUILD"), Some("64570"));
        assert_eq!(env.get("OS_VERSION"), Some("geminilake dsm 7.2-64570"));
        assert_eq!(env.get("PLATFORM"), Some("群晖"));
        assert_eq!(env.get("GIN_MODE"), Some("release"));
    }

    #[test]
    fn test_paths() {
        let env = sample();
        assert_eq!(env.get("HOME"), Some("/xunlei/data/.drive"));
        assert_eq!(env.get("ConfigPath"), Some("/xunlei/data"));
        assert_eq!(env.get("DownloadPATH"), Some("/mnt/a:/mnt/b"));
        assert_eq!(
            env.get("DriveListen"),
            Some("unix:///var/packages/pan-xunlei-com/target/var/pan-xunlei-com.sock")
        );
    }

    #[test]
    fn test_home_is_written_once() {
        let env = sample();
        assert_eq!(env.iter().filter(|e| e.starts_with("HOME=")).count(), 1);
    }
}
