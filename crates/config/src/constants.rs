//! Fixed, non-configurable paths and identifiers of the emulated firmware
//!
//! The vendor binary looks these up at hard-coded locations, so they are not
//! exposed through TOML configuration.

/// Package name the vendor client registers under
pub const PKG_NAME: &str = "pan-xunlei-com";

/// Install root of the vendor package
pub const PKG_DEST: &str = "/var/packages/pan-xunlei-com/target";

/// Directory holding vendor executables; also the working directory of
/// every vendor process
pub const PKG_BIN_DIR: &str = "/var/packages/pan-xunlei-com/target/bin";

/// Runtime state directory of the vendor package (sockets, pid file)
pub const PKG_VAR_DIR: &str = "/var/packages/pan-xunlei-com/target/var";

/// Dashboard CGI program inside the package
pub const PKG_UI_CGI: &str = "/var/packages/pan-xunlei-com/target/ui/index.cgi";

pub const LAUNCHER_SOCKET: &str =
    "unix:///var/packages/pan-xunlei-com/target/var/pan-xunlei-com-launcher.sock";
pub const LAUNCHER_PID_FILE: &str = "/var/packages/pan-xunlei-com/target/var/pan-xunlei-com.pid";
pub const DRIVE_LISTEN: &str = "unix:///var/packages/pan-xunlei-com/target/var/pan-xunlei-com.sock";

/// Firmware identification file read by the vendor binary
pub const SYNOINFO_PATH: &str = "/etc/synoinfo.conf";

/// Authentication helper the vendor UI shells out to
pub const AUTHENTICATE_CGI_PATH: &str = "/usr/syno/synoman/webman/modules/authenticate.cgi";

/// Marker a container runtime leaves behind; the vendor refuses to run when present
pub const DOCKERENV_PATH: &str = "/.dockerenv";

pub const PROC_DIR: &str = "/proc";

pub const SYNO_PLATFORM: &str = "geminilake";
pub const SYNO_MODEL: &str = "DS920+";
pub const DSM_VERSION_MAJOR: &str = "7";
pub const DSM_VERSION_MINOR: &str = "2";
pub const DSM_VERSION_BUILD: &str = "64570";
pub const OS_VERSION: &str = "geminilake dsm 7.2-64570";
pub const PLATFORM_LABEL: &str = "群晖";

/// URL prefix the vendor UI is served under
pub const CGI_PATH: &str = "/webman/3rdparty/pan-xunlei-com/index.cgi/";
pub const LOGIN_PATH: &str = "/webman/login.cgi";

/// Default location of the configuration file
pub const CONFIG_PATH: &str = "/etc/nasemu/config.toml";

pub const DEFAULT_LISTEN: &str = ":2345";
pub const DEFAULT_DATA_DIR: &str = "/xunlei/data";
pub const DEFAULT_DOWNLOAD_DIR: &str = "/xunlei/downloads";
pub const DEFAULT_PACKAGE_URL: &str = "file:///var/packages/pan-xunlei-com.spk";

/// Lines written to the firmware identification file
#[must_use]
pub fn synoinfo_lines() -> Vec<String> {
    vec![
        format!("platform_name=\"{SYNO_PLATFORM}\""),
        format!("synobios=\"{SYNO_PLATFORM}\""),
        format!("unique=\"synology_{SYNO_PLATFORM}_{SYNO_MODEL}\""),
    ]
}
