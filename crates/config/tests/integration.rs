//! Integration tests for config

#[cfg(test)]
mod tests {
    use nasemu_config::*;
    use nasemu_errors::{ConfigError, Error};
    use std::io::Write;
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: &[&str] = &[
        "XL_LISTEN",
        "XL_DIR_DOWNLOAD",
        "XL_DIR_DATA",
        "XL_UID",
        "XL_GID",
        "XL_PREVENT_UPDATE",
        "XL_SPK_URL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
listen = "127.0.0.1:8080"
prevent_update = true

[paths]
data_dir = "/srv/xl/data"
download_dirs = ["/srv/xl/a", "/srv/xl/b"]

[identity]
uid = 1000
gid = 100

[package]
url = "https://example.com/pkg.spk"

[package.layout]
min_artifact_size = 1024

[isolation]
proc_mount_policy = "warn"
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.general.listen, "127.0.0.1:8080");
        assert!(config.general.prevent_update);
        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/xl/data"));
        assert_eq!(config.paths.download_dirs.len(), 2);
        assert_eq!(config.identity, IdentityConfig { uid: 1000, gid: 100 });
        assert_eq!(config.package.url, "https://example.com/pkg.spk");
        assert_eq!(config.package.layout.min_artifact_size, 1024);
        // Unset layout fields keep their defaults
        assert_eq!(config.package.layout.artifacts.len(), 3);
        assert_eq!(config.isolation.proc_mount_policy, FailurePolicy::Warn);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.general.listen, ":2345");
        assert_eq!(config.paths.data_dir, PathBuf::from("/xunlei/data"));
        assert_eq!(config.paths.download_dirs, vec!["/xunlei/downloads"]);
        assert_eq!(config.identity, IdentityConfig::default());
        assert_eq!(config.package.layout.min_artifact_size, 10 * 1024 * 1024);
        assert_eq!(config.isolation.proc_mount_policy, FailurePolicy::Fatal);
        assert_eq!("Warning".parse::<FailurePolicy>().unwrap(), FailurePolicy::Warn);
        assert!("sometimes".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("XL_LISTEN", ":9000");
        std::env::set_var("XL_DIR_DOWNLOAD", "/dl/one:/dl/two");
        std::env::set_var("XL_UID", "1000");
        std::env::set_var("XL_GID", "1001");
        std::env::set_var("XL_PREVENT_UPDATE", "true");
        std::env::set_var("XL_SPK_URL", "file:///tmp/pkg.spk");

        let mut config = Config::default();
        config.merge_env().unwrap();
        config.normalize().unwrap();

        assert_eq!(config.general.listen, ":9000");
        assert_eq!(config.paths.download_dirs, vec!["/dl/one", "/dl/two"]);
        assert_eq!(config.identity.uid, 1000);
        assert_eq!(config.identity.gid, 1001);
        assert!(config.general.prevent_update);
        assert_eq!(config.package.url, "file:///tmp/pkg.spk");

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("XL_UID", "nobody");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { ref field, .. })) if field == "XL_UID"
        ));

        clear_env();
    }

    #[test]
    fn test_normalize_download_dirs() {
        let mut config = Config::default();
        config.paths.download_dirs = vec![" /a : /b ".to_string(), String::new(), "::".to_string()];
        config.normalize().unwrap();
        assert_eq!(config.paths.download_dirs, vec!["/a", "/b"]);

        config.paths.download_dirs = vec![":".to_string()];
        config.normalize().unwrap();
        assert_eq!(config.paths.download_dirs, vec!["/xunlei/downloads"]);

        config.paths.download_dirs = vec!["relative".to_string()];
        config.normalize().unwrap();
        assert!(PathBuf::from(&config.paths.download_dirs[0]).is_absolute());
    }

    #[test]
    fn test_parse_listen() {
        let expected: SocketAddr = "0.0.0.0:2345".parse().unwrap();
        assert_eq!(parse_listen(":2345").unwrap(), expected);
        assert_eq!(parse_listen("2345").unwrap(), expected);
        assert_eq!(
            parse_listen("127.0.0.1:80").unwrap(),
            "127.0.0.1:80".parse::<SocketAddr>().unwrap()
        );
        assert!(matches!(
            parse_listen("nope"),
            Err(Error::Config(ConfigError::InvalidListen { .. }))
        ));
        assert!(parse_listen(":99999").is_err());
    }

    #[test]
    fn test_layout_expand() {
        let layout = PackageLayout::default();
        let files = layout.expand("amd64", "3.20.1");
        assert_eq!(
            files,
            vec![
                "bin/bin/xunlei-pan-cli-launcher.amd64",
                "bin/bin/xunlei-pan-cli.3.20.1.amd64",
                "ui/index.cgi",
            ]
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = Config::load_from_file(std::path::Path::new("/nonexistent/nasemu.toml"));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_synoinfo_lines() {
        let lines = constants::synoinfo_lines();
        assert_eq!(lines[0], "platform_name=\"geminilake\"");
        assert_eq!(lines[2], "unique=\"synology_geminilake_DS920+\"");
    }
}
