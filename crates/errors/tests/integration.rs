//! Integration tests for error types

#[cfg(test)]
mod tests {
    use nasemu_errors::*;

    #[test]
    fn test_error_conversion() {
        let err: Error = AcquisitionError::UnsupportedScheme {
            url: "ftp://example.com/pkg.spk".into(),
        }
        .into();
        assert!(matches!(err, Error::Acquisition(_)));

        let err: Error = ProvisionError::GuardBusy.into();
        assert!(matches!(err, Error::Provision(ProvisionError::GuardBusy)));
    }

    #[test]
    fn test_error_display() {
        let err = AcquisitionError::UnsupportedScheme {
            url: "ftp://example.com/pkg.spk".into(),
        };
        assert_eq!(
            err.to_string(),
            "package url is not supported: ftp://example.com/pkg.spk"
        );

        let err = ProvisionError::Mount {
            target: "/proc".into(),
            message: "EPERM".into(),
        };
        assert_eq!(err.to_string(), "mount failed on /proc: EPERM");
    }

    #[test]
    fn test_error_clone() {
        let err = LaunchError::SpawnFailed {
            program: "launcher".into(),
            message: "not found".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::PermissionDenied,
                path: None,
                ..
            }
        ));
    }

    #[test]
    fn test_retryability_follows_phase() {
        let acquisition: Error = AcquisitionError::Transport {
            url: "https://example.com".into(),
            message: "reset".into(),
        }
        .into();
        assert!(acquisition.is_retryable());

        let config: Error = ConfigError::InvalidValue {
            field: "XL_UID".into(),
            value: "-1".into(),
        }
        .into();
        assert!(!config.is_retryable());
        assert_eq!(config.user_code(), Some("config.invalid_value"));
        assert!(Error::Cancelled.is_cancelled());
    }
}
