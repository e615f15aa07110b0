//! Integration tests for the provisioning executor and plan

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use nasemu_config::{Config, FailurePolicy};
    use nasemu_errors::{AcquisitionError, Error};
    use nasemu_events::{channel, AppEvent, EventReceiver, ProvisionEvent};
    use nasemu_install::{AcquireOutcome, AcquireRequest, PackageAcquirer};
    use nasemu_ops::*;
    use nasemu_platform::{Identity, MountSpec, Namespaces, PropertyOption};
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct RecordingAcquirer {
        requests: Mutex<Vec<AcquireRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl PackageAcquirer for RecordingAcquirer {
        async fn acquire(
            &self,
            request: &AcquireRequest,
            _cancel: &CancellationToken,
        ) -> Result<AcquireOutcome, Error> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(AcquisitionError::HttpStatus {
                    url: request.url.clone(),
                    status: 503,
                }
                .into());
            }
            Ok(AcquireOutcome::Installed)
        }
    }

    #[derive(Default)]
    struct CountingLauncher {
        launches: AtomicUsize,
    }

    #[async_trait]
    impl Launcher for CountingLauncher {
        async fn launch(&self, _cancel: &CancellationToken) -> Result<(), Error> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Records the effective identity each launch runs under
    #[derive(Default)]
    struct IdentityLauncher {
        seen: Mutex<Vec<Identity>>,
    }

    #[async_trait]
    impl Launcher for IdentityLauncher {
        async fn launch(&self, _cancel: &CancellationToken) -> Result<(), Error> {
            self.seen.lock().unwrap().push(Identity::current_effective());
            Ok(())
        }
    }

    // Effective ids are process-wide; tests touching the filesystem must not
    // overlap with one that drops privileges.
    static IDENTITY_LOCK: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        IDENTITY_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    struct Harness {
        executor: Executor,
        acquirer: Arc<RecordingAcquirer>,
        launcher: Arc<CountingLauncher>,
        rx: EventReceiver,
    }

    fn harness_with(acquirer: RecordingAcquirer, cancel: CancellationToken) -> Harness {
        let acquirer = Arc::new(acquirer);
        let launcher = Arc::new(CountingLauncher::default());
        let (tx, rx) = channel();
        let executor = Executor::builder()
            .with_acquirer(acquirer.clone())
            .with_launcher(launcher.clone())
            .with_event_sender(tx)
            .with_cancel_token(cancel)
            .build()
            .unwrap();
        Harness {
            executor,
            acquirer,
            launcher,
            rx,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingAcquirer::default(), CancellationToken::new())
    }

    fn mkdir(path: &Path) -> Step {
        Step::CreateDir {
            path: path.to_path_buf(),
            options: Vec::new(),
        }
    }

    /// A directory below a regular file can never be created
    fn failing_mkdir(temp: &TempDir) -> Step {
        let file = temp.path().join("plain-file");
        std::fs::write(&file, "x").unwrap();
        mkdir(&file.join("sub"))
    }

    fn provision_events(rx: &mut EventReceiver) -> Vec<ProvisionEvent> {
        let mut events = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Provision(event) = message.event {
                events.push(event);
            }
        }
        events
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let _serial = serial();
        let temp = TempDir::new().unwrap();
        let mut h = harness();
        let pipeline = Pipeline::new()
            .then(mkdir(&temp.path().join("a")))
            .then(Step::WriteFile {
                path: temp.path().join("a/conf"),
                lines: vec!["k=\"v\"".to_string(), "x=1".to_string()],
                overwrite: false,
                options: vec![PropertyOption::chmod(0o640)],
            })
            .then(Step::RemoveFile {
                path: temp.path().join("absent"),
            });

        h.executor.execute(&pipeline).await.unwrap();

        let content = std::fs::read_to_string(temp.path().join("a/conf")).unwrap();
        assert_eq!(content, "k=\"v\"\nx=1");

        let started: Vec<usize> = provision_events(&mut h.rx)
            .into_iter()
            .filter_map(|event| match event {
                ProvisionEvent::StepStarted { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_first_failure_stops_pipeline() {
        let _serial = serial();
        let temp = TempDir::new().unwrap();
        let mut h = harness();
        let later = temp.path().join("later");
        let pipeline = Pipeline::new()
            .then(mkdir(&temp.path().join("first")))
            .then(failing_mkdir(&temp))
            .then(mkdir(&later));

        let result = h.executor.execute(&pipeline).await;

        assert!(result.is_err());
        assert!(temp.path().join("first").is_dir());
        assert!(!later.exists());

        let events = provision_events(&mut h.rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, ProvisionEvent::StepFailed { index: 1, .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, ProvisionEvent::StepStarted { index: 2, .. })));
    }

    fn mount_on_missing_target(temp: &TempDir, policy: FailurePolicy) -> Step {
        Step::Mount {
            spec: MountSpec {
                target: temp.path().join("no-such-dir"),
                ..MountSpec::proc("/proc")
            },
            policy,
        }
    }

    #[tokio::test]
    async fn test_warn_policy_continues() {
        let _serial = serial();
        let temp = TempDir::new().unwrap();
        let mut h = harness();
        let after = temp.path().join("after");
        let pipeline = Pipeline::new()
            .then(mount_on_missing_target(&temp, FailurePolicy::Warn))
            .then(mkdir(&after));

        h.executor.execute(&pipeline).await.unwrap();

        assert!(after.is_dir());
        assert!(provision_events(&mut h.rx)
            .iter()
            .any(|e| matches!(e, ProvisionEvent::StepToleratedFailure { index: 0, .. })));
    }

    #[tokio::test]
    async fn test_fatal_mount_aborts() {
        let _serial = serial();
        let temp = TempDir::new().unwrap();
        let h = harness();
        let after = temp.path().join("after");
        let pipeline = Pipeline::new()
            .then(mount_on_missing_target(&temp, FailurePolicy::Fatal))
            .then(mkdir(&after));

        assert!(h.executor.execute(&pipeline).await.is_err());
        assert!(!after.exists());
    }

    #[tokio::test]
    async fn test_run_as_failure_restores_identity() {
        let _serial = serial();
        let temp = TempDir::new().unwrap();
        let mut h = harness();
        let before = Identity::current_effective();
        let later = temp.path().join("later");
        let pipeline = Pipeline::new()
            .then(run_as(
                before,
                vec![mkdir(&temp.path().join("inner")), failing_mkdir(&temp)],
            ))
            .then(mkdir(&later));

        let result = h.executor.execute(&pipeline).await;

        assert!(result.is_err());
        assert!(temp.path().join("inner").is_dir());
        assert!(!later.exists());
        assert_eq!(Identity::current_effective(), before);

        let events = provision_events(&mut h.rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, ProvisionEvent::StepFailed { depth: 1, index: 1, .. })));
        if !before.is_root() {
            assert!(events
                .iter()
                .any(|e| matches!(e, ProvisionEvent::PrivilegeRestored { .. })));
        }
    }

    #[tokio::test]
    async fn test_run_as_nobody_drops_and_restores_privileges() {
        let _serial = serial();
        let before = Identity::current_effective();
        if !before.is_root() {
            return;
        }

        let temp = TempDir::new().unwrap();
        // Let the unprivileged identity reach a writable directory
        std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        let open = temp.path().join("open");
        std::fs::create_dir(&open).unwrap();
        std::fs::set_permissions(&open, std::fs::Permissions::from_mode(0o777)).unwrap();
        let after_failure = open.join("after-failure");

        let nobody = Identity::new(65534, 65534);
        let launcher = Arc::new(IdentityLauncher::default());
        let (tx, mut rx) = channel();
        let executor = Executor::builder()
            .with_acquirer(Arc::new(RecordingAcquirer::default()))
            .with_launcher(launcher.clone())
            .with_event_sender(tx)
            .build()
            .unwrap();
        let pipeline = Pipeline::new().then(run_as(
            nobody,
            vec![Step::Launch, failing_mkdir(&temp), mkdir(&after_failure)],
        ));

        let result = executor.execute(&pipeline).await;

        assert!(result.is_err());
        assert_eq!(*launcher.seen.lock().unwrap(), vec![nobody]);
        assert_eq!(Identity::current_effective(), before);
        assert!(!after_failure.exists());

        let events = provision_events(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, ProvisionEvent::PrivilegeEntered { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, ProvisionEvent::PrivilegeRestored { .. })));
    }

    #[tokio::test]
    async fn test_root_run_as_runs_directly() {
        let _serial = serial();
        let mut h = harness();
        let pipeline = Pipeline::new().then(run_as(Identity::ROOT, vec![Step::Launch]));

        h.executor.execute(&pipeline).await.unwrap();

        assert_eq!(h.launcher.launches.load(Ordering::SeqCst), 1);
        assert!(!provision_events(&mut h.rx)
            .iter()
            .any(|e| matches!(e, ProvisionEvent::PrivilegeEntered { .. })));
    }

    #[tokio::test]
    async fn test_acquire_failure_skips_launch() {
        let h = harness_with(
            RecordingAcquirer {
                fail: true,
                ..RecordingAcquirer::default()
            },
            CancellationToken::new(),
        );
        let request = AcquireRequest {
            url: "http://example.invalid/pkg.spk".to_string(),
            dest: PathBuf::from("/nonexistent"),
            force: false,
        };
        let pipeline = Pipeline::new()
            .then(Step::Acquire(request.clone()))
            .then(Step::Launch);

        let result = h.executor.execute(&pipeline).await;

        assert!(matches!(
            result,
            Err(Error::Acquisition(AcquisitionError::HttpStatus { status: 503, .. }))
        ));
        assert_eq!(*h.acquirer.requests.lock().unwrap(), vec![request]);
        assert_eq!(h.launcher.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_step() {
        let _serial = serial();
        let temp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let h = harness_with(RecordingAcquirer::default(), cancel);
        let pipeline = Pipeline::new().then(mkdir(&temp.path().join("never")));

        let result = h.executor.execute(&pipeline).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(!temp.path().join("never").exists());
    }

    #[test]
    fn test_builder_requires_launcher() {
        let result = Executor::builder()
            .with_acquirer(Arc::new(RecordingAcquirer::default()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_plan_order() {
        let config = Config::default();
        let plan = provision_plan(&config);

        let kinds: Vec<&str> = plan.steps().iter().map(Step::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "write_file",
                "write_file",
                "remove_file",
                "create_dir",
                "create_dirs",
                "unshare",
                "mount",
                "create_dir",
                "mount",
                "acquire",
                "chown",
                "create_dir",
                "run_as",
            ]
        );
        assert_eq!(plan.steps()[5], Step::Unshare(Namespaces::ISOLATED));
        assert_eq!(
            plan.steps()[6],
            Step::Mount {
                spec: MountSpec::private_root(),
                policy: FailurePolicy::Fatal,
            }
        );
    }

    #[test]
    fn test_plan_uses_config() {
        let mut config = Config::default();
        config.identity.uid = 1000;
        config.identity.gid = 100;
        config.package.url = "https://example.com/pkg.spk".to_string();
        config.package.force = true;
        config.isolation.proc_mount_policy = FailurePolicy::Warn;
        let plan = provision_plan(&config);
        let steps = plan.steps();

        assert_eq!(
            steps[1],
            Step::WriteFile {
                path: PathBuf::from("/usr/syno/synoman/webman/modules/authenticate.cgi"),
                lines: AUTHENTICATE_CGI_SCRIPT
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                overwrite: false,
                options: vec![PropertyOption::chmod(0o777)],
            }
        );
        assert_eq!(steps[8].policy(), FailurePolicy::Warn);
        assert_eq!(
            steps[9],
            Step::Acquire(AcquireRequest {
                url: "https://example.com/pkg.spk".to_string(),
                dest: PathBuf::from("/var/packages/pan-xunlei-com/target"),
                force: true,
            })
        );
        assert_eq!(
            steps[12],
            run_as(Identity::new(1000, 100), vec![Step::Launch])
        );
    }

    #[test]
    fn test_synoinfo_is_not_overwritten() {
        let plan = provision_plan(&Config::default());
        match &plan.steps()[0] {
            Step::WriteFile {
                path,
                lines,
                overwrite,
                ..
            } => {
                assert_eq!(path, Path::new("/etc/synoinfo.conf"));
                assert!(!overwrite);
                assert_eq!(lines[0], "platform_name=\"geminilake\"");
                assert_eq!(lines[2], "unique=\"synology_geminilake_DS920+\"");
            }
            other => panic!("unexpected first step {other}"),
        }
    }
}
