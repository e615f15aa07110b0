//! Vendor process supervision

use crate::dashboard::{self, Dashboard};
use async_trait::async_trait;
use nasemu_config::{constants, Config};
use nasemu_errors::{Error, LaunchError};
use nasemu_events::{
    AppEvent, DashboardEvent, EventEmitter, EventSender, FailureContext, LaunchEvent,
};
use nasemu_install::package_arch;
use nasemu_ops::{vendor_environment, Launcher};
use nasemu_platform::{process, EnvSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::Child;
use tokio_util::sync::CancellationToken;

/// Program, arguments and working directory of the vendor launcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub work_dir: PathBuf,
}

impl VendorCommand {
    /// The launcher inside the package root for this architecture
    pub fn for_package(prevent_update: bool) -> Self {
        let program = PathBuf::from(constants::PKG_BIN_DIR)
            .join("bin")
            .join(format!("xunlei-pan-cli-launcher.{}", package_arch()));

        let mut args = vec![
            "-launcher_listen".to_string(),
            constants::LAUNCHER_SOCKET.to_string(),
            "-pid".to_string(),
            constants::LAUNCHER_PID_FILE.to_string(),
        ];
        if prevent_update {
            args.push("-update_url".to_string());
            args.push("null".to_string());
        }

        Self {
            program,
            args,
            work_dir: PathBuf::from(constants::PKG_BIN_DIR),
        }
    }

    pub fn cmdline(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs the vendor launcher next to the dashboard
pub struct VendorLauncher {
    command: VendorCommand,
    listen: SocketAddr,
    data_dir: PathBuf,
    download_dirs: Vec<PathBuf>,
    tx: Option<EventSender>,
}

impl EventEmitter for VendorLauncher {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl VendorLauncher {
    /// Build from a normalized configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address is invalid.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            command: VendorCommand::for_package(config.general.prevent_update),
            listen: config.listen_addr()?,
            data_dir: config.paths.data_dir.clone(),
            download_dirs: config.download_dirs(),
            tx: None,
        })
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    async fn supervise(&self, env: &EnvSet, cancel: &CancellationToken) {
        let cmdline = self.command.cmdline();
        let mut command = tokio::process::Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .current_dir(&self.command.work_dir)
            .env_clear()
            .envs(env.pairs())
            .process_group(0)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let error = LaunchError::SpawnFailed {
                    program: self.command.program.display().to_string(),
                    message: e.to_string(),
                };
                self.emit(AppEvent::Launch(LaunchEvent::Failed {
                    cmdline,
                    failure: FailureContext::from_error(&error),
                }));
                return;
            }
        };

        self.track(child, cmdline, cancel).await;
    }

    /// Wait for `child`, interrupting its process group on cancellation
    async fn track(&self, mut child: Child, cmdline: String, cancel: &CancellationToken) {
        // No pid means the child was already reaped; signalling group 0 would hit us
        let Some(pid) = child.id() else {
            self.emit_warning_with_context("vendor process exited before it was tracked", cmdline);
            self.report_exit(child.wait().await);
            return;
        };
        self.emit(AppEvent::Launch(LaunchEvent::Started { cmdline, pid }));

        let status = tokio::select! {
            status = child.wait() => status,
            () = cancel.cancelled() => {
                match process::interrupt_process_group(pid) {
                    Ok(()) => self.emit(AppEvent::Launch(LaunchEvent::InterruptSent {
                        pgid: i32::try_from(pid).unwrap_or_default(),
                    })),
                    Err(e) => self.emit_warning_with_context("interrupt vendor process", e.to_string()),
                }
                child.wait().await
            }
        };
        self.report_exit(status);
    }

    fn report_exit(&self, status: std::io::Result<ExitStatus>) {
        match status {
            Ok(status) => self.emit(AppEvent::Launch(LaunchEvent::Exited {
                code: status.code(),
                success: status.success(),
            })),
            Err(e) => {
                let error = LaunchError::WaitFailed {
                    message: e.to_string(),
                };
                self.emit(AppEvent::Launch(LaunchEvent::Failed {
                    cmdline: self.command.cmdline(),
                    failure: FailureContext::from_error(&error),
                }));
            }
        }
    }

    async fn run_dashboard(&self, env: EnvSet, cancel: &CancellationToken) {
        let dashboard = Dashboard::new(env);
        match dashboard::serve(self.listen, dashboard, cancel.clone(), self.tx.clone()).await {
            Ok(()) => {}
            Err(Error::Launch(LaunchError::ShutdownFailed { message })) => {
                self.emit(AppEvent::Dashboard(DashboardEvent::ShutdownFailed { message }));
            }
            Err(e) => self.emit_error(e.to_string()),
        }
        // Without a dashboard the vendor client is unreachable
        cancel.cancel();
    }
}

#[async_trait]
impl Launcher for VendorLauncher {
    async fn launch(&self, cancel: &CancellationToken) -> Result<(), Error> {
        let token = cancel.child_token();
        let env = vendor_environment(&self.data_dir, &self.download_dirs);

        tokio::join!(
            self.supervise(&env, &token),
            self.run_dashboard(env.clone(), &token)
        );
        Ok(())
    }
}
