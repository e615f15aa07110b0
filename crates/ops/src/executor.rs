//! Step interpreter

use crate::pipeline::Pipeline;
use crate::step::Step;
use async_trait::async_trait;
use futures::future::BoxFuture;
use nasemu_config::FailurePolicy;
use nasemu_errors::Error;
use nasemu_events::{AppEvent, EventEmitter, EventSender, FailureContext, ProvisionEvent};
use nasemu_install::{AcquireOutcome, PackageAcquirer};
use nasemu_platform::{fs, namespace, Identity, PrivilegeGuard};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs the vendor software once provisioning is done
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Run until the vendor process and dashboard have both stopped
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that should abort the pipeline;
    /// a vendor process that fails to start is reported through events.
    async fn launch(&self, cancel: &CancellationToken) -> Result<(), Error>;
}

/// Interprets steps in order, stopping at the first fatal failure
///
/// Nothing is rolled back: steps that already ran stay applied. The executor
/// only holds its collaborators, so one instance can run several pipelines.
pub struct Executor {
    acquirer: Arc<dyn PackageAcquirer>,
    launcher: Arc<dyn Launcher>,
    tx: Option<EventSender>,
    cancel: CancellationToken,
}

impl EventEmitter for Executor {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl Executor {
    #[must_use]
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    /// Token observed by acquisition and launch
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run every step of `pipeline`
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step whose policy is fatal, or
    /// `Error::Cancelled` when the token fires between steps.
    pub async fn execute(&self, pipeline: &Pipeline) -> Result<(), Error> {
        self.run_steps(pipeline.steps(), 0).await
    }

    fn run_steps<'a>(&'a self, steps: &'a [Step], depth: usize) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            for (index, step) in steps.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                let label = step.to_string();
                tracing::debug!(index, depth, step = %label, "running step");
                self.emit(AppEvent::Provision(ProvisionEvent::StepStarted {
                    index,
                    depth,
                    step: label.clone(),
                }));

                match self.run_step(step, depth).await {
                    Ok(()) => {
                        self.emit(AppEvent::Provision(ProvisionEvent::StepCompleted {
                            index,
                            depth,
                            step: label,
                        }));
                    }
                    Err(e) if step.policy() == FailurePolicy::Warn && !e.is_cancelled() => {
                        tracing::warn!(step = %label, error = %e, "step failed, continuing");
                        self.emit(AppEvent::Provision(ProvisionEvent::StepToleratedFailure {
                            index,
                            depth,
                            step: label,
                            failure: FailureContext::from_error(&e),
                        }));
                    }
                    Err(e) => {
                        if !e.is_cancelled() {
                            self.emit(AppEvent::Provision(ProvisionEvent::StepFailed {
                                index,
                                depth,
                                step: label,
                                failure: FailureContext::from_error(&e),
                            }));
                        }
                        return Err(e);
                    }
                }
            }
            Ok(())
        })
    }

    async fn run_step(&self, step: &Step, depth: usize) -> Result<(), Error> {
        match step {
            Step::CreateDir { path, options } => fs::create_dir_all(path, options),
            Step::CreateDirs { paths, options } => fs::create_dirs(paths, options),
            Step::WriteFile {
                path,
                lines,
                overwrite,
                options,
            } => fs::write_file(path, lines, *overwrite, options),
            Step::RemoveFile { path } => fs::remove_file(path),
            Step::Chown {
                path,
                identity,
                recursive,
            } => fs::chown(path, *identity, *recursive),
            Step::Chmod {
                path,
                mode,
                recursive,
            } => fs::chmod(path, *mode, *recursive),
            Step::Unshare(namespaces) => namespace::unshare(*namespaces),
            Step::Mount { spec, .. } => namespace::mount(spec),
            Step::Acquire(request) => {
                match self.acquirer.acquire(request, &self.cancel).await? {
                    AcquireOutcome::AlreadyInstalled { version } => {
                        tracing::info!(%version, "vendor package already installed");
                    }
                    AcquireOutcome::Installed => {
                        tracing::info!(dest = %request.dest.display(), "vendor package installed");
                    }
                }
                Ok(())
            }
            Step::RunAs { identity, steps } => self.run_as(*identity, steps, depth).await,
            Step::Launch => self.launcher.launch(&self.cancel).await,
        }
    }

    async fn run_as(&self, identity: Identity, steps: &[Step], depth: usize) -> Result<(), Error> {
        if identity.is_root() {
            return self.run_steps(steps, depth + 1).await;
        }

        let guard = PrivilegeGuard::enter(identity)?;
        let saved = guard.saved();
        self.emit(AppEvent::Provision(ProvisionEvent::PrivilegeEntered {
            uid: identity.uid,
            gid: identity.gid,
        }));

        let result = self.run_steps(steps, depth + 1).await;
        drop(guard);

        let current = Identity::current_effective();
        if current == saved {
            self.emit(AppEvent::Provision(ProvisionEvent::PrivilegeRestored {
                uid: saved.uid,
                gid: saved.gid,
            }));
        } else {
            self.emit(AppEvent::Provision(ProvisionEvent::RestoreFailed {
                message: format!("effective identity is {current}, expected {saved}"),
            }));
        }
        result
    }
}

/// Builder for [`Executor`]
#[derive(Default)]
pub struct ExecutorBuilder {
    acquirer: Option<Arc<dyn PackageAcquirer>>,
    launcher: Option<Arc<dyn Launcher>>,
    tx: Option<EventSender>,
    cancel: Option<CancellationToken>,
}

impl ExecutorBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_acquirer(mut self, acquirer: Arc<dyn PackageAcquirer>) -> Self {
        self.acquirer = Some(acquirer);
        self
    }

    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Defaults to a fresh token that is never cancelled
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the executor
    ///
    /// # Errors
    ///
    /// Returns an error if the acquirer or launcher is missing.
    pub fn build(self) -> Result<Executor, Error> {
        let acquirer = self
            .acquirer
            .ok_or_else(|| Error::internal("executor is missing its acquirer"))?;
        let launcher = self
            .launcher
            .ok_or_else(|| Error::internal("executor is missing its launcher"))?;

        Ok(Executor {
            acquirer,
            launcher,
            tx: self.tx,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}
