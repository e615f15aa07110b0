//! Package acquisition: state check, fetch and extract

use crate::extract::{BoxedReader, Extractor, SpkExtractor};
use crate::source::PackageSource;
use crate::state::{check_install_state, package_arch, InstallState};
use async_trait::async_trait;
use nasemu_config::PackageLayout;
use nasemu_errors::{AcquisitionError, Error};
use nasemu_events::{AcquisitionEvent, AppEvent, EventEmitter, EventSender, FailureContext};
use nasemu_net::{NetClient, NetConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Parameters of one acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireRequest {
    /// `file://`, `http://` or `https://` URL of the `.spk`
    pub url: String,
    /// Package root to unpack into
    pub dest: PathBuf,
    /// Skip the install state check
    pub force: bool,
}

/// Result of a successful acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The package was already complete; the source was not touched
    AlreadyInstalled { version: String },
    /// The package was fetched and unpacked
    Installed,
}

/// Anything able to make a package available under a directory
#[async_trait]
pub trait PackageAcquirer: Send + Sync {
    /// Ensure the package described by `request` is installed
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or extraction fails.
    async fn acquire(
        &self,
        request: &AcquireRequest,
        cancel: &CancellationToken,
    ) -> Result<AcquireOutcome, Error>;
}

/// Default acquirer backed by the filesystem, HTTP and an [`Extractor`]
///
/// The HTTP client is only built when an HTTP source is actually fetched.
pub struct Acquirer {
    layout: PackageLayout,
    arch: String,
    net: NetConfig,
    extractor: Arc<dyn Extractor>,
    tx: Option<EventSender>,
}

impl Acquirer {
    /// Create an acquirer for `layout` using the `.spk` extractor
    #[must_use]
    pub fn new(layout: PackageLayout) -> Self {
        Self {
            layout,
            arch: package_arch().to_string(),
            net: NetConfig::default(),
            extractor: Arc::new(SpkExtractor),
            tx: None,
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_net_config(mut self, net: NetConfig) -> Self {
        self.net = net;
        self
    }

    /// Override the architecture used to expand artifact names
    #[must_use]
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    async fn open(&self, source: &PackageSource) -> Result<BoxedReader, Error> {
        match source {
            PackageSource::File(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    AcquisitionError::SourceUnreadable {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(Box::new(file))
            }
            PackageSource::Http(url) => {
                let client = NetClient::new(&self.net)?;
                let reader = nasemu_net::open_stream(&client, url, self.tx.as_ref()).await?;
                Ok(Box::new(reader))
            }
        }
    }

    async fn fetch(&self, request: &AcquireRequest, cancel: &CancellationToken) -> Result<(), Error> {
        let source = PackageSource::parse(&request.url)?;
        tracing::info!(%source, dest = %request.dest.display(), "fetching vendor package");

        let reader = tokio::select! {
            () = cancel.cancelled() => return Err(Error::Cancelled),
            reader = self.open(&source) => reader?,
        };
        self.extractor.extract(reader, &request.dest, cancel).await?;

        self.tx.emit(AppEvent::Acquisition(AcquisitionEvent::Completed {
            url: request.url.clone(),
            dest: request.dest.display().to_string(),
        }));
        Ok(())
    }
}

#[async_trait]
impl PackageAcquirer for Acquirer {
    async fn acquire(
        &self,
        request: &AcquireRequest,
        cancel: &CancellationToken,
    ) -> Result<AcquireOutcome, Error> {
        let dest = request.dest.display().to_string();

        if !request.force {
            match check_install_state(&request.dest, &self.layout, &self.arch, self.tx.as_ref()) {
                InstallState::Complete { version } => {
                    self.tx.emit(AppEvent::Acquisition(AcquisitionEvent::AlreadyInstalled {
                        dest,
                        version: version.clone(),
                    }));
                    return Ok(AcquireOutcome::AlreadyInstalled { version });
                }
                state => {
                    self.tx.emit(AppEvent::Acquisition(AcquisitionEvent::RefetchRequired {
                        dest,
                        reason: state.to_string(),
                    }));
                }
            }
        }

        match self.fetch(request, cancel).await {
            Ok(()) => Ok(AcquireOutcome::Installed),
            Err(e) => {
                if !e.is_cancelled() {
                    self.tx.emit(AppEvent::Acquisition(AcquisitionEvent::Failed {
                        url: request.url.clone(),
                        failure: FailureContext::from_error(&e),
                    }));
                }
                Err(e)
            }
        }
    }
}
