//! Archive extraction

use async_trait::async_trait;
use flate2::read::GzDecoder;
use nasemu_errors::{AcquisitionError, Error};
use std::ffi::OsStr;
use std::future::Future;
use std::io::{self, Read};
use std::path::{Component, Path};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::io::SyncIoBridge;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Name of the payload inside a `.spk`
pub const PACKAGE_MEMBER: &str = "package.tgz";

/// Owned byte stream handed to an extractor
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Turns an archive stream into files under a directory
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Consume `reader` and unpack its content into `dest`
    ///
    /// Implementations check `cancel` while reading and fail with
    /// `Error::Cancelled` once it fires.
    async fn extract(
        &self,
        reader: BoxedReader,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), Error>;
}

/// Extractor for vendor `.spk` archives
///
/// An `.spk` is an uncompressed tar whose `package.tgz` member is a gzipped
/// tar of the package root. Only that member is unpacked.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpkExtractor;

#[async_trait]
impl Extractor for SpkExtractor {
    async fn extract(
        &self,
        reader: BoxedReader,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let dest = dest.to_path_buf();
        let bridge = SyncIoBridge::new(CancelRead::new(reader, cancel));
        let task = tokio::task::spawn_blocking(move || unpack_spk(bridge, &dest));

        // A stalled source keeps the blocking read parked; the token wins
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            joined = task => {
                let result =
                    joined.map_err(|e| Error::internal(format!("extraction task failed: {e}")))?;
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                result
            }
        }
    }
}

/// Async reader that fails every read once the token is cancelled
///
/// A read already waiting for data is woken by the cancellation too, which
/// releases the blocking thread behind [`SyncIoBridge`].
struct CancelRead {
    inner: BoxedReader,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl CancelRead {
    fn new(inner: BoxedReader, cancel: &CancellationToken) -> Self {
        Self {
            inner,
            cancelled: Box::pin(cancel.clone().cancelled_owned()),
        }
    }
}

impl AsyncRead for CancelRead {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Err(io::Error::other("extraction cancelled")));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

fn is_package_member(path: &Path) -> bool {
    let mut normal = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir));
    matches!(
        (normal.next(), normal.next()),
        (Some(Component::Normal(name)), None) if name == OsStr::new(PACKAGE_MEMBER)
    )
}

fn extraction_error(e: &io::Error) -> Error {
    AcquisitionError::Extraction {
        message: e.to_string(),
    }
    .into()
}

/// Unpack the `package.tgz` member of an `.spk` stream into `dest`
pub(crate) fn unpack_spk<R: Read>(reader: R, dest: &Path) -> Result<(), Error> {
    let mut outer = tar::Archive::new(reader);

    for entry in outer.entries().map_err(|e| extraction_error(&e))? {
        let entry = entry.map_err(|e| extraction_error(&e))?;
        let is_member = entry
            .path()
            .map(|path| is_package_member(&path))
            .map_err(|e| extraction_error(&e))?;
        if !is_member {
            continue;
        }

        tracing::debug!(dest = %dest.display(), "unpacking {PACKAGE_MEMBER}");
        let mut inner = tar::Archive::new(GzDecoder::new(entry));
        inner.set_preserve_permissions(true);
        inner.set_overwrite(true);
        inner.unpack(dest).map_err(|e| extraction_error(&e))?;
        return Ok(());
    }

    Err(AcquisitionError::MissingMember {
        member: PACKAGE_MEMBER.to_string(),
    }
    .into())
}
