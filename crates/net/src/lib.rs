#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for nasemu
//!
//! This crate fetches the vendor package over HTTP(S). Response bodies are
//! exposed as `AsyncRead` streams so the archive can be unpacked while it is
//! still downloading; nothing is staged on disk.

mod client;
mod human;
mod progress;

pub use client::{NetClient, NetConfig, BROWSER_HEADERS, BROWSER_USER_AGENT};
pub use human::{human_bytes, human_bytes_with_precision};
pub use progress::{ProgressCounter, ProgressReader};

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use nasemu_errors::Error;
use nasemu_events::{AcquisitionEvent, AppEvent, EventEmitter, EventSender};
use tokio_util::io::StreamReader;

/// Streaming response body with progress reporting
pub type BodyReader = ProgressReader<StreamReader<BoxStream<'static, std::io::Result<Bytes>>, Bytes>>;

/// Issue a GET for `url` and return its body as a progress-reporting reader
///
/// Emits `AcquisitionEvent::Started` with the advertised content length.
///
/// # Errors
///
/// Returns an error if the request fails or the server answers with a
/// non-success status. Errors while reading the body surface as I/O errors
/// from the returned reader.
pub async fn open_stream(
    client: &NetClient,
    url: &str,
    tx: Option<&EventSender>,
) -> Result<BodyReader, Error> {
    tracing::debug!(%url, "requesting package");
    let response = client.get(url).await?;
    let total = response.content_length();

    tx.cloned().emit(AppEvent::Acquisition(AcquisitionEvent::Started {
        url: url.to_string(),
        total_bytes: total,
    }));

    let stream = response
        .bytes_stream()
        .map_err(std::io::Error::other)
        .boxed();

    let reader = ProgressReader::new(StreamReader::new(stream), url, total);
    Ok(match tx {
        Some(tx) => reader.with_events(tx.clone()),
        None => reader,
    })
}
