//! Byte-counting pass-through reader

use nasemu_events::{AcquisitionEvent, AppEvent, EventEmitter, EventSender};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, ReadBuf};

/// Minimum spacing between two progress events
const REPORT_INTERVAL: Duration = Duration::from_millis(50);

/// Shared running total of transferred bytes
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    bytes: Arc<AtomicU64>,
}

impl ProgressCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` bytes and return the new total
    pub fn add(&self, n: u64) -> u64 {
        self.bytes.fetch_add(n, Ordering::Relaxed) + n
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Wraps a reader and reports how many bytes went through it
///
/// Every read adds to the shared [`ProgressCounter`]. Progress events are
/// emitted for the first chunk, at most every 50ms afterwards, and once at
/// end of stream.
pub struct ProgressReader<R> {
    inner: R,
    counter: ProgressCounter,
    url: String,
    total: Option<u64>,
    tx: Option<EventSender>,
    last_report: Option<Instant>,
    finished: bool,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, url: impl Into<String>, total: Option<u64>) -> Self {
        Self {
            inner,
            counter: ProgressCounter::new(),
            url: url.into(),
            total,
            tx: None,
            last_report: None,
            finished: false,
        }
    }

    /// Report progress events through `tx`
    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Count into an existing counter instead of a private one
    #[must_use]
    pub fn with_counter(mut self, counter: ProgressCounter) -> Self {
        self.counter = counter;
        self
    }

    #[must_use]
    pub fn counter(&self) -> &ProgressCounter {
        &self.counter
    }

    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    fn report(&mut self, bytes: u64) {
        self.last_report = Some(Instant::now());
        self.tx.emit(AppEvent::Acquisition(AcquisitionEvent::Progress {
            url: self.url.clone(),
            bytes,
            total_bytes: self.total,
        }));
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = poll {
            let read = (buf.filled().len() - before) as u64;
            if read > 0 {
                let bytes = this.counter.add(read);
                let due = this
                    .last_report
                    .is_none_or(|last| last.elapsed() >= REPORT_INTERVAL);
                if due {
                    this.report(bytes);
                }
            } else if buf.remaining() > 0 && !this.finished {
                this.finished = true;
                let bytes = this.counter.get();
                this.report(bytes);
            }
        }

        poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_counts_every_byte() {
        let data = vec![7u8; 10_000];
        let (tx, mut rx) = nasemu_events::channel();
        let mut reader =
            ProgressReader::new(&data[..], "file:///pkg.spk", Some(10_000)).with_events(tx);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, data);
        assert_eq!(reader.counter().get(), 10_000);

        let mut last = None;
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Acquisition(AcquisitionEvent::Progress { bytes, .. }) = message.event
            {
                last = Some(bytes);
            }
        }
        assert_eq!(last, Some(10_000));
    }

    #[tokio::test]
    async fn test_shared_counter() {
        let counter = ProgressCounter::new();
        let mut reader =
            ProgressReader::new(&b"abc"[..], "mem", None).with_counter(counter.clone());

        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(counter.get(), 3);
    }
}
