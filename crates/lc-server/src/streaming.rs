//! Range-accurate delivery over a chunked upstream.
//!
//! The upstream can only start at an offset and keep going; its chunk
//! boundaries have nothing to do with the requested range. The adapter
//! forwards chunks in order and cuts the stream off at exactly the window
//! length, so the body always matches the `Content-Length` that was
//! promised.
//!
//! Errors while draining the upstream end the body quietly. A client that
//! goes away mid-stream (the normal case when a player seeks) drops the
//! body, which drops the upstream stream with it.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;

use lc_core::ServingWindow;
use lc_upstream::{ByteStream, ChunkSource, ObjectHandle};

/// Tracks how many bytes may still be written for one window.
#[derive(Debug, Clone, Copy)]
pub struct ByteBudget {
    remaining: u64,
}

impl ByteBudget {
    pub fn new(len: u64) -> Self {
        Self { remaining: len }
    }

    /// Cut `chunk` down to what the budget still allows and charge for it.
    pub fn take(&mut self, mut chunk: Bytes) -> Bytes {
        if chunk.len() as u64 > self.remaining {
            chunk.truncate(self.remaining as usize);
        }
        self.remaining -= chunk.len() as u64;
        chunk
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Logs how a delivery ended, including when the body is dropped early.
struct Delivery {
    handle: ObjectHandle,
    expected: u64,
    sent: u64,
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if self.sent < self.expected {
            tracing::debug!(
                handle = %self.handle,
                sent = self.sent,
                expected = self.expected,
                "Stream ended early (client disconnected or upstream stopped)"
            );
        } else {
            tracing::trace!(handle = %self.handle, sent = self.sent, "Stream complete");
        }
    }
}

/// Stream exactly `window.len` bytes of `handle`, starting at
/// `window.start`.
///
/// The upstream is asked once, at `window.start`, and is not polled again
/// after the last byte of the window has been produced. An empty window
/// never touches the upstream.
pub fn stream_window(
    source: Arc<dyn ChunkSource>,
    handle: ObjectHandle,
    window: &ServingWindow,
) -> ByteStream {
    let offset = window.start;
    let expected = window.len;

    if expected == 0 {
        return Box::pin(futures::stream::empty());
    }

    Box::pin(async_stream::stream! {
        let mut budget = ByteBudget::new(expected);
        let mut chunks = source.chunks(&handle, offset);
        let mut delivery = Delivery { handle, expected, sent: 0 };

        while let Some(next) = chunks.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::debug!(
                        handle = %delivery.handle,
                        sent = delivery.sent,
                        error = %e,
                        "Upstream chunk stream failed"
                    );
                    break;
                }
            };

            let piece = budget.take(chunk);
            if !piece.is_empty() {
                delivery.sent += piece.len() as u64;
                yield Ok::<Bytes, std::io::Error>(piece);
            }
            if budget.is_exhausted() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use lc_core::{negotiate, AttachmentKind, ContainerRef};
    use lc_upstream::MemoryRepository;
    use parking_lot::Mutex;

    /// Wraps a memory repository and records every call and every chunk
    /// pulled.
    struct CountingSource {
        inner: MemoryRepository,
        pulls: Arc<AtomicUsize>,
        offsets: Mutex<Vec<u64>>,
        dropped: Arc<AtomicBool>,
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl ChunkSource for CountingSource {
        fn chunks(&self, handle: &ObjectHandle, offset: u64) -> ByteStream {
            self.offsets.lock().push(offset);
            let pulls = self.pulls.clone();
            let flag = DropFlag(self.dropped.clone());
            Box::pin(self.inner.chunks(handle, offset).inspect(move |_| {
                let _keep = &flag;
                pulls.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    fn data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 241) as u8).collect()
    }

    fn counting(len: usize, chunk_size: usize) -> (Arc<CountingSource>, ObjectHandle) {
        let inner = MemoryRepository::new(chunk_size);
        let handle = inner.insert_media(
            ContainerRef::Id(1),
            1,
            AttachmentKind::Document,
            None,
            None,
            data(len),
        );
        let source = Arc::new(CountingSource {
            inner,
            pulls: Arc::new(AtomicUsize::new(0)),
            offsets: Mutex::new(Vec::new()),
            dropped: Arc::new(AtomicBool::new(false)),
        });
        (source, handle)
    }

    async fn collect(stream: ByteStream) -> Vec<Bytes> {
        stream.map(|c| c.unwrap()).collect().await
    }

    #[test]
    fn budget_truncates_and_exhausts() {
        let mut budget = ByteBudget::new(100);
        assert_eq!(budget.take(Bytes::from(vec![0u8; 64])).len(), 64);
        assert!(!budget.is_exhausted());
        assert_eq!(budget.take(Bytes::from(vec![0u8; 64])).len(), 36);
        assert!(budget.is_exhausted());
        assert!(budget.take(Bytes::from(vec![0u8; 64])).is_empty());
    }

    #[tokio::test]
    async fn exact_bytes_across_chunk_boundaries() {
        let (source, handle) = counting(1000, 64);
        let window = negotiate(Some("bytes=500-599"), 1000);

        let chunks = collect(stream_window(source.clone(), handle, &window)).await;
        let sizes: Vec<usize> = chunks.iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![64, 36]);
        assert_eq!(chunks.concat(), data(1000)[500..600]);

        assert_eq!(*source.offsets.lock(), vec![500]);
        assert_eq!(source.pulls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn full_window_streams_everything() {
        let (source, handle) = counting(1000, 64);
        let window = negotiate(None, 1000);
        let chunks = collect(stream_window(source.clone(), handle, &window)).await;
        assert_eq!(chunks.concat(), data(1000));
        assert_eq!(*source.offsets.lock(), vec![0]);
    }

    #[tokio::test]
    async fn window_ending_on_chunk_boundary_stops_immediately() {
        let (source, handle) = counting(1000, 64);
        let window = negotiate(Some("bytes=0-127"), 1000);
        let chunks = collect(stream_window(source.clone(), handle, &window)).await;
        assert_eq!(chunks.iter().map(Bytes::len).sum::<usize>(), 128);
        assert_eq!(source.pulls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_window_never_calls_upstream() {
        let (source, handle) = counting(0, 64);
        let window = negotiate(None, 0);
        let chunks = collect(stream_window(source.clone(), handle, &window)).await;
        assert!(chunks.is_empty());
        assert!(source.offsets.lock().is_empty());
    }

    #[tokio::test]
    async fn short_upstream_ends_body_early() {
        let (source, handle) = counting(550, 64);
        // Window claims more than the upstream actually has.
        let window = negotiate(Some("bytes=500-599"), 1000);
        let chunks = collect(stream_window(source, handle, &window)).await;
        assert_eq!(chunks.concat().len(), 50);
    }

    #[tokio::test]
    async fn upstream_error_is_swallowed() {
        struct FailingSource;

        impl ChunkSource for FailingSource {
            fn chunks(&self, _handle: &ObjectHandle, _offset: u64) -> ByteStream {
                Box::pin(futures::stream::iter(vec![
                    Ok(Bytes::from(vec![7u8; 64])),
                    Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
                    Ok(Bytes::from(vec![8u8; 64])),
                ]))
            }
        }

        let window = negotiate(None, 1000);
        let items: Vec<std::io::Result<Bytes>> =
            stream_window(Arc::new(FailingSource), ObjectHandle::new("x"), &window)
                .collect()
                .await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn dropping_body_releases_upstream() {
        let (source, handle) = counting(1000, 64);
        let window = negotiate(None, 1000);

        let mut body = stream_window(source.clone(), handle, &window);
        let first = body.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 64);
        assert!(!source.dropped.load(Ordering::SeqCst));

        drop(body);
        assert!(source.dropped.load(Ordering::SeqCst));
        assert_eq!(source.pulls.load(Ordering::SeqCst), 1);
    }
}
