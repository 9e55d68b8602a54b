//! lc-upstream: the object repository that deep-links point into.
//!
//! The proxy talks to its upstream through two narrow traits:
//!
//! - [`Repository`] looks up a single [`Entry`] by container and object id
//! - [`ChunkSource`] yields an object's bytes as a chunk stream starting at
//!   an arbitrary offset, with no way to ask for fewer bytes
//!
//! Two implementations ship with the crate: [`local::LocalRepository`]
//! (a directory tree on disk) and [`memory::MemoryRepository`] (in-process,
//! used heavily by tests).

pub mod local;
pub mod memory;

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use lc_core::config::{UpstreamBackend, UpstreamConfig};
use lc_core::{AttachmentKind, ContainerRef};

pub use local::LocalRepository;
pub use memory::MemoryRepository;

/// Ordered chunks of an object, as produced by a [`ChunkSource`].
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Upstream-specific reference used to fetch an object's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(String);

impl ObjectHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A media attachment as the upstream describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub handle: ObjectHandle,
    pub file_name: Option<String>,
    pub size: u64,
    /// Content type declared by the upstream, if any.
    pub mime_type: Option<String>,
}

/// A single message in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub container: ContainerRef,
    pub object_id: u64,
    pub document: Option<Attachment>,
    pub video: Option<Attachment>,
    pub audio: Option<Attachment>,
    pub photo: Option<Attachment>,
}

impl Entry {
    /// An entry with no attachments.
    pub fn empty(container: ContainerRef, object_id: u64) -> Self {
        Self {
            container,
            object_id,
            document: None,
            video: None,
            audio: None,
            photo: None,
        }
    }

    pub fn attachment(&self, kind: AttachmentKind) -> Option<&Attachment> {
        match kind {
            AttachmentKind::Document => self.document.as_ref(),
            AttachmentKind::Video => self.video.as_ref(),
            AttachmentKind::Audio => self.audio.as_ref(),
            AttachmentKind::Photo => self.photo.as_ref(),
        }
    }

    pub fn set_attachment(&mut self, kind: AttachmentKind, attachment: Attachment) {
        let slot = match kind {
            AttachmentKind::Document => &mut self.document,
            AttachmentKind::Video => &mut self.video,
            AttachmentKind::Audio => &mut self.audio,
            AttachmentKind::Photo => &mut self.photo,
        };
        *slot = Some(attachment);
    }

    /// First attachment in [`AttachmentKind::PRECEDENCE`] order.
    pub fn primary_attachment(&self) -> Option<(AttachmentKind, &Attachment)> {
        AttachmentKind::PRECEDENCE
            .into_iter()
            .find_map(|kind| self.attachment(kind).map(|a| (kind, a)))
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Entry lookup against the upstream repository.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetch one entry.
    ///
    /// Fails with `EntryNotFound` when the container or object does not
    /// exist and `UpstreamUnreachable` when the repository itself cannot be
    /// reached.
    async fn fetch_entry(&self, container: &ContainerRef, object_id: u64)
        -> lc_core::Result<Entry>;
}

/// Offset-seekable, length-unlimited byte source.
pub trait ChunkSource: Send + Sync {
    /// Stream the object's bytes from `offset` to its end.
    fn chunks(&self, handle: &ObjectHandle, offset: u64) -> ByteStream;
}

/// The shared upstream session handed to request handlers.
#[derive(Clone)]
pub struct UpstreamHandle {
    pub repository: Arc<dyn Repository>,
    pub chunks: Arc<dyn ChunkSource>,
}

impl UpstreamHandle {
    /// Wrap one value that implements both traits.
    pub fn new<T>(upstream: Arc<T>) -> Self
    where
        T: Repository + ChunkSource + 'static,
    {
        Self {
            repository: upstream.clone(),
            chunks: upstream,
        }
    }

    /// Build the upstream selected by the configuration.
    pub fn from_config(config: &UpstreamConfig) -> Self {
        let chunk_size = config.effective_chunk_size();
        match config.backend {
            UpstreamBackend::Local => {
                tracing::info!(
                    root = %config.root.display(),
                    chunk_size,
                    "Using local upstream repository"
                );
                Self::new(Arc::new(LocalRepository::new(&config.root, chunk_size)))
            }
            UpstreamBackend::Memory => {
                tracing::info!(chunk_size, "Using in-memory upstream repository");
                Self::new(Arc::new(MemoryRepository::new(chunk_size)))
            }
        }
    }
}

/// Read `reader` to its end as chunks of exactly `chunk_size` bytes (the
/// last one may be shorter).
pub fn fixed_chunks<R>(mut reader: R, chunk_size: usize) -> ByteStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let chunk_size = chunk_size.max(1);
    Box::pin(async_stream::try_stream! {
        loop {
            let mut buf = BytesMut::with_capacity(chunk_size);
            while buf.len() < chunk_size {
                let remaining = (chunk_size - buf.len()) as u64;
                if (&mut reader).take(remaining).read_buf(&mut buf).await? == 0 {
                    break;
                }
            }
            if buf.is_empty() {
                break;
            }
            let full = buf.len() == chunk_size;
            yield buf.freeze();
            if !full {
                break;
            }
        }
    })
}
