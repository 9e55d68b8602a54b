//! In-process upstream repository.
//!
//! Entries and object bytes live in maps behind [`RwLock`]s. Chunks are
//! cut at a fixed size measured from the requested offset, like the remote
//! protocol does. The [`MemoryRepository::set_unreachable`] switch simulates
//! a lost upstream session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use lc_core::{AttachmentKind, ContainerRef, Error};

use crate::{Attachment, ByteStream, ChunkSource, Entry, ObjectHandle, Repository};

/// Upstream repository held entirely in memory.
#[derive(Debug)]
pub struct MemoryRepository {
    entries: RwLock<HashMap<(ContainerRef, u64), Entry>>,
    blobs: RwLock<HashMap<ObjectHandle, Bytes>>,
    chunk_size: usize,
    unreachable: AtomicBool,
    next_handle: AtomicU64,
}

impl MemoryRepository {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            blobs: RwLock::new(HashMap::new()),
            chunk_size: chunk_size.max(1),
            unreachable: AtomicBool::new(false),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Store `data` as a `kind` attachment of entry `container/object_id`,
    /// creating the entry if needed.
    pub fn insert_media(
        &self,
        container: ContainerRef,
        object_id: u64,
        kind: AttachmentKind,
        file_name: Option<&str>,
        mime_type: Option<&str>,
        data: impl Into<Bytes>,
    ) -> ObjectHandle {
        let data = data.into();
        let handle = ObjectHandle::new(format!(
            "mem-{}",
            self.next_handle.fetch_add(1, Ordering::Relaxed)
        ));
        let attachment = Attachment {
            handle: handle.clone(),
            file_name: file_name.map(str::to_string),
            size: data.len() as u64,
            mime_type: mime_type.map(str::to_string),
        };

        self.blobs.write().insert(handle.clone(), data);
        self.entries
            .write()
            .entry((container.clone(), object_id))
            .or_insert_with(|| Entry::empty(container, object_id))
            .set_attachment(kind, attachment);

        handle
    }

    /// Store an entry as-is (e.g. one with no attachments).
    pub fn insert_entry(&self, entry: Entry) {
        self.entries
            .write()
            .insert((entry.container.clone(), entry.object_id), entry);
    }

    /// Make every lookup fail as if the upstream session were lost.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::Relaxed);
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new(lc_core::config::DEFAULT_CHUNK_SIZE)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn fetch_entry(
        &self,
        container: &ContainerRef,
        object_id: u64,
    ) -> lc_core::Result<Entry> {
        if self.unreachable.load(Ordering::Relaxed) {
            return Err(Error::unreachable("in-memory upstream marked unreachable"));
        }

        self.entries
            .read()
            .get(&(container.clone(), object_id))
            .cloned()
            .ok_or_else(|| Error::entry_not_found(container, object_id))
    }
}

impl ChunkSource for MemoryRepository {
    fn chunks(&self, handle: &ObjectHandle, offset: u64) -> ByteStream {
        let Some(data) = self.blobs.read().get(handle).cloned() else {
            let err = std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no object for handle {handle}"),
            );
            return Box::pin(futures::stream::once(async move { Err(err) }));
        };

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let rest = data.slice(start..);
        let chunk_size = self.chunk_size;
        let pieces: Vec<std::io::Result<Bytes>> = (0..rest.len())
            .step_by(chunk_size)
            .map(|at| Ok(rest.slice(at..(at + chunk_size).min(rest.len()))))
            .collect();

        Box::pin(futures::stream::iter(pieces))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn fetch_inserted_entry() {
        let repo = MemoryRepository::new(64);
        let handle = repo.insert_media(
            ContainerRef::Id(-100123),
            10,
            AttachmentKind::Document,
            Some("movie.mkv"),
            None,
            sample(1000),
        );

        let entry = repo.fetch_entry(&ContainerRef::Id(-100123), 10).await.unwrap();
        let doc = entry.document.unwrap();
        assert_eq!(doc.handle, handle);
        assert_eq!(doc.size, 1000);
        assert_eq!(doc.file_name.as_deref(), Some("movie.mkv"));
    }

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let repo = MemoryRepository::new(64);
        let err = repo
            .fetch_entry(&ContainerRef::Handle("nobody".into()), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EntryNotFound { .. }));
    }

    #[tokio::test]
    async fn unreachable_switch() {
        let repo = MemoryRepository::new(64);
        repo.insert_media(ContainerRef::Id(5), 1, AttachmentKind::Video, None, None, sample(10));
        repo.set_unreachable(true);
        let err = repo.fetch_entry(&ContainerRef::Id(5), 1).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnreachable(_)));
        repo.set_unreachable(false);
        assert!(repo.fetch_entry(&ContainerRef::Id(5), 1).await.is_ok());
    }

    #[tokio::test]
    async fn chunks_start_at_offset() {
        let data = sample(1000);
        let repo = MemoryRepository::new(64);
        let handle = repo.insert_media(
            ContainerRef::Id(1),
            1,
            AttachmentKind::Document,
            None,
            None,
            data.clone(),
        );

        let chunks: Vec<Bytes> = repo
            .chunks(&handle, 500)
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks.len(), 8);
        assert!(chunks[..7].iter().all(|c| c.len() == 64));
        assert_eq!(chunks[7].len(), 500 - 7 * 64);
        assert_eq!(chunks.concat(), data[500..]);
    }

    #[tokio::test]
    async fn chunks_past_end_are_empty() {
        let repo = MemoryRepository::new(64);
        let handle = repo.insert_media(
            ContainerRef::Id(1),
            1,
            AttachmentKind::Document,
            None,
            None,
            sample(10),
        );
        assert_eq!(repo.chunks(&handle, 10).count().await, 0);
        assert_eq!(repo.chunks(&handle, 5000).count().await, 0);
    }

    #[tokio::test]
    async fn unknown_handle_yields_error() {
        let repo = MemoryRepository::new(64);
        let mut stream = repo.chunks(&ObjectHandle::new("mem-404"), 0);
        let first = stream.next().await.unwrap();
        assert_eq!(first.unwrap_err().kind(), std::io::ErrorKind::NotFound);
    }
}
