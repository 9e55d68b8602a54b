//! Directory-backed upstream repository.
//!
//! Layout under the root:
//!
//! ```text
//! <root>/<container>/<object_id>.json    entry manifest
//! <root>/<container>/<file>              attachment bytes
//! ```
//!
//! `<container>` is the numeric container id (`-100123456789`, `42`) or the
//! lower-cased public handle. A manifest names each attachment's file
//! relative to its container directory; sizes are read from disk so they
//! always match the bytes that will be served.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncSeekExt;

use lc_core::{AttachmentKind, ContainerRef, Error};

use crate::{fixed_chunks, Attachment, ByteStream, ChunkSource, Entry, ObjectHandle, Repository};

/// On-disk description of one entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryManifest {
    pub document: Option<AttachmentManifest>,
    pub video: Option<AttachmentManifest>,
    pub audio: Option<AttachmentManifest>,
    pub photo: Option<AttachmentManifest>,
}

impl EntryManifest {
    fn slot_mut(&mut self, kind: AttachmentKind) -> &mut Option<AttachmentManifest> {
        match kind {
            AttachmentKind::Document => &mut self.document,
            AttachmentKind::Video => &mut self.video,
            AttachmentKind::Audio => &mut self.audio,
            AttachmentKind::Photo => &mut self.photo,
        }
    }

    fn slot(&self, kind: AttachmentKind) -> Option<&AttachmentManifest> {
        match kind {
            AttachmentKind::Document => self.document.as_ref(),
            AttachmentKind::Video => self.video.as_ref(),
            AttachmentKind::Audio => self.audio.as_ref(),
            AttachmentKind::Photo => self.photo.as_ref(),
        }
    }
}

/// On-disk description of one attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentManifest {
    /// File holding the bytes, relative to the container directory.
    pub file: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Upstream repository rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
    chunk_size: usize,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            root: root.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name used for a container.
    pub fn container_key(container: &ContainerRef) -> String {
        match container {
            ContainerRef::Id(id) => id.to_string(),
            ContainerRef::Handle(handle) => handle.to_ascii_lowercase(),
        }
    }

    fn container_dir(&self, container: &ContainerRef) -> PathBuf {
        self.root.join(Self::container_key(container))
    }

    fn manifest_path(&self, container: &ContainerRef, object_id: u64) -> PathBuf {
        self.container_dir(container).join(format!("{object_id}.json"))
    }

    /// Resolve a handle to a file below the root, refusing anything that
    /// would escape it.
    fn handle_path(&self, handle: &ObjectHandle) -> Option<PathBuf> {
        let relative = Path::new(handle.as_str());
        let clean = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        clean.then(|| self.root.join(relative))
    }

    /// Copy `source` into the repository as a new entry of `container`.
    ///
    /// The entry gets the next free object id, which is returned.
    pub async fn register(
        &self,
        container: &ContainerRef,
        source: &Path,
        kind: AttachmentKind,
        file_name: Option<&str>,
        mime_type: Option<&str>,
    ) -> lc_core::Result<u64> {
        let dir = self.container_dir(container);
        tokio::fs::create_dir_all(&dir).await?;

        let object_id = self.next_object_id(&dir).await?;
        let display_name = file_name
            .map(str::to_string)
            .or_else(|| {
                source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            });
        let stored = format!(
            "{object_id}-{}",
            sanitize_file_name(display_name.as_deref().unwrap_or(kind.default_name()))
        );

        tokio::fs::copy(source, dir.join(&stored)).await?;

        let mut manifest = EntryManifest::default();
        *manifest.slot_mut(kind) = Some(AttachmentManifest {
            file: stored,
            file_name: display_name,
            mime_type: mime_type.map(str::to_string),
        });
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| Error::Internal(format!("manifest serialization failed: {e}")))?;
        tokio::fs::write(self.manifest_path(container, object_id), json).await?;

        tracing::info!(
            container = %container,
            object_id,
            kind = kind.as_str(),
            "Registered object"
        );
        Ok(object_id)
    }

    async fn next_object_id(&self, dir: &Path) -> lc_core::Result<u64> {
        let mut max_id = 0;
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let id = Path::new(&name)
                .file_stem()
                .filter(|_| Path::new(&name).extension().is_some_and(|e| e == "json"))
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok());
            if let Some(id) = id {
                max_id = max_id.max(id);
            }
        }
        Ok(max_id + 1)
    }
}

#[async_trait]
impl Repository for LocalRepository {
    async fn fetch_entry(
        &self,
        container: &ContainerRef,
        object_id: u64,
    ) -> lc_core::Result<Entry> {
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            return Err(Error::unreachable(format!(
                "repository root {} is not available",
                self.root.display()
            )));
        }

        let manifest_path = self.manifest_path(container, object_id);
        let contents = match tokio::fs::read_to_string(&manifest_path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::entry_not_found(container, object_id));
            }
            Err(e) => return Err(Error::unreachable(e)),
        };
        let manifest: EntryManifest = serde_json::from_str(&contents).map_err(|e| {
            Error::unreachable(format!("corrupt manifest {}: {e}", manifest_path.display()))
        })?;

        let key = Self::container_key(container);
        let mut entry = Entry::empty(container.clone(), object_id);
        for kind in AttachmentKind::PRECEDENCE {
            let Some(att) = manifest.slot(kind) else {
                continue;
            };
            let handle = ObjectHandle::new(format!("{key}/{}", att.file));
            let path = self
                .handle_path(&handle)
                .ok_or_else(|| Error::unreachable(format!("invalid attachment path {}", att.file)))?;
            let size = match tokio::fs::metadata(&path).await {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "Attachment file missing");
                    return Err(Error::entry_not_found(container, object_id));
                }
                Err(e) => return Err(Error::unreachable(e)),
            };
            entry.set_attachment(
                kind,
                Attachment {
                    handle,
                    file_name: att.file_name.clone(),
                    size,
                    mime_type: att.mime_type.clone(),
                },
            );
        }

        Ok(entry)
    }
}

impl ChunkSource for LocalRepository {
    fn chunks(&self, handle: &ObjectHandle, offset: u64) -> ByteStream {
        let path = self.handle_path(handle);
        let chunk_size = self.chunk_size;
        let handle = handle.clone();

        Box::pin(async_stream::try_stream! {
            let path = path.ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid object handle {handle}"),
                )
            })?;
            let mut file = tokio::fs::File::open(&path).await?;
            file.seek(std::io::SeekFrom::Start(offset)).await?;

            let mut inner = fixed_chunks(file, chunk_size);
            while let Some(chunk) = futures::StreamExt::next(&mut inner).await {
                yield chunk?;
            }
        })
    }
}

/// Keep file names to a conservative character set for on-disk storage.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".into()
    } else {
        cleaned.to_string()
    }
}
