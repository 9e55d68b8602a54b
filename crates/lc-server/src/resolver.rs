//! Metadata resolution: deep-link target to servable media.

use lc_core::link::{self, LinkTarget};
use lc_core::{Error, MediaDescriptor, Result};
use lc_upstream::{ObjectHandle, Repository};

/// Everything a stream response needs, resolved from one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub target: LinkTarget,
    pub handle: ObjectHandle,
    pub descriptor: MediaDescriptor,
}

/// Look up `target` upstream and describe its primary media attachment.
///
/// Attachments are considered document, video, audio, photo; an entry with
/// none of them fails with `NoMediaAttached`.
pub async fn resolve(
    repository: &dyn Repository,
    target: &LinkTarget,
) -> Result<(ObjectHandle, MediaDescriptor)> {
    let container = target.container()?;
    let object_id = target.object_id();

    let entry = repository.fetch_entry(&container, object_id).await?;
    let (kind, attachment) = entry
        .primary_attachment()
        .ok_or_else(|| Error::no_media(&container, object_id))?;

    let descriptor = MediaDescriptor::from_attachment(
        kind,
        attachment.file_name.as_deref(),
        attachment.size,
        attachment.mime_type.as_deref(),
    );

    tracing::debug!(
        container = %container,
        object_id,
        kind = kind.as_str(),
        name = %descriptor.name,
        size = descriptor.size_bytes,
        content_type = %descriptor.content_type,
        "Resolved media"
    );

    Ok((attachment.handle.clone(), descriptor))
}

/// Decode `link` and resolve it.
pub async fn resolve_link(repository: &dyn Repository, link: &str) -> Result<ResolvedMedia> {
    let target = link::decode(link)?;
    let (handle, descriptor) = resolve(repository, &target).await?;
    Ok(ResolvedMedia {
        target,
        handle,
        descriptor,
    })
}
