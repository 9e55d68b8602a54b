//! Media descriptor and content-type rules.

use serde::{Deserialize, Serialize};

/// Fallback when nothing better is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Kind of media attachment an upstream entry can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Document,
    Video,
    Audio,
    Photo,
}

impl AttachmentKind {
    /// Order in which attachments are considered when an entry carries
    /// more than one.
    pub const PRECEDENCE: [AttachmentKind; 4] = [
        AttachmentKind::Document,
        AttachmentKind::Video,
        AttachmentKind::Audio,
        AttachmentKind::Photo,
    ];

    /// File name used when the upstream does not supply one.
    pub fn default_name(self) -> &'static str {
        match self {
            AttachmentKind::Document => "document",
            AttachmentKind::Video => "video.mp4",
            AttachmentKind::Audio => "audio.mp3",
            AttachmentKind::Photo => "photo.jpg",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentKind::Document => "document",
            AttachmentKind::Video => "video",
            AttachmentKind::Audio => "audio",
            AttachmentKind::Photo => "photo",
        }
    }
}

impl std::str::FromStr for AttachmentKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "document" => Ok(AttachmentKind::Document),
            "video" => Ok(AttachmentKind::Video),
            "audio" => Ok(AttachmentKind::Audio),
            "photo" => Ok(AttachmentKind::Photo),
            other => Err(crate::Error::Validation(format!(
                "unknown attachment kind '{other}'"
            ))),
        }
    }
}

/// What a response needs to know about the object it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaDescriptor {
    pub name: String,
    /// Exact size in bytes. Zero is a real, empty object.
    pub size_bytes: u64,
    pub content_type: String,
}

impl MediaDescriptor {
    /// Build a descriptor from raw upstream attachment fields.
    pub fn from_attachment(
        kind: AttachmentKind,
        file_name: Option<&str>,
        size_bytes: u64,
        declared_type: Option<&str>,
    ) -> Self {
        let name = file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(kind.default_name())
            .to_string();
        let content_type = content_type_for(&name, declared_type);
        Self {
            name,
            size_bytes,
            content_type,
        }
    }

    /// `Content-Disposition` value for this object.
    ///
    /// Names that are not plain printable ASCII get an RFC 5987
    /// `filename*` parameter next to a sanitized `filename`.
    pub fn content_disposition(&self, download: bool) -> String {
        let disposition = if download { "attachment" } else { "inline" };
        let fallback: String = self
            .name
            .chars()
            .map(|c| match c {
                '"' | '\\' => '_',
                c if c == ' ' || c.is_ascii_graphic() => c,
                _ => '_',
            })
            .collect();

        if fallback == self.name {
            format!("{disposition}; filename=\"{fallback}\"")
        } else {
            format!(
                "{disposition}; filename=\"{fallback}\"; filename*=UTF-8''{}",
                urlencoding::encode(&self.name)
            )
        }
    }
}

/// Decide the content type for `file_name`.
///
/// An upstream-declared type wins; otherwise the standard extension table,
/// then the common video containers, then [`OCTET_STREAM`].
pub fn content_type_for(file_name: &str, declared_type: Option<&str>) -> String {
    if let Some(declared) = declared_type.map(str::trim).filter(|t| !t.is_empty()) {
        return declared.to_string();
    }

    if let Some(guess) = mime_guess::from_path(file_name).first() {
        return guess.to_string();
    }

    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    video_container_type(&ext).unwrap_or(OCTET_STREAM).to_string()
}

fn video_container_type(ext: &str) -> Option<&'static str> {
    match ext {
        "mkv" => Some("video/x-matroska"),
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "avi" => Some("video/x-msvideo"),
        "mov" => Some("video/quicktime"),
        _ => None,
    }
}
