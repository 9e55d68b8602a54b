//! Deep-link codec.
//!
//! A [`DeepLink`] names one entry in the upstream repository. Three shapes
//! are recognized:
//!
//! - `https://t.me/c/<suffix>/<object>`: private container, addressed by the
//!   numeric suffix that follows the fixed `-100` marker
//! - `https://t.me/<handle>/<object>`: public container, addressed by handle
//! - `https://t.me/b/<owner>/<object>`: direct message from the owning account
//!
//! Decoding tries the shapes in exactly that order. The public pattern is a
//! superset of the other two, so it refuses all-digit segments and the
//! reserved `c` / `b` segments.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Host prefix used by [`encode`].
const LINK_HOST: &str = "https://t.me";

/// Marker prepended to a private container's numeric suffix.
const PRIVATE_MARKER: &str = "-100";

static PRIVATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:t|telegram)\.me/(?:c/)?(\d+)/(\d+)(?:[/?#]|$)").expect("valid regex")
});

static PUBLIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:t|telegram)\.me/([A-Za-z][A-Za-z0-9_]*)/(\d+)(?:[/?#]|$)")
        .expect("valid regex")
});

static DIRECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:t|telegram)\.me/b/(\d+)/(\d+)(?:[/?#]|$)").expect("valid regex")
});

/// Path segments that belong to the private and direct shapes.
const RESERVED_SEGMENTS: [&str; 2] = ["c", "b"];

// ---------------------------------------------------------------------------
// LinkTarget
// ---------------------------------------------------------------------------

/// The entry a deep-link points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkTarget {
    /// Entry in a private container. The suffix is kept as the digits that
    /// appeared in the link; leading zeros are part of the container id.
    PrivateContainer {
        container_suffix: String,
        object_id: u64,
    },
    /// Entry in a public container reachable by handle.
    PublicContainer { handle: String, object_id: u64 },
    /// Entry sent directly to the serving identity by `owner_id`.
    DirectObject { owner_id: u64, object_id: u64 },
}

impl LinkTarget {
    /// Object (message) id within the container.
    pub fn object_id(&self) -> u64 {
        match self {
            LinkTarget::PrivateContainer { object_id, .. }
            | LinkTarget::PublicContainer { object_id, .. }
            | LinkTarget::DirectObject { object_id, .. } => *object_id,
        }
    }

    /// The container address handed to the upstream repository.
    ///
    /// Fails only when a numeric id does not fit the upstream's signed id
    /// space.
    pub fn container(&self) -> Result<ContainerRef> {
        match self {
            LinkTarget::PrivateContainer {
                container_suffix, ..
            } => private_container_id(container_suffix)
                .map(ContainerRef::Id)
                .ok_or_else(|| {
                    Error::invalid_link(format!("invalid container suffix {container_suffix}"))
                }),
            LinkTarget::PublicContainer { handle, .. } => Ok(ContainerRef::Handle(handle.clone())),
            LinkTarget::DirectObject { owner_id, .. } => i64::try_from(*owner_id)
                .map(ContainerRef::Id)
                .map_err(|_| Error::invalid_link(format!("owner id {owner_id} out of range"))),
        }
    }

    /// Encode this target as a [`DeepLink`].
    pub fn to_link(&self) -> DeepLink {
        encode(self)
    }
}

/// Build the signed container id `-100<suffix>`.
fn private_container_id(suffix: &str) -> Option<i64> {
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    format!("{PRIVATE_MARKER}{suffix}").parse().ok()
}

// ---------------------------------------------------------------------------
// ContainerRef
// ---------------------------------------------------------------------------

/// How the upstream addresses a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContainerRef {
    /// Numeric container id (negative for private containers).
    Id(i64),
    /// Public handle.
    Handle(String),
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerRef::Id(id) => write!(f, "{id}"),
            ContainerRef::Handle(handle) => f.write_str(handle),
        }
    }
}

// ---------------------------------------------------------------------------
// DeepLink
// ---------------------------------------------------------------------------

/// Opaque, shareable string naming one upstream entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeepLink(String);

impl DeepLink {
    /// The link text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The link percent-encoded for use as a single URL path segment.
    pub fn path_segment(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }

    /// Decode the target this link names.
    pub fn target(&self) -> Result<LinkTarget> {
        decode(&self.0)
    }
}

impl fmt::Display for DeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeepLink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode(s)?;
        Ok(Self(s.to_string()))
    }
}

/// Encode a target as its canonical deep-link. Never fails.
pub fn encode(target: &LinkTarget) -> DeepLink {
    let text = match target {
        LinkTarget::PrivateContainer {
            container_suffix,
            object_id,
        } => format!("{LINK_HOST}/c/{container_suffix}/{object_id}"),
        LinkTarget::PublicContainer { handle, object_id } => {
            format!("{LINK_HOST}/{handle}/{object_id}")
        }
        LinkTarget::DirectObject {
            owner_id,
            object_id,
        } => format!("{LINK_HOST}/b/{owner_id}/{object_id}"),
    };
    DeepLink(text)
}

/// Decode a deep-link into its target.
///
/// Shapes are tried private, public, direct; the first match wins.
pub fn decode(link: &str) -> Result<LinkTarget> {
    if let Some(caps) = PRIVATE_RE.captures(link) {
        let container_suffix = caps[1].to_string();
        if private_container_id(&container_suffix).is_none() {
            return Err(Error::invalid_link(link));
        }
        return Ok(LinkTarget::PrivateContainer {
            container_suffix,
            object_id: parse_id(&caps[2], link)?,
        });
    }

    if let Some(caps) = PUBLIC_RE.captures(link) {
        let handle = &caps[1];
        if !RESERVED_SEGMENTS.contains(&handle) {
            return Ok(LinkTarget::PublicContainer {
                handle: handle.to_string(),
                object_id: parse_id(&caps[2], link)?,
            });
        }
    }

    if let Some(caps) = DIRECT_RE.captures(link) {
        let owner_id = parse_id(&caps[1], link)?;
        if i64::try_from(owner_id).is_err() {
            return Err(Error::invalid_link(link));
        }
        return Ok(LinkTarget::DirectObject {
            owner_id,
            object_id: parse_id(&caps[2], link)?,
        });
    }

    Err(Error::invalid_link(link))
}

fn parse_id(digits: &str, link: &str) -> Result<u64> {
    digits.parse().map_err(|_| Error::invalid_link(link))
}

// ---------------------------------------------------------------------------
// ShareLinks
// ---------------------------------------------------------------------------

/// Human-facing URLs for a registered object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLinks {
    /// Inline player page.
    pub watch_url: String,
    /// Forced-download URL.
    pub download_url: String,
}

impl ShareLinks {
    /// Build share URLs under `base_url` (trailing slashes are ignored).
    pub fn new(base_url: &str, link: &DeepLink) -> Self {
        let base = base_url.trim_end_matches('/');
        let segment = link.path_segment();
        Self {
            watch_url: format!("{base}/watch/{segment}"),
            download_url: format!("{base}/stream/{segment}?download=true"),
        }
    }
}
