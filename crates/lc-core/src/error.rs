//! Unified error type for linkcast.
//!
//! All crates funnel their failures into [`Error`]. Resolution failures are
//! kept distinct internally so they can be logged precisely, but
//! [`Error::http_status`] maps all of them to the same 404.

/// Unified error type covering all failure modes in linkcast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The deep-link did not match any known shape.
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    /// The link was well-formed but the upstream has no such entry.
    #[error("Entry not found: {container}/{object_id}")]
    EntryNotFound {
        /// Container the lookup was made in.
        container: String,
        /// Object (message) id that was looked up.
        object_id: u64,
    },

    /// Talking to the upstream repository failed (network, auth, storage).
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The entry exists but carries no servable media.
    #[error("No media attached to {container}/{object_id}")]
    NoMediaAttached {
        /// Container the entry lives in.
        container: String,
        /// Object (message) id of the entry.
        object_id: u64,
    },

    /// Request or configuration data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidLink(_)
            | Error::EntryNotFound { .. }
            | Error::UpstreamUnreachable(_)
            | Error::NoMediaAttached { .. } => 404,
            Error::Validation(_) => 400,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Whether this error came from resolving a link to a media object.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Error::InvalidLink(_)
                | Error::EntryNotFound { .. }
                | Error::UpstreamUnreachable(_)
                | Error::NoMediaAttached { .. }
        )
    }

    /// Convenience constructor for [`Error::InvalidLink`].
    pub fn invalid_link(link: impl Into<String>) -> Self {
        Error::InvalidLink(link.into())
    }

    /// Convenience constructor for [`Error::EntryNotFound`].
    pub fn entry_not_found(container: impl ToString, object_id: u64) -> Self {
        Error::EntryNotFound {
            container: container.to_string(),
            object_id,
        }
    }

    /// Convenience constructor for [`Error::NoMediaAttached`].
    pub fn no_media(container: impl ToString, object_id: u64) -> Self {
        Error::NoMediaAttached {
            container: container.to_string(),
            object_id,
        }
    }

    /// Convenience constructor for [`Error::UpstreamUnreachable`].
    pub fn unreachable(reason: impl std::fmt::Display) -> Self {
        Error::UpstreamUnreachable(reason.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
