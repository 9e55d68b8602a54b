//! lc-core: shared types, errors, configuration, and the pure pieces of the
//! streaming proxy.
//!
//! Everything in this crate is synchronous and side-effect free apart from
//! configuration loading: the deep-link codec, the `Range` negotiator, and
//! the media descriptor with its content-type rules.

pub mod config;
pub mod error;
pub mod link;
pub mod media;
pub mod range;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use link::{ContainerRef, DeepLink, LinkTarget, ShareLinks};
pub use media::{AttachmentKind, MediaDescriptor};
pub use range::{negotiate, ServingWindow, WindowStatus};
