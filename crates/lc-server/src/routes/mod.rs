//! HTTP route handlers.
//!
//! - `GET /` and `GET /health`: [`home`]
//! - `GET /watch/{link}`: [`watch`]
//! - `GET /stream/{link}`: [`stream`]

pub mod home;
pub mod stream;
pub mod watch;
