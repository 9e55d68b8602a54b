//! `Range` header negotiation.
//!
//! [`negotiate`] turns an optional `Range: bytes=<start>-<end?>` header and a
//! known object size into the [`ServingWindow`] a response must cover.
//! Headers that do not parse are ignored and the whole object is served.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bytes=(\d+)-(\d*)").expect("valid regex"));

/// Which kind of response a window calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    /// Whole object, HTTP 200.
    Full,
    /// A requested byte range, HTTP 206.
    Partial,
    /// A parsed range that lies outside the object, HTTP 416.
    Unsatisfiable,
}

/// The inclusive byte range transmitted in one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServingWindow {
    /// First byte served.
    pub start: u64,
    /// Number of bytes served (the response `Content-Length`).
    pub len: u64,
    /// Total size of the object.
    pub total: u64,
    pub status: WindowStatus,
}

impl ServingWindow {
    /// The entire object.
    pub fn full(total: u64) -> Self {
        Self {
            start: 0,
            len: total,
            total,
            status: WindowStatus::Full,
        }
    }

    /// Bytes `start..=end` of an object of `total` bytes.
    ///
    /// Callers must ensure `start <= end`.
    pub fn partial(start: u64, end: u64, total: u64) -> Self {
        Self {
            start,
            len: end - start + 1,
            total,
            status: WindowStatus::Partial,
        }
    }

    /// A range that cannot be served from an object of `total` bytes.
    pub fn unsatisfiable(total: u64) -> Self {
        Self {
            start: 0,
            len: 0,
            total,
            status: WindowStatus::Unsatisfiable,
        }
    }

    /// Inclusive index of the last byte served, `None` for an empty window.
    pub fn last_byte(&self) -> Option<u64> {
        (self.len > 0).then(|| self.start + self.len - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// HTTP status code for this window.
    pub fn status_code(&self) -> u16 {
        match self.status {
            WindowStatus::Full => 200,
            WindowStatus::Partial => 206,
            WindowStatus::Unsatisfiable => 416,
        }
    }

    /// Value of the `Content-Range` header, if the response needs one.
    pub fn content_range(&self) -> Option<String> {
        match self.status {
            WindowStatus::Full => None,
            WindowStatus::Partial => {
                let last = self.last_byte()?;
                Some(format!("bytes {}-{}/{}", self.start, last, self.total))
            }
            WindowStatus::Unsatisfiable => Some(format!("bytes */{}", self.total)),
        }
    }
}

/// Compute the serving window for a request.
///
/// - no header, or a header that does not match `bytes=<start>-<end?>`:
///   the full object
/// - a matching header: [`WindowStatus::Partial`], even when it spans the
///   whole object; a missing `end` means the last byte and an `end` past the
///   object is clamped to it
/// - a matching header with `start` past the object (an overflowing `start`
///   included) or `end < start`: [`WindowStatus::Unsatisfiable`]
pub fn negotiate(range_header: Option<&str>, total: u64) -> ServingWindow {
    let Some((start, end)) = range_header.and_then(parse_range) else {
        return ServingWindow::full(total);
    };

    if total == 0 || start >= total {
        return ServingWindow::unsatisfiable(total);
    }

    let end = end.map_or(total - 1, |end| end.min(total - 1));
    if end < start {
        return ServingWindow::unsatisfiable(total);
    }

    ServingWindow::partial(start, end, total)
}

/// Parse `bytes=<start>-<end?>` into `(start, Option<end>)`.
fn parse_range(value: &str) -> Option<(u64, Option<u64>)> {
    let caps = RANGE_RE.captures(value)?;
    // The pattern only admits digits, so a failed parse is an overflow.
    let start: u64 = caps[1].parse().unwrap_or(u64::MAX);
    let end = match &caps[2] {
        "" => None,
        digits => Some(digits.parse().unwrap_or(u64::MAX)),
    };
    Some((start, end))
}
