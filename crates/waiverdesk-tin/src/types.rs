//! Values exchanged between the upstream client, the proxy, and callers.

use serde::Serialize;

/// Body of an upstream response, classified by its content type.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    /// Content type named JSON; decoded but otherwise untouched.
    Json(serde_json::Value),
    /// Anything else, kept as text. The upstream's 404 "not found" arrives this way.
    Text(String),
}

/// An upstream answer to relay verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: UpstreamBody,
}

impl UpstreamReply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Observable state of a [`crate::TinValidator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationState {
    pub loading: bool,
    pub error: Option<String>,
}
