//! Newtype IDs for the viewer objects the pipeline is keyed by.
//!
//! Using newtypes prevents accidentally mixing up different kinds of IDs
//! (e.g., passing a window ID where a canvas ID is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a canvas (a page/image surface), usually its IIIF URI.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanvasId(pub String);

impl CanvasId {
    /// Creates a new CanvasId.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanvasId({})", self.0)
    }
}

impl fmt::Display for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CanvasId {
    fn from(id: &str) -> Self {
        CanvasId::new(id)
    }
}

impl From<String> for CanvasId {
    fn from(id: String) -> Self {
        CanvasId(id)
    }
}

/// Identifier of a viewer window; overlay settings are scoped per window.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub String);

impl WindowId {
    /// Creates a new WindowId.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowId({})", self.0)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WindowId {
    fn from(id: &str) -> Self {
        WindowId::new(id)
    }
}

impl From<String> for WindowId {
    fn from(id: String) -> Self {
        WindowId(id)
    }
}
