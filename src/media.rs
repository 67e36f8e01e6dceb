//! Generated media assets and the handles generation services return.

use std::fmt;
use std::path::{Path, PathBuf};

/// What a media asset contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// A resource produced by a generation service, not yet on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaHandle {
    /// The service hosts the result; it has to be downloaded.
    Remote { url: String },
    /// The service returned the payload in the response body.
    Inline { id: String, bytes: Vec<u8> },
}

impl MediaHandle {
    pub fn remote(url: impl Into<String>) -> Self {
        MediaHandle::Remote { url: url.into() }
    }

    pub fn inline(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        MediaHandle::Inline {
            id: id.into(),
            bytes,
        }
    }

    /// URL or opaque identifier naming where the resource came from.
    pub fn source(&self) -> &str {
        match self {
            MediaHandle::Remote { url } => url,
            MediaHandle::Inline { id, .. } => id,
        }
    }
}

/// An image or audio clip generated for a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub kind: MediaKind,
    /// Remote URL or opaque identifier returned by the generation service.
    pub source_handle: String,
    /// Set once the asset has been written to local storage.
    pub local_path: Option<PathBuf>,
}

impl MediaAsset {
    pub fn new(kind: MediaKind, source_handle: impl Into<String>) -> Self {
        Self {
            kind,
            source_handle: source_handle.into(),
            local_path: None,
        }
    }

    /// Create an asset that already lives on local storage.
    pub fn materialized(
        kind: MediaKind,
        source_handle: impl Into<String>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind,
            source_handle: source_handle.into(),
            local_path: Some(local_path.into()),
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }
}
