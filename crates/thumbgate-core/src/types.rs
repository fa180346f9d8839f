//! Core data types for the thumbgate request pipeline.
//!
//! A [`TransformDescriptor`] is built fresh from each request URI, never
//! mutated, and dropped once the response is produced.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transform applied to the source image.
///
/// The URL carries a single-letter token; only scale-to-fit exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// Fit within the bounding box, preserving aspect ratio (`s`)
    Scale,
}

impl Transform {
    /// All transforms accepted in request URIs.
    pub const ALL: &'static [Transform] = &[Transform::Scale];

    /// Look up a transform by its URL token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.token() == token)
    }

    /// URL token for this transform.
    pub fn token(self) -> &'static str {
        match self {
            Transform::Scale => "s",
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A decoded thumbnail request.
///
/// Grammar: `/{id}_{hash}_{width}x{height}_{transform}.{extension}?{signature}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformDescriptor {
    /// Source image identifier
    pub id: String,

    /// Opaque content fingerprint paired with `id`
    pub hash: String,

    /// Bounding box width in pixels
    pub width: u32,

    /// Bounding box height in pixels
    pub height: u32,

    /// Requested transform
    pub transform: Transform,

    /// File extension; also the output format hint
    pub extension: String,

    /// Signature carried in the query string
    pub signature: String,
}

impl TransformDescriptor {
    /// Source filename: `{id}_{hash}.{extension}`.
    pub fn source_filename(&self) -> String {
        format!("{}_{}.{}", self.id, self.hash, self.extension)
    }

    /// Thumbnail filename, i.e. the request path without its leading `/`.
    pub fn filename(&self) -> String {
        format!(
            "{}_{}_{}x{}_{}.{}",
            self.id, self.hash, self.width, self.height, self.transform, self.extension
        )
    }

    /// Rebuild the request URI (`/{filename}?{signature}`).
    pub fn to_request_uri(&self) -> String {
        format!("/{}?{}", self.filename(), self.signature)
    }
}
