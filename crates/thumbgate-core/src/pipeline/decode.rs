//! Request URI decoding into a [`TransformDescriptor`].

use crate::config::LimitsConfig;
use crate::error::{RequestError, RequestResult};
use crate::types::{Transform, TransformDescriptor};

/// Decodes raw request URIs with configurable limits.
#[derive(Debug, Clone)]
pub struct RequestDecoder {
    limits: LimitsConfig,
}

impl RequestDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode `/{id}_{hash}_{w}x{h}_{transform}.{ext}?{signature}`.
    ///
    /// The bare root path yields [`RequestError::RootPathRequested`] before
    /// any parsing, whatever the query string. Grammar violations yield
    /// `MalformedRequest`; an unknown transform token yields
    /// `UnsupportedTransform` once the rest of the URI has parsed.
    pub fn decode(&self, request_uri: &str) -> RequestResult<TransformDescriptor> {
        let (path, query) = match request_uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (request_uri, None),
        };

        if path == "/" {
            return Err(RequestError::RootPathRequested);
        }

        let signature = match query {
            Some(q) if !q.is_empty() => q,
            _ => return Err(RequestError::malformed("missing signature")),
        };

        let filename = path
            .strip_prefix('/')
            .ok_or_else(|| RequestError::malformed("path must start with '/'"))?;

        let mut file_parts = filename.split('.');
        let (stem, extension) = match (file_parts.next(), file_parts.next(), file_parts.next()) {
            (Some(stem), Some(ext), None) => (stem, ext),
            _ => {
                return Err(RequestError::malformed(
                    "expected exactly one '.' in filename",
                ))
            }
        };
        let extension = token(extension, "extension")?;

        let params: Vec<&str> = stem.split('_').collect();
        let [id, hash, dimensions, transform] = params.as_slice() else {
            return Err(RequestError::malformed(format!(
                "expected 4 '_'-separated parameters, got {}",
                params.len()
            )));
        };
        let id = token(id, "id")?;
        let hash = token(hash, "hash")?;

        let (width, height) = dimensions
            .split_once('x')
            .ok_or_else(|| RequestError::malformed("dimensions must be WIDTHxHEIGHT"))?;
        let width = self.dimension(width, "width")?;
        let height = self.dimension(height, "height")?;

        let transform =
            Transform::from_token(transform).ok_or_else(|| RequestError::UnsupportedTransform {
                token: (*transform).to_string(),
            })?;

        Ok(TransformDescriptor {
            id: id.to_string(),
            hash: hash.to_string(),
            width,
            height,
            transform,
            extension: extension.to_string(),
            signature: signature.to_string(),
        })
    }

    /// Parse a canonical base-10 dimension: digits only, no leading zero,
    /// within `1..=max_dimension`.
    fn dimension(&self, raw: &str, name: &str) -> RequestResult<u32> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RequestError::malformed(format!(
                "{name} must be a positive integer, got {raw:?}"
            )));
        }
        if raw.starts_with('0') {
            return Err(RequestError::malformed(format!(
                "{name} must be a positive integer without leading zeros, got {raw:?}"
            )));
        }
        let value: u32 = raw
            .parse()
            .map_err(|_| RequestError::malformed(format!("{name} out of range: {raw}")))?;
        if value > self.limits.max_dimension {
            return Err(RequestError::malformed(format!(
                "{name} {value} exceeds limit {}",
                self.limits.max_dimension
            )));
        }
        Ok(value)
    }
}

/// Check an opaque path token: non-empty, no path separators or NUL.
fn token<'a>(raw: &'a str, name: &str) -> RequestResult<&'a str> {
    if raw.is_empty() {
        return Err(RequestError::malformed(format!("{name} is empty")));
    }
    if raw.contains(['/', '\\', '\0']) {
        return Err(RequestError::malformed(format!(
            "{name} contains a path separator"
        )));
    }
    Ok(raw)
}
