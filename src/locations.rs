//! Resource location resolution
//!
//! Schema locations appear as absolute URIs, paths or relative references
//! that must be resolved against the URI of the referring document.

use crate::error::{Error, Result};
use std::path::Path;
use url::Url;

/// Convert a filesystem path into a `file:` URL
pub fn path_to_url(path: &Path) -> Result<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map_err(|_| Error::Resource(format!("Cannot express '{}' as a URL", path.display())))
}

/// Resolve a location reference against an optional base URI
///
/// Absolute URIs are returned as-is. Relative references need a base; a
/// reference that looks like an absolute filesystem path is accepted
/// without one.
pub fn resolve_location(base: Option<&Url>, reference: &str) -> Result<Url> {
    let reference = reference.trim();
    if let Ok(url) = Url::parse(reference) {
        // Single-letter schemes are Windows drive letters, not URIs.
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }

    match base {
        Some(base) => Ok(base.join(reference)?),
        None => {
            let path = Path::new(reference);
            if path.is_absolute() || path.exists() {
                path_to_url(path)
            } else {
                Err(Error::Resource(format!(
                    "Cannot resolve relative location '{}' without a base URI",
                    reference
                )))
            }
        }
    }
}

/// True if the string parses as an absolute URI
pub fn is_absolute_uri(uri: &str) -> bool {
    Url::parse(uri).map(|u| u.scheme().len() > 1).unwrap_or(false)
}
