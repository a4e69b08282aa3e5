//! Loading schema documents
//!
//! Documents are addressed by URL. `file:` URLs are read from disk; remote
//! schemes are recognised but never fetched, so a remote import fails with
//! a [`Error::Resource`] and is logged by the resolver.

use std::fs;
use std::path::Path;

use url::Url;

use crate::error::{Error, Result};
use crate::limits::Limits;

/// Reads schema documents for the registry
#[derive(Debug, Clone, Default)]
pub struct Loader {
    limits: Limits,
    allow_remote: bool,
}

impl Loader {
    /// Loader with default limits; remote locations are refused
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Accept remote locations
    ///
    /// No HTTP client is bundled, so an accepted remote location still
    /// fails, with a message saying it could not be fetched.
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Limits applied by this loader
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Read the document behind a URL
    pub fn load_url(&self, url: &Url) -> Result<Vec<u8>> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::Resource(format!("'{}' is not a local path", url)))?;
                self.load_path(&path)
            }
            "http" | "https" | "ftp" if !self.allow_remote => Err(Error::Resource(format!(
                "remote location '{}' refused",
                url
            ))),
            scheme => Err(Error::Resource(format!(
                "cannot fetch '{}': no loader for scheme '{}'",
                url, scheme
            ))),
        }
    }

    /// Read a document from disk
    pub fn load_path(&self, path: &Path) -> Result<Vec<u8>> {
        let size = fs::metadata(path)
            .map_err(|e| Error::Resource(format!("cannot read '{}': {}", path.display(), e)))?
            .len();
        self.limits.check_xml_size(usize::try_from(size).unwrap_or(usize::MAX))?;
        fs::read(path)
            .map_err(|e| Error::Resource(format!("cannot read '{}': {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file_url() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "<a/>").unwrap();

        let url = Url::from_file_path(file.path()).unwrap();
        let content = Loader::new().load_url(&url).unwrap();
        assert_eq!(content, b"<a/>");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Loader::new().load_path(&dir.path().join("absent.xsd")).unwrap_err();
        assert!(matches!(err, Error::Resource(_)));
    }

    #[test]
    fn test_remote_is_not_fetched() {
        let url = Url::parse("http://example.com/a.xsd").unwrap();
        let refused = Loader::new().load_url(&url).unwrap_err();
        assert!(refused.to_string().contains("refused"));
        let allowed = Loader::new().with_allow_remote(true).load_url(&url).unwrap_err();
        assert!(allowed.to_string().contains("cannot fetch"));
    }

    #[test]
    fn test_size_limit() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", "x".repeat(2048)).unwrap();

        let mut limits = Limits::strict();
        limits.max_xml_size = 1024;
        let loader = Loader::new().with_limits(limits);
        assert!(loader.load_path(file.path()).is_err());
    }
}
