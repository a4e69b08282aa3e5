//! XML name checks
//!
//! Declaration names in a schema must be NCNames; QName-valued attributes
//! (`type`, `ref`, `base`, ...) must be QNames.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}][A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\-\.0-9\u{B7}]*$",
    )
    .expect("NCName pattern is valid")
});

/// True for an NCName (a name without a colon)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// True for a QName: an NCName, optionally prefixed
pub fn is_valid_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_ncname(prefix) && is_valid_ncname(local),
        None => is_valid_ncname(name),
    }
}

/// Fail with [`Error::Name`] unless `name` is an NCName
pub fn validate_ncname(name: &str) -> Result<()> {
    if !is_valid_ncname(name) {
        return Err(Error::Name(format!("'{}' is not an NCName", name)));
    }
    Ok(())
}
