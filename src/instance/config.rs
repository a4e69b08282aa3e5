//! Instance parser configuration

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use url::Url;

use super::handlers::{HandlerFactory, SchemaHandlerFactory};
use crate::limits::Limits;

/// Cooperative stop check polled at element boundaries
pub type StopCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// How strictly instance content is held to its content model
///
/// - `Low`: children nobody declares are kept as untyped records and text
///   that does not parse as its declared type is kept as a string.
/// - `Medium`: undeclared children are skipped; bad typed text is an error.
/// - `High`: undeclared children and attributes are errors, and occurrence
///   bounds and required attributes are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub enum FilterStrictness {
    /// Keep everything
    Low,
    /// Skip what the schema does not declare
    #[default]
    Medium,
    /// Reject what the schema does not declare
    High,
}

impl FilterStrictness {
    /// Parse `low`, `medium` or `high` (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for FilterStrictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Options of an instance parse
#[derive(Clone)]
pub struct ParserConfig {
    /// Namespace to schema location overrides; these win over locations
    /// named in the document
    pub schema_locations: IndexMap<String, String>,
    /// Stop check, polled at every element start and end
    pub stop: Option<StopCheck>,
    /// Hand completed children of the root to a sink instead of the root value
    pub streaming: bool,
    /// Content model strictness
    pub strictness: FilterStrictness,
    /// URI of the instance document, for relative schema locations
    pub base_uri: Option<Url>,
    /// Resource limits
    pub limits: Limits,
    /// Factory creating the handler of the document element
    pub handler_factory: Arc<dyn HandlerFactory>,
}

impl ParserConfig {
    /// Default configuration with the schema-driven handler factory
    pub fn new() -> Self {
        Self {
            schema_locations: IndexMap::new(),
            stop: None,
            streaming: false,
            strictness: FilterStrictness::default(),
            base_uri: None,
            limits: Limits::default(),
            handler_factory: Arc::new(SchemaHandlerFactory),
        }
    }

    /// Override the schema location of a namespace
    pub fn with_schema_location(
        mut self,
        namespace: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.schema_locations.insert(namespace.into(), location.into());
        self
    }

    /// Install a stop check
    pub fn with_stop(mut self, stop: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.stop = Some(Arc::new(stop));
        self
    }

    /// Stop when the flag is set
    pub fn with_cancel_flag(self, flag: Arc<AtomicBool>) -> Self {
        self.with_stop(move || flag.load(Ordering::Relaxed))
    }

    /// Enable streaming of root children
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Set the strictness
    pub fn with_strictness(mut self, strictness: FilterStrictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Set the document URI
    pub fn with_base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = Some(base_uri);
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the handler factory
    pub fn with_handler_factory(mut self, factory: impl HandlerFactory + 'static) -> Self {
        self.handler_factory = Arc::new(factory);
        self
    }

    /// True if the stop check asks to stop
    pub fn should_stop(&self) -> bool {
        self.stop.as_ref().map_or(false, |stop| stop())
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("schema_locations", &self.schema_locations)
            .field("stop", &self.stop.is_some())
            .field("streaming", &self.streaming)
            .field("strictness", &self.strictness)
            .field("base_uri", &self.base_uri)
            .field("limits", &self.limits)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let config = ParserConfig::new().with_cancel_flag(flag.clone());
        assert!(!config.should_stop());
        flag.store(true, Ordering::Relaxed);
        assert!(config.should_stop());
    }

    #[test]
    fn test_strictness_parse() {
        assert_eq!(FilterStrictness::parse("HIGH"), Some(FilterStrictness::High));
        assert_eq!(FilterStrictness::default(), FilterStrictness::Medium);
        assert_eq!(FilterStrictness::parse("extreme"), None);
    }
}
