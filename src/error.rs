//! Error types for xsdbind
//!
//! Failures fall into three groups that callers usually need to tell apart:
//!
//! - **malformed input**: the event stream itself is not well-formed XML
//!   ([`Error::Malformed`]);
//! - **structural errors**: the input is well-formed but a declaration is
//!   missing, an attribute value is invalid, two schemas cannot be merged or
//!   no element can encode a value ([`Error::Structural`]);
//! - **advisory stop**: the caller asked the parse to stop
//!   ([`Error::Stopped`]).
//!
//! The remaining variants cover resource loading, limits and I/O.

use std::fmt;
use thiserror::Error;

/// Result type alias using xsdbind Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xsdbind operations
#[derive(Error, Debug)]
pub enum Error {
    /// The input is not well-formed XML
    #[error("malformed input: {0}")]
    Malformed(ParseError),

    /// A schema or instance is well-formed but structurally unusable
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// The cooperative stop check asked the parse to abort
    #[error("parse stopped at caller request")]
    Stopped,

    /// Value error (invalid lexical value for a type)
    #[error("value error: {0}")]
    Value(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Shorthand for a structural error with only a message
    pub fn structural(message: impl Into<String>) -> Self {
        Error::Structural(StructuralError::new(message))
    }

    /// Shorthand for a malformed-input error with only a message
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::Malformed(ParseError::new(message))
    }

    /// True if this is the advisory stop outcome
    pub fn is_stop(&self) -> bool {
        matches!(self, Error::Stopped)
    }

    /// True if the input was not well-formed
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::Malformed(_))
    }

    /// True if this is a structural or semantic error
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Structural(_))
    }

    /// Attach a position to malformed or structural errors that lack one.
    pub fn at(self, position: Position) -> Self {
        match self {
            Error::Malformed(e) if e.position.is_none() => {
                Error::Malformed(e.with_position(position))
            }
            Error::Structural(e) if e.position.is_none() => {
                Error::Structural(e.with_position(position))
            }
            other => other,
        }
    }

    /// Attach the element being processed and its position
    pub fn located(self, element: &str, position: Position) -> Self {
        match self {
            Error::Structural(e) if e.element.is_none() => {
                Error::Structural(e.with_element(element)).at(position)
            }
            other => other.at(position),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        match e {
            quick_xml::Error::Io(io) => Error::Io(std::io::Error::new(io.kind(), io.to_string())),
            other => Error::malformed(other.to_string()),
        }
    }
}

/// One-based line and column in a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, in characters)
    pub column: usize,
}

impl Position {
    /// Create a new position
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Well-formedness error in an input document
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Where in the document the problem was noticed
    pub position: Option<Position>,
    /// URI of the document being read
    pub source: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            source: None,
        }
    }

    /// Set the position
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the source document URI
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref pos) = self.position {
            write!(f, " (line {}, column {})", pos.line, pos.column)?;
        }

        if let Some(ref src) = self.source {
            write!(f, "\n\nSource: {}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Structural or semantic error with context
#[derive(Debug, Clone)]
pub struct StructuralError {
    /// Error message
    pub message: String,
    /// Element (or declaration) being processed when the error occurred
    pub element: Option<String>,
    /// Position in the input, for parse-time errors
    pub position: Option<Position>,
    /// Original reason, when wrapping a lower-level failure
    pub reason: Option<String>,
}

impl StructuralError {
    /// Create a new structural error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            element: None,
            position: None,
            reason: None,
        }
    }

    /// Set the element name
    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Set the position
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref element) = self.element {
            write!(f, " [element '{}']", element)?;
        }

        if let Some(ref pos) = self.position {
            write!(f, " (line {}, column {})", pos.line, pos.column)?;
        }

        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }

        Ok(())
    }
}

impl std::error::Error for StructuralError {}
