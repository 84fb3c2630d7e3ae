//! Request context
//!
//! The upload filter only cares about one thing from the originating request:
//! its HTTP method. The method selects how the uploaded file reaches storage.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// HTTP methods relevant to uploads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Post,
    Put,
    Patch,
    /// Anything else, kept as given
    Other(String),
}

impl HttpMethod {
    /// Parse a method name, ignoring surrounding whitespace.
    ///
    /// Method names are case-sensitive, so `post` is not `POST`.
    pub fn parse(method: &str) -> Self {
        match method.trim() {
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            other => HttpMethod::Other(other.to_string()),
        }
    }

    /// Method name
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Other(name) => name,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HttpMethod::parse(s))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an uploaded file reaches its final target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStrategy {
    /// Storage-level move; the temp file is consumed
    Move,
    /// Copy the bytes; the temp file stays where it is
    Copy,
    /// No transfer is allowed for this method
    Reject,
}

impl MoveStrategy {
    /// Total mapping from request method to transfer strategy
    ///
    /// Form posts move the file, `PUT`/`PATCH` bodies are copied, every other
    /// method is refused.
    pub fn for_method(method: &HttpMethod) -> Self {
        match method {
            HttpMethod::Post => MoveStrategy::Move,
            HttpMethod::Put | HttpMethod::Patch => MoveStrategy::Copy,
            HttpMethod::Other(_) => MoveStrategy::Reject,
        }
    }
}

/// Request data the filter needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequestContext {
    method: HttpMethod,
}

impl UploadRequestContext {
    /// Create a context from an already parsed method
    pub fn new(method: HttpMethod) -> Self {
        Self { method }
    }

    /// Create a context from a raw method string
    pub fn from_method(method: &str) -> Self {
        Self::new(HttpMethod::parse(method))
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    /// Strategy selected by this request
    pub fn strategy(&self) -> MoveStrategy {
        MoveStrategy::for_method(&self.method)
    }
}
