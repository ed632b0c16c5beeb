//! Call-site capture for error and unwrap diagnostics.
//!
//! Rust's `#[track_caller]` attribute gives every capture point an accurate
//! caller location even through inlining and generic instantiation, so this
//! is a thin value type rather than a platform shim.

use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};

/// A captured source location: file, line, column, and (when supplied by the
/// caller) the enclosing function name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Function name; empty when not supplied. `Location` does not carry
    /// function names, so callers that want one pass it explicitly.
    pub function: String,
}

impl SourceLocation {
    /// Capture the location of the caller.
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }

    /// Attach a function name to a captured location.
    pub fn with_function(mut self, function: &str) -> Self {
        self.function = function.to_string();
        self
    }
}

impl From<&Location<'_>> for SourceLocation {
    fn from(loc: &Location<'_>) -> Self {
        Self {
            file: loc.file().to_string(),
            line: loc.line(),
            column: loc.column(),
            function: String::new(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_captures_this_file() {
        let loc = SourceLocation::caller();
        assert!(loc.file.ends_with("source_location.rs"));
        assert!(loc.line > 0);
        assert!(loc.column > 0);
    }

    #[test]
    fn test_display_is_file_colon_line() {
        let loc = SourceLocation {
            file: "f.xx".to_string(),
            line: 42,
            column: 7,
            function: String::new(),
        };
        assert_eq!(loc.to_string(), "f.xx:42");
    }

    #[test]
    fn test_with_function() {
        let loc = SourceLocation::caller().with_function("test_with_function");
        assert_eq!(loc.function, "test_with_function");
    }
}
