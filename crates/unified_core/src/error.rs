//! Structured error values and error categories.
//!
//! [`ErrorInfo`] is the error half of [`crate::result::Result`]. Categories
//! are singletons compared by identity; [`TypedErrorCode`] pairs a raw code
//! with its category for human-readable rendering.

use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error_codes;

/// Standard error information carried by every failed operation.
///
/// Equality is field-wise; two errors with the same code but different
/// messages are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("[{module}] error {code}: {message}")]
pub struct ErrorInfo {
    pub code: i32,
    pub message: String,
    pub module: String,
    pub details: Option<String>,
}

impl ErrorInfo {
    pub fn new(code: i32, message: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            module: module.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Map an I/O error to the common error-code table.
    pub fn from_io(err: &std::io::Error, module: impl Into<String>) -> Self {
        use std::io::ErrorKind;

        let code = match err.kind() {
            ErrorKind::NotFound => error_codes::common::NOT_FOUND,
            ErrorKind::PermissionDenied => error_codes::common::PERMISSION_DENIED,
            ErrorKind::InvalidInput | ErrorKind::InvalidData => {
                error_codes::common::INVALID_ARGUMENT
            }
            ErrorKind::TimedOut => error_codes::common::TIMEOUT,
            ErrorKind::OutOfMemory => error_codes::common::OUT_OF_MEMORY,
            ErrorKind::AlreadyExists => error_codes::common::ALREADY_EXISTS,
            _ => error_codes::common::IO_ERROR,
        };

        Self::new(code, err.to_string(), module).with_details(format!("{:?}", err.kind()))
    }

    /// Map a caught panic payload. Panics with string payloads keep their
    /// message; anything else is reported as a non-standard payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send), module: impl Into<String>) -> Self {
        let (message, details) = if let Some(s) = payload.downcast_ref::<&str>() {
            ((*s).to_string(), "panic")
        } else if let Some(s) = payload.downcast_ref::<String>() {
            (s.clone(), "panic")
        } else {
            ("non-standard panic payload".to_string(), "non-standard")
        };

        Self::new(error_codes::common::INTERNAL_ERROR, message, module).with_details(details)
    }
}

/// A semantic error category. Categories are singletons: two categories are
/// equal only when they are the same object.
pub trait ErrorCategory: Send + Sync {
    /// Stable identifier, e.g. `"common"` or `"network"`.
    fn name(&self) -> &'static str;

    /// Render a human-readable message for a code in this category.
    fn message(&self, code: i32) -> String;
}

/// Category for the common error-code range and success.
pub struct CommonCategory;

impl ErrorCategory for CommonCategory {
    fn name(&self) -> &'static str {
        "common"
    }

    fn message(&self, code: i32) -> String {
        error_codes::message_for(code).to_string()
    }
}

static COMMON_CATEGORY: Lazy<CommonCategory> = Lazy::new(|| CommonCategory);

/// The shared common category singleton.
pub fn common_category() -> &'static CommonCategory {
    &COMMON_CATEGORY
}

/// An error code paired with the category it belongs to.
///
/// Equality requires the same code *and* the same category object.
#[derive(Clone, Copy)]
pub struct TypedErrorCode {
    pub code: i32,
    pub category: &'static dyn ErrorCategory,
}

impl TypedErrorCode {
    pub fn new(code: i32, category: &'static dyn ErrorCategory) -> Self {
        Self { code, category }
    }

    /// Message rendered by the owning category.
    pub fn message(&self) -> String {
        self.category.message(self.code)
    }
}

impl PartialEq for TypedErrorCode {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && std::ptr::eq(self.category, other.category)
    }
}

impl Eq for TypedErrorCode {}

impl fmt::Debug for TypedErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedErrorCode")
            .field("code", &self.code)
            .field("category", &self.category.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_field_wise_equality() {
        let a = ErrorInfo::new(-1, "boom", "mod");
        let b = ErrorInfo::new(-1, "boom", "mod");
        let c = ErrorInfo::new(-1, "boom", "mod").with_details("extra");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display_includes_code_module_message() {
        let e = ErrorInfo::new(-2, "missing", "registry");
        let rendered = e.to_string();
        assert!(rendered.contains("-2"));
        assert!(rendered.contains("registry"));
        assert!(rendered.contains("missing"));
    }

    #[test]
    fn test_from_io_maps_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e = ErrorInfo::from_io(&io, "loader");
        assert_eq!(e.code, error_codes::common::NOT_FOUND);
        assert_eq!(e.details.as_deref(), Some("NotFound"));
    }

    #[test]
    fn test_typed_code_identity_equality() {
        let a = TypedErrorCode::new(-1, common_category());
        let b = TypedErrorCode::new(-1, common_category());
        assert_eq!(a, b);
        assert_eq!(a.message(), "Invalid argument");
    }

    #[test]
    fn test_category_name() {
        assert_eq!(common_category().name(), "common");
    }
}
