//! Result algebra built on `std::result::Result` with [`ErrorInfo`] errors.
//!
//! The alias keeps `?`, combinators, and pattern matching from the standard
//! library; what this module adds is the structured error payload, checked
//! unwrapping with call-site diagnostics, and panic-to-error capture.

use std::panic::{self, AssertUnwindSafe};

use crate::error::ErrorInfo;
use crate::error_codes;
use crate::source_location::SourceLocation;

/// Result carrying a structured [`ErrorInfo`] on failure.
pub type Result<T> = std::result::Result<T, ErrorInfo>;

/// Result of an operation with no meaningful value.
pub type UnitResult = Result<()>;

/// Successful result.
pub fn ok<T>(value: T) -> Result<T> {
    Ok(value)
}

/// Failed result with code, message, and originating module.
pub fn err<T>(code: i32, message: impl Into<String>, module: impl Into<String>) -> Result<T> {
    Err(ErrorInfo::new(code, message, module))
}

/// Failed result with additional details attached.
pub fn err_with_details<T>(
    code: i32,
    message: impl Into<String>,
    module: impl Into<String>,
    details: impl Into<String>,
) -> Result<T> {
    Err(ErrorInfo::new(code, message, module).with_details(details))
}

/// Failure for a component that has not been initialized yet.
pub fn uninitialized<T>(module: impl Into<String>) -> Result<T> {
    err(
        error_codes::common::NOT_INITIALIZED,
        "Not initialized",
        module,
    )
}

/// True when the result holds a value.
pub fn is_ok<T>(result: &Result<T>) -> bool {
    result.is_ok()
}

/// Borrow the value if present.
pub fn get_value<T>(result: &Result<T>) -> Option<&T> {
    result.as_ref().ok()
}

/// Borrow the error if present.
pub fn get_error<T>(result: &Result<T>) -> Option<&ErrorInfo> {
    result.as_ref().err()
}

/// The value, or a fallback when the result is an error.
pub fn value_or<T>(result: Result<T>, default: T) -> T {
    result.unwrap_or(default)
}

/// Checked extraction with full diagnostics on failure.
pub trait ResultExt<T> {
    /// Take the value, panicking with the error's code, module, message,
    /// details, and the *caller's* source location when the result is an
    /// error. For recoverable paths use `?` or [`ResultExt::value_or`].
    fn unwrap_checked(self) -> T;

    /// The value, or a fallback when the result is an error.
    fn value_or(self, default: T) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    #[track_caller]
    fn unwrap_checked(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                let loc = SourceLocation::caller();
                let details = e.details.as_deref().unwrap_or("none");
                panic!(
                    "unwrap_checked on error: code={} module={} message={} details={} at {}",
                    e.code, e.module, e.message, details, loc
                );
            }
        }
    }

    fn value_or(self, default: T) -> T {
        self.unwrap_or(default)
    }
}

/// Run a closure, converting panics into a failed result.
///
/// String panic payloads keep their message; other payloads are reported as
/// non-standard. Unwinding across this boundary is contained, so callers can
/// wrap third-party factories and callbacks without poisoning their own
/// state.
pub fn try_catch<T>(module: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(ErrorInfo::from_panic(payload.as_ref(), module)),
    }
}

/// [`try_catch`] for closures returning plain values.
pub fn try_catch_unit(module: &str, f: impl FnOnce()) -> UnitResult {
    try_catch(module, || {
        f();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_positive(s: &str) -> Result<u32> {
        match s.parse::<u32>() {
            Ok(n) if n > 0 => ok(n),
            Ok(_) => err(
                error_codes::common::INVALID_ARGUMENT,
                "value must be positive",
                "parser",
            ),
            Err(e) => err_with_details(
                error_codes::common::INVALID_ARGUMENT,
                "not a number",
                "parser",
                e.to_string(),
            ),
        }
    }

    #[test]
    fn test_question_mark_propagates() {
        fn doubled(s: &str) -> Result<u32> {
            let n = parse_positive(s)?;
            ok(n * 2)
        }
        assert_eq!(doubled("21"), Ok(42));
        assert_eq!(
            get_error(&doubled("x")).map(|e| e.code),
            Some(error_codes::common::INVALID_ARGUMENT)
        );
    }

    #[test]
    fn test_free_helpers() {
        let good = parse_positive("7");
        assert!(is_ok(&good));
        assert_eq!(get_value(&good), Some(&7));
        assert_eq!(value_or(parse_positive("x"), 99), 99);
    }

    #[test]
    fn test_uninitialized_code() {
        let r: Result<()> = uninitialized("registry");
        assert_eq!(
            get_error(&r).map(|e| e.code),
            Some(error_codes::common::NOT_INITIALIZED)
        );
    }

    #[test]
    fn test_unwrap_checked_ok() {
        assert_eq!(parse_positive("3").unwrap_checked(), 3);
    }

    #[test]
    #[should_panic(expected = "code=-1")]
    fn test_unwrap_checked_panics_with_code() {
        parse_positive("nope").unwrap_checked();
    }

    #[test]
    fn test_unwrap_checked_message_carries_diagnostics() {
        let result = std::panic::catch_unwind(|| {
            let r: Result<u32> = err_with_details(-4, "timed out", "net", "after 30s");
            r.unwrap_checked()
        });
        let payload = result.unwrap_err();
        let msg = payload.downcast_ref::<String>().unwrap();
        assert!(msg.contains("code=-4"));
        assert!(msg.contains("module=net"));
        assert!(msg.contains("message=timed out"));
        assert!(msg.contains("details=after 30s"));
        assert!(msg.contains("result.rs:"));
    }

    #[test]
    fn test_try_catch_maps_panic() {
        let r: Result<u32> = try_catch("worker", || panic!("exploded"));
        let e = r.unwrap_err();
        assert_eq!(e.code, error_codes::common::INTERNAL_ERROR);
        assert_eq!(e.message, "exploded");
    }

    #[test]
    fn test_try_catch_passes_through() {
        assert_eq!(try_catch("worker", || ok(5)), Ok(5));
    }

    #[test]
    fn test_try_catch_unit() {
        assert!(try_catch_unit("worker", || ()).is_ok());
        assert!(try_catch_unit("worker", || panic!("boom")).is_err());
    }
}
