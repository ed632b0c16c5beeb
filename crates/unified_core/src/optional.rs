//! Checked extraction helpers for `Option`.
//!
//! `Option<T>` already covers the optional-value algebra; this module only
//! adds diagnostics-bearing extraction to match [`crate::result::ResultExt`].

use crate::source_location::SourceLocation;

/// Checked extraction with call-site diagnostics on absence.
pub trait OptionExt<T> {
    /// Take the value, panicking with the *caller's* source location when
    /// the option is empty.
    fn unwrap_checked(self) -> T;

    /// The value, or a fallback when the option is empty.
    fn value_or(self, default: T) -> T;
}

impl<T> OptionExt<T> for Option<T> {
    #[track_caller]
    fn unwrap_checked(self) -> T {
        match self {
            Some(value) => value,
            None => {
                let loc = SourceLocation::caller();
                panic!("unwrap_checked on empty optional at {}", loc);
            }
        }
    }

    fn value_or(self, default: T) -> T {
        self.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_checked_some() {
        assert_eq!(Some(5).unwrap_checked(), 5);
    }

    #[test]
    #[should_panic(expected = "empty optional at")]
    fn test_unwrap_checked_none_panics() {
        let n: Option<u32> = None;
        n.unwrap_checked();
    }

    #[test]
    fn test_none_panic_names_this_file() {
        let result = std::panic::catch_unwind(|| {
            let n: Option<u32> = None;
            n.unwrap_checked()
        });
        let payload = result.unwrap_err();
        let msg = payload.downcast_ref::<String>().unwrap();
        assert!(msg.contains("optional.rs:"));
    }

    #[test]
    fn test_value_or() {
        assert_eq!(None.value_or(3), 3);
        assert_eq!(Some(9).value_or(3), 9);
    }
}
