//! Test support for the NWP source crates.
//!
//! - [`ScriptedArchive`]: in-memory `Retriever` with a probe log
//! - [`generators`]: decoded grids with predictable values
//! - [`fixtures`]: reference times, grid axes, option presets, a sample catalog
//!
//! Only integration tests (`tests/`) may depend on this crate, since it
//! links `nwp-source` itself.

pub mod archive;
pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use archive::ScriptedArchive;
pub use generators::*;

/// Assert that a `Result` is an `Err` matching a pattern.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_err;
///
/// assert_err!(source.open(), NwpError::Coverage { .. });
/// ```
#[macro_export]
macro_rules! assert_err {
    ($result:expr, $pattern:pat) => {{
        match $result {
            Err(err) => assert!(
                matches!(err, $pattern),
                "unexpected error: {:?}",
                err
            ),
            Ok(_) => panic!("expected error matching `{}`", stringify!($pattern)),
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_err_matches() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_err!(result, _);
    }

    #[test]
    #[should_panic(expected = "expected error")]
    fn test_assert_err_on_ok() {
        let result: Result<u8, String> = Ok(1);
        assert_err!(result, _);
    }
}
