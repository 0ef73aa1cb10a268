//! Common error handling utilities
//!
//! Errors in this workspace nest `thiserror` enums through `#[source]`. When a
//! failure is logged instead of propagated, the whole chain has to end up in
//! the log line, not only the outermost message.

use std::error::Error;
use std::fmt;

/// Display adapter rendering an error followed by every `source()` in its chain
///
/// ```
/// use ftsearch_common::ErrorChain;
///
/// let err = std::io::Error::other("disk gone");
/// assert_eq!(ErrorChain(&err).to_string(), "disk gone");
/// ```
pub struct ErrorChain<'a>(pub &'a (dyn Error + 'static));

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(cause) = source {
            write!(f, "\ncaused by: {cause}")?;
            source = cause.source();
        }
        Ok(())
    }
}

impl fmt::Debug for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
