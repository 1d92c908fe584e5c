use crate::ParseOutcome;

/// Base trait for line parsers.
///
/// Implementations must be pure: the dispatcher calls `parse` from several
/// worker threads at once, so any state has to be immutable.
pub trait Parser: Send + Sync {
    /// Returns the name of this parser (e.g., "dashed")
    fn name(&self) -> &'static str;

    /// Parse one line. Malformed input is a `ParseOutcome::Failure`, never a panic.
    fn parse(&self, line: &str) -> ParseOutcome;
}
