//! Custom error types for rustgscholar.
//!
//! The two stage errors, [`FetchError`] and [`ParseError`], are what the
//! Fetcher and Parser produce. [`ScholarError`] wraps them unchanged together
//! with the configuration and I/O failures of the surrounding library.
//! All functions return `Result<T, ScholarError>` instead of using `unwrap()`.

use crate::parse::PageKind;
use thiserror::Error;

/// Main error type for rustgscholar operations.
#[derive(Debug, Error)]
pub enum ScholarError {
    /// Fetching a page failed after all retry attempts
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A page could not be turned into records
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Caller input rejected before any request was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using `ScholarError`
pub type Result<T> = std::result::Result<T, ScholarError>;

/// Terminal failure of [`Fetcher::fetch`](crate::fetch::Fetcher::fetch).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fetching {url} failed after {attempts} attempt(s): {kind}")]
pub struct FetchError {
    /// What went wrong on the last attempt
    pub kind: FetchErrorKind,
    /// Number of attempts made, always at least one
    pub attempts: u32,
    /// The URL that was requested
    pub url: String,
}

/// Classification of a failed HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchErrorKind {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("network error: {0}")]
    NetworkError(String),
}

/// A page did not match the expected layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {page} page: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub page: PageKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// A marker required for every record was absent
    #[error("missing {0}")]
    MissingField(&'static str),

    /// The page as a whole is not the kind of page we expected
    #[error("unexpected layout: {0}")]
    UnexpectedLayout(String),
}

impl ParseErrorKind {
    pub(crate) fn on(self, page: PageKind) -> ParseError {
        ParseError { kind: self, page }
    }
}

/// Extension trait for turning a missing marker into a parse failure
pub trait OptionExt<T> {
    /// Convert Option to Result with a missing-field error
    fn or_missing(self, field: &'static str) -> std::result::Result<T, ParseErrorKind>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_missing(self, field: &'static str) -> std::result::Result<T, ParseErrorKind> {
        self.ok_or(ParseErrorKind::MissingField(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_names_attempts_and_kind() {
        let err = FetchError {
            kind: FetchErrorKind::HttpStatus(503),
            attempts: 3,
            url: "https://scholar.google.com/scholar?q=x".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempt(s)"));
        assert!(msg.contains("HTTP status 503"));
    }

    #[test]
    fn test_stage_errors_surface_unchanged_through_scholar_error() {
        let parse = ParseErrorKind::MissingField("title").on(PageKind::PaperSearch);
        let wrapped: ScholarError = parse.clone().into();
        assert!(matches!(wrapped, ScholarError::Parse(ref inner) if *inner == parse));
        assert_eq!(wrapped.to_string(), parse.to_string());
    }

    #[test]
    fn test_or_missing_names_the_field() {
        let none: Option<u32> = None;
        assert_eq!(none.or_missing("year"), Err(ParseErrorKind::MissingField("year")));
        assert_eq!(Some(1).or_missing("year"), Ok(1));
    }
}
