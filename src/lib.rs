//! # rustgscholar
//!
//! Google Scholar scraping client: author and paper search, citing papers
//! and author publications, with retry/backoff on every page fetch.
//!
//! ## Modules
//!
//! - [`scholar`] - Query operations composing fetch and parse
//! - [`fetch`] - HTTP transport and the retry loop
//! - [`parse`] - Record extraction from Scholar HTML
//! - [`models`] - Author and paper records
//! - [`config`] - Client configuration and retry policy
//! - [`cookies`] - Cookie persistence
//! - [`logging`] - Tracing subscriber setup
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustgscholar::{ScholarClient, ScholarConfig};
//!
//! #[tokio::main]
//! async fn main() -> rustgscholar::Result<()> {
//!     let client = ScholarClient::new(ScholarConfig::default())?;
//!     let papers = client.search_papers("machine learning").await?;
//!     for paper in papers.iter().take(5) {
//!         let citing = client.get_citations(&paper.id).await?;
//!         println!("{} ({} citing on first page)", paper.title, citing.iter().count());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cookies;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod models;
pub mod parse;
pub mod scholar;

pub use config::{Pacing, RetryPolicy, ScholarConfig};
pub use error::{FetchError, FetchErrorKind, ParseError, ParseErrorKind, Result, ScholarError};
pub use models::{AuthorId, AuthorRecord, CitationEntry, PaperId, PaperRecord, PaperWithCitations};
pub use parse::Records;
pub use scholar::ScholarClient;
