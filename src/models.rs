//! Normalized records extracted from Scholar pages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque paper identifier.
///
/// Usually the numeric Scholar cluster id taken from a `cites=` or
/// `cluster=` link, which is what `/scholar?cites=` resolves. Results with
/// neither link fall back to the block's `data-cid` token, and uncited
/// profile publications to their `user:key` `citation_for_view` value.
/// Those fallbacks identify the record but do not resolve as a citation
/// lookup; see [`PaperId::is_cluster_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for a numeric cluster id, the only form a citation lookup resolves.
    pub fn is_cluster_id(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scholar profile identifier (the `user=` parameter of a profile URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(String);

impl AuthorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An author, from a search result block or a profile page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub name: String,
    /// `None` for search result cards without a profile link
    pub author_id: Option<AuthorId>,
    pub affiliation: Option<String>,
    /// Total citations shown for the author, 0 when not displayed
    pub citations: u32,
    /// Research interest labels in page order
    pub interests: Vec<String>,
    /// Publications listed on the profile page; empty for search results
    pub publications: Vec<PaperId>,
}

/// A paper, from search results, citation lists or a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: PaperId,
    pub title: String,
    /// Author names in listed order
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub year: Option<u16>,
    pub citations: u32,
    /// Link to the article itself
    pub url: Option<String>,
    /// Text snippet from the result page
    pub snippet: Option<String>,
}

/// A paper citing another paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitationEntry(pub PaperRecord);

impl CitationEntry {
    pub fn paper(&self) -> &PaperRecord {
        &self.0
    }

    pub fn into_paper(self) -> PaperRecord {
        self.0
    }
}

impl From<PaperRecord> for CitationEntry {
    fn from(paper: PaperRecord) -> Self {
        Self(paper)
    }
}

/// A search result together with the papers citing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperWithCitations {
    pub paper: PaperRecord,
    pub citing: Vec<CitationEntry>,
}
