//! Extraction of records from Scholar HTML.
//!
//! Each page kind is a [`Page`] type naming the selector of its record
//! blocks and how one block becomes a record. [`Parser::parse`] locates the
//! blocks and hands back a lazy [`Records`] sequence; a block is only turned
//! into a record while iterating, and malformed blocks are skipped.

mod locate;
mod pages;

pub use locate::{Element, HtmlLocator, Locate};
pub use pages::{AuthorProfile, AuthorSearch, CitationList, PaperSearch, PublicationList};

use crate::error::{ParseError, ParseErrorKind, Result, ScholarError};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Strings that only appear on Scholar's automated-traffic interstitial.
const BLOCKED_PAGE_MARKERS: &[&str] = &[
    "Solving the above CAPTCHA",
    "unusual traffic from your computer network",
    "gs_captcha_ccl",
];

/// Runtime tag for the kind of page being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    AuthorSearch,
    PaperSearch,
    CitationList,
    PublicationList,
    AuthorProfile,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PageKind::AuthorSearch => "author-search",
            PageKind::PaperSearch => "paper-search",
            PageKind::CitationList => "citation-list",
            PageKind::PublicationList => "publication-list",
            PageKind::AuthorProfile => "author-profile",
        })
    }
}

/// A kind of Scholar page and the record its blocks hold.
pub trait Page {
    type Record;

    const KIND: PageKind;

    /// Selector matching one block per record.
    const BLOCK: &'static str;

    /// Turn one block into a record.
    fn extract(scope: &Scope<'_>, block: &Element) -> std::result::Result<Self::Record, ParseErrorKind>;

    /// Key that must be unique within one result; later duplicates are dropped.
    fn identity(_record: &Self::Record) -> Option<&str> {
        None
    }
}

/// Lookup helpers handed to [`Page::extract`].
pub struct Scope<'a> {
    locator: &'a dyn Locate,
    patterns: &'a Patterns,
}

impl Scope<'_> {
    /// All elements inside `within` matching `selector`.
    pub fn all(
        &self,
        within: &Element,
        selector: &str,
    ) -> std::result::Result<Vec<Element>, ParseErrorKind> {
        self.locator.locate(within.html(), selector)
    }

    /// First element inside `within` matching `selector`.
    pub fn first(
        &self,
        within: &Element,
        selector: &str,
    ) -> std::result::Result<Option<Element>, ParseErrorKind> {
        Ok(self.all(within, selector)?.into_iter().next())
    }

    /// Text of the first matching element, if it has any.
    pub fn text(
        &self,
        within: &Element,
        selector: &str,
    ) -> std::result::Result<Option<String>, ParseErrorKind> {
        Ok(self
            .first(within, selector)?
            .map(|e| e.text().to_string())
            .filter(|t| !t.is_empty()))
    }

    pub(crate) fn patterns(&self) -> &Patterns {
        self.patterns
    }
}

/// Regular expressions for the free-text parts of a page.
pub(crate) struct Patterns {
    year: Regex,
    trailing_year: Regex,
    number: Regex,
    cites: Regex,
    cluster: Regex,
    user: Regex,
    view: Regex,
    title_tags: Regex,
}

impl Patterns {
    fn new() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            year: Regex::new(r"\b(?:19|20)\d{2}\b")?,
            trailing_year: Regex::new(r",?\s*\b(?:19|20)\d{2}\s*$")?,
            number: Regex::new(r"\d[\d,]*")?,
            cites: Regex::new(r"[?&]cites=(\d+)")?,
            cluster: Regex::new(r"[?&]cluster=(\d+)")?,
            user: Regex::new(r"[?&]user=([\w-]+)")?,
            view: Regex::new(r"citation_for_view=([\w-]+:[\w-]+)")?,
            title_tags: Regex::new(r"^(?:\s*\[[^\]]*\])+\s*")?,
        })
    }

    /// First run of digits in `text`, ignoring thousands separators.
    pub(crate) fn first_number(&self, text: &str) -> Option<u32> {
        self.number
            .find(text)
            .and_then(|m| m.as_str().replace(',', "").parse().ok())
    }

    /// First plausible publication year in `text` and its byte offset.
    pub(crate) fn year(&self, text: &str) -> Option<(u16, usize)> {
        self.year
            .find(text)
            .and_then(|m| m.as_str().parse().ok().map(|y| (y, m.start())))
    }

    pub(crate) fn strip_trailing_year<'t>(&self, text: &'t str) -> &'t str {
        match self.trailing_year.find(text) {
            Some(m) => text[..m.start()].trim_end(),
            None => text,
        }
    }

    pub(crate) fn cites_id(&self, href: &str) -> Option<String> {
        capture(&self.cites, href)
    }

    pub(crate) fn cluster_id(&self, href: &str) -> Option<String> {
        capture(&self.cluster, href)
    }

    pub(crate) fn user_id(&self, href: &str) -> Option<String> {
        capture(&self.user, href)
    }

    pub(crate) fn view_id(&self, href: &str) -> Option<String> {
        capture(&self.view, href)
    }

    /// Drop leading type badges such as `[PDF]` or `[CITATION][C]`.
    pub(crate) fn strip_title_tags<'t>(&self, title: &'t str) -> &'t str {
        match self.title_tags.find(title) {
            Some(m) => &title[m.end()..],
            None => title,
        }
    }
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Turns page bodies into [`Records`]. Cheap to clone.
#[derive(Clone)]
pub struct Parser {
    locator: Arc<dyn Locate>,
    patterns: Arc<Patterns>,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser").finish_non_exhaustive()
    }
}

impl Parser {
    /// Parser using [`HtmlLocator`].
    pub fn new() -> Result<Self> {
        Self::with_locator(Arc::new(HtmlLocator))
    }

    /// Parser using a custom marker lookup.
    pub fn with_locator(locator: Arc<dyn Locate>) -> Result<Self> {
        let patterns = Patterns::new()
            .map_err(|e| ScholarError::Config(format!("Failed to compile patterns: {}", e)))?;
        Ok(Self {
            locator,
            patterns: Arc::new(patterns),
        })
    }

    /// Locate the record blocks of a `P` page.
    ///
    /// A page without any block is an empty result. A page whose blocks all
    /// fail to extract reports the first block's failure.
    ///
    /// # Errors
    ///
    /// `UnexpectedLayout` for an automated-traffic page or an unusable
    /// selector, `MissingField` when no block yields a record.
    pub fn parse<P: Page>(&self, body: &str) -> std::result::Result<Records<P>, ParseError> {
        if BLOCKED_PAGE_MARKERS.iter().any(|m| body.contains(m)) {
            return Err(ParseErrorKind::UnexpectedLayout(
                "Scholar served its automated-traffic check".to_string(),
            )
            .on(P::KIND));
        }

        let blocks = self
            .locator
            .locate(body, P::BLOCK)
            .map_err(|kind| kind.on(P::KIND))?;

        let mut first_failure = None;
        for block in &blocks {
            match self.extract::<P>(block) {
                Ok(_) => {
                    first_failure = None;
                    break;
                }
                Err(kind) => {
                    first_failure.get_or_insert(kind);
                }
            }
        }
        if let Some(kind) = first_failure {
            return Err(kind.on(P::KIND));
        }

        debug!(page = %P::KIND, blocks = blocks.len(), "Located record blocks");
        Ok(Records {
            parser: self.clone(),
            blocks,
            page: PhantomData,
        })
    }

    fn extract<P: Page>(&self, block: &Element) -> std::result::Result<P::Record, ParseErrorKind> {
        let scope = Scope {
            locator: self.locator.as_ref(),
            patterns: &self.patterns,
        };
        P::extract(&scope, block)
    }
}

/// Lazy, restartable sequence of the records on one page.
///
/// Every call to [`iter`](Records::iter) starts again from the first block.
pub struct Records<P: Page> {
    parser: Parser,
    blocks: Vec<Element>,
    page: PhantomData<fn() -> P>,
}

impl<P: Page> Records<P> {
    pub fn iter(&self) -> RecordIter<'_, P> {
        RecordIter {
            records: self,
            next: 0,
            seen: HashSet::new(),
        }
    }

    /// Number of blocks located, including ones that will be skipped.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_vec(&self) -> Vec<P::Record> {
        self.iter().collect()
    }
}

impl<P: Page> Clone for Records<P> {
    fn clone(&self) -> Self {
        Self {
            parser: self.parser.clone(),
            blocks: self.blocks.clone(),
            page: PhantomData,
        }
    }
}

impl<P: Page> fmt::Debug for Records<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Records")
            .field("page", &P::KIND)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

impl<'a, P: Page> IntoIterator for &'a Records<P> {
    type Item = P::Record;
    type IntoIter = RecordIter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over [`Records`], extracting one block per step.
pub struct RecordIter<'a, P: Page> {
    records: &'a Records<P>,
    next: usize,
    seen: HashSet<String>,
}

impl<P: Page> Iterator for RecordIter<'_, P> {
    type Item = P::Record;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(block) = self.records.blocks.get(self.next) {
            let index = self.next;
            self.next += 1;

            match self.records.parser.extract::<P>(block) {
                Ok(record) => {
                    if let Some(key) = P::identity(&record) {
                        if !self.seen.insert(key.to_string()) {
                            debug!(page = %P::KIND, index, key, "Skipping duplicate record");
                            continue;
                        }
                    }
                    return Some(record);
                }
                Err(kind) => {
                    debug!(page = %P::KIND, index, error = %kind, "Skipping malformed block");
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.records.blocks.len() - self.next))
    }
}

impl<P: Page> FusedIterator for RecordIter<'_, P> {}
