//! Google Scholar queries.
//!
//! [`ScholarClient`] builds the page URL for each query, fetches it through
//! the [`Fetcher`] with the configured [`RetryPolicy`], and parses the body
//! with the matching [`Page`] kind. Retries happen only inside the fetch;
//! a parse failure is never retried.

use crate::config::{Pacing, RetryPolicy, ScholarConfig};
use crate::error::{Result, ScholarError};
use crate::fetch::{Fetcher, ReqwestTransport, Transport};
use crate::models::{AuthorId, AuthorRecord, PaperId, PaperWithCitations};
use crate::parse::{
    AuthorProfile, AuthorSearch, CitationList, Page, PaperSearch, Parser, PublicationList, Records,
};
use tracing::{debug, info};
use url::Url;

/// Entry point for Scholar queries
#[derive(Debug)]
pub struct ScholarClient<T = ReqwestTransport> {
    base_url: String,
    language: String,
    policy: RetryPolicy,
    pacing: Option<Pacing>,
    fetcher: Fetcher<T>,
    parser: Parser,
}

impl ScholarClient<ReqwestTransport> {
    /// Client sending real HTTP requests as described by `config`.
    pub fn new(config: ScholarConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ScholarClient<T> {
    /// Client sending its requests through `transport`.
    pub fn with_transport(config: ScholarConfig, transport: T) -> Result<Self> {
        let base_url = config.trimmed_base_url().to_string();
        Url::parse(&base_url)
            .map_err(|e| ScholarError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        Ok(Self {
            base_url,
            language: config.language,
            policy: config.retry,
            pacing: config.pacing,
            fetcher: Fetcher::new(transport),
            parser: Parser::new()?,
        })
    }

    /// Replace the parser, e.g. one with a substitute locator.
    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        self.fetcher.transport()
    }

    /// Authors whose name matches `name`.
    pub async fn search_authors(&self, name: &str) -> Result<Records<AuthorSearch>> {
        let name = required("author name", name)?;
        let url = self.url(
            "citations",
            &[("view_op", "search_authors"), ("mauthors", name)],
        )?;
        self.run::<AuthorSearch>(&url).await
    }

    /// Papers matching the free-text `query`.
    pub async fn search_papers(&self, query: &str) -> Result<Records<PaperSearch>> {
        let query = required("query", query)?;
        let url = self.url("scholar", &[("q", query)])?;
        self.run::<PaperSearch>(&url).await
    }

    /// Papers citing the paper identified by `paper_id`.
    ///
    /// The id is sent unchanged; only numeric cluster ids resolve to a
    /// citation list on Scholar.
    pub async fn get_citations(&self, paper_id: &PaperId) -> Result<Records<CitationList>> {
        let id = required("paper id", paper_id.as_str())?;
        let url = self.url("scholar", &[("cites", id)])?;
        self.run::<CitationList>(&url).await
    }

    /// Publications listed on an author's profile.
    pub async fn get_publications(&self, author_id: &AuthorId) -> Result<Records<PublicationList>> {
        let url = self.profile_page(author_id)?;
        self.run::<PublicationList>(&url).await
    }

    /// Full profile of an author, including publication identifiers.
    ///
    /// `None` when the page has no profile header.
    pub async fn get_author(&self, author_id: &AuthorId) -> Result<Option<AuthorRecord>> {
        let url = self.profile_page(author_id)?;
        let profile = self.run::<AuthorProfile>(&url).await?.iter().next();
        Ok(profile.map(|mut author| {
            author.author_id.get_or_insert_with(|| author_id.clone());
            author
        }))
    }

    /// Search papers, then fetch up to `citations_per_paper` citing papers
    /// for each of the first `max_papers` results that has citations.
    ///
    /// Follow-up requests wait a pacing delay first when one is configured.
    pub async fn search_papers_with_citations(
        &self,
        query: &str,
        max_papers: usize,
        citations_per_paper: usize,
    ) -> Result<Vec<PaperWithCitations>> {
        let papers: Vec<_> = self.search_papers(query).await?.iter().take(max_papers).collect();

        let mut results = Vec::with_capacity(papers.len());
        for paper in papers {
            let citing = if paper.citations > 0 && citations_per_paper > 0 {
                self.pace().await;
                self.get_citations(&paper.id)
                    .await?
                    .iter()
                    .take(citations_per_paper)
                    .collect()
            } else {
                Vec::new()
            };
            results.push(PaperWithCitations { paper, citing });
        }

        info!(
            query,
            papers = results.len(),
            citing = results.iter().map(|r| r.citing.len()).sum::<usize>(),
            "Citation expansion complete"
        );
        Ok(results)
    }

    /// Public profile URL of an author.
    pub fn profile_url(&self, author_id: &AuthorId) -> Result<Url> {
        self.profile_page(author_id)
    }

    fn profile_page(&self, author_id: &AuthorId) -> Result<Url> {
        let id = required("author id", author_id.as_str())?;
        self.url("citations", &[("user", id)])
    }

    async fn run<P: Page>(&self, url: &Url) -> Result<Records<P>> {
        info!(page = %P::KIND, url = %url, "Starting Google Scholar query");
        let body = self.fetcher.fetch(url, &self.policy).await?;
        let records = self.parser.parse::<P>(&body)?;
        info!(page = %P::KIND, blocks = records.block_count(), "Query complete");
        Ok(records)
    }

    async fn pace(&self) {
        if let Some(pacing) = &self.pacing {
            let delay = pacing.sample();
            debug!(delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "Pacing follow-up request");
            tokio::time::sleep(delay).await;
        }
    }

    /// Build `{base}/{path}?{params}&hl={language}`.
    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| ScholarError::Config(format!("Invalid base URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("hl", &self.language);
        }

        Ok(url)
    }
}

fn required<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ScholarError::Validation(format!("{} must not be empty", what)));
    }
    Ok(value)
}
