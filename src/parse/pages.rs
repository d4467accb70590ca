//! Page markers and per-block extraction.

use super::{Element, Page, PageKind, Patterns, Scope};
use crate::error::{OptionExt, ParseErrorKind};
use crate::models::{AuthorId, AuthorRecord, CitationEntry, PaperId, PaperRecord};

type Extracted<T> = Result<T, ParseErrorKind>;

/// Result list of `/citations?view_op=search_authors`.
#[derive(Debug)]
pub struct AuthorSearch;

/// Result list of `/scholar?q=`.
#[derive(Debug)]
pub struct PaperSearch;

/// Result list of `/scholar?cites=`.
#[derive(Debug)]
pub struct CitationList;

/// Publication table of `/citations?user=`.
#[derive(Debug)]
pub struct PublicationList;

/// Header, metrics and publication table of `/citations?user=`.
#[derive(Debug)]
pub struct AuthorProfile;

impl Page for AuthorSearch {
    type Record = AuthorRecord;

    const KIND: PageKind = PageKind::AuthorSearch;
    const BLOCK: &'static str = "div.gs_ai_chpr";

    fn extract(scope: &Scope<'_>, block: &Element) -> Extracted<AuthorRecord> {
        let link = scope
            .first(block, ".gs_ai_name a")?
            .filter(|l| !l.text().is_empty())
            .or_missing("author name")?;
        // Some result cards carry a name but no profile link.
        let author_id = link
            .attr("href")
            .and_then(|href| scope.patterns().user_id(href))
            .map(AuthorId::new);

        let citations = scope
            .text(block, ".gs_ai_cby")?
            .and_then(|t| scope.patterns().first_number(&t))
            .unwrap_or(0);

        Ok(AuthorRecord {
            name: link.text().to_string(),
            author_id,
            affiliation: scope.text(block, ".gs_ai_aff")?,
            citations,
            interests: texts(scope.all(block, ".gs_ai_one_int")?),
            publications: Vec::new(),
        })
    }

    fn identity(record: &AuthorRecord) -> Option<&str> {
        record.author_id.as_ref().map(AuthorId::as_str)
    }
}

impl Page for PaperSearch {
    type Record = PaperRecord;

    const KIND: PageKind = PageKind::PaperSearch;
    const BLOCK: &'static str = "div.gs_r.gs_or.gs_scl";

    fn extract(scope: &Scope<'_>, block: &Element) -> Extracted<PaperRecord> {
        extract_result(scope, block)
    }

    fn identity(record: &PaperRecord) -> Option<&str> {
        Some(record.id.as_str())
    }
}

impl Page for CitationList {
    type Record = CitationEntry;

    const KIND: PageKind = PageKind::CitationList;
    const BLOCK: &'static str = "div.gs_r.gs_or.gs_scl";

    fn extract(scope: &Scope<'_>, block: &Element) -> Extracted<CitationEntry> {
        extract_result(scope, block).map(CitationEntry)
    }

    fn identity(record: &CitationEntry) -> Option<&str> {
        Some(record.paper().id.as_str())
    }
}

/// One `div.gs_r` block of a search or citation result list.
fn extract_result(scope: &Scope<'_>, block: &Element) -> Extracted<PaperRecord> {
    let patterns = scope.patterns();

    let heading = scope.first(block, "h3.gs_rt")?.or_missing("title")?;
    let link = scope.first(&heading, "a")?;
    let raw_title = link
        .as_ref()
        .map(Element::text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| heading.text());
    let title = patterns.strip_title_tags(raw_title).trim().to_string();
    if title.is_empty() {
        return Err(ParseErrorKind::MissingField("title"));
    }

    let (authors, venue, year) = match scope.text(block, "div.gs_a")? {
        Some(byline) => split_byline(patterns, &byline),
        None => (Vec::new(), None, None),
    };

    // "Cited by N" is the only footer link carrying cites=; "All N versions"
    // carries cluster=.
    let mut citations = 0;
    let mut cites_id = None;
    let mut cluster_id = None;
    for footer_link in scope.all(block, "div.gs_fl a")? {
        let Some(href) = footer_link.attr("href") else {
            continue;
        };
        if cites_id.is_none() {
            if let Some(id) = patterns.cites_id(href) {
                citations = patterns.first_number(footer_link.text()).unwrap_or(0);
                cites_id = Some(id);
                continue;
            }
        }
        if cluster_id.is_none() {
            cluster_id = patterns.cluster_id(href);
        }
    }

    let id = cites_id
        .or(cluster_id)
        .or_else(|| block.attr("data-cid").map(str::to_string))
        .filter(|id| !id.is_empty())
        .or_missing("paper id")?;

    Ok(PaperRecord {
        id: PaperId::new(id),
        title,
        authors,
        venue,
        year,
        citations,
        url: link.and_then(|l| l.attr("href").map(str::to_string)),
        snippet: scope.text(block, "div.gs_rs")?,
    })
}

/// Split a `div.gs_a` byline, e.g.
/// `A Vaswani, N Shazeer… - Advances in neural …, 2017 - proceedings.neurips.cc`,
/// into authors, venue and year.
fn split_byline(patterns: &Patterns, byline: &str) -> (Vec<String>, Option<String>, Option<u16>) {
    let mut parts = byline.split(" - ");
    let authors = parts.next().map(split_names).unwrap_or_default();

    let (venue, year) = match parts.next().map(str::trim) {
        Some(segment) => match patterns.year(segment) {
            Some((year, start)) => {
                let venue = segment[..start].trim().trim_end_matches(',').trim();
                (non_empty(venue), Some(year))
            }
            None => (non_empty(segment), None),
        },
        None => (None, None),
    };

    (authors, venue, year)
}

impl Page for PublicationList {
    type Record = PaperRecord;

    const KIND: PageKind = PageKind::PublicationList;
    const BLOCK: &'static str = "tr.gsc_a_tr";

    fn extract(scope: &Scope<'_>, block: &Element) -> Extracted<PaperRecord> {
        let patterns = scope.patterns();

        let title_link = scope
            .first(block, "a.gsc_a_at")?
            .filter(|l| !l.text().is_empty())
            .or_missing("title")?;
        let citation_cell = scope
            .first(block, "td.gsc_a_c")?
            .or_missing("citation count")?;

        // The count link is empty for uncited papers.
        let citations = patterns.first_number(citation_cell.text()).unwrap_or(0);
        let cites_id = scope
            .first(&citation_cell, "a")?
            .and_then(|a| a.attr("href").and_then(|h| patterns.cites_id(h)));
        let id = cites_id
            .or_else(|| {
                title_link
                    .attr("href")
                    .and_then(|h| patterns.view_id(h))
            })
            .or_missing("paper id")?;

        let gray = scope.all(block, ".gs_gray")?;
        let authors = gray
            .first()
            .map(|e| split_names(e.text()))
            .unwrap_or_default();
        let venue = gray
            .get(1)
            .and_then(|e| non_empty(patterns.strip_trailing_year(e.text())));
        let year = scope
            .text(block, "td.gsc_a_y")?
            .and_then(|t| patterns.year(&t))
            .map(|(year, _)| year);

        Ok(PaperRecord {
            id: PaperId::new(id),
            title: title_link.text().to_string(),
            authors,
            venue,
            year,
            citations,
            url: None,
            snippet: None,
        })
    }

    fn identity(record: &PaperRecord) -> Option<&str> {
        Some(record.id.as_str())
    }
}

impl Page for AuthorProfile {
    type Record = AuthorRecord;

    const KIND: PageKind = PageKind::AuthorProfile;
    const BLOCK: &'static str = "div#gsc_bdy";

    fn extract(scope: &Scope<'_>, block: &Element) -> Extracted<AuthorRecord> {
        let patterns = scope.patterns();
        let name = scope.text(block, "#gsc_prf_in")?.or_missing("author name")?;

        // First cell of the metrics table is "Citations / All".
        let citations = scope
            .first(block, "td.gsc_rsb_std")?
            .and_then(|cell| patterns.first_number(cell.text()))
            .unwrap_or(0);

        let author_id = scope
            .all(block, "a.gsc_a_at")?
            .iter()
            .filter_map(|a| a.attr("href").and_then(|h| patterns.view_id(h)))
            .find_map(|view| view.split_once(':').map(|(user, _)| AuthorId::new(user)));

        let mut publications: Vec<PaperId> = Vec::new();
        for row in scope.all(block, PublicationList::BLOCK)? {
            if let Ok(paper) = PublicationList::extract(scope, &row) {
                if !publications.contains(&paper.id) {
                    publications.push(paper.id);
                }
            }
        }

        Ok(AuthorRecord {
            name,
            author_id,
            affiliation: scope.text(block, ".gsc_prf_il")?,
            citations,
            interests: texts(scope.all(block, "#gsc_prf_int a")?),
            publications,
        })
    }
}

/// Comma-separated author names, minus truncation ellipses.
fn split_names(text: &str) -> Vec<String> {
    text.split(',')
        .map(|name| name.trim().trim_end_matches('…').trim_end_matches("...").trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn texts(elements: Vec<Element>) -> Vec<String> {
    elements
        .into_iter()
        .map(|e| e.text().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
