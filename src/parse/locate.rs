//! Marker lookup: find the elements of a body that match a CSS selector.

use crate::error::ParseErrorKind;
use scraper::{ElementRef, Html, Selector};

/// A located element, detached from the document it came from.
///
/// `html` is the element's outer HTML, so the element can itself be passed
/// back to [`Locate::locate`] as a body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    html: String,
    text: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(
        html: impl Into<String>,
        text: impl Into<String>,
        attrs: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            html: html.into(),
            text: text.into(),
            attrs: attrs.into_iter().collect(),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Text content with whitespace runs collapsed to single spaces.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Capability to find elements in a piece of HTML.
pub trait Locate: Send + Sync {
    /// All elements of `body` matching `selector`, in document order.
    fn locate(&self, body: &str, selector: &str) -> Result<Vec<Element>, ParseErrorKind>;
}

/// [`Locate`] backed by `scraper`'s HTML5 parser and CSS selectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLocator;

impl Locate for HtmlLocator {
    fn locate(&self, body: &str, css: &str) -> Result<Vec<Element>, ParseErrorKind> {
        let selector = Selector::parse(css).map_err(|e| {
            ParseErrorKind::UnexpectedLayout(format!("invalid selector '{}': {}", css, e))
        })?;
        let markup = parse_markup(body);
        Ok(markup.select(&selector).map(detach).collect())
    }
}

/// Parse a full page as a document and anything else as a fragment.
///
/// Table rows and cells are wrapped in the table context HTML5 requires,
/// otherwise the parser drops their tags.
fn parse_markup(body: &str) -> Html {
    let head = body.trim_start();
    let lead = head.get(..9).unwrap_or(head).to_ascii_lowercase();

    if lead.starts_with("<!doctype") || lead.starts_with("<html") {
        return Html::parse_document(body);
    }

    if lead.starts_with("<tr") {
        Html::parse_fragment(&format!("<table><tbody>{}</tbody></table>", body))
    } else if lead.starts_with("<td") || (lead.starts_with("<th") && !is_section_tag(&lead)) {
        Html::parse_fragment(&format!("<table><tbody><tr>{}</tr></tbody></table>", body))
    } else if is_section_tag(&lead) {
        Html::parse_fragment(&format!("<table>{}</table>", body))
    } else {
        Html::parse_fragment(body)
    }
}

fn is_section_tag(lead: &str) -> bool {
    ["<thead", "<tbody", "<tfoot"]
        .iter()
        .any(|tag| lead.starts_with(tag))
}

fn detach(element: ElementRef<'_>) -> Element {
    Element {
        html: element.html(),
        text: collapse_whitespace(&element.text().collect::<String>()),
        attrs: element
            .value()
            .attrs()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
