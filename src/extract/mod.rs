//! Document processing: page dates from metadata plus boilerplate-free prose.

pub mod clean;
pub mod dates;

use scraper::Html;
use tracing::debug;

pub use dates::UNKNOWN_DATE;

use crate::fetch::FetchedDocument;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ExtractError {
    #[error("document {0} has no HTML content")]
    EmptyContent(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedDocument {
    pub url: String,
    pub release_date: String,
    pub modified_date: String,
    pub clean_text: String,
}

impl DatedDocument {
    /// Composite `(release, modified)` label attached to every sentence of the page.
    pub fn date_label(&self) -> String {
        format!("({}, {})", self.release_date, self.modified_date)
    }
}

/// Pure function of the document's HTML: the same input always yields the
/// same `DatedDocument`.
pub fn extract(doc: &FetchedDocument) -> Result<DatedDocument, ExtractError> {
    if doc.raw_html.trim().is_empty() {
        return Err(ExtractError::EmptyContent(doc.url.clone()));
    }

    let html = Html::parse_document(&doc.raw_html);
    let page_dates = dates::page_dates(&html);
    let clean_text = clean::clean_text(&html);

    debug!(
        url = %doc.url,
        release = %page_dates.release,
        modified = %page_dates.modified,
        chars = clean_text.len(),
        "document extracted"
    );

    Ok(DatedDocument {
        url: doc.url.clone(),
        release_date: page_dates.release,
        modified_date: page_dates.modified,
        clean_text,
    })
}
