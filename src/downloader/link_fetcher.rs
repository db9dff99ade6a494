use crate::auth::Session;
use crate::constants::{ANCHOR_SELECTOR, CHECKSUM_EXTENSIONS, DATA_EXTENSIONS};
use crate::errors::{AppResult, DiscoveryError};
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::info;

/// Cached CSS selector for anchors carrying an `href`.
/// Compiled once at initialization for performance.
static ANCHOR_SELECTOR_CACHED: OnceLock<Selector> = OnceLock::new();

/// Links scraped from one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLinks {
    pub checksum_url: String,
    pub data_urls: BTreeSet<String>,
}

/// Fetches the listing page and discovers its checksum manifest and data files.
///
/// # Errors
///
/// Returns an error if the page cannot be fetched or carries no checksum manifest link.
pub async fn fetch_listing(session: &Session, base_url: &str) -> AppResult<ListingLinks> {
    info!(base_url, "Fetching listing page");
    let html = session.fetch_text(base_url).await?;

    let checksum_url = discover_checksum_link(&html, base_url)?;
    let data_urls = discover_data_links(&html, base_url);
    info!(
        data_files = data_urls.len(),
        checksum_url = %checksum_url,
        "Listing page parsed"
    );

    Ok(ListingLinks {
        checksum_url,
        data_urls,
    })
}

/// Returns the deduplicated absolute URLs of every data file on the listing page.
///
/// An anchor is a data link if its `href` contains one of [`DATA_EXTENSIONS`].
/// The set iterates in sorted order.
pub fn discover_data_links(html: &str, base_url: &str) -> BTreeSet<String> {
    hrefs(html)
        .into_iter()
        .filter(|href| contains_any(href, DATA_EXTENSIONS))
        .map(|href| absolute_url(base_url, &href))
        .collect()
}

/// Returns the absolute URL of the first checksum manifest link in document order.
///
/// # Errors
///
/// Returns [`DiscoveryError::NotFound`] if no `href` contains one of [`CHECKSUM_EXTENSIONS`].
pub fn discover_checksum_link(html: &str, base_url: &str) -> Result<String, DiscoveryError> {
    hrefs(html)
        .into_iter()
        .find(|href| contains_any(href, CHECKSUM_EXTENSIONS))
        .map(|href| absolute_url(base_url, &href))
        .ok_or(DiscoveryError::NotFound)
}

fn hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let selector = ANCHOR_SELECTOR_CACHED.get_or_init(|| {
        Selector::parse(ANCHOR_SELECTOR).expect("ANCHOR_SELECTOR is a valid CSS selector")
    });

    document
        .select(selector)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_string)
        .collect()
}

fn contains_any(href: &str, extensions: &[&str]) -> bool {
    extensions.iter().any(|ext| href.contains(ext))
}

/// Joins a listing URL and a relative file name with a single `/`.
///
/// Listing hrefs are bare file names, so this is plain concatenation rather than
/// RFC 3986 resolution.
fn absolute_url(base_url: &str, href: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), href)
}
