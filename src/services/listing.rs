// src/services/listing.rs

//! Listing page extraction.
//!
//! Turns the catalog listing markup into raw items. Extraction never fails:
//! entries missing a title or an enclosing link are skipped, and a missing
//! year becomes `"Unknown"`.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::Result;
use crate::models::{MarkupSelectors, RawItem, UNKNOWN, parse_selector};
use crate::utils::{normalize_whitespace, resolve_url};

/// Extracts raw items from listing pages.
pub struct ListingExtractor {
    base_url: Url,
    title_sel: Selector,
    anchor_sel: Selector,
    year_sel: Selector,
}

impl ListingExtractor {
    /// Create an extractor resolving relative links against `listing_url`.
    pub fn new(listing_url: &str, markup: &MarkupSelectors) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(listing_url)?,
            title_sel: parse_selector(&markup.title_selector)?,
            anchor_sel: parse_selector(&markup.anchor_selector)?,
            year_sel: parse_selector(&markup.year_selector)?,
        })
    }

    /// Extract items in document order.
    pub fn extract(&self, html: &str) -> Vec<RawItem> {
        let document = Html::parse_document(html);

        // One pre-order walk: each year node belongs to every title before it
        // that has not been given a year yet.
        let mut titles: Vec<(ElementRef<'_>, Option<String>)> = Vec::new();
        let mut waiting_from = 0;

        for node in document.root_element().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };

            if self.title_sel.matches(&element) {
                titles.push((element, None));
            } else if self.year_sel.matches(&element) && waiting_from < titles.len() {
                let year = normalize_whitespace(&element.text().collect::<String>());
                for (_, slot) in &mut titles[waiting_from..] {
                    *slot = Some(year.clone());
                }
                waiting_from = titles.len();
            }
        }

        titles
            .into_iter()
            .filter_map(|(title, year)| self.build_item(title, year))
            .collect()
    }

    fn build_item(&self, title: ElementRef<'_>, year: Option<String>) -> Option<RawItem> {
        let name = normalize_whitespace(&title.text().collect::<String>());
        if name.is_empty() {
            return None;
        }

        let href = title
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| self.anchor_sel.matches(el))
            .and_then(|anchor| anchor.value().attr("href"))?;

        let display_year = year
            .filter(|y| !y.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Some(RawItem {
            name,
            display_year,
            redirect_url: resolve_url(&self.base_url, href),
        })
    }
}
