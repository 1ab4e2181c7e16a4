// src/services/enricher.rs

//! Detail page enrichment.

use std::sync::Arc;

use scraper::{Html, Selector};

use crate::error::Result;
use crate::models::{DetailAttributes, MarkupSelectors, UNKNOWN, parse_selector};
use crate::pipeline::tracker::Service;
use crate::services::fetcher::DocumentFetcher;

/// Reads audio languages and the poster image from detail pages.
pub struct DetailEnricher {
    fetcher: Arc<DocumentFetcher>,
    row_sel: Selector,
    label_sel: Selector,
    value_sel: Selector,
    poster_sel: Selector,
    audio_label: String,
}

impl DetailEnricher {
    pub fn new(fetcher: Arc<DocumentFetcher>, markup: &MarkupSelectors) -> Result<Self> {
        Ok(Self {
            fetcher,
            row_sel: parse_selector(&markup.metadata_row_selector)?,
            label_sel: parse_selector(&markup.metadata_label_selector)?,
            value_sel: parse_selector(&markup.metadata_value_selector)?,
            poster_sel: parse_selector(&markup.poster_selector)?,
            audio_label: markup.audio_label.clone(),
        })
    }

    /// Fetch the detail page and extract its attributes.
    ///
    /// A page that cannot be fetched degrades to `("Unknown", "Unknown")`.
    pub async fn enrich(&self, canonical_link: &str) -> DetailAttributes {
        match self.fetcher.fetch(Service::DetailSource, canonical_link).await {
            Ok(html) => self.extract_details(&html),
            Err(error) => {
                log::warn!("Detail page unavailable, using placeholders: {}", error);
                DetailAttributes::default()
            }
        }
    }

    /// Extract the attributes from detail markup. Each field defaults on its own.
    pub fn extract_details(&self, html: &str) -> DetailAttributes {
        let document = Html::parse_document(html);

        let audio_languages = document
            .select(&self.row_sel)
            .find_map(|row| {
                let label: String = row.select(&self.label_sel).next()?.text().collect();
                if !label.contains(&self.audio_label) {
                    return None;
                }
                let value: String = row.select(&self.value_sel).next()?.text().collect();
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            })
            .unwrap_or_else(|| UNKNOWN.to_string());

        let poster_url = document
            .select(&self.poster_sel)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map_or_else(|| UNKNOWN.to_string(), str::to_string);

        DetailAttributes {
            audio_languages,
            poster_url,
        }
    }
}
