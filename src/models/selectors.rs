// src/models/selectors.rs

//! CSS selectors for the listing and detail markup.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Selectors describing where each field lives in the catalog markup.
///
/// The markup belongs to the catalog, so the defaults track its current
/// layout and can be overridden from `[markup]` without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkupSelectors {
    /// Title heading of each listing entry
    #[serde(default = "defaults::title")]
    pub title_selector: String,

    /// Anchor wrapping the title and carrying the redirect link
    #[serde(default = "defaults::anchor")]
    pub anchor_selector: String,

    /// Release-year text following the title
    #[serde(default = "defaults::year")]
    pub year_selector: String,

    /// Label/value block on the detail page
    #[serde(default = "defaults::metadata_row")]
    pub metadata_row_selector: String,

    /// Label inside a metadata block
    #[serde(default = "defaults::metadata_label")]
    pub metadata_label_selector: String,

    /// Value inside a metadata block
    #[serde(default = "defaults::metadata_value")]
    pub metadata_value_selector: String,

    /// Document-level preview image tag
    #[serde(default = "defaults::poster")]
    pub poster_selector: String,

    /// Label text marking the audio-language row
    #[serde(default = "defaults::audio_label")]
    pub audio_label: String,
}

impl MarkupSelectors {
    /// Check that every selector parses.
    pub fn validate(&self) -> Result<()> {
        for s in [
            &self.title_selector,
            &self.anchor_selector,
            &self.year_selector,
            &self.metadata_row_selector,
            &self.metadata_label_selector,
            &self.metadata_value_selector,
            &self.poster_selector,
        ] {
            parse_selector(s)?;
        }
        Ok(())
    }
}

impl Default for MarkupSelectors {
    fn default() -> Self {
        Self {
            title_selector: defaults::title(),
            anchor_selector: defaults::anchor(),
            year_selector: defaults::year(),
            metadata_row_selector: defaults::metadata_row(),
            metadata_label_selector: defaults::metadata_label(),
            metadata_value_selector: defaults::metadata_value(),
            poster_selector: defaults::poster(),
            audio_label: defaults::audio_label(),
        }
    }
}

/// Parse a CSS selector, mapping failures into `AppError::Selector`.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

mod defaults {
    pub fn title() -> String {
        "h2.a-size-medium.a-spacing-none.a-color-base.a-text-normal".into()
    }
    pub fn anchor() -> String {
        "a.a-link-normal[href]".into()
    }
    pub fn year() -> String {
        "span.a-size-base.a-color-secondary.a-text-normal".into()
    }
    pub fn metadata_row() -> String {
        r#"[data-testid="metadata-row"]"#.into()
    }
    pub fn metadata_label() -> String {
        "dt".into()
    }
    pub fn metadata_value() -> String {
        "dd".into()
    }
    pub fn poster() -> String {
        r#"meta[property="og:image"]"#.into()
    }
    pub fn audio_label() -> String {
        "Audio languages".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selectors_parse() {
        assert!(MarkupSelectors::default().validate().is_ok());
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(parse_selector("[[invalid").is_err());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let markup = MarkupSelectors {
            year_selector: "span[".into(),
            ..MarkupSelectors::default()
        };
        assert!(matches!(
            markup.validate(),
            Err(AppError::Selector { .. })
        ));
    }
}
