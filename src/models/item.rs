//! Catalog item data structures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder for any field the markup did not provide.
pub const UNKNOWN: &str = "Unknown";

/// An entry scraped from the listing page, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    /// Display title
    pub name: String,

    /// Release year as shown on the listing, or `UNKNOWN`
    pub display_year: String,

    /// Absolute redirect link wrapping the detail page
    pub redirect_url: String,
}

impl RawItem {
    /// Dedup identity of this entry.
    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.name, &self.display_year)
    }
}

/// Dedup identity: `"{name} ({year})"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(name: &str, display_year: &str) -> Self {
        Self(format!("{name} ({display_year})"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secondary attributes read from the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailAttributes {
    pub audio_languages: String,
    pub poster_url: String,
}

impl Default for DetailAttributes {
    fn default() -> Self {
        Self {
            audio_languages: UNKNOWN.to_string(),
            poster_url: UNKNOWN.to_string(),
        }
    }
}

/// A newly discovered item, ready to announce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedItem {
    pub name: String,
    pub display_year: String,
    pub canonical_link: String,
    pub audio_languages: String,
    pub poster_url: String,
}

impl EnrichedItem {
    pub fn new(raw: RawItem, canonical_link: String, details: DetailAttributes) -> Self {
        Self {
            name: raw.name,
            display_year: raw.display_year,
            canonical_link,
            audio_languages: details.audio_languages,
            poster_url: details.poster_url,
        }
    }

    /// Format the item for display using a template.
    ///
    /// Supported placeholders: `{name}`, `{year}`, `{link}`, `{audio}`,
    /// `{poster}`. Free-text fields are escaped for Telegram's legacy
    /// Markdown; links are inserted verbatim. Substitution is a single pass,
    /// so braces inside field values are never expanded. Template lines that
    /// reference `{poster}` are left out when no poster was found.
    pub fn format(&self, template: &str) -> String {
        let has_poster = self.poster_url != UNKNOWN;
        template
            .split('\n')
            .filter(|line| has_poster || !line.contains("{poster}"))
            .map(|line| self.substitute(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn substitute(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len() + 64);
        let mut rest = line;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let field = tail
                .find('}')
                .and_then(|end| self.field(&tail[1..end]).map(|value| (end, value)));
            match field {
                Some((end, value)) => {
                    out.push_str(&value);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn field(&self, placeholder: &str) -> Option<String> {
        match placeholder {
            "name" => Some(escape_markdown(&self.name)),
            "year" => Some(escape_markdown(&self.display_year)),
            "link" => Some(self.canonical_link.clone()),
            "audio" => Some(escape_markdown(&self.audio_languages)),
            "poster" => Some(self.poster_url.clone()),
            _ => None,
        }
    }
}

/// Escape the characters legacy Markdown treats as entity delimiters.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
