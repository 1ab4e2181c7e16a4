// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains the data structures shared by the services and the
//! polling pipeline, organized by their primary purpose.

mod config;
mod item;
mod selectors;

// Re-export all public types
pub use config::{Config, FetchConfig, NotifierConfig, PollConfig, SourceConfig};
pub use item::{DetailAttributes, EnrichedItem, ItemKey, RawItem, UNKNOWN, escape_markdown};
pub use selectors::{MarkupSelectors, parse_selector};
