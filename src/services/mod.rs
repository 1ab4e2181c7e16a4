//! Service layer for the watcher.
//!
//! This module contains the business logic for:
//! - Page fetching with retries (`DocumentFetcher`)
//! - Listing extraction (`ListingExtractor`)
//! - Detail enrichment (`DetailEnricher`)
//! - Message delivery (`Notifier`)

pub mod enricher;
pub mod fetcher;
pub mod listing;
pub mod notifier;

#[cfg(test)]
pub(crate) mod testing;

pub use enricher::DetailEnricher;
pub use fetcher::{DocumentFetcher, HttpTransport, PageResponse, PageTransport, RetryPolicy};
pub use listing::ListingExtractor;
pub use notifier::{ConsoleSender, MessageSender, Notifier, SendOptions, TelegramSender};
