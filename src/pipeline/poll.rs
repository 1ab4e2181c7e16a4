// src/pipeline/poll.rs

//! Poll orchestrator.
//!
//! One cycle: fetch the listing, extract items, and for each item
//! canonicalize, filter, enrich and notify. Cycles repeat with a fixed pause
//! until cancelled. A listing that cannot be fetched costs one cycle and is
//! retried after the failure delay.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Config, EnrichedItem, PollConfig};
use crate::pipeline::dedup::SeenSet;
use crate::pipeline::tracker::{RequestTracker, Service, spawn_snapshot_logger};
use crate::services::{
    DetailEnricher, DocumentFetcher, ListingExtractor, Notifier, PageTransport, RetryPolicy,
};
use crate::utils::canonicalize_with_host;

/// Outcome of a single cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Whether the listing page was fetched at all
    pub listing_available: bool,
    /// Items found on the listing
    pub extracted: usize,
    /// Items whose redirect carried no usable destination
    pub dropped: usize,
    /// Items already processed earlier in this run
    pub already_seen: usize,
    /// Items announced successfully
    pub notified: usize,
    /// Items whose announcement failed (not retried)
    pub notify_failed: usize,
}

impl CycleReport {
    fn unavailable() -> Self {
        Self::default()
    }

    pub fn new_items(&self) -> usize {
        self.notified + self.notify_failed
    }
}

/// Drives the detection pipeline.
pub struct Poller {
    listing_url: String,
    canonical_host: String,
    timing: PollConfig,
    fetcher: Arc<DocumentFetcher>,
    extractor: ListingExtractor,
    enricher: DetailEnricher,
    notifier: Notifier,
    seen: SeenSet,
    tracker: RequestTracker,
}

impl Poller {
    /// Assemble a poller around a page transport and a notifier.
    ///
    /// The tracker should be the same one the notifier reports to.
    pub fn new(
        config: &Config,
        transport: Arc<dyn PageTransport>,
        notifier: Notifier,
        tracker: RequestTracker,
    ) -> Result<Self> {
        let fetcher = Arc::new(DocumentFetcher::new(
            transport,
            tracker.clone(),
            RetryPolicy::from(&config.fetch),
        ));
        let extractor = ListingExtractor::new(&config.source.listing_url, &config.markup)?;
        let enricher = DetailEnricher::new(Arc::clone(&fetcher), &config.markup)?;

        Ok(Self {
            listing_url: config.source.listing_url.clone(),
            canonical_host: config.source.canonical_host.clone(),
            timing: config.poll.clone(),
            fetcher,
            extractor,
            enricher,
            notifier,
            seen: SeenSet::new(),
            tracker,
        })
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Run one detection cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let html = match self
            .fetcher
            .fetch(Service::ListingSource, &self.listing_url)
            .await
        {
            Ok(html) => html,
            Err(error) if error.is_transient() => {
                log::warn!("Listing unavailable this cycle: {}", error);
                return Ok(CycleReport::unavailable());
            }
            // Retrying cannot help, e.g. the listing URL has an unsupported scheme
            Err(error) => return Err(error),
        };

        let items = self.extractor.extract(&html);
        let mut report = CycleReport {
            listing_available: true,
            extracted: items.len(),
            ..CycleReport::default()
        };
        log::debug!("Extracted {} items from listing", items.len());

        for raw in items {
            let Some(link) = canonicalize_with_host(&raw.redirect_url, &self.canonical_host)
            else {
                log::debug!("No detail link in redirect for {}", raw.name);
                report.dropped += 1;
                continue;
            };

            if !self.seen.check_and_mark(raw.key()) {
                report.already_seen += 1;
                continue;
            }

            log::info!("New item: {}", raw.key());
            let details = self.enricher.enrich(&link).await;
            let item = EnrichedItem::new(raw, link, details);

            if self.notifier.notify(&item).await {
                report.notified += 1;
            } else {
                report.notify_failed += 1;
            }
        }

        Ok(report)
    }

    /// Poll until `shutdown` is cancelled or a cycle fails unexpectedly.
    ///
    /// The snapshot logger runs alongside and is always cancelled and joined
    /// before this returns.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        let snapshot_token = shutdown.child_token();
        let snapshot_task = spawn_snapshot_logger(
            self.tracker.clone(),
            self.timing.snapshot_interval(),
            snapshot_token.clone(),
        );

        log::info!("Watching {}", self.listing_url);
        let outcome = self.poll_loop(&shutdown).await;

        snapshot_token.cancel();
        if let Err(error) = snapshot_task.await {
            if !error.is_cancelled() {
                log::error!("Snapshot logger ended abnormally: {}", error);
            }
        }

        match &outcome {
            Ok(()) => log::info!("Watcher stopped ({} items seen)", self.seen.len()),
            Err(error) => log::error!("Watcher halted: {}", error),
        }
        outcome
    }

    async fn poll_loop(&mut self, shutdown: &CancellationToken) -> Result<()> {
        loop {
            let report = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                report = self.run_cycle() => report?,
            };

            let delay = if report.listing_available {
                log::info!(
                    "Cycle done: {} listed, {} new, {} notified, {} failed, {} dropped",
                    report.extracted,
                    report.new_items(),
                    report.notified,
                    report.notify_failed,
                    report.dropped
                );
                self.timing.interval()
            } else {
                self.timing.failure_delay()
            };

            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
