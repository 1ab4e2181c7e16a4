//! release-watch CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use release_watch::{
    error::Result,
    models::Config,
    pipeline::{Poller, RequestTracker, format_snapshot},
    services::{HttpTransport, Notifier},
    utils::canonicalize_with_host,
};
use tokio_util::sync::CancellationToken;

/// release-watch - Catalog listing watcher
#[derive(Parser, Debug)]
#[command(
    name = "release-watch",
    version,
    about = "Announces titles newly added to a streaming catalog"
)]

struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log messages instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the listing until interrupted
    Run,

    /// Run a single cycle and print the request state
    Once,

    /// Validate configuration and notifier credentials
    Validate,

    /// Print the canonical detail link for a listing redirect URL
    Canonicalize {
        /// Redirect URL as found on the listing page
        url: String,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        log::warn!(
            "No config at {}, using defaults.",
            cli.config.display()
        );
        Config::default()
    };
    config.apply_env();
    if cli.dry_run {
        config.notifier.dry_run = true;
    }

    match cli.command {
        Command::Run => {
            let poller = build_poller(&config)?;
            let shutdown = CancellationToken::new();

            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Interrupt received, shutting down...");
                }
                signal_token.cancel();
            });

            poller.run(shutdown).await?;
        }

        Command::Once => {
            let mut poller = build_poller(&config)?;
            let report = poller.run_cycle().await?;

            if report.listing_available {
                log::info!(
                    "Listed {}, new {}, notified {}, failed {}, dropped {}",
                    report.extracted,
                    report.new_items(),
                    report.notified,
                    report.notify_failed,
                    report.dropped
                );
            } else {
                log::warn!("Listing was unavailable.");
            }
            for line in format_snapshot(&poller.tracker().snapshot()) {
                log::info!("[state] {line}");
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (source, fetch, poll, markup)");

            if let Err(e) = Notifier::from_config(&config.notifier, RequestTracker::new()) {
                log::error!("Notifier setup failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Notifier OK");

            log::info!("All validations passed!");
        }

        Command::Canonicalize { url } => {
            match canonicalize_with_host(&url, &config.source.canonical_host) {
                Some(link) => println!("{link}"),
                None => log::warn!("No detail link could be derived from {}", url),
            }
        }
    }

    Ok(())
}

/// Wire the poller from configuration. Fails fast on a broken setup.
fn build_poller(config: &Config) -> Result<Poller> {
    config.validate()?;

    let tracker = RequestTracker::new();
    let notifier = Notifier::from_config(&config.notifier, tracker.clone())?;
    let transport = Arc::new(HttpTransport::from_config(&config.source)?);

    if let Some(proxy) = &config.source.proxy {
        log::info!("Routing page requests through proxy {}", redact(proxy));
    }

    Poller::new(config, transport, notifier, tracker)
}

/// Hide proxy credentials in log output.
fn redact(proxy: &str) -> String {
    match url::Url::parse(proxy) {
        Ok(mut parsed) if !parsed.username().is_empty() => {
            let _ = parsed.set_username("***");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<invalid>".to_string(),
    }
}
