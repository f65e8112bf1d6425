//! Batch resolve command
//!
//! Wires configuration into the running pieces: one shared HTTP
//! transport, the enabled providers, the (possibly preloaded)
//! result store, the shutdown coordinator, and the batch resolver.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::provider::{self, HttpTransport};
use crate::resolver::{BatchResolver, RunOutcome};
use crate::shutdown::ShutdownCoordinator;
use crate::source::RecordSource;
use crate::store::ResultStore;

pub async fn resolve(config: Config) -> Result<RunOutcome> {
    config.validate().context("Invalid configuration")?;

    let transport = Arc::new(
        HttpTransport::new(&config.http).context("Failed to create HTTP transport")?,
    );
    let providers = provider::from_config(&config.providers, &transport);

    tracing::info!(
        providers = providers.len(),
        input = %config.resolver.input.display(),
        store = %config.resolver.store.display(),
        preload = config.resolver.preload,
        burst_size = config.resolver.burst_size,
        cooldown_ms = config.resolver.cooldown_ms,
        "Starting batch resolution"
    );

    // A malformed store file must abort here, before any provider
    // call is made.
    let store = ResultStore::open(&config.resolver.store, config.resolver.preload)
        .context("Failed to open results store")?;

    let mut source = RecordSource::open(&config.resolver.input)
        .context("Failed to open record source")?;

    let shutdown = ShutdownCoordinator::new();
    shutdown.install();

    let mut resolver = BatchResolver::new(&config.resolver, providers, store, shutdown);
    let outcome = resolver.run(&mut source).await?;

    match outcome {
        RunOutcome::Completed { processed } => {
            println!("Processed {processed} new entries");
        }
        RunOutcome::Interrupted { signal, processed } => {
            println!("Interrupted by {signal} after {processed} new entries; work saved");
        }
    }

    Ok(outcome)
}
