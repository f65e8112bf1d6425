//! Batch resolution engine
//!
//! Drives the record source one record at a time, fans each record
//! out to the configured providers, merges answers into the result
//! store, throttles work into bursts with an enforced cooldown,
//! checkpoints the store at burst boundaries, and drains cleanly
//! when a shutdown signal is observed. Deliberately sequential: no
//! two records (and no two provider calls) are ever in flight at
//! once.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ResolverConfig;
use crate::models::ResolvedLocation;
use crate::provider::Provider;
use crate::shutdown::{ShutdownCoordinator, Signal};
use crate::source::{AddressMapper, AddressRecord, RecordSource};
use crate::store::ResultStore;

/// How a run ended, with the count of newly processed records.
///
/// Records fully satisfied by a preloaded store contribute nothing
/// to the count, so a resumed run reports only the work it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Record source exhausted.
    Completed { processed: usize },
    /// Shutdown signal observed between records.
    Interrupted { signal: Signal, processed: usize },
}

impl RunOutcome {
    pub fn processed(&self) -> usize {
        match self {
            Self::Completed { processed } | Self::Interrupted { processed, .. } => *processed,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => 0,
            Self::Interrupted { .. } => 1,
        }
    }
}

/// The batch orchestrator. Sole owner of the result store and the
/// store file for the duration of a run.
pub struct BatchResolver {
    providers: Vec<Box<dyn Provider>>,
    store: ResultStore,
    store_path: PathBuf,
    mapper: AddressMapper,
    shutdown: ShutdownCoordinator,
    burst_size: usize,
    cooldown: Duration,
    counter: usize,
}

impl BatchResolver {
    pub fn new(
        config: &ResolverConfig,
        providers: Vec<Box<dyn Provider>>,
        store: ResultStore,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        Self {
            providers,
            store,
            store_path: config.store.clone(),
            mapper: AddressMapper::default(),
            shutdown,
            burst_size: config.burst_size.max(1),
            cooldown: Duration::from_millis(config.cooldown_ms),
            counter: 0,
        }
    }

    /// Resolve every record in the source, one at a time.
    ///
    /// The shutdown flag is polled strictly before each record is
    /// started, so a record already dispatched to providers always
    /// runs to completion; per-provider state is written to the
    /// store immediately after each provider call. On both
    /// completion and drain, the store is saved a final time.
    pub async fn run(&mut self, source: &mut RecordSource) -> Result<RunOutcome> {
        loop {
            if let Some(signal) = self.shutdown.triggered() {
                tracing::warn!(signal = %signal, "Received shutdown signal, exiting now");
                self.save_work()?;
                return Ok(RunOutcome::Interrupted {
                    signal,
                    processed: self.counter,
                });
            }

            let Some(record) = source.next_record()? else {
                break;
            };

            let accounted = self.process_record(&record).await;
            if accounted {
                self.counter += 1;

                // Burst boundary: cooldown, then checkpoint. Only
                // the accounting transition triggers it, so a run of
                // already-resolved records never re-fires the same
                // boundary.
                if self.counter % self.burst_size == 0 {
                    tracing::info!(
                        cooldown_ms = self.cooldown.as_millis() as u64,
                        "Cooling down between bursts"
                    );
                    tokio::time::sleep(self.cooldown).await;
                    self.save_work()?;
                }
            }
        }

        tracing::info!(processed = self.counter, "Processed new entries");
        self.save_work()?;
        Ok(RunOutcome::Completed {
            processed: self.counter,
        })
    }

    /// Resolve one record against every provider that has not
    /// already answered for it. Returns whether any provider call
    /// was actually made.
    async fn process_record(&mut self, record: &AddressRecord) -> bool {
        let id = record.id();
        let address = self.mapper.normalize(record).to_string();

        tracing::info!(id = %id, address = %address, "Resolving address");

        let mut accounted = false;
        for provider in &self.providers {
            let tag = provider.tag();

            if self.store.is_resolved(id, tag) {
                tracing::info!(id = %id, provider = %tag, "Noop, already resolved");
                continue;
            }
            accounted = true;

            let result = match provider.resolve(&address).await {
                Ok(candidates) => {
                    // Head of the ranked list; ranking policy belongs
                    // to the response parser.
                    candidates
                        .into_iter()
                        .next()
                        .map(|coordinate| ResolvedLocation {
                            address: address.clone(),
                            coordinate,
                        })
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %tag,
                        address = %address,
                        error = %e,
                        "Provider failed to resolve"
                    );
                    None
                }
            };

            match &result {
                Some(location) => {
                    tracing::info!(provider = %tag, location = %location, "Provider reported")
                }
                None => tracing::info!(provider = %tag, "Provider reported no result"),
            }

            self.store.set_result(id, tag, result);
        }

        accounted
    }

    fn save_work(&self) -> Result<()> {
        tracing::info!(
            store = %self.store_path.display(),
            entries = self.store.len(),
            "Saving work so far"
        );
        self.store
            .save(&self.store_path)
            .with_context(|| format!("Failed to save store to {}", self.store_path.display()))
    }

    /// Newly processed records so far this run.
    pub fn processed(&self) -> usize {
        self.counter
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }
}
