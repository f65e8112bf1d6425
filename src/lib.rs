//! windrose - Batch Geocoding Aggregator
//!
//! Resolves street addresses to geographic coordinates by querying
//! multiple independent geocoding providers and reconciling their
//! answers into a durable keyed store.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures (coordinates, addresses)
//! - [`source`] - Input record source and address normalization
//! - [`provider`] - Provider clients, request/response parsing
//! - [`store`] - Durable keyed result store with discrepancy tracking
//! - [`resolver`] - Rate-limited, resumable batch resolution engine
//! - [`shutdown`] - Signal capture for graceful, lossless exit
//! - [`error`] - Typed error taxonomy
//!
//! # Example
//!
//! ```no_run
//! use windrose::commands;
//! use windrose::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let outcome = commands::resolve(config).await?;
//!     std::process::exit(outcome.exit_code());
//! }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod resolver;
pub mod shutdown;
pub mod source;
pub mod store;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{FetchError, ParseError, ProviderError, SourceError, StoreError};
    pub use crate::models::{Address, Coordinate, ResolvedLocation};
    pub use crate::provider::Provider;
    pub use crate::resolver::{BatchResolver, RunOutcome};
    pub use crate::shutdown::{ShutdownCoordinator, Signal};
    pub use crate::source::{AddressMapper, AddressRecord, RecordSource};
    pub use crate::store::ResultStore;
}

// Direct re-exports for convenience
pub use models::{Address, Coordinate, ResolvedLocation};
