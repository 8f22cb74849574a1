//! # flight-sync
//!
//! Periodic flight schedule reconciliation between two SQL Server databases.
//!
//! Each run reads a sector-date window of flight legs from the operational
//! source, reshapes them into the target's canonical record, diffs them
//! against what the target already holds, and writes the result:
//!
//! - **Inserts** for keys the target has never seen, via TDS bulk load
//! - **Updates** for keys whose tracked fields changed, bulk loaded into a
//!   staging table and merged in one transaction
//! - **Crew counts** joined in from a separate aggregate query
//!
//! ## Example
//!
//! ```rust,no_run
//! use flight_sync::{Config, SyncOrchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> flight_sync::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = SyncOrchestrator::new(&config)?;
//!     let summary = orchestrator.run_once(&CancellationToken::new()).await?;
//!     println!("{} inserted, {} updated", summary.inserted, summary.updated);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crew;
pub mod db;
pub mod error;
pub mod index;
pub mod notify;
pub mod orchestrator;
pub mod reconcile;
pub mod record;
pub mod scheduler;
pub mod source;
pub mod target;
pub mod transform;
pub mod value;

pub use config::Config;
pub use error::{Result, SyncError, TransformError};
pub use notify::{LogNotifier, Notifier, WebhookNotifier};
pub use orchestrator::{SyncOrchestrator, SyncSummary, SyncWindow};
pub use record::{ActionCode, FlightKey, FlightRecord};
pub use scheduler::Scheduler;
pub use source::{MssqlSource, SourceStore};
pub use target::{BulkWriter, MssqlTarget, TargetStore};
