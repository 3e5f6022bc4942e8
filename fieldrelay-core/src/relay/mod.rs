//! Report relay
//!
//! Local-first by construction: producers append events to the SQLite queue
//! and nothing else; relaying happens on a schedule (or on demand) and a
//! failed submission leaves the queue exactly as it found it. Events are
//! deleted only after the remote confirms the report that contained them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fieldrelay_core::config::RelayConfig;
//! use fieldrelay_core::db::EventStore;
//! use fieldrelay_core::probes::host::{AllowAll, NoRadios, StaticDeviceInfo, SysfsPowerProbe};
//! use fieldrelay_core::probes::ProbeSet;
//! use fieldrelay_core::relay::{RelayWorker, WebhookSink};
//!
//! # fn run(config: RelayConfig) -> fieldrelay_core::Result<()> {
//! let store = Arc::new(EventStore::open_in_memory()?);
//! store.migrate()?;
//!
//! let probes = ProbeSet {
//!     location: Box::new(NoRadios),
//!     power: Box::new(SysfsPowerProbe),
//!     network: Box::new(NoRadios),
//!     device: Box::new(StaticDeviceInfo::detect()),
//!     permissions: Box::new(AllowAll),
//! };
//!
//! let sink = WebhookSink::new(&config)?;
//! let worker = Arc::new(RelayWorker::new(store, probes, Box::new(sink), &config));
//! # Ok(())
//! # }
//! ```

mod report;
mod sink;
mod worker;

pub use report::{Report, UNAVAILABLE};
pub use sink::{ReportSink, WebhookSink};
pub use worker::RelayWorker;
