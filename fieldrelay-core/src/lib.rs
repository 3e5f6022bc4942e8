//! # fieldrelay-core
//!
//! Core library for fieldrelay - a device telemetry capture queue and relay
//! agent.
//!
//! This library provides:
//! - Domain types for events, device snapshots and reports
//! - A SQLite-backed event queue with at-least-once delivery semantics
//! - Probe traits over device data sources (location, power, network)
//! - The relay worker: gather → snapshot → send → commit
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Producers append events to the local queue at any time; the relay worker
//! periodically reads the queue, assembles a fresh device snapshot, submits
//! one capped report to the webhook, and deletes exactly the delivered
//! events on confirmation. Failures leave the queue untouched.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fieldrelay_core::{Config, EventStore};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open the event queue
//! let store = EventStore::open(&config.database_path()).expect("failed to open queue");
//! store.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::EventStore;
pub use error::{Error, Result};
pub use relay::{RelayWorker, ReportSink, WebhookSink};
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod format;
pub mod logging;
pub mod probes;
pub mod relay;
pub mod types;
