//! Core domain types for fieldrelay
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | One captured occurrence, queued locally until relayed |
//! | **Producer** | Any code path that appends Events to the queue |
//! | **Probe** | A narrow interface over one device data source (location, power, network) |
//! | **DeviceSnapshot** | Point-in-time device state, assembled fresh per cycle |
//! | **Report** | One snapshot plus a bounded batch of Events, rendered as text |
//! | **Cycle** | One gather → snapshot → send → commit pass of the relay worker |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free-form string-to-string payload attached to an [`Event`].
///
/// Producers put whatever shallow fields they have (`title`, `body`, ...);
/// the queue does not interpret them beyond rendering.
pub type Payload = HashMap<String, String>;

// ============================================
// Event
// ============================================

/// One captured occurrence, queued for later transmission.
///
/// Events are immutable once inserted: the store only ever reads them or
/// deletes them whole. `id` is assigned by the store and never reused,
/// `captured_at` is assigned at insertion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned identifier, monotonically increasing
    pub id: i64,
    /// Opaque producer/category name (e.g. "notifications")
    pub source: String,
    /// Shallow string map of captured fields
    pub payload: Payload,
    /// When the event was inserted into the queue
    pub captured_at: DateTime<Utc>,
}

impl Event {
    /// Convenience accessor for the conventional `title` payload field.
    pub fn title(&self) -> Option<&str> {
        self.payload.get("title").map(String::as_str)
    }

    /// Convenience accessor for the conventional `body` payload field.
    pub fn body(&self) -> Option<&str> {
        self.payload.get("body").map(String::as_str)
    }
}

// ============================================
// Device snapshot
// ============================================

/// A location fix in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
}

/// Battery charge level and charging state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Charge level in percent (0..=100)
    pub percent: i32,
    /// Whether the device is currently on external power
    pub charging: bool,
}

/// Identity of the currently associated WiFi network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiIdentity {
    pub ssid: String,
    pub bssid: String,
}

/// Identity of the serving cellular cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellIdentity {
    /// Radio technology name (e.g. "LTE")
    pub technology: String,
    pub cell_id: i64,
    pub signal_dbm: i32,
}

/// Static device identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub model: String,
    pub os_version: String,
}

/// Point-in-time device state, assembled fresh for each report.
///
/// Never persisted. Each optional field degrades to `None` independently when
/// its probe fails; partial telemetry is preferred over no telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub device: DeviceIdentity,
    pub location: Option<LocationFix>,
    pub battery: Option<BatteryStatus>,
    pub wifi: Option<WifiIdentity>,
    pub cell: Option<CellIdentity>,
    /// When this snapshot was assembled
    pub taken_at: DateTime<Utc>,
}

// ============================================
// Cycle outcome
// ============================================

/// Result of one relay cycle, returned to the host for scheduling decisions.
///
/// A cycle never panics outward; every failure mode maps to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Report submitted and the batched events removed from the queue
    Success,
    /// Submission or a storage read/delete failed; the queue is untouched
    /// and the same events will be retried at the next trigger
    Retry,
    /// A required capability is missing; the queue was never read
    PermissionDenied,
    /// The report could not be rendered after the queue was read; non-fatal,
    /// the queue and the sink are untouched
    AssembleError,
}

impl CycleOutcome {
    /// True when the host should consider the cycle's work delivered.
    pub fn is_success(self) -> bool {
        matches!(self, CycleOutcome::Success)
    }
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CycleOutcome::Success => "success",
            CycleOutcome::Retry => "retry",
            CycleOutcome::PermissionDenied => "permission-denied",
            CycleOutcome::AssembleError => "assemble-error",
        };
        f.write_str(s)
    }
}
