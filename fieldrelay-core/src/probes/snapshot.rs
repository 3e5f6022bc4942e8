//! Device snapshot assembly
//!
//! Queries every probe independently and degrades each failed field to
//! `None` instead of aborting. Partial telemetry is preferred over no
//! telemetry: one dead probe must not cost the report its other fields.

use chrono::Utc;

use super::{LocationPriority, ProbeSet};
use crate::types::{BatteryStatus, DeviceIdentity, DeviceSnapshot};

/// Assemble a fresh snapshot of device state from the given probes.
pub fn assemble(probes: &ProbeSet, priority: LocationPriority) -> DeviceSnapshot {
    let device = DeviceIdentity {
        model: probes.device.model(),
        os_version: probes.device.os_version(),
    };

    let location = match probes.location.current_location(priority) {
        Ok(fix) => fix,
        Err(e) => {
            tracing::warn!(error = %e, "Location probe failed");
            None
        }
    };

    let battery = match probes.power.battery_percent() {
        Ok(percent) => {
            let charging = match probes.power.is_charging() {
                Ok(charging) => charging,
                Err(e) => {
                    tracing::warn!(error = %e, "Charging state probe failed");
                    false
                }
            };
            Some(BatteryStatus { percent, charging })
        }
        Err(e) => {
            tracing::warn!(error = %e, "Battery probe failed");
            None
        }
    };

    let wifi = match probes.network.wifi_identity() {
        Ok(wifi) => wifi,
        Err(e) => {
            tracing::warn!(error = %e, "WiFi probe failed");
            None
        }
    };

    let cell = match probes.network.cell_identity() {
        Ok(cell) => cell,
        Err(e) => {
            tracing::warn!(error = %e, "Cell probe failed");
            None
        }
    };

    DeviceSnapshot {
        device,
        location,
        battery,
        wifi,
        cell,
        taken_at: Utc::now(),
    }
}
