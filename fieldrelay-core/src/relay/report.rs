//! Report building and rendering
//!
//! A report is one device snapshot plus a bounded batch of queued events,
//! rendered as Markdown-flavored text for the webhook. Reports are built,
//! sent and discarded; they are never persisted.

use crate::format::format_clock_time;
use crate::types::{DeviceSnapshot, Event};

/// Marker rendered for snapshot fields whose probe produced nothing.
pub const UNAVAILABLE: &str = "unavailable";

/// One cycle's submission: snapshot plus the oldest events up to the cap.
pub struct Report {
    pub snapshot: DeviceSnapshot,
    /// Batched events in stored order, already truncated to the cap
    pub events: Vec<Event>,
}

impl Report {
    /// Build a report from the full pending queue, taking the oldest `cap`
    /// events. Events beyond the cap stay queued for the next cycle.
    pub fn build(snapshot: DeviceSnapshot, pending: &[Event], cap: usize) -> Self {
        let events = pending.iter().take(cap).cloned().collect();
        Self { snapshot, events }
    }

    /// Ids of exactly the events included in this report.
    ///
    /// This is the delete set after a confirmed submission - never the full
    /// pending queue.
    pub fn batch_ids(&self) -> Vec<i64> {
        self.events.iter().map(|e| e.id).collect()
    }

    /// Render the report as webhook text.
    pub fn render(&self, device_name: &str) -> String {
        let mut out = String::new();

        out.push_str(&format!("📱 *{}*\n\n", device_name));

        out.push_str("📍 *Location*:\n");
        match self.snapshot.location {
            Some(fix) => {
                out.push_str(&format!("- Latitude: {}\n", fix.latitude));
                out.push_str(&format!("- Longitude: {}\n", fix.longitude));
                out.push_str(&format!(
                    "- [View on map](https://maps.google.com/?q={},{})\n",
                    fix.latitude, fix.longitude
                ));
            }
            None => {
                out.push_str(&format!("- Latitude: {}\n", UNAVAILABLE));
                out.push_str(&format!("- Longitude: {}\n", UNAVAILABLE));
            }
        }
        out.push('\n');

        match self.snapshot.battery {
            Some(battery) => {
                let power = if battery.charging {
                    "charging"
                } else {
                    "on battery"
                };
                out.push_str(&format!(
                    "🔋 *Battery*: {}% ({})\n\n",
                    battery.percent, power
                ));
            }
            None => out.push_str(&format!("🔋 *Battery*: {}\n\n", UNAVAILABLE)),
        }

        out.push_str("📶 *Network*:\n");
        match &self.snapshot.wifi {
            Some(wifi) => out.push_str(&format!("- WiFi: {} ({})\n", wifi.ssid, wifi.bssid)),
            None => out.push_str(&format!("- WiFi: {}\n", UNAVAILABLE)),
        }
        match &self.snapshot.cell {
            Some(cell) => out.push_str(&format!(
                "- Cell: {} cell {} at {} dBm\n",
                cell.technology, cell.cell_id, cell.signal_dbm
            )),
            None => out.push_str(&format!("- Cell: {}\n", UNAVAILABLE)),
        }
        out.push('\n');

        out.push_str("⚙️ *Device*:\n");
        out.push_str(&format!("- Model: {}\n", self.snapshot.device.model));
        out.push_str(&format!("- OS: {}\n", self.snapshot.device.os_version));

        if !self.events.is_empty() {
            out.push_str("\n🔔 *Recent events*:\n");
            for event in &self.events {
                out.push_str(&format!(
                    "\n`[{}] {}`\n",
                    format_clock_time(event.captured_at),
                    event.source
                ));
                if let Some(title) = event.title().map(str::trim).filter(|t| !t.is_empty()) {
                    out.push_str(&format!("*{}*\n", title));
                }
                if let Some(body) = event.body().map(str::trim).filter(|b| !b.is_empty()) {
                    out.push_str(&format!("_{}_\n", body));
                }
            }
        }

        out
    }
}
