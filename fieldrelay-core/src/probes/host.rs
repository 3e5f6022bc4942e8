//! Host-backed probe implementations for headless deployments.
//!
//! These cover what a plain Linux host can answer from the filesystem:
//! device identity from DMI/os-release and battery state from sysfs.
//! Radios (GNSS, WiFi identity, cellular) have no portable host interface,
//! so those probes report "no data" and the snapshot degrades cleanly.

use std::io;
use std::path::Path;

use super::{
    Capability, DeviceInfoProbe, LocationPriority, LocationProbe, NetworkProbe, PermissionGate,
    PowerProbe,
};
use crate::error::Result;
use crate::types::{CellIdentity, LocationFix, WifiIdentity};

const DMI_PRODUCT_NAME: &str = "/sys/devices/virtual/dmi/id/product_name";
const OS_RELEASE: &str = "/etc/os-release";
const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// Device identity resolved once at startup.
pub struct StaticDeviceInfo {
    model: String,
    os_version: String,
}

impl StaticDeviceInfo {
    pub fn new(model: impl Into<String>, os_version: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            os_version: os_version.into(),
        }
    }

    /// Detect identity from the host: DMI product name and os-release,
    /// falling back to the build target.
    pub fn detect() -> Self {
        let model = read_trimmed(Path::new(DMI_PRODUCT_NAME))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| std::env::consts::ARCH.to_string());

        let os_version =
            os_release_pretty_name().unwrap_or_else(|| std::env::consts::OS.to_string());

        Self { model, os_version }
    }
}

impl DeviceInfoProbe for StaticDeviceInfo {
    fn model(&self) -> String {
        self.model.clone()
    }

    fn os_version(&self) -> String {
        self.os_version.clone()
    }
}

/// Battery state read from `/sys/class/power_supply`.
pub struct SysfsPowerProbe;

impl SysfsPowerProbe {
    /// First power supply directory whose type is "Battery".
    fn battery_dir(&self) -> io::Result<std::path::PathBuf> {
        for entry in std::fs::read_dir(POWER_SUPPLY_DIR)? {
            let dir = entry?.path();
            if let Some(kind) = read_trimmed(&dir.join("type")) {
                if kind == "Battery" {
                    return Ok(dir);
                }
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            "no battery present",
        ))
    }
}

impl PowerProbe for SysfsPowerProbe {
    fn battery_percent(&self) -> Result<i32> {
        let dir = self.battery_dir()?;
        let raw = std::fs::read_to_string(dir.join("capacity"))?;
        let percent = raw.trim().parse::<i32>().map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "unparseable battery capacity")
        })?;
        Ok(percent)
    }

    fn is_charging(&self) -> Result<bool> {
        let dir = self.battery_dir()?;
        let status = std::fs::read_to_string(dir.join("status"))?;
        // "Full" means the device is sitting on external power
        Ok(matches!(status.trim(), "Charging" | "Full"))
    }
}

/// Probe for hosts without GNSS or radio hardware: always "no data".
pub struct NoRadios;

impl LocationProbe for NoRadios {
    fn current_location(&self, _priority: LocationPriority) -> Result<Option<LocationFix>> {
        Ok(None)
    }
}

impl NetworkProbe for NoRadios {
    fn wifi_identity(&self) -> Result<Option<WifiIdentity>> {
        Ok(None)
    }

    fn cell_identity(&self) -> Result<Option<CellIdentity>> {
        Ok(None)
    }
}

/// Permission gate for hosts where the operator owns the machine outright.
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn has_capability(&self, _capability: Capability) -> bool {
        true
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}

fn os_release_pretty_name() -> Option<String> {
    let content = std::fs::read_to_string(OS_RELEASE).ok()?;
    for line in content.lines() {
        if let Some(value) = line.strip_prefix("PRETTY_NAME=") {
            return Some(value.trim_matches('"').to_string());
        }
    }
    None
}
