//! Probe traits over device data sources
//!
//! Each probe is a narrow interface over one external data source the relay
//! worker consults when assembling a report. The worker never talks to a
//! platform API directly: hosts wire whatever implementations their hardware
//! supports, tests wire fakes.
//!
//! Probe calls are plain blocking calls. A probe that needs to wait on
//! hardware (a location fix, for example) resolves or times out inside the
//! call and reports the outcome through its return value.

pub mod host;
pub mod snapshot;

use crate::error::Result;
use crate::types::{CellIdentity, LocationFix, WifiIdentity};

/// Capabilities the permission gate can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Location,
    Power,
    Network,
}

/// How hard the location probe should try for a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationPriority {
    /// Trade accuracy for power (the default for background cycles)
    Balanced,
    /// Best available fix regardless of cost
    HighAccuracy,
}

/// Source of location fixes.
pub trait LocationProbe: Send + Sync {
    /// Resolve the current position, or `None` when no fix is available.
    ///
    /// May block while the platform resolves; implementations own their
    /// timeout.
    fn current_location(&self, priority: LocationPriority) -> Result<Option<LocationFix>>;
}

/// Source of battery state.
pub trait PowerProbe: Send + Sync {
    /// Charge level in percent (0..=100)
    fn battery_percent(&self) -> Result<i32>;

    /// Whether the device is on external power
    fn is_charging(&self) -> Result<bool>;
}

/// Source of network identity (WiFi association, serving cell).
pub trait NetworkProbe: Send + Sync {
    fn wifi_identity(&self) -> Result<Option<WifiIdentity>>;

    fn cell_identity(&self) -> Result<Option<CellIdentity>>;
}

/// Source of static device identity.
pub trait DeviceInfoProbe: Send + Sync {
    fn model(&self) -> String;

    fn os_version(&self) -> String;
}

/// Gate consulted before any probe that needs a granted capability.
pub trait PermissionGate: Send + Sync {
    fn has_capability(&self, capability: Capability) -> bool;
}

/// The full set of probes a relay worker runs against.
pub struct ProbeSet {
    pub location: Box<dyn LocationProbe>,
    pub power: Box<dyn PowerProbe>,
    pub network: Box<dyn NetworkProbe>,
    pub device: Box<dyn DeviceInfoProbe>,
    pub permissions: Box<dyn PermissionGate>,
}

#[cfg(test)]
pub(crate) mod fakes {
    //! Scriptable probe fakes shared by snapshot and worker tests.

    use super::*;
    use crate::error::Error;
    use crate::types::{BatteryStatus, CellIdentity, LocationFix, WifiIdentity};

    pub struct FakeLocation {
        pub fix: Option<LocationFix>,
        pub fail: bool,
    }

    impl LocationProbe for FakeLocation {
        fn current_location(&self, _priority: LocationPriority) -> Result<Option<LocationFix>> {
            if self.fail {
                return Err(Error::Config("simulated location failure".to_string()));
            }
            Ok(self.fix)
        }
    }

    pub struct FakePower {
        pub status: BatteryStatus,
        pub fail: bool,
    }

    impl PowerProbe for FakePower {
        fn battery_percent(&self) -> Result<i32> {
            if self.fail {
                return Err(Error::Config("simulated power failure".to_string()));
            }
            Ok(self.status.percent)
        }

        fn is_charging(&self) -> Result<bool> {
            if self.fail {
                return Err(Error::Config("simulated power failure".to_string()));
            }
            Ok(self.status.charging)
        }
    }

    /// A probe implementation that blows up instead of failing cleanly.
    pub struct PanickingPower;

    impl PowerProbe for PanickingPower {
        fn battery_percent(&self) -> Result<i32> {
            panic!("broken probe implementation")
        }

        fn is_charging(&self) -> Result<bool> {
            panic!("broken probe implementation")
        }
    }

    pub struct FakeNetwork {
        pub wifi: Option<WifiIdentity>,
        pub cell: Option<CellIdentity>,
        pub fail: bool,
    }

    impl NetworkProbe for FakeNetwork {
        fn wifi_identity(&self) -> Result<Option<WifiIdentity>> {
            if self.fail {
                return Err(Error::Config("simulated network failure".to_string()));
            }
            Ok(self.wifi.clone())
        }

        fn cell_identity(&self) -> Result<Option<CellIdentity>> {
            if self.fail {
                return Err(Error::Config("simulated network failure".to_string()));
            }
            Ok(self.cell.clone())
        }
    }

    pub struct FakeDevice;

    impl DeviceInfoProbe for FakeDevice {
        fn model(&self) -> String {
            "test-device".to_string()
        }

        fn os_version(&self) -> String {
            "test-os 1.0".to_string()
        }
    }

    pub struct FakeGate {
        pub granted: bool,
    }

    impl PermissionGate for FakeGate {
        fn has_capability(&self, _capability: Capability) -> bool {
            self.granted
        }
    }

    /// A fully healthy probe set with a fix, full battery and WiFi.
    pub fn healthy_probes() -> ProbeSet {
        ProbeSet {
            location: Box::new(FakeLocation {
                fix: Some(LocationFix {
                    latitude: 52.520008,
                    longitude: 13.404954,
                }),
                fail: false,
            }),
            power: Box::new(FakePower {
                status: BatteryStatus {
                    percent: 87,
                    charging: true,
                },
                fail: false,
            }),
            network: Box::new(FakeNetwork {
                wifi: Some(WifiIdentity {
                    ssid: "depot-net".to_string(),
                    bssid: "aa:bb:cc:dd:ee:ff".to_string(),
                }),
                cell: Some(CellIdentity {
                    technology: "LTE".to_string(),
                    cell_id: 123_456,
                    signal_dbm: -95,
                }),
                fail: false,
            }),
            device: Box::new(FakeDevice),
            permissions: Box::new(FakeGate { granted: true }),
        }
    }
}
