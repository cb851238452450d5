use serde::{Deserialize, Serialize};

/// Firmware version compared against the update manifest.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub connected: bool,
    #[serde(rename = "rssiDbm")]
    pub rssi_dbm: Option<i32>,
}

impl NetworkStatus {
    pub fn connected(rssi_dbm: i32) -> Self {
        Self {
            connected: true,
            rssi_dbm: Some(rssi_dbm),
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> SignalStrength {
        if !self.connected {
            return SignalStrength::None;
        }
        self.rssi_dbm
            .map(SignalStrength::from_rssi)
            .unwrap_or(SignalStrength::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignalStrength {
    None,
    Dot,
    Low,
    Medium,
    High,
}

impl SignalStrength {
    pub fn from_rssi(rssi_dbm: i32) -> Self {
        // 0 dBm is what the radio reports when it has no association.
        if rssi_dbm == 0 || rssi_dbm <= -86 {
            Self::None
        } else if rssi_dbm > -64 {
            Self::High
        } else if rssi_dbm > -74 {
            Self::Medium
        } else if rssi_dbm > -79 {
            Self::Low
        } else {
            Self::Dot
        }
    }

    pub fn bars(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Dot => 1,
            Self::Low => 2,
            Self::Medium => 3,
            Self::High => 4,
        }
    }
}
