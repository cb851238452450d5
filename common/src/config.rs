use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatConfig {
    pub slow_after_ms: u64,
    pub fast_after_ms: u64,
    pub slow_interval_ms: u64,
    pub fast_interval_ms: u64,
}

impl Default for RepeatConfig {
    fn default() -> Self {
        Self {
            slow_after_ms: 500,
            fast_after_ms: 2_500,
            slow_interval_ms: 500,
            fast_interval_ms: 50,
        }
    }
}

impl RepeatConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.slow_interval_ms == 0 {
            self.slow_interval_ms = defaults.slow_interval_ms;
        }
        if self.fast_interval_ms == 0 {
            self.fast_interval_ms = defaults.fast_interval_ms;
        }
        if self.fast_after_ms < self.slow_after_ms {
            self.fast_after_ms = self.slow_after_ms;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub debounce_ms: u64,
    pub sensor_interval_ms: u64,
    pub signal_interval_ms: u64,
    pub wifi_retry_ms: u64,
    pub wifi_connect_timeout_ms: u64,
    pub saved_notice_ms: u64,
    pub relay_hysteresis_c: f32,
    pub disconnected_sentinel_c: f32,
    pub update_manifest_url: String,
    pub repeat: RepeatConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 25,
            sensor_interval_ms: 1_000,
            signal_interval_ms: 1_000,
            wifi_retry_ms: 60_000,
            wifi_connect_timeout_ms: 10_000,
            saved_notice_ms: 2_000,
            relay_hysteresis_c: 0.0,
            disconnected_sentinel_c: 66.6,
            update_manifest_url: String::new(),
            repeat: RepeatConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        self.debounce_ms = self.debounce_ms.clamp(1, 500);
        if self.sensor_interval_ms < 750 {
            // DS18B20 12-bit conversion time
            self.sensor_interval_ms = 750;
        }
        self.signal_interval_ms = self.signal_interval_ms.max(100);
        self.wifi_retry_ms = self.wifi_retry_ms.max(1_000);
        self.wifi_connect_timeout_ms = self.wifi_connect_timeout_ms.clamp(1_000, 60_000);
        if !self.relay_hysteresis_c.is_finite() {
            self.relay_hysteresis_c = defaults.relay_hysteresis_c;
        }
        self.relay_hysteresis_c = self.relay_hysteresis_c.clamp(0.0, 5.0);
        if !self.disconnected_sentinel_c.is_finite() {
            self.disconnected_sentinel_c = defaults.disconnected_sentinel_c;
        }
        self.update_manifest_url = self.update_manifest_url.trim().to_string();
        self.repeat.sanitize();
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: String,
    #[serde(rename = "pass")]
    pub password: String,
}

impl WifiCredentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// Engine actions are logged with `{:?}`; keep the password out of the log.
impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"*".repeat(self.password.chars().count()))
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSettings {
    pub schedule: Schedule,
    pub wifi: WifiCredentials,
}

impl PersistedSettings {
    pub fn sanitize(&mut self) {
        self.schedule.sanitize();
        self.wifi.ssid = self.wifi.ssid.chars().take(crate::wifi_editor::SSID_MAX_LEN).collect();
        self.wifi.password = self
            .wifi
            .password
            .chars()
            .take(crate::wifi_editor::PASSWORD_MAX_LEN)
            .collect();
    }
}
