//! Namespaced key/value persistence for menu-editable settings.
//!
//! The device keeps these in NVS and the host simulation in a JSON file; both
//! implement [`SettingsStore`]. Missing keys read as `None` and fall back to
//! the compiled-in defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    config::{PersistedSettings, WifiCredentials},
    error::StoreError,
    schedule::{ClockTime, Schedule, ScheduleAnchor},
};

pub const SCHEDULE_NAMESPACE: &str = "config";
pub const WIFI_NAMESPACE: &str = "wifi";

const KEY_HOUR_DAY: &str = "hourDay";
const KEY_MIN_DAY: &str = "minDay";
const KEY_TEMP_DAY: &str = "tempDay";
const KEY_HOUR_NIGHT: &str = "hourNight";
const KEY_MIN_NIGHT: &str = "minNight";
const KEY_TEMP_NIGHT: &str = "tempNight";
const KEY_SSID: &str = "ssid";
const KEY_PASS: &str = "pass";

pub trait SettingsStore {
    fn get_i32(&mut self, namespace: &str, key: &str) -> Result<Option<i32>, StoreError>;
    fn get_f32(&mut self, namespace: &str, key: &str) -> Result<Option<f32>, StoreError>;
    fn get_str(&mut self, namespace: &str, key: &str) -> Result<Option<String>, StoreError>;

    fn put_i32(&mut self, namespace: &str, key: &str, value: i32) -> Result<(), StoreError>;
    fn put_f32(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), StoreError>;
    fn put_str(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Reads every key on its own. A key that is missing or unreadable falls
/// back to its default without disturbing the others; read failures are
/// returned alongside the settings so the caller can report them.
pub fn load_settings(store: &mut dyn SettingsStore) -> (PersistedSettings, Vec<StoreError>) {
    let defaults = PersistedSettings::default();
    let mut skipped = Vec::new();

    let day = load_anchor(
        store,
        &defaults.schedule.day,
        [KEY_HOUR_DAY, KEY_MIN_DAY, KEY_TEMP_DAY],
        &mut skipped,
    );
    let night = load_anchor(
        store,
        &defaults.schedule.night,
        [KEY_HOUR_NIGHT, KEY_MIN_NIGHT, KEY_TEMP_NIGHT],
        &mut skipped,
    );
    let ssid = keep(store.get_str(WIFI_NAMESPACE, KEY_SSID), &mut skipped);
    let password = keep(store.get_str(WIFI_NAMESPACE, KEY_PASS), &mut skipped);

    let mut settings = PersistedSettings {
        schedule: Schedule {
            day,
            night,
            fade_minutes: defaults.schedule.fade_minutes,
        },
        wifi: WifiCredentials {
            ssid: ssid.unwrap_or(defaults.wifi.ssid),
            password: password.unwrap_or(defaults.wifi.password),
        },
    };
    settings.sanitize();
    (settings, skipped)
}

fn keep<T>(read: Result<Option<T>, StoreError>, skipped: &mut Vec<StoreError>) -> Option<T> {
    read.unwrap_or_else(|err| {
        skipped.push(err);
        None
    })
}

fn load_anchor(
    store: &mut dyn SettingsStore,
    fallback: &ScheduleAnchor,
    [hour_key, minute_key, temp_key]: [&str; 3],
    skipped: &mut Vec<StoreError>,
) -> ScheduleAnchor {
    let hour = keep(store.get_i32(SCHEDULE_NAMESPACE, hour_key), skipped)
        .map(|value| value.clamp(0, 23) as u8)
        .unwrap_or(fallback.time.hour);
    let minute = keep(store.get_i32(SCHEDULE_NAMESPACE, minute_key), skipped)
        .map(|value| value.clamp(0, 59) as u8)
        .unwrap_or(fallback.time.minute);
    let target_temp_c = keep(store.get_f32(SCHEDULE_NAMESPACE, temp_key), skipped)
        .filter(|value| value.is_finite())
        .unwrap_or(fallback.target_temp_c);

    ScheduleAnchor {
        time: ClockTime { hour, minute },
        target_temp_c,
    }
}

pub fn save_schedule(store: &mut dyn SettingsStore, schedule: &Schedule) -> Result<(), StoreError> {
    let entries = [
        (KEY_HOUR_DAY, KEY_MIN_DAY, KEY_TEMP_DAY, &schedule.day),
        (KEY_HOUR_NIGHT, KEY_MIN_NIGHT, KEY_TEMP_NIGHT, &schedule.night),
    ];
    for (hour_key, minute_key, temp_key, anchor) in entries {
        store.put_i32(SCHEDULE_NAMESPACE, hour_key, anchor.time.hour.into())?;
        store.put_i32(SCHEDULE_NAMESPACE, minute_key, anchor.time.minute.into())?;
        store.put_f32(SCHEDULE_NAMESPACE, temp_key, anchor.target_temp_c)?;
    }
    Ok(())
}

pub fn save_wifi(store: &mut dyn SettingsStore, wifi: &WifiCredentials) -> Result<(), StoreError> {
    store.put_str(WIFI_NAMESPACE, KEY_SSID, &wifi.ssid)?;
    store.put_str(WIFI_NAMESPACE, KEY_PASS, &wifi.password)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum StoredValue {
    Int(i32),
    Float(f32),
    Str(String),
}

impl StoredValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

/// In-memory store, serializable so a host runtime can mirror it to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    namespaces: BTreeMap<String, BTreeMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, namespace: &str, key: &str) -> Option<&StoredValue> {
        self.namespaces.get(namespace)?.get(key)
    }

    fn put(&mut self, namespace: &str, key: &str, value: StoredValue) {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn mismatch(namespace: &str, key: &str, expected: &'static str, found: &StoredValue) -> StoreError {
        StoreError::TypeMismatch {
            namespace: namespace.to_string(),
            key: key.to_string(),
            expected,
            found: found.kind(),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn get_i32(&mut self, namespace: &str, key: &str) -> Result<Option<i32>, StoreError> {
        match self.get(namespace, key) {
            None => Ok(None),
            Some(StoredValue::Int(value)) => Ok(Some(*value)),
            Some(other) => Err(Self::mismatch(namespace, key, "int", other)),
        }
    }

    fn get_f32(&mut self, namespace: &str, key: &str) -> Result<Option<f32>, StoreError> {
        match self.get(namespace, key) {
            None => Ok(None),
            Some(StoredValue::Float(value)) => Ok(Some(*value)),
            Some(other) => Err(Self::mismatch(namespace, key, "float", other)),
        }
    }

    fn get_str(&mut self, namespace: &str, key: &str) -> Result<Option<String>, StoreError> {
        match self.get(namespace, key) {
            None => Ok(None),
            Some(StoredValue::Str(value)) => Ok(Some(value.clone())),
            Some(other) => Err(Self::mismatch(namespace, key, "string", other)),
        }
    }

    fn put_i32(&mut self, namespace: &str, key: &str, value: i32) -> Result<(), StoreError> {
        self.put(namespace, key, StoredValue::Int(value));
        Ok(())
    }

    fn put_f32(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), StoreError> {
        self.put(namespace, key, StoredValue::Float(value));
        Ok(())
    }

    fn put_str(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.put(namespace, key, StoredValue::Str(value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_store_loads_defaults() {
        let mut store = MemoryStore::new();
        let (settings, skipped) = load_settings(&mut store);
        assert!(skipped.is_empty());

        assert_eq!(settings, PersistedSettings::default());
        assert_eq!(settings.schedule.day.time, ClockTime { hour: 9, minute: 30 });
        assert_eq!(settings.schedule.night.target_temp_c, 20.5);
    }

    #[test]
    fn saved_schedule_and_wifi_load_back() {
        let mut store = MemoryStore::new();
        let mut schedule = Schedule::default();
        schedule.day.time = ClockTime { hour: 7, minute: 15 };
        schedule.night.target_temp_c = 18.0;
        let wifi = WifiCredentials::new("Terrarium", "s3cret");

        save_schedule(&mut store, &schedule).unwrap();
        save_wifi(&mut store, &wifi).unwrap();
        let (settings, skipped) = load_settings(&mut store);
        assert!(skipped.is_empty());

        assert_eq!(settings.schedule, schedule);
        assert_eq!(settings.wifi, wifi);
    }

    #[test]
    fn keys_use_the_persisted_layout() {
        let mut store = MemoryStore::new();
        save_schedule(&mut store, &Schedule::default()).unwrap();

        assert_eq!(store.get_i32("config", "hourNight").unwrap(), Some(19));
        assert_eq!(store.get_f32("config", "tempDay").unwrap(), Some(25.5));
    }

    #[test]
    fn out_of_range_stored_hour_is_clamped() {
        let mut store = MemoryStore::new();
        store.put_i32(SCHEDULE_NAMESPACE, "hourDay", 31).unwrap();

        let (settings, skipped) = load_settings(&mut store);
        assert!(skipped.is_empty());
        assert_eq!(settings.schedule.day.time.hour, 23);
    }

    #[test]
    fn one_bad_key_keeps_the_other_values() {
        let mut store = MemoryStore::new();
        save_wifi(&mut store, &WifiCredentials::new("Vivarium", "pw")).unwrap();
        store.put_i32(SCHEDULE_NAMESPACE, "hourNight", 21).unwrap();
        store.put_str(SCHEDULE_NAMESPACE, "tempDay", "warm").unwrap();

        let (settings, skipped) = load_settings(&mut store);

        assert_eq!(settings.wifi, WifiCredentials::new("Vivarium", "pw"));
        assert_eq!(settings.schedule.night.time.hour, 21);
        assert_eq!(settings.schedule.day.target_temp_c, 25.5);
        assert_eq!(skipped.len(), 1);
        assert!(matches!(
            &skipped[0],
            StoreError::TypeMismatch { key, expected: "float", .. } if key == "tempDay"
        ));
    }

    #[test]
    fn memory_store_survives_json() {
        let mut store = MemoryStore::new();
        save_wifi(&mut store, &WifiCredentials::new("net", "pw")).unwrap();

        let json = serde_json::to_string(&store).unwrap();
        let mut restored: MemoryStore = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.get_str(WIFI_NAMESPACE, "ssid").unwrap().as_deref(), Some("net"));
    }
}
