pub mod button;
pub mod config;
pub mod display;
pub mod error;
pub mod menu;
pub mod network;
pub mod relay;
pub mod repeat;
pub mod schedule;
pub mod settings;
pub mod thermostat;
pub mod timing;
pub mod types;
pub mod update;
pub mod wifi_editor;

pub use button::{ButtonPad, ButtonState, Buttons, RawButtons};
pub use config::{ControllerConfig, PersistedSettings, RepeatConfig, WifiCredentials};
pub use display::{render, DisplaySurface, Font, View};
pub use error::{ManifestError, StoreError};
pub use menu::{Menu, MenuAction, MenuItem, Screen};
pub use schedule::{ClockTime, Schedule, ScheduleAnchor};
pub use settings::{load_settings, save_schedule, save_wifi, MemoryStore, SettingsStore};
pub use thermostat::{EngineAction, ThermostatEngine};
pub use timing::IntervalGate;
pub use types::{NetworkStatus, SignalStrength, FIRMWARE_VERSION};
pub use update::{plan_update, FirmwareTarget, UpdatePlan};
