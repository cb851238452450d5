use chrono::NaiveDateTime;

use crate::{
    button::Buttons,
    config::{ControllerConfig, PersistedSettings, WifiCredentials},
    display::{HomeView, View},
    menu::{Menu, MenuAction, MenuContext, Screen},
    network::WifiSupervisor,
    relay::RelayPolicy,
    schedule::{ClockTime, Schedule},
    timing::IntervalGate,
    types::NetworkStatus,
};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    SetRelay(bool),
    RequestReading,
    SaveSchedule(Schedule),
    SaveWifi(WifiCredentials),
    ReconnectWifi(WifiCredentials),
    SetClock(NaiveDateTime),
    CheckForUpdate,
}

#[derive(Debug, Clone)]
pub struct ThermostatEngine {
    pub config: ControllerConfig,
    schedule: Schedule,
    wifi: WifiCredentials,
    menu: Menu,
    relay_policy: RelayPolicy,

    current_temp_c: f32,
    sensor_connected: bool,
    target_temp_c: f32,
    relay_on: bool,

    sensor_gate: IntervalGate,
    network: NetworkStatus,
    wifi_supervisor: WifiSupervisor,

    saved_until_ms: Option<u64>,
}

impl ThermostatEngine {
    pub fn new(mut config: ControllerConfig, mut settings: PersistedSettings) -> Self {
        config.sanitize();
        settings.sanitize();
        Self {
            menu: Menu::new(config.repeat),
            relay_policy: RelayPolicy::new(config.relay_hysteresis_c),
            current_temp_c: config.disconnected_sentinel_c,
            sensor_connected: false,
            target_temp_c: settings.schedule.day.target_temp_c,
            relay_on: false,
            sensor_gate: IntervalGate::new(config.sensor_interval_ms),
            network: NetworkStatus::disconnected(),
            wifi_supervisor: WifiSupervisor::new(config.wifi_retry_ms),
            saved_until_ms: None,
            schedule: settings.schedule,
            wifi: settings.wifi,
            config,
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn wifi(&self) -> &WifiCredentials {
        &self.wifi
    }

    pub fn screen(&self) -> &Screen {
        self.menu.screen()
    }

    pub fn current_temp_c(&self) -> f32 {
        self.current_temp_c
    }

    pub fn is_sensor_connected(&self) -> bool {
        self.sensor_connected
    }

    pub fn target_temp_c(&self) -> f32 {
        self.target_temp_c
    }

    pub fn is_relay_on(&self) -> bool {
        self.relay_on
    }

    pub fn is_manual_override(&self) -> bool {
        self.menu.manual_override()
    }

    pub fn network(&self) -> NetworkStatus {
        self.network
    }

    /// Stores the result of the previous conversion; `None` means the probe
    /// did not answer and the display sentinel is used instead.
    pub fn update_sensor_reading(&mut self, reading_c: Option<f32>) {
        match reading_c.filter(|value| value.is_finite()) {
            Some(value) => {
                self.current_temp_c = value;
                self.sensor_connected = true;
            }
            None => {
                self.current_temp_c = self.config.disconnected_sentinel_c;
                self.sensor_connected = false;
            }
        }
    }

    pub fn update_network(&mut self, status: NetworkStatus) {
        self.network = status;
    }

    pub fn tick(&mut self, now_ms: u64, wall_clock: NaiveDateTime, buttons: &Buttons) -> Vec<EngineAction> {
        let mut actions = Vec::new();

        if self.sensor_gate.ready(now_ms) {
            actions.push(EngineAction::RequestReading);
        }

        if !self.menu.manual_override() {
            self.target_temp_c = self
                .schedule
                .target_temperature(ClockTime::from_datetime(&wall_clock));
        }

        self.evaluate_relay(&mut actions);

        if self
            .wifi_supervisor
            .poll(&self.network, self.wifi.is_configured(), now_ms)
        {
            actions.push(EngineAction::ReconnectWifi(self.wifi.clone()));
        }

        let menu_actions = self.menu.update(
            buttons,
            MenuContext {
                now_ms,
                wall_clock,
                target_temp_c: &mut self.target_temp_c,
                schedule: &self.schedule,
                wifi: &self.wifi,
            },
        );
        for action in menu_actions {
            self.apply_menu_action(action, now_ms, &mut actions);
        }

        if self
            .saved_until_ms
            .is_some_and(|until| now_ms >= until)
        {
            self.saved_until_ms = None;
        }

        actions
    }

    pub fn view(&self, now_ms: u64, wall_clock: NaiveDateTime) -> View {
        let home = HomeView {
            clock: wall_clock,
            current_temp_c: self.current_temp_c,
            target_temp_c: self.target_temp_c,
            heating: self.relay_on,
            manual_override: self.menu.manual_override(),
            signal: self.network.signal(),
            saved_notice: self.saved_until_ms.is_some_and(|until| now_ms < until),
        };
        View::from_screen(self.menu.screen(), home)
    }

    fn evaluate_relay(&mut self, actions: &mut Vec<EngineAction>) {
        let wanted = self
            .relay_policy
            .decide(self.relay_on, self.current_temp_c, self.target_temp_c);
        if wanted != self.relay_on {
            self.relay_on = wanted;
            actions.push(EngineAction::SetRelay(wanted));
        }
    }

    fn apply_menu_action(&mut self, action: MenuAction, now_ms: u64, actions: &mut Vec<EngineAction>) {
        match action {
            MenuAction::CommitSchedule(mut schedule) => {
                schedule.sanitize();
                self.schedule = schedule;
                actions.push(EngineAction::SaveSchedule(schedule));
            }
            MenuAction::SetClock(datetime) => actions.push(EngineAction::SetClock(datetime)),
            MenuAction::CommitWifi(credentials) => {
                self.wifi = credentials.clone();
                self.wifi_supervisor.reset();
                actions.push(EngineAction::SaveWifi(credentials.clone()));
                if credentials.is_configured() {
                    actions.push(EngineAction::ReconnectWifi(credentials));
                }
            }
            MenuAction::ShowSaved => {
                self.saved_until_ms = Some(now_ms.saturating_add(self.config.saved_notice_ms));
            }
            MenuAction::CheckForUpdate => actions.push(EngineAction::CheckForUpdate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{button::ButtonState, menu::MenuItem};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn clock(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 20)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn engine() -> ThermostatEngine {
        ThermostatEngine::new(ControllerConfig::default(), PersistedSettings::default())
    }

    fn press_right() -> Buttons {
        Buttons {
            right: ButtonState::pressed(),
            ..Buttons::default()
        }
    }

    fn press_up() -> Buttons {
        Buttons {
            up: ButtonState::pressed(),
            ..Buttons::default()
        }
    }

    #[test]
    fn first_tick_requests_a_reading_then_waits_for_interval() {
        let mut engine = engine();
        let idle = Buttons::default();

        assert!(engine.tick(0, clock(14, 0), &idle).contains(&EngineAction::RequestReading));
        assert!(!engine.tick(500, clock(14, 0), &idle).contains(&EngineAction::RequestReading));
        assert!(engine.tick(1_000, clock(14, 0), &idle).contains(&EngineAction::RequestReading));
    }

    #[test]
    fn relay_follows_scheduled_target() {
        let mut engine = engine();
        let idle = Buttons::default();

        engine.update_sensor_reading(Some(22.0));
        let actions = engine.tick(0, clock(14, 0), &idle);
        assert_eq!(engine.target_temp_c(), 25.5);
        assert!(actions.contains(&EngineAction::SetRelay(true)));
        assert!(engine.is_relay_on());

        engine.update_sensor_reading(Some(25.6));
        let actions = engine.tick(100, clock(14, 0), &idle);
        assert_eq!(actions, vec![EngineAction::SetRelay(false)]);

        // no repeat while the output is unchanged
        assert!(engine.tick(200, clock(14, 0), &idle).is_empty());
    }

    #[test]
    fn missing_sensor_shows_sentinel_and_stops_heating() {
        let mut engine = engine();
        let idle = Buttons::default();
        engine.update_sensor_reading(Some(20.0));
        engine.tick(0, clock(14, 0), &idle);
        assert!(engine.is_relay_on());

        engine.update_sensor_reading(None);
        let actions = engine.tick(100, clock(14, 0), &idle);

        assert_eq!(engine.current_temp_c(), 66.6);
        assert!(!engine.is_sensor_connected());
        assert!(actions.contains(&EngineAction::SetRelay(false)));
    }

    #[test]
    fn manual_override_freezes_target() {
        let mut engine = engine();
        engine.tick(0, clock(14, 0), &Buttons::default());

        engine.tick(1_000, clock(14, 0), &press_up());
        assert!(engine.is_manual_override());
        assert_eq!(engine.target_temp_c(), 25.6);

        // the night period would otherwise pull it down
        engine.tick(2_000, clock(23, 0), &Buttons::default());
        assert_eq!(engine.target_temp_c(), 25.6);

        let left = Buttons {
            left: ButtonState::pressed(),
            ..Buttons::default()
        };
        engine.tick(3_000, clock(23, 0), &left);
        engine.tick(4_000, clock(23, 0), &Buttons::default());
        assert_eq!(engine.target_temp_c(), 20.5);
    }

    #[test]
    fn committing_schedule_persists_and_shows_notice() {
        let mut engine = engine();
        let now = clock(14, 0);
        let mut t = 0;
        let mut tick = |engine: &mut ThermostatEngine, buttons: Buttons| {
            t += 1_000;
            (t, engine.tick(t, now, &buttons))
        };

        tick(&mut engine, press_right());
        let down = Buttons {
            down: ButtonState::pressed(),
            ..Buttons::default()
        };
        tick(&mut engine, down);
        tick(&mut engine, press_right());
        assert!(matches!(engine.screen(), Screen::TempEdit { .. }));

        tick(&mut engine, press_up()); // day hour 9 -> 10
        let mut last = Vec::new();
        let mut committed_at = 0;
        for _ in 0..6 {
            let (at, actions) = tick(&mut engine, press_right());
            last = actions;
            committed_at = at;
        }

        let mut expected = Schedule::default();
        expected.day.time.hour = 10;
        assert!(last.contains(&EngineAction::SaveSchedule(expected)));
        assert_eq!(engine.schedule(), &expected);
        assert_eq!(engine.screen(), &Screen::Home);

        match engine.view(committed_at + 1_999, now) {
            View::Home(home) => assert!(home.saved_notice),
            other => panic!("unexpected view {other:?}"),
        }
        match engine.view(committed_at + 2_000, now) {
            View::Home(home) => assert!(!home.saved_notice),
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn wifi_commit_saves_and_reconnects() {
        let mut engine = engine();
        let now = clock(14, 0);
        let down = Buttons {
            down: ButtonState::pressed(),
            ..Buttons::default()
        };

        engine.tick(1_000, now, &press_right());
        engine.tick(2_000, now, &down);
        engine.tick(3_000, now, &down);
        engine.tick(4_000, now, &press_right());
        assert!(matches!(engine.screen(), Screen::WifiEdit(_)));

        // SSID row, type "A"
        engine.tick(5_000, now, &press_right());
        engine.tick(6_000, now, &press_up());
        let left = Buttons {
            left: ButtonState::pressed(),
            ..Buttons::default()
        };
        engine.tick(7_000, now, &left);
        engine.tick(8_000, now, &down);
        engine.tick(9_000, now, &down);
        let actions = engine.tick(10_000, now, &press_right());

        let credentials = WifiCredentials::new("A", "");
        assert!(actions.contains(&EngineAction::SaveWifi(credentials.clone())));
        assert!(actions.contains(&EngineAction::ReconnectWifi(credentials.clone())));
        assert_eq!(engine.wifi(), &credentials);
    }

    #[test]
    fn outage_triggers_periodic_reconnect() {
        let mut engine = ThermostatEngine::new(
            ControllerConfig::default(),
            PersistedSettings {
                wifi: WifiCredentials::new("Vivarium", "pw"),
                ..PersistedSettings::default()
            },
        );
        let idle = Buttons::default();
        engine.update_network(NetworkStatus::disconnected());

        let reconnect = EngineAction::ReconnectWifi(WifiCredentials::new("Vivarium", "pw"));
        assert!(!engine.tick(0, clock(14, 0), &idle).contains(&reconnect));
        assert!(!engine.tick(59_000, clock(14, 0), &idle).contains(&reconnect));
        assert!(engine.tick(60_000, clock(14, 0), &idle).contains(&reconnect));
    }

    #[test]
    fn entering_version_requests_update_check() {
        let mut engine = engine();
        let now = clock(14, 0);
        let down = Buttons {
            down: ButtonState::pressed(),
            ..Buttons::default()
        };

        engine.tick(1_000, now, &press_right());
        for t in [2_000, 3_000, 4_000] {
            engine.tick(t, now, &down);
        }
        assert_eq!(
            engine.screen(),
            &Screen::Menu {
                selected: MenuItem::Version
            }
        );
        let actions = engine.tick(5_000, now, &press_right());
        assert!(actions.contains(&EngineAction::CheckForUpdate));
    }
}
