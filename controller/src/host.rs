use std::{
    io::ErrorKind,
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{info, warn};

use heatmat_common::{
    display::{DisplaySurface, Font},
    load_settings, render, save_schedule, save_wifi, ButtonPad, ControllerConfig, EngineAction,
    IntervalGate, MemoryStore, NetworkStatus, PersistedSettings, RawButtons, ThermostatEngine,
};

const TICK_MS: u64 = 10;
const TAP_MS: u64 = 100;
const SIMULATED_RSSI_DBM: i32 = -67;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Tap(Key),
    ToggleHold(Key),
    ToggleProbe,
    ToggleWifi,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "u" => Some(Self::Tap(Key::Up)),
            "d" => Some(Self::Tap(Key::Down)),
            "l" => Some(Self::Tap(Key::Left)),
            "r" => Some(Self::Tap(Key::Right)),
            "U" => Some(Self::ToggleHold(Key::Up)),
            "D" => Some(Self::ToggleHold(Key::Down)),
            "s" => Some(Self::ToggleProbe),
            "w" => Some(Self::ToggleWifi),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Settings file mirroring the device's namespaced key/value layout.
struct FileStore {
    path: PathBuf,
    memory: MemoryStore,
}

/// Wall clock that can be set from the Date screen without touching the OS.
struct SimulatedRtc {
    offset: TimeDelta,
}

/// First-order model of a heated mat: warms while the relay is on and drifts
/// back toward room temperature otherwise.
struct SimulatedMat {
    temp_c: f32,
    ambient_c: f32,
    probe_connected: bool,
    pending: Option<f32>,
}

struct SimulatedButtons {
    raw: RawButtons,
    release_at_ms: [Option<u64>; 4],
}

#[derive(Default)]
struct LogSurface {
    runs: Vec<(i32, i32, String)>,
    marks: usize,
    last_frame: String,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = load_config().await.unwrap_or_else(|err| {
        warn!("failed to load controller config: {err:#}");
        ControllerConfig::default()
    });
    config.sanitize();

    let mut store = FileStore::new();
    let settings = match store.load().await {
        Ok(()) => {
            let (settings, skipped) = load_settings(&mut store.memory);
            for err in skipped {
                warn!("stored setting unreadable, using its default: {err}");
            }
            settings
        }
        Err(err) => {
            warn!("failed to load settings from store: {err:#}");
            PersistedSettings::default()
        }
    };
    info!(
        "schedule loaded: day {:02}:{:02} {:.1}C, night {:02}:{:02} {:.1}C, ssid=`{}`",
        settings.schedule.day.time.hour,
        settings.schedule.day.time.minute,
        settings.schedule.day.target_temp_c,
        settings.schedule.night.time.hour,
        settings.schedule.night.time.minute,
        settings.schedule.night.target_temp_c,
        settings.wifi.ssid,
    );

    let mut wifi_connected = settings.wifi.is_configured();
    let mut engine = ThermostatEngine::new(config.clone(), settings);
    let mut pad = ButtonPad::new(config.debounce_ms);
    let mut signal_gate = IntervalGate::new(config.signal_interval_ms);
    let mut rtc = SimulatedRtc::new();
    let mut mat = SimulatedMat::new(21.0);
    let mut buttons = SimulatedButtons::new();
    let mut surface = LogSurface::default();

    let (commands_tx, mut commands) = mpsc::unbounded_channel();
    spawn_stdin_reader(commands_tx);
    info!("keys: u/d/l/r tap, U/D toggle hold, s probe, w wifi, q quit");

    let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let booted = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!("interrupted, shutting down");
                break;
            }
        }

        let now_ms = uptime_ms(booted);

        while let Ok(command) = commands.try_recv() {
            match command {
                Command::Tap(key) => buttons.tap(key, now_ms),
                Command::ToggleHold(key) => buttons.toggle(key),
                Command::ToggleProbe => {
                    mat.probe_connected = !mat.probe_connected;
                    info!("probe connected: {}", mat.probe_connected);
                }
                Command::ToggleWifi => {
                    wifi_connected = !wifi_connected;
                    info!("wifi link up: {wifi_connected}");
                }
                Command::Quit => return Ok(()),
            }
        }
        buttons.release_due(now_ms);

        if signal_gate.ready(now_ms) {
            engine.update_network(if wifi_connected {
                NetworkStatus::connected(SIMULATED_RSSI_DBM)
            } else {
                NetworkStatus::disconnected()
            });
        }

        let wall_clock = rtc.now();
        let pressed = pad.update(buttons.raw, now_ms);
        let actions = engine.tick(now_ms, wall_clock, &pressed);

        mat.advance(engine.is_relay_on(), TICK_MS);
        if !actions.is_empty() {
            execute_engine_actions(
                actions,
                &mut engine,
                &mut store,
                &mut rtc,
                &mut mat,
                &mut wifi_connected,
            )
            .await;
        }

        render(&engine.view(now_ms, rtc.now()), &mut surface);
    }

    Ok(())
}

async fn execute_engine_actions(
    actions: Vec<EngineAction>,
    engine: &mut ThermostatEngine,
    store: &mut FileStore,
    rtc: &mut SimulatedRtc,
    mat: &mut SimulatedMat,
    wifi_connected: &mut bool,
) {
    for action in actions {
        if action == EngineAction::RequestReading {
            engine.update_sensor_reading(mat.last_reading());
            mat.request_reading();
            continue;
        }

        info!("engine action: {action:?}");
        match action {
            EngineAction::RequestReading | EngineAction::SetRelay(_) => {}
            EngineAction::SaveSchedule(schedule) => {
                let result = match save_schedule(&mut store.memory, &schedule) {
                    Ok(()) => store.persist().await,
                    Err(err) => Err(err.into()),
                };
                if let Err(err) = result {
                    warn!("failed to persist schedule: {err:#}");
                }
            }
            EngineAction::SaveWifi(credentials) => {
                let result = match save_wifi(&mut store.memory, &credentials) {
                    Ok(()) => store.persist().await,
                    Err(err) => Err(err.into()),
                };
                if let Err(err) = result {
                    warn!("failed to persist wifi credentials: {err:#}");
                }
            }
            EngineAction::ReconnectWifi(credentials) => {
                *wifi_connected = credentials.is_configured();
            }
            EngineAction::SetClock(datetime) => rtc.adjust(datetime),
            EngineAction::CheckForUpdate => {
                warn!("firmware update check is only available in ESP32 builds");
            }
        }
    }
}

fn spawn_stdin_reader(commands: mpsc::UnboundedSender<Command>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match Command::parse(&line) {
                    Some(command) => {
                        if commands.send(command).is_err() {
                            break;
                        }
                    }
                    None => warn!("unknown key `{}`", line.trim()),
                },
                Ok(None) => break,
                Err(err) => {
                    warn!("stdin read failed: {err}");
                    break;
                }
            }
        }
    });
}

async fn load_config() -> anyhow::Result<ControllerConfig> {
    let Ok(path) = std::env::var("HEATMAT_CONFIG") else {
        return Ok(ControllerConfig::default());
    };
    let raw = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {path}"))?;
    Ok(serde_json::from_slice(&raw)?)
}

impl FileStore {
    fn new() -> Self {
        let data_dir = std::env::var("HEATMAT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.heatmat"));

        Self {
            path: data_dir.join("settings.json"),
            memory: MemoryStore::new(),
        }
    }

    async fn load(&mut self) -> anyhow::Result<()> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => {
                self.memory = serde_json::from_slice(&raw)?;
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(&self.memory)?;
        tokio::fs::write(&self.path, payload).await?;
        Ok(())
    }
}

impl SimulatedRtc {
    fn new() -> Self {
        Self {
            offset: TimeDelta::zero(),
        }
    }

    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local() + self.offset
    }

    fn adjust(&mut self, datetime: NaiveDateTime) {
        self.offset = datetime - Local::now().naive_local();
    }
}

impl SimulatedMat {
    const HEAT_RATE_C_PER_S: f32 = 0.05;
    const COOL_FACTOR_PER_S: f32 = 0.01;

    fn new(ambient_c: f32) -> Self {
        Self {
            temp_c: ambient_c,
            ambient_c,
            probe_connected: true,
            pending: None,
        }
    }

    fn advance(&mut self, heating: bool, elapsed_ms: u64) {
        let seconds = elapsed_ms as f32 / 1_000.0;
        if heating {
            self.temp_c += Self::HEAT_RATE_C_PER_S * seconds;
        }
        self.temp_c -= (self.temp_c - self.ambient_c) * Self::COOL_FACTOR_PER_S * seconds;
    }

    fn request_reading(&mut self) {
        self.pending = self.probe_connected.then_some(self.temp_c);
    }

    fn last_reading(&mut self) -> Option<f32> {
        self.pending.take()
    }
}

impl SimulatedButtons {
    fn new() -> Self {
        Self {
            raw: RawButtons::default(),
            release_at_ms: [None; 4],
        }
    }

    fn slot(&mut self, key: Key) -> (&mut bool, &mut Option<u64>) {
        let index = match key {
            Key::Up => 0,
            Key::Down => 1,
            Key::Left => 2,
            Key::Right => 3,
        };
        let level = match key {
            Key::Up => &mut self.raw.up,
            Key::Down => &mut self.raw.down,
            Key::Left => &mut self.raw.left,
            Key::Right => &mut self.raw.right,
        };
        (level, &mut self.release_at_ms[index])
    }

    fn tap(&mut self, key: Key, now_ms: u64) {
        let (level, release_at) = self.slot(key);
        *level = true;
        *release_at = Some(now_ms + TAP_MS);
    }

    fn toggle(&mut self, key: Key) {
        let (level, release_at) = self.slot(key);
        *level = !*level;
        *release_at = None;
    }

    fn release_due(&mut self, now_ms: u64) {
        for key in [Key::Up, Key::Down, Key::Left, Key::Right] {
            let (level, release_at) = self.slot(key);
            if release_at.is_some_and(|at| now_ms >= at) {
                *level = false;
                *release_at = None;
            }
        }
    }
}

impl DisplaySurface for LogSurface {
    fn clear(&mut self) {
        self.runs.clear();
        self.marks = 0;
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: Font) {
        let column = x / Font::Small.glyph_width();
        let text = match font {
            Font::Small => text.to_string(),
            Font::Large => text.to_uppercase(),
        };
        self.runs.push((y, column, text));
    }

    fn fill_rect(&mut self, _x: i32, _y: i32, _width: u32, _height: u32) {
        self.marks += 1;
    }

    fn draw_pixel(&mut self, _x: i32, _y: i32) {}

    fn flush(&mut self) {
        self.runs.sort_by_key(|(y, column, _)| (*y, *column));

        let mut frame = String::new();
        let mut current_y = None;
        let mut line = String::new();
        for (y, column, text) in &self.runs {
            if current_y != Some(*y) {
                if current_y.is_some() {
                    frame.push_str(line.trim_end());
                    frame.push('\n');
                }
                line.clear();
                current_y = Some(*y);
            }
            let column = (*column).max(0) as usize;
            while line.chars().count() < column {
                line.push(' ');
            }
            line.push_str(text);
        }
        frame.push_str(line.trim_end());

        if frame != self.last_frame {
            info!("display:\n{frame}");
            self.last_frame = frame;
        }
    }
}

/// Simulated uptime, the host stand-in for the board's boot timer.
fn uptime_ms(booted: Instant) -> u64 {
    u64::try_from(booted.elapsed().as_millis()).unwrap_or(u64::MAX)
}
