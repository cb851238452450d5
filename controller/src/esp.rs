use core::convert::TryInto;
use std::{
    cell::RefCell,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;
use ds18b20::Ds18b20;
use embedded_hal_bus::i2c::RefCellDevice;
use embedded_svc::{
    http::{Method, Status},
    io::{Read, Write},
    wifi::{AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{
        delay::Ets,
        gpio::{AnyIOPin, AnyOutputPin, IOPin, Input, InputOutput, Output, OutputPin, PinDriver, Pull},
        i2c::{I2cConfig, I2cDriver},
        modem::Modem,
        prelude::*,
    },
    http::client::{Configuration as HttpClientConfiguration, EspHttpConnection},
    log::EspLogger,
    nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault},
    ota::EspOta,
    sys::EspError,
    wifi::EspWifi,
};
use log::{error, info, warn};
use one_wire_bus::{Address, OneWire};
use sha2::{Digest, Sha256};

use heatmat_common::{
    load_settings, plan_update, render, save_schedule, save_wifi, ButtonPad, ControllerConfig,
    DisplaySurface, EngineAction, FirmwareTarget, Font, IntervalGate, NetworkStatus, RawButtons,
    SettingsStore, StoreError, ThermostatEngine, UpdatePlan, WifiCredentials, FIRMWARE_VERSION,
};

use crate::{oled::Oled, rtc::Ds3231};

const ONEWIRE_PIN: i32 = 2;
const WATCHDOG_TIMEOUT_SEC: u32 = 30;
const LOOP_SLEEP_MS: u64 = 10;
const FRAME_INTERVAL_MS: u64 = 50;
const MAX_MANIFEST_BYTES: usize = 4096;
const OTA_CHUNK_SIZE: usize = 4096;
const NVS_STR_BUFFER: usize = 96;

type SharedI2c<'bus> = RefCellDevice<'bus, I2cDriver<'static>>;

/// Peripherals handed to the control loop thread.
struct Board {
    i2c: I2cDriver<'static>,
    buttons: ButtonPins,
    relay: PinDriver<'static, AnyOutputPin, Output>,
    probe: MatProbe,
}

struct ButtonPins {
    up: PinDriver<'static, AnyIOPin, Input>,
    down: PinDriver<'static, AnyIOPin, Input>,
    left: PinDriver<'static, AnyIOPin, Input>,
    right: PinDriver<'static, AnyIOPin, Input>,
}

/// DS18B20 on the mat. A conversion is started on one request and read back
/// on the next so the loop never waits out the 750 ms conversion time.
struct MatProbe {
    one_wire: OneWire<PinDriver<'static, AnyIOPin, InputOutput>>,
    address: Option<Address>,
    converting: bool,
    delay: Ets,
}

#[derive(Clone)]
struct NvsStore {
    partition: EspDefaultNvsPartition,
}

struct ControlContext<'bus> {
    rtc: Ds3231<SharedI2c<'bus>>,
    clock: NaiveDateTime,
    probe: MatProbe,
    relay: PinDriver<'static, AnyOutputPin, Output>,
    nvs_store: NvsStore,
    wifi: EspWifi<'static>,
    manifest_url: String,
    update_running: Arc<AtomicBool>,
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let mut nvs_store = NvsStore {
        partition: nvs_partition.clone(),
    };

    let (mut settings, skipped) = load_settings(&mut nvs_store);
    for err in skipped {
        warn!("NVS setting unreadable, using its default: {err}");
    }
    ensure_wifi_defaults(&mut settings.wifi);

    let mut config = ControllerConfig::default();
    if let Some(url) = option_env!("HEATMAT_UPDATE_MANIFEST_URL") {
        config.update_manifest_url = url.to_string();
    }
    config.sanitize();

    info!(
        "heatmat {FIRMWARE_VERSION}: day {:02}:{:02} {:.1}C, night {:02}:{:02} {:.1}C, ssid=`{}`",
        settings.schedule.day.time.hour,
        settings.schedule.day.time.minute,
        settings.schedule.day.target_temp_c,
        settings.schedule.night.time.hour,
        settings.schedule.night.time.minute,
        settings.schedule.night.target_temp_c,
        settings.wifi.ssid,
    );

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        pins.gpio3,
        pins.gpio4,
        &I2cConfig::new().baudrate(400.kHz().into()),
    )
    .context("failed to initialize I2C bus")?;

    let buttons = ButtonPins {
        up: input_pin(pins.gpio20.downgrade())?,
        down: input_pin(pins.gpio9.downgrade())?,
        left: input_pin(pins.gpio10.downgrade())?,
        right: input_pin(pins.gpio21.downgrade())?,
    };

    let mut relay = PinDriver::output(pins.gpio5.downgrade_output())?;
    relay.set_low()?;

    let probe = MatProbe::new(pins.gpio2.downgrade())?;

    let wifi = start_wifi(
        peripherals.modem,
        sys_loop,
        nvs_partition,
        &settings.wifi,
        config.wifi_connect_timeout_ms,
    )
    .context("wifi startup failed")?;

    TaskWatchdog::init(WATCHDOG_TIMEOUT_SEC)?;

    if let Ok(mut ota) = EspOta::new() {
        if let Err(err) = ota.mark_running_slot_valid() {
            warn!("failed to mark running OTA slot valid: {err:?}");
        }
    }

    let board = Board {
        i2c,
        buttons,
        relay,
        probe,
    };
    let engine = ThermostatEngine::new(config, settings);
    spawn_control_loop(engine, board, nvs_store, wifi)?;

    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

fn ensure_wifi_defaults(wifi: &mut WifiCredentials) {
    if wifi.ssid.is_empty() {
        if let Some(ssid) = option_env!("WIFI_SSID") {
            wifi.ssid = ssid.to_string();
        }
    }

    if wifi.password.is_empty() {
        if let Some(pass) = option_env!("WIFI_PASS") {
            wifi.password = pass.to_string();
        }
    }
}

fn input_pin(pin: AnyIOPin) -> anyhow::Result<PinDriver<'static, AnyIOPin, Input>> {
    let mut driver = PinDriver::input(pin)?;
    driver.set_pull(Pull::Up)?;
    Ok(driver)
}

fn client_configuration(credentials: &WifiCredentials) -> anyhow::Result<Configuration> {
    let auth_method = if credentials.password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPAWPA2Personal
    };

    Ok(Configuration::Client(ClientConfiguration {
        ssid: credentials
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("wifi ssid too long"))?,
        password: credentials
            .password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("wifi password too long"))?,
        auth_method,
        ..Default::default()
    }))
}

/// Brings the station up and waits at most `timeout_ms` for an association.
/// A failed attempt leaves the supervisor to retry from the control loop.
fn start_wifi(
    modem: Modem,
    sys_loop: EspSystemEventLoop,
    nvs_partition: EspDefaultNvsPartition,
    credentials: &WifiCredentials,
    timeout_ms: u64,
) -> anyhow::Result<EspWifi<'static>> {
    let mut wifi = EspWifi::new(modem, sys_loop, Some(nvs_partition))?;
    wifi.set_configuration(&client_configuration(credentials)?)?;
    wifi.start()?;

    if !credentials.is_configured() {
        warn!("wifi credentials missing; set them from the Wifi menu");
        return Ok(wifi);
    }

    info!("wifi started, connecting to `{}`", credentials.ssid);
    if let Err(err) = wifi.connect() {
        warn!("wifi connect request failed: {err:#}");
        return Ok(wifi);
    }

    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(timeout_ms) {
        if wifi.is_connected().unwrap_or(false) {
            info!("wifi connected after {} ms", started.elapsed().as_millis());
            return Ok(wifi);
        }
        thread::sleep(Duration::from_millis(100));
    }

    warn!("wifi not connected after {timeout_ms} ms; continuing offline");
    Ok(wifi)
}

fn reconnect_wifi(wifi: &mut EspWifi<'static>, credentials: &WifiCredentials) -> anyhow::Result<()> {
    let _ = wifi.disconnect();
    wifi.set_configuration(&client_configuration(credentials)?)?;
    if credentials.is_configured() {
        wifi.connect()?;
    }
    Ok(())
}

fn spawn_control_loop(
    engine: ThermostatEngine,
    board: Board,
    nvs_store: NvsStore,
    wifi: EspWifi<'static>,
) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("control-loop".into())
        .stack_size(16 * 1024)
        .spawn(move || {
            if let Err(err) = control_loop(engine, board, nvs_store, wifi) {
                error!("control loop stopped: {err:#}");
            }
        })
        .context("failed to spawn control loop thread")?;
    Ok(())
}

fn control_loop(
    mut engine: ThermostatEngine,
    board: Board,
    nvs_store: NvsStore,
    wifi: EspWifi<'static>,
) -> anyhow::Result<()> {
    let Board {
        i2c,
        buttons,
        relay,
        probe,
    } = board;
    let bus = RefCell::new(i2c);

    let mut oled = Oled::init(RefCellDevice::new(&bus)).context("display unavailable")?;
    let mut rtc = Ds3231::new(RefCellDevice::new(&bus));

    if !rtc.probe() {
        error!("DS3231 not found on I2C");
        halt(&mut oled, &["RTC not found", "Check wiring"]);
    }
    match rtc.lost_power() {
        Ok(true) => {
            warn!("RTC lost power; clock needs to be set");
            show_message(&mut oled, &["RTC lost power", "Set the Date menu"]);
            thread::sleep(Duration::from_secs(2));
        }
        Ok(false) => {}
        Err(err) => warn!("failed to read RTC status: {err}"),
    }

    let clock = rtc.read_datetime().unwrap_or_else(|err| {
        warn!("failed to read RTC time: {err}");
        NaiveDateTime::default()
    });

    let mut ctx = ControlContext {
        rtc,
        clock,
        probe,
        relay,
        nvs_store,
        wifi,
        manifest_url: engine.config.update_manifest_url.clone(),
        update_running: Arc::new(AtomicBool::new(false)),
    };

    if let Err(err) = TaskWatchdog::watch_current_task() {
        warn!("failed to register control loop with watchdog: {err:#}");
    }

    let mut pad = ButtonPad::new(engine.config.debounce_ms);
    let mut signal_gate = IntervalGate::new(engine.config.signal_interval_ms);
    let mut frame_gate = IntervalGate::new(FRAME_INTERVAL_MS);
    let mut clock_error_logged = false;

    loop {
        TaskWatchdog::feed();
        let now_ms = uptime_ms();

        match ctx.rtc.read_datetime() {
            Ok(now) => {
                ctx.clock = now;
                clock_error_logged = false;
            }
            Err(err) if !clock_error_logged => {
                warn!("RTC read failed, holding last time: {err}");
                clock_error_logged = true;
            }
            Err(_) => {}
        }

        if signal_gate.ready(now_ms) {
            let status = station_rssi()
                .map_or_else(NetworkStatus::disconnected, NetworkStatus::connected);
            engine.update_network(status);
        }

        let pressed = pad.update(buttons.sample(), now_ms);
        let actions = engine.tick(now_ms, ctx.clock, &pressed);
        execute_engine_actions(&mut ctx, &mut engine, actions);

        if frame_gate.ready(now_ms) {
            render(&engine.view(now_ms, ctx.clock), &mut oled);
        }

        thread::sleep(Duration::from_millis(LOOP_SLEEP_MS));
    }
}

fn execute_engine_actions(
    ctx: &mut ControlContext<'_>,
    engine: &mut ThermostatEngine,
    actions: Vec<EngineAction>,
) {
    for action in actions {
        if action == EngineAction::RequestReading {
            engine.update_sensor_reading(ctx.probe.last_reading());
            ctx.probe.request_reading();
            continue;
        }

        let description = format!("{action:?}");
        if let Err(err) = execute_action(ctx, action) {
            warn!("engine action failed [{description}]: {err:#}");
        } else {
            info!("engine action applied [{description}]");
        }
    }
}

fn execute_action(ctx: &mut ControlContext<'_>, action: EngineAction) -> anyhow::Result<()> {
    match action {
        EngineAction::RequestReading => {}
        EngineAction::SetRelay(true) => ctx.relay.set_high()?,
        EngineAction::SetRelay(false) => ctx.relay.set_low()?,
        EngineAction::SaveSchedule(schedule) => save_schedule(&mut ctx.nvs_store, &schedule)?,
        EngineAction::SaveWifi(credentials) => save_wifi(&mut ctx.nvs_store, &credentials)?,
        EngineAction::ReconnectWifi(credentials) => reconnect_wifi(&mut ctx.wifi, &credentials)?,
        EngineAction::SetClock(datetime) => {
            ctx.rtc
                .set_datetime(&datetime)
                .map_err(|err| anyhow!("{err}"))?;
            ctx.clock = datetime;
        }
        EngineAction::CheckForUpdate => {
            spawn_update_check(ctx.manifest_url.clone(), ctx.update_running.clone())?
        }
    }
    Ok(())
}

fn show_message(surface: &mut dyn DisplaySurface, lines: &[&str]) {
    surface.clear();
    for (row, line) in lines.iter().enumerate() {
        surface.draw_text(0, 12 + row as i32 * 12, line, Font::Small);
    }
    surface.flush();
}

fn halt(surface: &mut dyn DisplaySurface, lines: &[&str]) -> ! {
    show_message(surface, lines);
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

impl ButtonPins {
    /// Buttons pull the line to ground.
    fn sample(&self) -> RawButtons {
        RawButtons {
            up: self.up.is_low(),
            down: self.down.is_low(),
            left: self.left.is_low(),
            right: self.right.is_low(),
        }
    }
}

impl MatProbe {
    fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut one_wire_pin = PinDriver::input_output_od(pin)?;
        one_wire_pin.set_pull(Pull::Up)?;
        one_wire_pin.set_high()?;

        let one_wire = OneWire::new(one_wire_pin)
            .map_err(|err| anyhow!("failed to initialize one-wire bus: {err:?}"))?;

        let mut probe = Self {
            one_wire,
            address: None,
            converting: false,
            delay: Ets,
        };
        probe.refresh_address();
        Ok(probe)
    }

    fn refresh_address(&mut self) {
        self.address = None;
        for addr in self.one_wire.devices(false, &mut self.delay) {
            match addr {
                Ok(address) if address.family_code() == ds18b20::FAMILY_CODE => {
                    self.address = Some(address);
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("one-wire device scan failed: {err:?}");
                    break;
                }
            }
        }

        match self.address {
            Some(address) => info!("DS18B20 ready on GPIO{ONEWIRE_PIN} ({address:?})"),
            None => warn!("no DS18B20 found on GPIO{ONEWIRE_PIN}"),
        }
    }

    fn request_reading(&mut self) {
        if self.address.is_none() {
            self.refresh_address();
        }
        if self.address.is_none() {
            return;
        }

        match ds18b20::start_simultaneous_temp_measurement(&mut self.one_wire, &mut self.delay) {
            Ok(()) => self.converting = true,
            Err(err) => {
                warn!("failed to start DS18B20 conversion: {err:?}");
                self.address = None;
            }
        }
    }

    fn last_reading(&mut self) -> Option<f32> {
        if !std::mem::take(&mut self.converting) {
            return None;
        }
        let address = self.address?;

        let sensor = match Ds18b20::new::<core::convert::Infallible>(address) {
            Ok(sensor) => sensor,
            Err(err) => {
                warn!("invalid DS18B20 address {address:?}: {err:?}");
                self.address = None;
                return None;
            }
        };

        match sensor.read_data(&mut self.one_wire, &mut self.delay) {
            Ok(data) => Some(data.temperature),
            Err(err) => {
                warn!("failed to read DS18B20 data: {err:?}");
                self.address = None;
                None
            }
        }
    }
}

impl NvsStore {
    fn open(&self, namespace: &str) -> Result<EspNvs<NvsDefault>, StoreError> {
        EspNvs::new(self.partition.clone(), namespace, true).map_err(backend_error)
    }
}

fn backend_error(err: EspError) -> StoreError {
    StoreError::Backend(err.to_string())
}

// Floats are stored as their IEEE-754 bits; NVS has no float type.
impl SettingsStore for NvsStore {
    fn get_i32(&mut self, namespace: &str, key: &str) -> Result<Option<i32>, StoreError> {
        self.open(namespace)?.get_i32(key).map_err(backend_error)
    }

    fn get_f32(&mut self, namespace: &str, key: &str) -> Result<Option<f32>, StoreError> {
        let bits = self.open(namespace)?.get_u32(key).map_err(backend_error)?;
        Ok(bits.map(f32::from_bits))
    }

    fn get_str(&mut self, namespace: &str, key: &str) -> Result<Option<String>, StoreError> {
        let nvs = self.open(namespace)?;
        let mut buffer = [0_u8; NVS_STR_BUFFER];
        let value = nvs.get_str(key, &mut buffer).map_err(backend_error)?;
        Ok(value.map(str::to_string))
    }

    fn put_i32(&mut self, namespace: &str, key: &str, value: i32) -> Result<(), StoreError> {
        self.open(namespace)?.set_i32(key, value).map_err(backend_error)
    }

    fn put_f32(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), StoreError> {
        self.open(namespace)?
            .set_u32(key, value.to_bits())
            .map_err(backend_error)
    }

    fn put_str(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.open(namespace)?.set_str(key, value).map_err(backend_error)
    }
}

fn spawn_update_check(manifest_url: String, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    if manifest_url.is_empty() {
        warn!("no update manifest configured");
        return Ok(());
    }
    if station_rssi().is_none() {
        warn!("update check skipped: wifi offline");
        return Ok(());
    }
    if running.swap(true, Ordering::AcqRel) {
        info!("update check already in progress");
        return Ok(());
    }

    let flag = running.clone();
    let spawned = thread::Builder::new()
        .name("ota".into())
        .stack_size(16 * 1024)
        .spawn(move || {
            if let Err(err) = check_and_install_update(&manifest_url) {
                warn!("firmware update failed: {err:#}");
            }
            flag.store(false, Ordering::Release);
        });

    if let Err(err) = spawned {
        running.store(false, Ordering::Release);
        return Err(anyhow!("failed to spawn update thread: {err}"));
    }
    Ok(())
}

#[allow(unreachable_code)]
fn check_and_install_update(manifest_url: &str) -> anyhow::Result<()> {
    let manifest = fetch_manifest(manifest_url)?;

    let (target, rollback) = match plan_update(&manifest, FIRMWARE_VERSION)? {
        UpdatePlan::UpToDate => {
            info!("firmware {FIRMWARE_VERSION} is up to date");
            return Ok(());
        }
        UpdatePlan::Install { target, rollback } => (target, rollback),
    };

    let image = match flash_firmware(&target) {
        Ok(image) => image,
        Err(err) => {
            let Some(rollback) = rollback else {
                return Err(err);
            };
            warn!("{err:#}; installing rollback {}", rollback.version);
            flash_firmware(&rollback)?
        }
    };

    info!(
        "mat firmware {} written ({} bytes, sha256 {}); restarting",
        image.version, image.bytes, image.sha256
    );
    thread::sleep(Duration::from_millis(500));
    unsafe { esp_idf_svc::sys::esp_restart() };
    Ok(())
}

/// Opens a GET request and fails on any non-2xx status. The connection is
/// returned with the response headers consumed; read the body from it.
fn http_get(url: &str, timeout: Duration) -> anyhow::Result<EspHttpConnection> {
    let mut connection = EspHttpConnection::new(&HttpClientConfiguration {
        timeout: Some(timeout),
        crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
        ..Default::default()
    })?;
    connection.initiate_request(Method::Get, url, &[])?;
    connection.initiate_response()?;

    let status = connection.status();
    if !(200..300).contains(&status) {
        return Err(anyhow!("GET {url} failed with HTTP {status}"));
    }
    Ok(connection)
}

fn fetch_manifest(url: &str) -> anyhow::Result<String> {
    let mut response = http_get(url, Duration::from_secs(15))?;

    let mut body = Vec::new();
    let mut chunk = [0_u8; 512];
    loop {
        let read = response.read(&mut chunk).map_err(|e| anyhow!("{e:?}"))?;
        if read == 0 {
            break;
        }
        if body.len() + read > MAX_MANIFEST_BYTES {
            return Err(anyhow!("manifest larger than {MAX_MANIFEST_BYTES} bytes"));
        }
        body.extend_from_slice(&chunk[..read]);
    }

    String::from_utf8(body).context("manifest is not UTF-8")
}

/// A firmware image that passed its checksum and now sits in the next boot slot.
struct FlashedImage {
    version: String,
    bytes: u64,
    sha256: String,
}

fn flash_firmware(target: &FirmwareTarget) -> anyhow::Result<FlashedImage> {
    info!("installing mat firmware {} from {}", target.version, target.url);
    let (bytes, sha256) = write_ota_slot(target)
        .with_context(|| format!("mat firmware {} not installed", target.version))?;
    Ok(FlashedImage {
        version: target.version.clone(),
        bytes,
        sha256,
    })
}

fn write_ota_slot(target: &FirmwareTarget) -> anyhow::Result<(u64, String)> {
    let mut response = http_get(&target.url, Duration::from_secs(30))?;

    let mut ota = EspOta::new().map_err(|err| anyhow!("OTA partition unavailable: {err:?}"))?;
    let mut update = ota
        .initiate_update()
        .map_err(|err| anyhow!("OTA slot could not be opened: {err:?}"))?;

    let mut hasher = Sha256::new();
    let mut written = 0_u64;
    let mut chunk = [0_u8; OTA_CHUNK_SIZE];

    loop {
        TaskWatchdog::feed();
        let read = response
            .read(&mut chunk)
            .map_err(|err| anyhow!("download interrupted after {written} bytes: {err:?}"))?;
        if read == 0 {
            break;
        }
        update
            .write(&chunk[..read])
            .map_err(|err| anyhow!("OTA slot write failed after {written} bytes: {err:?}"))?;
        hasher.update(&chunk[..read]);
        written = written.saturating_add(read as u64);
    }

    if written == 0 {
        return Err(anyhow!("server sent an empty image"));
    }

    let sha256 = format!("{:x}", hasher.finalize());
    if let Some(expected) = target.sha256.as_deref() {
        if !sha256.eq_ignore_ascii_case(expected.trim()) {
            // An aborted update leaves the running slot as the boot target.
            let _ = update.abort();
            return Err(anyhow!("checksum {sha256} does not match manifest {expected}"));
        }
    }

    update
        .complete()
        .map_err(|err| anyhow!("image rejected by the bootloader: {err:?}"))?;
    Ok((written, sha256))
}

/// ESP-IDF task watchdog. Only tasks that registered are checked, so the
/// control loop and the OTA writer feed it and nothing else has to.
struct TaskWatchdog;

impl TaskWatchdog {
    fn init(timeout_sec: u32) -> anyhow::Result<()> {
        let config = esp_idf_svc::sys::esp_task_wdt_config_t {
            timeout_ms: timeout_sec.saturating_mul(1000),
            idle_core_mask: 0,
            trigger_panic: true,
        };
        Self::check(unsafe { esp_idf_svc::sys::esp_task_wdt_init(&config) }, "init")
    }

    fn watch_current_task() -> anyhow::Result<()> {
        Self::check(
            unsafe { esp_idf_svc::sys::esp_task_wdt_add(core::ptr::null_mut()) },
            "add",
        )
    }

    fn feed() {
        let _ = unsafe { esp_idf_svc::sys::esp_task_wdt_reset() };
    }

    // INVALID_STATE means the watchdog or the task is already set up.
    fn check(rc: esp_idf_svc::sys::esp_err_t, call: &str) -> anyhow::Result<()> {
        match rc {
            esp_idf_svc::sys::ESP_OK | esp_idf_svc::sys::ESP_ERR_INVALID_STATE => Ok(()),
            rc => Err(anyhow!("task watchdog {call} failed with code {rc}")),
        }
    }
}

/// RSSI of the access point the station is joined to, or `None` when offline.
fn station_rssi() -> Option<i32> {
    let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
    let rc = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
    (rc == esp_idf_svc::sys::ESP_OK).then(|| i32::from(ap_info.rssi))
}

/// Milliseconds since boot from the ESP high-resolution timer.
fn uptime_ms() -> u64 {
    let micros = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    u64::try_from(micros / 1000).unwrap_or(0)
}
