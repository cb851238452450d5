//! Screen layout for the 128x64 monochrome panel.
//!
//! [`View`] is a snapshot of what to show, built from the menu state and the
//! engine readings. [`render`] lays it out on any [`DisplaySurface`]; the
//! device draws through embedded-graphics, the host simulation into text.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::{
    menu::{DateDraft, MenuItem, ScheduleDraft, Screen, MENU_ITEMS},
    types::{SignalStrength, FIRMWARE_VERSION},
    wifi_editor::{WifiEditMode, WifiEditor, WifiField},
};

pub const WIDTH: i32 = 128;
pub const HEIGHT: i32 = 64;
const SMALL_GLYPH_WIDTH: i32 = 6;
const LARGE_GLYPH_WIDTH: i32 = 10;
const TEXT_COLUMNS: usize = (WIDTH / SMALL_GLYPH_WIDTH) as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Small,
    Large,
}

impl Font {
    pub fn glyph_width(self) -> i32 {
        match self {
            Self::Small => SMALL_GLYPH_WIDTH,
            Self::Large => LARGE_GLYPH_WIDTH,
        }
    }
}

/// Write-only drawing target. `y` is the text baseline.
pub trait DisplaySurface {
    fn clear(&mut self);
    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: Font);
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn draw_pixel(&mut self, x: i32, y: i32);
    fn flush(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeView {
    pub clock: NaiveDateTime,
    pub current_temp_c: f32,
    pub target_temp_c: f32,
    pub heating: bool,
    pub manual_override: bool,
    pub signal: SignalStrength,
    pub saved_notice: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Home(HomeView),
    Menu {
        selected: MenuItem,
    },
    DateEdit {
        cursor: u8,
        draft: DateDraft,
    },
    TempEdit {
        cursor: u8,
        draft: ScheduleDraft,
    },
    WifiList {
        selected: u8,
        ssid: String,
        password_len: usize,
    },
    WifiText {
        field: WifiField,
        text: String,
        cursor: usize,
    },
    Version {
        version: &'static str,
    },
}

impl View {
    pub fn from_screen(screen: &Screen, home: HomeView) -> Self {
        match screen {
            Screen::Home => Self::Home(home),
            Screen::Menu { selected } => Self::Menu {
                selected: *selected,
            },
            Screen::DateEdit { cursor, draft } => Self::DateEdit {
                cursor: cursor.value(),
                draft: *draft,
            },
            Screen::TempEdit { cursor, draft } => Self::TempEdit {
                cursor: cursor.value(),
                draft: *draft,
            },
            Screen::WifiEdit(editor) => wifi_view(editor),
            Screen::Version { .. } => Self::Version {
                version: FIRMWARE_VERSION,
            },
        }
    }
}

fn wifi_view(editor: &WifiEditor) -> View {
    match editor.mode() {
        WifiEditMode::List { selected } => View::WifiList {
            selected,
            ssid: editor.field(WifiField::Ssid).as_string(),
            password_len: editor.field(WifiField::Password).len(),
        },
        WifiEditMode::Text { field, cursor } => {
            let raw = editor.field(field).as_string();
            let text = match field {
                WifiField::Ssid => raw,
                // only the glyph being edited is readable
                WifiField::Password => raw
                    .chars()
                    .enumerate()
                    .map(|(i, c)| if i == cursor { c } else { '*' })
                    .collect(),
            };
            View::WifiText {
                field,
                text,
                cursor,
            }
        }
    }
}

pub fn render(view: &View, surface: &mut dyn DisplaySurface) {
    surface.clear();
    match view {
        View::Home(home) => render_home(home, surface),
        View::Menu { selected } => render_menu(*selected, surface),
        View::DateEdit { cursor, draft } => render_date(*cursor, draft, surface),
        View::TempEdit { cursor, draft } => render_schedule(*cursor, draft, surface),
        View::WifiList {
            selected,
            ssid,
            password_len,
        } => render_wifi_list(*selected, ssid, *password_len, surface),
        View::WifiText {
            field,
            text,
            cursor,
        } => render_wifi_text(*field, text, *cursor, surface),
        View::Version { version } => {
            surface.draw_text(0, 10, "Version", Font::Small);
            surface.draw_text(0, 36, version, Font::Large);
        }
    }
    surface.flush();
}

fn render_home(home: &HomeView, surface: &mut dyn DisplaySurface) {
    let clock = &home.clock;
    let stamp = format!(
        "{:02}/{:02} {:02}:{:02}:{:02}",
        clock.day(),
        clock.month(),
        clock.hour(),
        clock.minute(),
        clock.second()
    );
    surface.draw_text(0, 10, &stamp, Font::Small);
    draw_signal(home.signal, surface);

    surface.draw_text(0, 34, &format!("{:.1}C", home.current_temp_c), Font::Large);
    if home.heating {
        draw_heating(surface, 100, 34);
    }

    let target = format!("Target {:.1}C", home.target_temp_c);
    surface.draw_text(0, 50, &target, Font::Small);
    if home.manual_override {
        draw_lock(surface, (target.len() as i32 + 1) * SMALL_GLYPH_WIDTH, 50);
    }

    if home.saved_notice {
        surface.draw_text(0, 62, "Saved !", Font::Small);
    }
}

fn render_menu(selected: MenuItem, surface: &mut dyn DisplaySurface) {
    surface.draw_text(0, 10, "Menu", Font::Small);
    for (row, item) in MENU_ITEMS.iter().enumerate() {
        let marker = if *item == selected { ">" } else { " " };
        let y = 24 + row as i32 * 11;
        surface.draw_text(0, y, &format!("{marker} {}", item.label()), Font::Small);
    }
}

/// One line made of text runs; the run tagged with the active field is
/// underlined.
fn draw_fields(surface: &mut dyn DisplaySurface, y: i32, runs: &[(String, Option<u8>)], active: u8) {
    let mut x = 0;
    for (text, field) in runs {
        surface.draw_text(x, y, text, Font::Small);
        let width = text.chars().count() as i32 * SMALL_GLYPH_WIDTH;
        if *field == Some(active) {
            surface.fill_rect(x, y + 2, width as u32, 1);
        }
        x += width;
    }
}

fn render_date(cursor: u8, draft: &DateDraft, surface: &mut dyn DisplaySurface) {
    surface.draw_text(0, 10, "Date", Font::Small);
    draw_fields(
        surface,
        30,
        &[
            (format!("{:02}", draft.day), Some(1)),
            ("/".to_string(), None),
            (format!("{:02}", draft.month), Some(2)),
            ("/".to_string(), None),
            (format!("{:04}", draft.year), Some(3)),
        ],
        cursor,
    );
    draw_fields(
        surface,
        46,
        &[
            (format!("{:02}", draft.hour), Some(4)),
            (":".to_string(), None),
            (format!("{:02}", draft.minute), Some(5)),
        ],
        cursor,
    );
}

fn render_schedule(cursor: u8, draft: &ScheduleDraft, surface: &mut dyn DisplaySurface) {
    surface.draw_text(0, 10, "Prog Temp", Font::Small);
    draw_fields(
        surface,
        30,
        &[
            ("Day   ".to_string(), None),
            (format!("{:02}", draft.day_hour), Some(1)),
            (":".to_string(), None),
            (format!("{:02}", draft.day_minute), Some(2)),
            (" ".to_string(), None),
            (format!("{:.1}C", draft.day_temp_c), Some(3)),
        ],
        cursor,
    );
    draw_fields(
        surface,
        46,
        &[
            ("Night ".to_string(), None),
            (format!("{:02}", draft.night_hour), Some(4)),
            (":".to_string(), None),
            (format!("{:02}", draft.night_minute), Some(5)),
            (" ".to_string(), None),
            (format!("{:.1}C", draft.night_temp_c), Some(6)),
        ],
        cursor,
    );
}

fn render_wifi_list(selected: u8, ssid: &str, password_len: usize, surface: &mut dyn DisplaySurface) {
    surface.draw_text(0, 10, "Wifi", Font::Small);
    let rows = [
        format!("SSID {ssid}"),
        format!("Pass {}", "*".repeat(password_len)),
        "Save".to_string(),
    ];
    for (index, row) in rows.iter().enumerate() {
        let marker = if index as u8 + 1 == selected { ">" } else { " " };
        let line: String = format!("{marker} {row}").chars().take(TEXT_COLUMNS).collect();
        surface.draw_text(0, 26 + index as i32 * 12, &line, Font::Small);
    }
}

fn render_wifi_text(field: WifiField, text: &str, cursor: usize, surface: &mut dyn DisplaySurface) {
    let title = match field {
        WifiField::Ssid => "SSID",
        WifiField::Password => "Password",
    };
    surface.draw_text(0, 10, title, Font::Small);

    let first = cursor.saturating_sub(TEXT_COLUMNS - 1);
    let visible: String = text.chars().skip(first).take(TEXT_COLUMNS).collect();
    surface.draw_text(0, 34, &visible, Font::Small);

    let x = (cursor - first) as i32 * SMALL_GLYPH_WIDTH;
    surface.fill_rect(x, 36, SMALL_GLYPH_WIDTH as u32, 1);
    surface.draw_text(0, 58, &format!("{}/{}", cursor + 1, field.max_len()), Font::Small);
}

fn draw_signal(signal: SignalStrength, surface: &mut dyn DisplaySurface) {
    let bars = signal.bars();
    if bars == 0 {
        return;
    }
    let base_x = WIDTH - 16;
    let base_y = 9;
    surface.fill_rect(base_x, base_y - 1, 2, 2);
    for bar in 1..bars as i32 {
        let height = 2 + bar * 2;
        surface.fill_rect(base_x + bar * 4, base_y + 1 - height, 2, height as u32);
    }
}

fn draw_heating(surface: &mut dyn DisplaySurface, x: i32, y: i32) {
    // three wavy heat lines
    for column in 0..3 {
        let cx = x + column * 6;
        for step in 0..12 {
            let wobble = if (step / 3) % 2 == 0 { 0 } else { 1 };
            surface.draw_pixel(cx + wobble, y - step);
        }
    }
}

fn draw_lock(surface: &mut dyn DisplaySurface, x: i32, y: i32) {
    surface.fill_rect(x, y - 4, 7, 5);
    for step in 0..4 {
        surface.draw_pixel(x + 1, y - 5 - step);
        surface.draw_pixel(x + 5, y - 5 - step);
    }
    surface.draw_pixel(x + 2, y - 8);
    surface.draw_pixel(x + 3, y - 8);
    surface.draw_pixel(x + 4, y - 8);
}
