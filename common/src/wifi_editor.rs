//! WiFi credential editing with four buttons.
//!
//! The screen starts as a three-row list (SSID, password, save). Choosing a
//! text row switches to per-character editing where Up/Down cycle the glyph
//! under the cursor through [`WIFI_KEYBOARD`] and Left/Right move the cursor.

use crate::{
    button::Buttons,
    config::{RepeatConfig, WifiCredentials},
    repeat::AutoRepeat,
};

pub const WIFI_KEYBOARD: &str =
    " ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.@!$#*?";
pub const SSID_MAX_LEN: usize = 32;
pub const PASSWORD_MAX_LEN: usize = 64;

const ROW_SSID: u8 = 1;
const ROW_PASSWORD: u8 = 2;
const ROW_SAVE: u8 = 3;

pub fn keyboard_len() -> usize {
    WIFI_KEYBOARD.len()
}

/// Position of `glyph` on the keyboard; characters it does not carry map to
/// the leading space.
pub fn keyboard_index(glyph: char) -> usize {
    WIFI_KEYBOARD.chars().position(|c| c == glyph).unwrap_or(0)
}

fn keyboard_glyph(index: usize) -> char {
    WIFI_KEYBOARD.chars().nth(index).unwrap_or(' ')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiField {
    Ssid,
    Password,
}

impl WifiField {
    pub fn max_len(self) -> usize {
        match self {
            Self::Ssid => SSID_MAX_LEN,
            Self::Password => PASSWORD_MAX_LEN,
        }
    }

    fn row(self) -> u8 {
        match self {
            Self::Ssid => ROW_SSID,
            Self::Password => ROW_PASSWORD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiEditMode {
    List { selected: u8 },
    Text { field: WifiField, cursor: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    chars: Vec<char>,
    max_len: usize,
}

impl TextField {
    pub fn new(value: &str, max_len: usize) -> Self {
        Self {
            chars: value.chars().take(max_len).collect(),
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn glyph(&self, cursor: usize) -> Option<char> {
        self.chars.get(cursor).copied()
    }

    fn pad_to(&mut self, cursor: usize) {
        while self.chars.len() <= cursor && self.chars.len() < self.max_len {
            self.chars.push(' ');
        }
    }

    fn trim_end(&mut self) {
        while matches!(self.chars.last(), Some(' ') | Some('\0')) {
            self.chars.pop();
        }
    }

    fn cycle(&mut self, cursor: usize, index: usize) {
        if let Some(slot) = self.chars.get_mut(cursor) {
            *slot = keyboard_glyph(index);
        }
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WifiOutcome {
    Stay,
    Back,
    Save(WifiCredentials),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiEditor {
    ssid: TextField,
    password: TextField,
    mode: WifiEditMode,
}

impl WifiEditor {
    pub fn new(credentials: &WifiCredentials) -> Self {
        Self {
            ssid: TextField::new(&credentials.ssid, SSID_MAX_LEN),
            password: TextField::new(&credentials.password, PASSWORD_MAX_LEN),
            mode: WifiEditMode::List { selected: ROW_SSID },
        }
    }

    pub fn mode(&self) -> WifiEditMode {
        self.mode
    }

    pub fn field(&self, field: WifiField) -> &TextField {
        match field {
            WifiField::Ssid => &self.ssid,
            WifiField::Password => &self.password,
        }
    }

    fn field_mut(&mut self, field: WifiField) -> &mut TextField {
        match field {
            WifiField::Ssid => &mut self.ssid,
            WifiField::Password => &mut self.password,
        }
    }

    pub fn credentials(&self) -> WifiCredentials {
        let mut ssid = self.ssid.clone();
        let mut password = self.password.clone();
        ssid.trim_end();
        password.trim_end();
        WifiCredentials::new(ssid.as_string(), password.as_string())
    }

    pub fn handle(
        &mut self,
        buttons: &Buttons,
        up: &mut AutoRepeat,
        down: &mut AutoRepeat,
        now_ms: u64,
        config: &RepeatConfig,
    ) -> WifiOutcome {
        match self.mode {
            WifiEditMode::List { selected } => self.handle_list(buttons, selected),
            WifiEditMode::Text { field, cursor } => {
                self.handle_text(buttons, field, cursor, up, down, now_ms, config);
                WifiOutcome::Stay
            }
        }
    }

    fn handle_list(&mut self, buttons: &Buttons, mut selected: u8) -> WifiOutcome {
        if buttons.up.fell {
            selected = selected.saturating_sub(1).max(ROW_SSID);
        }
        if buttons.down.fell {
            selected = (selected + 1).min(ROW_SAVE);
        }
        self.mode = WifiEditMode::List { selected };

        if buttons.left.fell {
            return WifiOutcome::Back;
        }

        if buttons.right.fell {
            match selected {
                ROW_SSID => self.begin_text(WifiField::Ssid),
                ROW_PASSWORD => self.begin_text(WifiField::Password),
                _ => return WifiOutcome::Save(self.credentials()),
            }
        }

        WifiOutcome::Stay
    }

    fn begin_text(&mut self, field: WifiField) {
        self.field_mut(field).pad_to(0);
        self.mode = WifiEditMode::Text { field, cursor: 0 };
    }

    fn finish_text(&mut self, field: WifiField) {
        self.field_mut(field).trim_end();
        self.mode = WifiEditMode::List {
            selected: field.row(),
        };
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_text(
        &mut self,
        buttons: &Buttons,
        field: WifiField,
        cursor: usize,
        up: &mut AutoRepeat,
        down: &mut AutoRepeat,
        now_ms: u64,
        config: &RepeatConfig,
    ) {
        let last_glyph = keyboard_len() as i32 - 1;
        let text = self.field_mut(field);
        let mut index = text.glyph(cursor).map(keyboard_index).unwrap_or(0) as i32;

        let mut cycled = up.adjust_wrapping(buttons.up, &mut index, 1, 0, last_glyph, now_ms, config);
        cycled |= down.adjust_wrapping(buttons.down, &mut index, -1, 0, last_glyph, now_ms, config);
        if cycled {
            text.cycle(cursor, index as usize);
        }

        if buttons.right.fell {
            if cursor + 1 < field.max_len() {
                self.field_mut(field).pad_to(cursor + 1);
                self.mode = WifiEditMode::Text {
                    field,
                    cursor: cursor + 1,
                };
            } else {
                self.finish_text(field);
            }
            return;
        }

        if buttons.left.fell {
            if cursor > 0 {
                self.mode = WifiEditMode::Text {
                    field,
                    cursor: cursor - 1,
                };
            } else {
                self.finish_text(field);
            }
        }
    }
}
