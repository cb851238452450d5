//! Debounced push buttons.
//!
//! Each input is sampled once per tick. A raw level must stay unchanged for
//! the settle interval before the debounced level follows it, and the edge is
//! reported for exactly that one tick.

pub const DEFAULT_SETTLE_MS: u64 = 25;

#[derive(Debug, Clone)]
pub struct Debouncer {
    settle_ms: u64,
    stable: bool,
    raw: bool,
    last_change_ms: u64,
    changed: bool,
}

impl Debouncer {
    pub fn new(settle_ms: u64) -> Self {
        Self {
            settle_ms,
            stable: false,
            raw: false,
            last_change_ms: 0,
            changed: false,
        }
    }

    /// Feeds one raw sample; `raw_pressed` is already mapped to "pressed = true".
    pub fn update(&mut self, raw_pressed: bool, now_ms: u64) {
        self.changed = false;

        if raw_pressed != self.raw {
            self.raw = raw_pressed;
            self.last_change_ms = now_ms;
        } else if raw_pressed != self.stable
            && now_ms.saturating_sub(self.last_change_ms) >= self.settle_ms
        {
            self.stable = raw_pressed;
            self.last_change_ms = now_ms;
            self.changed = true;
        }
    }

    pub fn fell(&self) -> bool {
        self.changed && self.stable
    }

    pub fn rose(&self) -> bool {
        self.changed && !self.stable
    }

    pub fn is_held(&self) -> bool {
        self.stable
    }

    pub fn state(&self) -> ButtonState {
        ButtonState {
            fell: self.fell(),
            rose: self.rose(),
            held: self.is_held(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub fell: bool,
    pub rose: bool,
    pub held: bool,
}

impl ButtonState {
    pub const IDLE: Self = Self {
        fell: false,
        rose: false,
        held: false,
    };

    pub fn pressed() -> Self {
        Self {
            fell: true,
            rose: false,
            held: true,
        }
    }

    pub fn holding() -> Self {
        Self {
            fell: false,
            rose: false,
            held: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawButtons {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons {
    pub up: ButtonState,
    pub down: ButtonState,
    pub left: ButtonState,
    pub right: ButtonState,
}

#[derive(Debug, Clone)]
pub struct ButtonPad {
    up: Debouncer,
    down: Debouncer,
    left: Debouncer,
    right: Debouncer,
}

impl ButtonPad {
    pub fn new(settle_ms: u64) -> Self {
        Self {
            up: Debouncer::new(settle_ms),
            down: Debouncer::new(settle_ms),
            left: Debouncer::new(settle_ms),
            right: Debouncer::new(settle_ms),
        }
    }

    pub fn update(&mut self, raw: RawButtons, now_ms: u64) -> Buttons {
        self.up.update(raw.up, now_ms);
        self.down.update(raw.down, now_ms);
        self.left.update(raw.left, now_ms);
        self.right.update(raw.right, now_ms);

        Buttons {
            up: self.up.state(),
            down: self.down.state(),
            left: self.left.state(),
            right: self.right.state(),
        }
    }
}

impl Default for ButtonPad {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_MS)
    }
}
