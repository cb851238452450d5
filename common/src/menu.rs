use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::{
    button::Buttons,
    config::{RepeatConfig, WifiCredentials},
    repeat::AutoRepeat,
    schedule::{ClockTime, Schedule, ScheduleAnchor},
    wifi_editor::{WifiEditor, WifiOutcome},
};

const TEMP_STEP_C: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Date,
    Schedule,
    Wifi,
    Version,
}

pub const MENU_ITEMS: [MenuItem; 4] = [
    MenuItem::Date,
    MenuItem::Schedule,
    MenuItem::Wifi,
    MenuItem::Version,
];

impl MenuItem {
    pub fn label(self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Schedule => "Prog Temp",
            Self::Wifi => "Wifi",
            Self::Version => "Version",
        }
    }

    pub fn position(self) -> u8 {
        match self {
            Self::Date => 1,
            Self::Schedule => 2,
            Self::Wifi => 3,
            Self::Version => 4,
        }
    }

    pub fn from_position(position: u8) -> Self {
        match position {
            0 | 1 => Self::Date,
            2 => Self::Schedule,
            3 => Self::Wifi,
            _ => Self::Version,
        }
    }
}

/// Field index on an edit screen: 0 leaves without saving, `confirm` commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCursor {
    value: u8,
    confirm: u8,
}

impl FieldCursor {
    pub fn new(confirm: u8) -> Self {
        Self { value: 1, confirm }
    }

    pub fn value(self) -> u8 {
        self.value
    }

    pub fn is_back(self) -> bool {
        self.value == 0
    }

    pub fn is_confirm(self) -> bool {
        self.value == self.confirm
    }

    fn navigate(&mut self, buttons: &Buttons) {
        if buttons.left.fell {
            self.value = self.value.saturating_sub(1);
        }
        if buttons.right.fell {
            self.value = (self.value + 1).min(self.confirm);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateDraft {
    pub day: i32,
    pub month: i32,
    pub year: i32,
    pub hour: i32,
    pub minute: i32,
}

impl DateDraft {
    pub const CONFIRM: u8 = 6;
    /// Years the DS3231 can hold with its century bit.
    pub const MIN_YEAR: i32 = 2000;
    pub const MAX_YEAR: i32 = 2199;

    pub fn from_datetime(now: &NaiveDateTime) -> Self {
        Self {
            day: now.day() as i32,
            month: now.month() as i32,
            year: now.year().clamp(Self::MIN_YEAR, Self::MAX_YEAR),
            hour: now.hour() as i32,
            minute: now.minute() as i32,
        }
    }

    /// Builds the clock value to set; a day past the end of the month is
    /// pulled back to the month's last day.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let month = u32::try_from(self.month).ok()?;
        let day = u32::try_from(self.day).ok()?;
        let date = (1..=day)
            .rev()
            .find_map(|candidate| NaiveDate::from_ymd_opt(self.year, month, candidate))?;
        date.and_hms_opt(
            u32::try_from(self.hour).ok()?,
            u32::try_from(self.minute).ok()?,
            0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleDraft {
    pub day_hour: i32,
    pub day_minute: i32,
    pub day_temp_c: f32,
    pub night_hour: i32,
    pub night_minute: i32,
    pub night_temp_c: f32,
    fade_minutes: u16,
}

impl ScheduleDraft {
    pub const CONFIRM: u8 = 7;

    pub fn from_schedule(schedule: &Schedule) -> Self {
        Self {
            day_hour: schedule.day.time.hour.into(),
            day_minute: schedule.day.time.minute.into(),
            day_temp_c: schedule.day.target_temp_c,
            night_hour: schedule.night.time.hour.into(),
            night_minute: schedule.night.time.minute.into(),
            night_temp_c: schedule.night.target_temp_c,
            fade_minutes: schedule.fade_minutes,
        }
    }

    pub fn to_schedule(&self) -> Schedule {
        let anchor = |hour: i32, minute: i32, target_temp_c: f32| ScheduleAnchor {
            time: ClockTime {
                hour: hour.clamp(0, 23) as u8,
                minute: minute.clamp(0, 59) as u8,
            },
            target_temp_c,
        };
        Schedule {
            day: anchor(self.day_hour, self.day_minute, self.day_temp_c),
            night: anchor(self.night_hour, self.night_minute, self.night_temp_c),
            fade_minutes: self.fade_minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Home,
    Menu { selected: MenuItem },
    DateEdit { cursor: FieldCursor, draft: DateDraft },
    TempEdit { cursor: FieldCursor, draft: ScheduleDraft },
    WifiEdit(WifiEditor),
    Version { cursor: FieldCursor },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    CommitSchedule(Schedule),
    SetClock(NaiveDateTime),
    CommitWifi(WifiCredentials),
    ShowSaved,
    CheckForUpdate,
}

/// Live values the menu reads and, for the Home target, adjusts.
pub struct MenuContext<'a> {
    pub now_ms: u64,
    pub wall_clock: NaiveDateTime,
    pub target_temp_c: &'a mut f32,
    pub schedule: &'a Schedule,
    pub wifi: &'a WifiCredentials,
}

#[derive(Debug, Clone)]
pub struct Menu {
    screen: Screen,
    manual_override: bool,
    up: AutoRepeat,
    down: AutoRepeat,
    repeat: RepeatConfig,
}

impl Menu {
    pub fn new(repeat: RepeatConfig) -> Self {
        Self {
            screen: Screen::Home,
            manual_override: false,
            up: AutoRepeat::default(),
            down: AutoRepeat::default(),
            repeat,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn manual_override(&self) -> bool {
        self.manual_override
    }

    pub fn update(&mut self, buttons: &Buttons, ctx: MenuContext<'_>) -> Vec<MenuAction> {
        let mut actions = Vec::new();
        let screen = core::mem::replace(&mut self.screen, Screen::Home);

        self.screen = match screen {
            Screen::Home => self.home(buttons, ctx),
            Screen::Menu { selected } => self.menu(buttons, selected, ctx, &mut actions),
            Screen::DateEdit { cursor, draft } => {
                self.date_edit(buttons, cursor, draft, ctx.now_ms, &mut actions)
            }
            Screen::TempEdit { cursor, draft } => {
                self.temp_edit(buttons, cursor, draft, ctx.now_ms, &mut actions)
            }
            Screen::WifiEdit(mut editor) => {
                match editor.handle(buttons, &mut self.up, &mut self.down, ctx.now_ms, &self.repeat) {
                    WifiOutcome::Stay => Screen::WifiEdit(editor),
                    WifiOutcome::Back => Screen::Menu {
                        selected: MenuItem::Wifi,
                    },
                    WifiOutcome::Save(credentials) => {
                        actions.push(MenuAction::CommitWifi(credentials));
                        actions.push(MenuAction::ShowSaved);
                        Screen::Home
                    }
                }
            }
            Screen::Version { mut cursor } => {
                cursor.navigate(buttons);
                if cursor.is_back() {
                    Screen::Menu {
                        selected: MenuItem::Version,
                    }
                } else {
                    Screen::Version { cursor }
                }
            }
        };

        actions
    }

    fn home(&mut self, buttons: &Buttons, ctx: MenuContext<'_>) -> Screen {
        if buttons.right.fell {
            return Screen::Menu {
                selected: MenuItem::Date,
            };
        }

        let target = ctx.target_temp_c;
        let mut nudged =
            self.up
                .adjust_f32(buttons.up, target, TEMP_STEP_C, ctx.now_ms, &self.repeat);
        nudged |= self
            .down
            .adjust_f32(buttons.down, target, -TEMP_STEP_C, ctx.now_ms, &self.repeat);
        if nudged {
            self.manual_override = true;
        }

        if buttons.left.fell {
            self.manual_override = false;
        }

        Screen::Home
    }

    fn menu(
        &mut self,
        buttons: &Buttons,
        selected: MenuItem,
        ctx: MenuContext<'_>,
        actions: &mut Vec<MenuAction>,
    ) -> Screen {
        let mut position = selected.position();
        if buttons.up.fell {
            position = position.saturating_sub(1);
        }
        if buttons.down.fell {
            position += 1;
        }
        let selected = MenuItem::from_position(position);

        if buttons.left.fell {
            return Screen::Home;
        }
        if !buttons.right.fell {
            return Screen::Menu { selected };
        }

        match selected {
            MenuItem::Date => Screen::DateEdit {
                cursor: FieldCursor::new(DateDraft::CONFIRM),
                draft: DateDraft::from_datetime(&ctx.wall_clock),
            },
            MenuItem::Schedule => Screen::TempEdit {
                cursor: FieldCursor::new(ScheduleDraft::CONFIRM),
                draft: ScheduleDraft::from_schedule(ctx.schedule),
            },
            MenuItem::Wifi => Screen::WifiEdit(WifiEditor::new(ctx.wifi)),
            MenuItem::Version => {
                actions.push(MenuAction::CheckForUpdate);
                Screen::Version {
                    cursor: FieldCursor::new(1),
                }
            }
        }
    }

    fn date_edit(
        &mut self,
        buttons: &Buttons,
        mut cursor: FieldCursor,
        mut draft: DateDraft,
        now_ms: u64,
        actions: &mut Vec<MenuAction>,
    ) -> Screen {
        cursor.navigate(buttons);

        if cursor.is_back() {
            return Screen::Menu {
                selected: MenuItem::Date,
            };
        }
        if cursor.is_confirm() {
            if let Some(datetime) = draft.to_datetime() {
                actions.push(MenuAction::SetClock(datetime));
            }
            actions.push(MenuAction::ShowSaved);
            return Screen::Home;
        }

        let (field, min, max) = match cursor.value() {
            1 => (&mut draft.day, 1, 31),
            2 => (&mut draft.month, 1, 12),
            3 => (&mut draft.year, DateDraft::MIN_YEAR, DateDraft::MAX_YEAR),
            4 => (&mut draft.hour, 0, 23),
            _ => (&mut draft.minute, 0, 59),
        };
        self.adjust_int(buttons, field, min, max, now_ms);

        Screen::DateEdit { cursor, draft }
    }

    fn temp_edit(
        &mut self,
        buttons: &Buttons,
        mut cursor: FieldCursor,
        mut draft: ScheduleDraft,
        now_ms: u64,
        actions: &mut Vec<MenuAction>,
    ) -> Screen {
        cursor.navigate(buttons);

        if cursor.is_back() {
            return Screen::Menu {
                selected: MenuItem::Schedule,
            };
        }
        if cursor.is_confirm() {
            actions.push(MenuAction::CommitSchedule(draft.to_schedule()));
            actions.push(MenuAction::ShowSaved);
            return Screen::Home;
        }

        match cursor.value() {
            1 => self.adjust_int(buttons, &mut draft.day_hour, 0, 23, now_ms),
            2 => self.adjust_int(buttons, &mut draft.day_minute, 0, 59, now_ms),
            3 => self.adjust_float(buttons, &mut draft.day_temp_c, now_ms),
            4 => self.adjust_int(buttons, &mut draft.night_hour, 0, 23, now_ms),
            5 => self.adjust_int(buttons, &mut draft.night_minute, 0, 59, now_ms),
            _ => self.adjust_float(buttons, &mut draft.night_temp_c, now_ms),
        }

        Screen::TempEdit { cursor, draft }
    }

    fn adjust_int(&mut self, buttons: &Buttons, value: &mut i32, min: i32, max: i32, now_ms: u64) {
        self.up
            .adjust_wrapping(buttons.up, value, 1, min, max, now_ms, &self.repeat);
        self.down
            .adjust_wrapping(buttons.down, value, -1, min, max, now_ms, &self.repeat);
    }

    fn adjust_float(&mut self, buttons: &Buttons, value: &mut f32, now_ms: u64) {
        self.up
            .adjust_f32(buttons.up, value, TEMP_STEP_C, now_ms, &self.repeat);
        self.down
            .adjust_f32(buttons.down, value, -TEMP_STEP_C, now_ms, &self.repeat);
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self::new(RepeatConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{button::ButtonState, wifi_editor::WifiEditMode};
    use pretty_assertions::assert_eq;

    struct Harness {
        menu: Menu,
        now_ms: u64,
        wall_clock: NaiveDateTime,
        target_temp_c: f32,
        schedule: Schedule,
        wifi: WifiCredentials,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                menu: Menu::default(),
                now_ms: 0,
                wall_clock: NaiveDate::from_ymd_opt(2026, 3, 14)
                    .unwrap()
                    .and_hms_opt(15, 9, 26)
                    .unwrap(),
                target_temp_c: 24.0,
                schedule: Schedule::default(),
                wifi: WifiCredentials::new("Vivarium", "hunter2"),
            }
        }

        fn step(&mut self, buttons: Buttons) -> Vec<MenuAction> {
            self.now_ms += 1_000;
            let actions = self.menu.update(
                &buttons,
                MenuContext {
                    now_ms: self.now_ms,
                    wall_clock: self.wall_clock,
                    target_temp_c: &mut self.target_temp_c,
                    schedule: &self.schedule,
                    wifi: &self.wifi,
                },
            );
            for action in &actions {
                if let MenuAction::CommitSchedule(schedule) = action {
                    self.schedule = *schedule;
                }
            }
            actions
        }

        fn up(&mut self) -> Vec<MenuAction> {
            self.step(Buttons {
                up: ButtonState::pressed(),
                ..Buttons::default()
            })
        }

        fn down(&mut self) -> Vec<MenuAction> {
            self.step(Buttons {
                down: ButtonState::pressed(),
                ..Buttons::default()
            })
        }

        fn left(&mut self) -> Vec<MenuAction> {
            self.step(Buttons {
                left: ButtonState::pressed(),
                ..Buttons::default()
            })
        }

        fn right(&mut self) -> Vec<MenuAction> {
            self.step(Buttons {
                right: ButtonState::pressed(),
                ..Buttons::default()
            })
        }

        fn open(&mut self, item: MenuItem) -> Vec<MenuAction> {
            self.right();
            for _ in 1..item.position() {
                self.down();
            }
            self.right()
        }
    }

    #[test]
    fn right_on_home_opens_menu_on_first_item() {
        let mut h = Harness::new();
        assert!(h.right().is_empty());
        assert_eq!(
            h.menu.screen(),
            &Screen::Menu {
                selected: MenuItem::Date
            }
        );
    }

    #[test]
    fn menu_selection_is_clamped() {
        let mut h = Harness::new();
        h.right();
        h.up();
        assert_eq!(
            h.menu.screen(),
            &Screen::Menu {
                selected: MenuItem::Date
            }
        );
        for _ in 0..6 {
            h.down();
        }
        assert_eq!(
            h.menu.screen(),
            &Screen::Menu {
                selected: MenuItem::Version
            }
        );
        h.left();
        assert_eq!(h.menu.screen(), &Screen::Home);
    }

    #[test]
    fn home_nudge_sets_manual_override() {
        let mut h = Harness::new();
        h.up();
        h.up();
        assert!(h.menu.manual_override());
        assert_eq!(h.target_temp_c, 24.2);

        h.down();
        assert_eq!(h.target_temp_c, 24.1);

        h.left();
        assert!(!h.menu.manual_override());
        assert_eq!(h.menu.screen(), &Screen::Home);
    }

    #[test]
    fn leaving_temp_edit_at_cursor_zero_discards_changes() {
        let mut h = Harness::new();
        h.open(MenuItem::Schedule);
        h.up();
        let actions = h.left();

        assert!(actions.is_empty());
        assert_eq!(
            h.menu.screen(),
            &Screen::Menu {
                selected: MenuItem::Schedule
            }
        );
        assert_eq!(h.schedule, Schedule::default());
    }

    #[test]
    fn committed_schedule_is_shown_on_reentry() {
        let mut h = Harness::new();
        h.open(MenuItem::Schedule);

        h.down(); // day hour 9 -> 8
        h.right();
        h.right();
        h.up(); // day temp 25.5 -> 25.6
        h.right();
        h.right();
        h.right();
        h.up(); // night temp 20.5 -> 20.6
        let actions = h.right();

        let mut expected = Schedule::default();
        expected.day.time.hour = 8;
        expected.day.target_temp_c = 25.6;
        expected.night.target_temp_c = 20.6;
        assert_eq!(
            actions,
            vec![MenuAction::CommitSchedule(expected), MenuAction::ShowSaved]
        );
        assert_eq!(h.menu.screen(), &Screen::Home);

        h.open(MenuItem::Schedule);
        match h.menu.screen() {
            Screen::TempEdit { cursor, draft } => {
                assert_eq!(cursor.value(), 1);
                assert_eq!(draft, &ScheduleDraft::from_schedule(&expected));
                assert_eq!(draft.day_hour, 8);
            }
            other => panic!("unexpected screen {other:?}"),
        }
    }

    #[test]
    fn date_edit_starts_from_wall_clock_and_sets_clock() {
        let mut h = Harness::new();
        h.open(MenuItem::Date);
        match h.menu.screen() {
            Screen::DateEdit { draft, .. } => {
                assert_eq!(
                    *draft,
                    DateDraft {
                        day: 14,
                        month: 3,
                        year: 2026,
                        hour: 15,
                        minute: 9
                    }
                );
            }
            other => panic!("unexpected screen {other:?}"),
        }

        h.up(); // day 15
        for _ in 0..4 {
            h.right();
        }
        let actions = h.right();

        let expected = NaiveDate::from_ymd_opt(2026, 3, 15)
            .unwrap()
            .and_hms_opt(15, 9, 0)
            .unwrap();
        assert_eq!(
            actions,
            vec![MenuAction::SetClock(expected), MenuAction::ShowSaved]
        );
        assert_eq!(h.menu.screen(), &Screen::Home);
    }

    #[test]
    fn month_field_wraps() {
        let mut h = Harness::new();
        h.wall_clock = NaiveDate::from_ymd_opt(2026, 12, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        h.open(MenuItem::Date);
        h.right();
        h.up();

        match h.menu.screen() {
            Screen::DateEdit { cursor, draft } => {
                assert_eq!(cursor.value(), 2);
                assert_eq!(draft.month, 1);
            }
            other => panic!("unexpected screen {other:?}"),
        }

        h.down();
        match h.menu.screen() {
            Screen::DateEdit { draft, .. } => assert_eq!(draft.month, 12),
            other => panic!("unexpected screen {other:?}"),
        }
    }

    #[test]
    fn year_field_stays_in_clock_range() {
        let mut h = Harness::new();
        h.wall_clock = NaiveDate::from_ymd_opt(2199, 6, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        h.open(MenuItem::Date);
        h.right();
        h.right();
        h.up();
        match h.menu.screen() {
            Screen::DateEdit { cursor, draft } => {
                assert_eq!(cursor.value(), 3);
                assert_eq!(draft.year, 2000);
            }
            other => panic!("unexpected screen {other:?}"),
        }

        h.down();
        match h.menu.screen() {
            Screen::DateEdit { draft, .. } => assert_eq!(draft.year, 2199),
            other => panic!("unexpected screen {other:?}"),
        }
    }

    #[test]
    fn unset_clock_opens_at_first_supported_year() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(DateDraft::from_datetime(&epoch).year, 2000);
    }

    #[test]
    fn impossible_day_is_clamped_to_month_end() {
        let draft = DateDraft {
            day: 31,
            month: 2,
            year: 2026,
            hour: 7,
            minute: 45,
        };
        let expected = NaiveDate::from_ymd_opt(2026, 2, 28)
            .unwrap()
            .and_hms_opt(7, 45, 0)
            .unwrap();
        assert_eq!(draft.to_datetime(), Some(expected));

        let leap = DateDraft { year: 2028, ..draft };
        assert_eq!(leap.to_datetime().map(|dt| dt.day()), Some(29));
    }

    #[test]
    fn version_requests_update_check_and_returns_to_its_row() {
        let mut h = Harness::new();
        let actions = h.open(MenuItem::Version);
        assert_eq!(actions, vec![MenuAction::CheckForUpdate]);

        assert!(h.right().is_empty());
        h.left();
        assert_eq!(
            h.menu.screen(),
            &Screen::Menu {
                selected: MenuItem::Version
            }
        );
    }

    #[test]
    fn wifi_save_commits_and_returns_home() {
        let mut h = Harness::new();
        h.open(MenuItem::Wifi);
        assert!(matches!(
            h.menu.screen(),
            Screen::WifiEdit(editor) if editor.mode() == WifiEditMode::List { selected: 1 }
        ));

        h.down();
        h.down();
        let actions = h.right();

        assert_eq!(
            actions,
            vec![
                MenuAction::CommitWifi(WifiCredentials::new("Vivarium", "hunter2")),
                MenuAction::ShowSaved
            ]
        );
        assert_eq!(h.menu.screen(), &Screen::Home);
    }

    #[test]
    fn wifi_back_selects_wifi_row() {
        let mut h = Harness::new();
        h.open(MenuItem::Wifi);
        h.left();
        assert_eq!(
            h.menu.screen(),
            &Screen::Menu {
                selected: MenuItem::Wifi
            }
        );
    }
}
