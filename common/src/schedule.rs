use core::f32::consts::PI;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn minute_of_day(self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    pub fn from_datetime(now: &NaiveDateTime) -> Self {
        Self {
            hour: now.hour() as u8,
            minute: now.minute() as u8,
        }
    }

    fn sanitize(&mut self) {
        self.hour = self.hour.min(23);
        self.minute = self.minute.min(59);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleAnchor {
    pub time: ClockTime,
    #[serde(rename = "targetTemp")]
    pub target_temp_c: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub day: ScheduleAnchor,
    pub night: ScheduleAnchor,
    #[serde(rename = "fadeMinutes", default = "default_fade_minutes")]
    pub fade_minutes: u16,
}

fn default_fade_minutes() -> u16 {
    120
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            day: ScheduleAnchor {
                time: ClockTime {
                    hour: 9,
                    minute: 30,
                },
                target_temp_c: 25.5,
            },
            night: ScheduleAnchor {
                time: ClockTime {
                    hour: 19,
                    minute: 0,
                },
                target_temp_c: 20.5,
            },
            fade_minutes: default_fade_minutes(),
        }
    }
}

impl Schedule {
    pub fn sanitize(&mut self) {
        let fallback = Self::default();
        self.day.time.sanitize();
        self.night.time.sanitize();
        if !self.day.target_temp_c.is_finite() {
            self.day.target_temp_c = fallback.day.target_temp_c;
        }
        if !self.night.target_temp_c.is_finite() {
            self.night.target_temp_c = fallback.night.target_temp_c;
        }
        self.fade_minutes = self.fade_minutes.clamp(1, MINUTES_PER_DAY - 1);
    }

    /// True while `now` falls in the day period `[day, night)` of the cycle.
    pub fn is_day(&self, now: ClockTime) -> bool {
        let day_m = self.day.time.minute_of_day();
        let night_m = self.night.time.minute_of_day();
        let now_m = now.minute_of_day();

        if day_m < night_m {
            now_m >= day_m && now_m < night_m
        } else {
            now_m >= day_m || now_m < night_m
        }
    }

    pub fn target_temperature(&self, now: ClockTime) -> f32 {
        let now_m = now.minute_of_day();
        let fade = self.fade_minutes.clamp(1, MINUTES_PER_DAY - 1);

        let (from, to) = if self.is_day(now) {
            (&self.night, &self.day)
        } else {
            (&self.day, &self.night)
        };

        let window_start = to.time.minute_of_day();
        let window_end = (window_start + fade) % MINUTES_PER_DAY;
        smooth_step(
            from.target_temp_c,
            to.target_temp_c,
            window_start,
            window_end,
            now_m,
        )
    }
}

/// Cosine S-curve from `start` to `end` across a minute-of-day window.
///
/// A window whose end is numerically before its start crosses midnight and is
/// unwrapped first; a `now` earlier than the window start is read as belonging
/// to the following day, which puts it past the window and yields `end`.
pub fn smooth_step(start: f32, end: f32, window_start: u16, window_end: u16, now: u16) -> f32 {
    let window_start = u32::from(window_start);
    let mut window_end = u32::from(window_end);
    let mut now = u32::from(now);

    if window_end < window_start {
        window_end += u32::from(MINUTES_PER_DAY);
    }
    if now < window_start {
        now += u32::from(MINUTES_PER_DAY);
    }

    if now <= window_start {
        return start;
    }
    if now >= window_end {
        return end;
    }

    let ratio = (now - window_start) as f32 / (window_end - window_start) as f32;
    let eased = (1.0 - (ratio * PI).cos()) / 2.0;
    start + eased * (end - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u8, minute: u8) -> ClockTime {
        ClockTime::new(hour, minute).unwrap()
    }

    fn anchors(day: (u8, u8), night: (u8, u8)) -> Schedule {
        Schedule {
            day: ScheduleAnchor {
                time: at(day.0, day.1),
                target_temp_c: 26.0,
            },
            night: ScheduleAnchor {
                time: at(night.0, night.1),
                target_temp_c: 20.0,
            },
            fade_minutes: 120,
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn afternoon_is_settled_on_day_target() {
        let schedule = anchors((9, 30), (19, 0));
        assert_eq!(schedule.target_temperature(at(14, 0)), 26.0);
    }

    #[test]
    fn morning_before_day_anchor_is_night_target() {
        let schedule = anchors((9, 30), (19, 0));
        assert_eq!(schedule.target_temperature(at(9, 0)), 20.0);
    }

    #[test]
    fn continuous_at_both_ends_of_each_fade() {
        let schedule = anchors((9, 30), (19, 0));

        assert_eq!(schedule.target_temperature(at(9, 30)), 20.0);
        assert_eq!(schedule.target_temperature(at(11, 30)), 26.0);
        assert_eq!(schedule.target_temperature(at(19, 0)), 26.0);
        assert_eq!(schedule.target_temperature(at(21, 0)), 20.0);

        let just_before = schedule.target_temperature(at(11, 29));
        assert!(just_before < 26.0 && just_before > 25.9);
    }

    #[test]
    fn midpoint_of_fade_is_halfway() {
        let schedule = anchors((9, 30), (19, 0));
        assert!(close(schedule.target_temperature(at(10, 30)), 23.0));
        assert!(close(schedule.target_temperature(at(20, 0)), 23.0));
    }

    #[test]
    fn fade_is_monotonic() {
        let schedule = anchors((9, 30), (19, 0));
        let mut previous = schedule.target_temperature(at(9, 30));
        for minute in 1..=120u16 {
            let m = 9 * 60 + 30 + minute;
            let value = schedule.target_temperature(at((m / 60) as u8, (m % 60) as u8));
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn inverted_cycle_uses_wrapped_day_period() {
        let schedule = anchors((22, 0), (6, 0));

        assert!(schedule.is_day(at(23, 0)));
        assert!(schedule.is_day(at(3, 0)));
        assert!(!schedule.is_day(at(12, 0)));

        assert_eq!(schedule.target_temperature(at(3, 0)), 26.0);
        assert_eq!(schedule.target_temperature(at(12, 0)), 20.0);
    }

    #[test]
    fn fade_crossing_midnight_interpolates() {
        let schedule = anchors((22, 0), (6, 0));

        assert_eq!(schedule.target_temperature(at(22, 0)), 20.0);
        assert!(close(schedule.target_temperature(at(23, 0)), 23.0));
        assert_eq!(schedule.target_temperature(at(0, 0)), 26.0);
        assert_eq!(schedule.target_temperature(at(0, 30)), 26.0);
    }

    #[test]
    fn fade_starting_late_evening_wraps_past_midnight() {
        let schedule = anchors((8, 0), (23, 30));

        let half_hour_in = schedule.target_temperature(at(0, 0));
        assert!(half_hour_in < 26.0 && half_hour_in > 20.0);
        assert!(close(schedule.target_temperature(at(0, 30)), 23.0));
        assert_eq!(schedule.target_temperature(at(1, 30)), 20.0);
    }

    #[test]
    fn smooth_step_clamps_outside_window() {
        assert_eq!(smooth_step(10.0, 20.0, 600, 720, 600), 10.0);
        assert_eq!(smooth_step(10.0, 20.0, 600, 720, 720), 20.0);
        assert_eq!(smooth_step(10.0, 20.0, 600, 720, 900), 20.0);
        assert!(close(smooth_step(10.0, 20.0, 600, 720, 660), 15.0));
    }

    #[test]
    fn sanitize_repairs_out_of_range_values() {
        let mut schedule = anchors((9, 30), (19, 0));
        schedule.day.time.hour = 40;
        schedule.night.target_temp_c = f32::NAN;
        schedule.fade_minutes = 0;

        schedule.sanitize();

        assert_eq!(schedule.day.time.hour, 23);
        assert_eq!(schedule.night.target_temp_c, 20.5);
        assert_eq!(schedule.fade_minutes, 1);
    }
}
