use crate::{button::ButtonState, config::RepeatConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoRepeat {
    pressed_since_ms: u64,
    last_repeat_ms: u64,
}

impl AutoRepeat {
    pub fn poll(&mut self, button: ButtonState, now_ms: u64, config: &RepeatConfig) -> u32 {
        let mut steps = 0;

        if button.fell {
            self.pressed_since_ms = now_ms;
            self.last_repeat_ms = now_ms;
            steps += 1;
        }

        if button.held {
            let held_ms = now_ms.saturating_sub(self.pressed_since_ms);
            let interval_ms = if held_ms > config.fast_after_ms {
                config.fast_interval_ms
            } else if held_ms > config.slow_after_ms {
                config.slow_interval_ms
            } else {
                0
            };

            if interval_ms > 0 && now_ms.saturating_sub(self.last_repeat_ms) >= interval_ms {
                self.last_repeat_ms = now_ms;
                steps += 1;
            }
        }

        steps
    }

    /// Float field: exactly `step` per event, unbounded.
    pub fn adjust_f32(
        &mut self,
        button: ButtonState,
        value: &mut f32,
        step: f32,
        now_ms: u64,
        config: &RepeatConfig,
    ) -> bool {
        let steps = self.poll(button, now_ms, config);
        for _ in 0..steps {
            *value = step_f32(*value, step);
        }
        steps > 0
    }

    #[allow(clippy::too_many_arguments)]
    pub fn adjust_wrapping(
        &mut self,
        button: ButtonState,
        value: &mut i32,
        step: i32,
        min: i32,
        max: i32,
        now_ms: u64,
        config: &RepeatConfig,
    ) -> bool {
        let steps = self.poll(button, now_ms, config);
        for _ in 0..steps {
            *value = wrap_step(*value, step, min, max);
        }
        steps > 0
    }
}

pub fn wrap_step(value: i32, step: i32, min: i32, max: i32) -> i32 {
    let next = value + step;
    if next > max {
        min
    } else if next < min {
        max
    } else {
        next
    }
}

// Values already on the 0.1 grid are snapped back onto it after the step so
// repeated edits do not accumulate float error. Off-grid values, such as a
// target taken mid-fade, move by the raw step.
fn step_f32(value: f32, step: f32) -> f32 {
    let tenths = value * 10.0;
    let next = value + step;
    if (tenths - tenths.round()).abs() < 1e-3 {
        (next * 10.0).round() / 10.0
    } else {
        next
    }
}
