/// Decides the heater relay output from the measured and wanted temperature.
///
/// With a zero band this is a plain `current < target` compare. A positive
/// band keeps an idle heater off until the mat drops below `target - band`;
/// a running heater stays on until `target` is reached.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RelayPolicy {
    pub hysteresis_c: f32,
}

impl RelayPolicy {
    pub fn new(hysteresis_c: f32) -> Self {
        Self {
            hysteresis_c: hysteresis_c.max(0.0),
        }
    }

    pub fn decide(&self, relay_on: bool, current_c: f32, target_c: f32) -> bool {
        if relay_on {
            current_c < target_c
        } else {
            current_c < target_c - self.hysteresis_c
        }
    }
}
