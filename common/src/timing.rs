/// Opens once per `interval_ms`, and immediately on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalGate {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl IntervalGate {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    pub fn ready(&mut self, now_ms: u64) -> bool {
        let open = self
            .last_ms
            .map(|last| now_ms.saturating_sub(last) >= self.interval_ms)
            .unwrap_or(true);
        if open {
            self.last_ms = Some(now_ms);
        }
        open
    }
}
