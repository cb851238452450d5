use crate::types::NetworkStatus;

/// Requests a station reconnect after a continuous outage of `retry_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiSupervisor {
    retry_ms: u64,
    disconnected_since_ms: Option<u64>,
}

impl WifiSupervisor {
    pub fn new(retry_ms: u64) -> Self {
        Self {
            retry_ms,
            disconnected_since_ms: None,
        }
    }

    /// Returns true when a reconnect attempt is due; the outage timer re-arms
    /// so the next attempt comes one interval later.
    pub fn poll(&mut self, status: &NetworkStatus, configured: bool, now_ms: u64) -> bool {
        if status.connected || !configured {
            self.disconnected_since_ms = None;
            return false;
        }

        match self.disconnected_since_ms {
            None => {
                self.disconnected_since_ms = Some(now_ms);
                false
            }
            Some(since) if now_ms.saturating_sub(since) >= self.retry_ms => {
                self.disconnected_since_ms = Some(now_ms);
                true
            }
            Some(_) => false,
        }
    }

    pub fn reset(&mut self) {
        self.disconnected_since_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnects_after_a_minute_then_every_minute() {
        let mut supervisor = WifiSupervisor::new(60_000);
        let down = NetworkStatus::disconnected();

        assert!(!supervisor.poll(&down, true, 1_000));
        assert!(!supervisor.poll(&down, true, 60_999));
        assert!(supervisor.poll(&down, true, 61_000));
        assert!(!supervisor.poll(&down, true, 61_010));
        assert!(supervisor.poll(&down, true, 121_000));
    }

    #[test]
    fn connection_clears_the_outage() {
        let mut supervisor = WifiSupervisor::new(60_000);
        let down = NetworkStatus::disconnected();

        supervisor.poll(&down, true, 0);
        supervisor.poll(&NetworkStatus::connected(-60), true, 30_000);
        assert!(!supervisor.poll(&down, true, 61_000));
        assert!(supervisor.poll(&down, true, 121_000));
    }

    #[test]
    fn no_credentials_means_no_retries() {
        let mut supervisor = WifiSupervisor::new(1_000);
        let down = NetworkStatus::disconnected();
        supervisor.poll(&down, false, 0);
        assert!(!supervisor.poll(&down, false, 10_000));
    }
}
