//! Per-block, per-operation-kind cooldown state.
//!
//! Mutating commands carry the sender's wall-clock timestamp; the gate
//! compares elapsed milliseconds against a configured minimum. This defends
//! against accidental double-submission, not malicious replay. Cooldown
//! state always lives at block scope, never session scope.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Last-accepted timestamp for one operation kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cooldown {
    last_accepted_ms: Option<u64>,
}

impl Cooldown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds left before a request at `now_ms` would be accepted.
    pub fn remaining_ms(&self, now_ms: u64, min_interval_ms: u64) -> u64 {
        match self.last_accepted_ms {
            Some(last) => (last + min_interval_ms).saturating_sub(now_ms),
            None => 0,
        }
    }

    /// Accepts a request whose carried timestamp is at or past the
    /// threshold, recording it as the new last-accepted time. A request
    /// strictly inside the interval is rejected and leaves state unchanged.
    pub fn try_accept(&mut self, request_ms: u64, min_interval_ms: u64) -> Result<(), u64> {
        let remaining = self.remaining_ms(request_ms, min_interval_ms);
        if remaining > 0 {
            return Err(remaining);
        }
        self.last_accepted_ms = Some(request_ms);
        Ok(())
    }

    pub fn elapsed(&self, now_ms: u64, min_interval_ms: u64) -> bool {
        self.remaining_ms(now_ms, min_interval_ms) == 0
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.last_accepted_ms = Some(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_always_accepted() {
        let mut cd = Cooldown::new();
        assert!(cd.try_accept(1_000, 200).is_ok());
    }

    #[test]
    fn test_rejects_inside_interval() {
        let mut cd = Cooldown::new();
        cd.try_accept(1_000, 200).unwrap();
        // 199 ms later: rejected, no state change
        assert_eq!(cd.try_accept(1_199, 200), Err(1));
        // exactly at the threshold: accepted
        assert!(cd.try_accept(1_200, 200).is_ok());
        // and the window restarted from the accepted request
        assert!(cd.try_accept(1_399, 200).is_err());
        assert!(cd.try_accept(1_400, 200).is_ok());
    }

    #[test]
    fn test_rejection_leaves_window_unchanged() {
        let mut cd = Cooldown::new();
        cd.try_accept(1_000, 200).unwrap();
        let _ = cd.try_accept(1_100, 200);
        // window still anchored at 1_000
        assert!(cd.try_accept(1_200, 200).is_ok());
    }

    #[test]
    fn test_remaining_reports_time_left() {
        let mut cd = Cooldown::new();
        cd.reset(5_000);
        assert_eq!(cd.remaining_ms(5_500, 30_000), 29_500);
        assert_eq!(cd.remaining_ms(40_000, 30_000), 0);
        assert!(cd.elapsed(35_000, 30_000));
    }
}
