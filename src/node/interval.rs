//! Time gates for periodic work.

/// Fires once per `period_ms`.
///
/// An interval created with [`new`](Interval::new) fires on its first check;
/// one created with [`starting_at`](Interval::starting_at) waits a full period
/// first. Time going backwards never fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period_ms: u64,
    last: Option<u64>,
}

impl Interval {
    /// An interval that is due immediately.
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last: None,
        }
    }

    /// An interval whose first firing is at `now_ms + period_ms`.
    pub const fn starting_at(period_ms: u64, now_ms: u64) -> Self {
        Self {
            period_ms,
            last: Some(now_ms),
        }
    }

    /// Returns `true` and restarts the period if it has elapsed at `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now_ms.checked_sub(last).is_some_and(|e| e >= self.period_ms),
        };
        if due {
            self.last = Some(now_ms);
        }
        due
    }
}
