//! Retry policies for the connection supervisor.
//!
//! The supervisor asks its policy how long to wait after each failed attempt.
//! `None` means give up. Swapping [`FixedDelay`] for [`Backoff`] changes the
//! retry behaviour without touching the supervisor.

/// Decides the wait between connection attempts.
pub trait RetryPolicy {
    /// Delay in milliseconds after failed attempt number `attempt` (0-based),
    /// or `None` to stop retrying.
    fn next_delay(&mut self, attempt: u32) -> Option<u32>;

    /// Called before a new sequence of attempts starts.
    fn reset(&mut self) {}
}

/// The same delay after every attempt.
///
/// Unbounded unless [`with_max_attempts`](FixedDelay::with_max_attempts) is
/// used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    delay_ms: u32,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    /// Retry forever, waiting `delay_ms` between attempts.
    pub const fn new(delay_ms: u32) -> Self {
        Self {
            delay_ms,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` attempts in total.
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl RetryPolicy for FixedDelay {
    fn next_delay(&mut self, attempt: u32) -> Option<u32> {
        match self.max_attempts {
            Some(max) if attempt.saturating_add(1) >= max => None,
            _ => Some(self.delay_ms),
        }
    }
}

/// Doubling delay from `initial_ms`, capped at `max_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial_ms: u32,
    max_ms: u32,
    max_attempts: Option<u32>,
}

impl Backoff {
    /// Retry forever, doubling the wait from `initial_ms` up to `max_ms`.
    pub const fn new(initial_ms: u32, max_ms: u32) -> Self {
        Self {
            initial_ms,
            max_ms,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` attempts in total.
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl RetryPolicy for Backoff {
    fn next_delay(&mut self, attempt: u32) -> Option<u32> {
        if let Some(max) = self.max_attempts {
            if attempt.saturating_add(1) >= max {
                return None;
            }
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        Some(self.initial_ms.saturating_mul(factor).min(self.max_ms))
    }
}
