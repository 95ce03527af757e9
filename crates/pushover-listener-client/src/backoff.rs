//! Reconnect delay bookkeeping.

use std::time::Duration;

use crate::ReconnectConfig;

/// Floor for the reconnect delay.
pub const MIN_DELAY: Duration = Duration::from_secs(1);

/// Current reconnect delay, bounded by `[initial, max]`.
///
/// Owned by the supervisor loop; reset after every successful login and
/// grown after every failed or dropped connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectState {
    initial: Duration,
    max: Duration,
    factor: u32,
    current: Duration,
}

impl ReconnectState {
    /// `initial` is raised to at least [`MIN_DELAY`], a `max` below `initial`
    /// is raised to `initial`, and a zero factor is treated as 1.
    #[must_use]
    pub fn new(initial: Duration, max: Duration, factor: u32) -> Self {
        let initial = initial.max(MIN_DELAY);
        Self {
            initial,
            max: max.max(initial),
            factor: factor.max(1),
            current: initial,
        }
    }

    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Grow the delay for the next attempt.
    pub fn advance(&mut self) {
        self.current = self
            .current
            .checked_mul(self.factor)
            .map_or(self.max, |next| next.min(self.max));
    }

    /// Back to the initial delay.
    pub const fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl From<&ReconnectConfig> for ReconnectState {
    fn from(config: &ReconnectConfig) -> Self {
        Self::new(config.initial_delay(), config.max_delay(), config.factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_doubles_until_capped() {
        let mut state = ReconnectState::from(&ReconnectConfig::default());
        let mut observed = Vec::new();
        for _ in 0..7 {
            observed.push(state.current());
            state.advance();
        }
        assert_eq!(observed, [10, 20, 40, 80, 160, 300, 300].map(secs).to_vec());
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut state = ReconnectState::new(secs(1), secs(8), 2);
        state.advance();
        state.advance();
        assert_eq!(state.current(), secs(4));
        state.reset();
        assert_eq!(state.current(), secs(1));
    }

    #[test]
    fn test_bounds_are_normalised() {
        let mut state = ReconnectState::new(secs(5), secs(1), 0);
        assert_eq!(state.current(), secs(5));
        state.advance();
        assert_eq!(state.current(), secs(5));
    }

    #[test]
    fn test_zero_initial_delay_is_raised_to_floor() {
        let mut state = ReconnectState::new(Duration::ZERO, Duration::ZERO, 2);
        assert_eq!(state.current(), MIN_DELAY);
        state.advance();
        assert_eq!(state.current(), MIN_DELAY);
        state.reset();
        assert_eq!(state.current(), MIN_DELAY);
    }
}
