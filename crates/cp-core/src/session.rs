use serde::{Deserialize, Serialize};

/// Connection lifecycle state of the sync session.
///
/// Design principle: this is a pure type state machine with only state
/// definitions and transition validation. Runtime behavior (timers, sockets,
/// sleeps) lives in the application layer.
///
/// State transitions:
///
/// ```text
/// Disconnected ──→ Connecting ──→ Connected
///       ↑              │              │
///       │ (give up)    │ (fail)       │ (close/error)
///       └───── Reconnecting ←─────────┘
///                      │
///                      └─→ Connecting (retry timer fires)
///
/// Any state ──→ Closed (manual disconnect, absorbing)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not connected and no retry scheduled.
    Disconnected,
    /// A transport connect is in flight.
    Connecting,
    /// Transport open; heartbeat running.
    Connected,
    /// Waiting out the reconnect interval before the next attempt.
    Reconnecting,
    /// Manually closed. Absorbing: no automatic reconnect ever leaves it.
    Closed,
}

/// What the runtime should do after a connection loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Schedule a retry after the reconnect interval.
    Retry { attempt: u32 },
    /// Attempt budget exhausted; stay down until an explicit connect.
    GiveUp,
    /// The loss was a manual disconnect; nothing to schedule.
    Absorbed,
}

/// Pure reconnect bookkeeping for one logical session.
///
/// `max_attempts == 0` means unlimited retries.
#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
    attempts: u32,
    max_attempts: u32,
}

impl SessionMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: SessionState::Disconnected,
            attempts: 0,
            max_attempts,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Begin a connect attempt. Valid from Disconnected (explicit connect)
    /// and Reconnecting (retry timer fired); counted against the budget.
    pub fn on_connect_started(&mut self) -> bool {
        match self.state {
            SessionState::Disconnected | SessionState::Reconnecting => {
                self.state = SessionState::Connecting;
                self.attempts += 1;
                true
            }
            _ => false,
        }
    }

    /// Transport opened: attempt counter resets so the next outage gets a
    /// fresh budget.
    pub fn on_open(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Connected;
            self.attempts = 0;
        }
    }

    /// Transport closed or connect failed.
    ///
    /// `manual` marks an explicit disconnect and absorbs into Closed,
    /// suppressing the reconnect path.
    pub fn on_closed(&mut self, manual: bool) -> ReconnectDecision {
        if manual {
            self.state = SessionState::Closed;
            return ReconnectDecision::Absorbed;
        }
        match self.state {
            SessionState::Closed => ReconnectDecision::Absorbed,
            _ => {
                if self.max_attempts == 0 || self.attempts < self.max_attempts {
                    self.state = SessionState::Reconnecting;
                    ReconnectDecision::Retry {
                        attempt: self.attempts + 1,
                    }
                } else {
                    self.state = SessionState::Disconnected;
                    ReconnectDecision::GiveUp
                }
            }
        }
    }

    /// Re-open the machine after a manual close, for an explicit reconnect.
    pub fn reset(&mut self) {
        self.state = SessionState::Disconnected;
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_open_close_retry_flow() {
        let mut m = SessionMachine::new(0);
        assert!(m.on_connect_started());
        assert_eq!(m.state(), SessionState::Connecting);

        m.on_open();
        assert!(m.is_connected());
        assert_eq!(m.attempts(), 0);

        assert_eq!(m.on_closed(false), ReconnectDecision::Retry { attempt: 1 });
        assert_eq!(m.state(), SessionState::Reconnecting);

        assert!(m.on_connect_started());
        m.on_open();
        assert!(m.is_connected());
    }

    #[test]
    fn attempt_budget_is_bounded() {
        // max 3 attempts: after the 3rd consecutive failure no 4th attempt
        // may be scheduled
        let mut m = SessionMachine::new(3);

        for expected_attempt in 1..=3u32 {
            assert!(m.on_connect_started());
            assert_eq!(m.attempts(), expected_attempt);
            let decision = m.on_closed(false);
            if expected_attempt < 3 {
                assert_eq!(
                    decision,
                    ReconnectDecision::Retry {
                        attempt: expected_attempt + 1
                    }
                );
            } else {
                assert_eq!(decision, ReconnectDecision::GiveUp);
            }
        }
        assert_eq!(m.state(), SessionState::Disconnected);
        // no retry scheduled; only an explicit connect may continue
    }

    #[test]
    fn successful_open_resets_the_budget() {
        let mut m = SessionMachine::new(2);
        assert!(m.on_connect_started());
        assert!(matches!(m.on_closed(false), ReconnectDecision::Retry { .. }));
        assert!(m.on_connect_started());
        m.on_open();
        assert_eq!(m.attempts(), 0);

        // a fresh outage gets the full budget again
        assert!(matches!(m.on_closed(false), ReconnectDecision::Retry { .. }));
    }

    #[test]
    fn manual_close_absorbs() {
        let mut m = SessionMachine::new(0);
        m.on_connect_started();
        m.on_open();

        assert_eq!(m.on_closed(true), ReconnectDecision::Absorbed);
        assert!(m.is_closed());

        // absorbing: neither reconnect nor connect leaves Closed
        assert_eq!(m.on_closed(false), ReconnectDecision::Absorbed);
        assert!(!m.on_connect_started());
        assert!(m.is_closed());

        // explicit reset re-opens the machine
        m.reset();
        assert!(m.on_connect_started());
    }

    #[test]
    fn unlimited_retries_with_zero_budget() {
        let mut m = SessionMachine::new(0);
        for _ in 0..100 {
            assert!(m.on_connect_started());
            assert!(matches!(m.on_closed(false), ReconnectDecision::Retry { .. }));
        }
    }
}
