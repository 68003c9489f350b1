//! Command-echo suppression.
//!
//! The engine publishes heater commands on the same channel it receives
//! manual overrides from, so every emitted command comes straight back
//! as an inbound command notification. Without suppression the engine's
//! own `OFF` would be read as "user disabled manual mode" and its own
//! `ON` as "user engaged manual mode" — a feedback loop between the
//! command-out and status-in paths.
//!
//! The guard records each emission and suppresses inbound commands that
//! match it within a short window (~0.1 s). This is deliberately not a
//! general-purpose debouncer: only the engine's own command class is
//! suppressed, and a genuinely manual command that matches it inside
//! the window is dropped. That race is accepted — closing it fully
//! would require correlating command identity across the transport,
//! which this design does not do.

use chrono::{Duration, NaiveDateTime};

use crate::app::commands::SwitchState;

/// Suppression state for the engine's own command emissions.
pub struct CommandEchoGuard {
    window: Duration,
    engaged: Option<(SwitchState, NaiveDateTime)>,
}

impl CommandEchoGuard {
    pub fn new(window_ms: u32) -> Self {
        Self {
            window: Duration::milliseconds(i64::from(window_ms)),
            engaged: None,
        }
    }

    /// Note an outgoing command immediately before it is handed to the
    /// transport. Any previous engagement is replaced unconditionally,
    /// so a failed emission never leaves the guard stuck.
    pub fn engage(&mut self, command: SwitchState, now: NaiveDateTime) {
        self.engaged = Some((command, now));
    }

    /// Whether an inbound command notification should be treated as the
    /// echo of our own recent emission rather than a manual override.
    pub fn suppresses(&self, command: SwitchState, now: NaiveDateTime) -> bool {
        self.engaged.is_some_and(|(own, at)| {
            let elapsed = now.signed_duration_since(at);
            command == own && elapsed >= Duration::zero() && elapsed <= self.window
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 12)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn after_ms(ms: i64) -> NaiveDateTime {
        t0() + Duration::milliseconds(ms)
    }

    #[test]
    fn suppresses_matching_echo_within_window() {
        let mut guard = CommandEchoGuard::new(100);
        guard.engage(SwitchState::Off, t0());
        assert!(guard.suppresses(SwitchState::Off, after_ms(50)));
        assert!(guard.suppresses(SwitchState::Off, after_ms(100)));
    }

    #[test]
    fn different_command_class_passes_through() {
        let mut guard = CommandEchoGuard::new(100);
        guard.engage(SwitchState::Off, t0());
        assert!(!guard.suppresses(SwitchState::On, after_ms(50)));
    }

    #[test]
    fn expired_window_passes_through() {
        let mut guard = CommandEchoGuard::new(100);
        guard.engage(SwitchState::Off, t0());
        assert!(!guard.suppresses(SwitchState::Off, after_ms(101)));
    }

    #[test]
    fn nothing_engaged_never_suppresses() {
        let guard = CommandEchoGuard::new(100);
        assert!(!guard.suppresses(SwitchState::On, t0()));
        assert!(!guard.suppresses(SwitchState::Off, t0()));
    }

    #[test]
    fn re_engagement_replaces_previous_command() {
        let mut guard = CommandEchoGuard::new(100);
        guard.engage(SwitchState::Off, t0());
        guard.engage(SwitchState::On, after_ms(20));
        assert!(!guard.suppresses(SwitchState::Off, after_ms(40)));
        assert!(guard.suppresses(SwitchState::On, after_ms(40)));
    }
}
