//! Heater-effect safety watchdog.
//!
//! Tracks heater runtime against temperature rise and raises a one-shot
//! stall report when the heater appears to run without effect (window
//! left open, tripped breaker, dead element).
//!
//! ## Run lifecycle
//!
//! 1. OFF→ON edge: arm — remember the start instant and temperature.
//! 2. Each cycle while ON, once the observation window has elapsed:
//!    if the temperature failed to rise by the configured minimum,
//!    report once and latch.
//! 3. ON→OFF edge: disarm — the run window and the latch are cleared,
//!    so a new ON-run can report again.
//!
//! At most one report per contiguous ON-run; none while the heater is
//! OFF; evaluation is idempotent once latched.

use chrono::{Duration, NaiveDateTime};
use log::{debug, warn};

/// One stall detection, handed to the caller exactly once per ON-run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StallReport {
    /// Seconds the heater had been running when the stall was detected.
    pub elapsed_secs: i64,
    /// Temperature change since the run started (may be negative).
    pub delta_c: f32,
}

#[derive(Debug, Clone, Copy)]
struct RunWindow {
    started_at: NaiveDateTime,
    temp_at_start: f32,
    alert_latched: bool,
}

/// Safety watchdog over one heater.
pub struct SafetyWatchdog {
    window: Duration,
    min_rise_c: f32,
    run: Option<RunWindow>,
}

impl SafetyWatchdog {
    pub fn new(window_secs: u16, min_rise_c: f32) -> Self {
        Self {
            window: Duration::seconds(i64::from(window_secs)),
            min_rise_c,
            run: None,
        }
    }

    /// Evaluate one cycle. Returns a report on the single cycle where a
    /// stall is first detected, `None` otherwise.
    pub fn observe(
        &mut self,
        now: NaiveDateTime,
        heater_on: bool,
        temp_c: f32,
    ) -> Option<StallReport> {
        if !heater_on {
            if self.run.take().is_some() {
                debug!("watchdog disarmed (heater off)");
            }
            return None;
        }

        let run = self.run.get_or_insert_with(|| {
            debug!("watchdog armed at {temp_c:.2}C");
            RunWindow {
                started_at: now,
                temp_at_start: temp_c,
                alert_latched: false,
            }
        });

        if run.alert_latched {
            return None;
        }

        let elapsed = now.signed_duration_since(run.started_at);
        if elapsed < self.window {
            return None;
        }

        let delta_c = temp_c - run.temp_at_start;
        if delta_c <= self.min_rise_c {
            run.alert_latched = true;
            warn!(
                "heater ran {}s with no effect (delta {delta_c:+.2}C)",
                elapsed.num_seconds()
            );
            return Some(StallReport {
                elapsed_secs: elapsed.num_seconds(),
                delta_c,
            });
        }

        debug!("heating effective, rose {delta_c:+.2}C");
        None
    }

    /// Whether an ON-run is currently being tracked.
    pub fn is_armed(&self) -> bool {
        self.run.is_some()
    }

    /// Whether the current ON-run has already reported.
    pub fn is_latched(&self) -> bool {
        self.run.is_some_and(|r| r.alert_latched)
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

    fn after(secs: i64) -> NaiveDateTime {
        t0() + Duration::seconds(secs)
    }

    #[test]
    fn stagnation_reports_exactly_once_then_latches() {
        let mut wd = SafetyWatchdog::new(30, 0.1);

        assert_eq!(wd.observe(t0(), true, 18.0), None); // arms
        assert!(wd.is_armed());
        for s in 1..30 {
            assert_eq!(wd.observe(after(s), true, 18.05), None);
        }

        let report = wd.observe(after(30), true, 18.05).expect("stall report");
        assert_eq!(report.elapsed_secs, 30);
        assert!((report.delta_c - 0.05).abs() < 1e-6);
        assert!(wd.is_latched());

        for s in 31..=60 {
            assert_eq!(wd.observe(after(s), true, 18.05), None, "latched at {s}s");
        }
    }

    #[test]
    fn effective_heating_never_reports() {
        let mut wd = SafetyWatchdog::new(30, 0.1);
        wd.observe(t0(), true, 18.0);
        for s in 1..=120 {
            let temp = 18.0 + 0.02 * s as f32; // rises past the threshold
            assert_eq!(wd.observe(after(s), true, temp), None);
        }
        assert!(!wd.is_latched());
    }

    #[test]
    fn cooling_while_on_reports() {
        let mut wd = SafetyWatchdog::new(30, 0.1);
        wd.observe(t0(), true, 18.0);
        let report = wd.observe(after(30), true, 17.4).expect("cooling is a stall");
        assert!(report.delta_c < 0.0);
    }

    #[test]
    fn no_report_while_heater_off() {
        let mut wd = SafetyWatchdog::new(30, 0.1);
        for s in 0..=60 {
            assert_eq!(wd.observe(after(s), false, 18.0), None);
        }
        assert!(!wd.is_armed());
    }

    #[test]
    fn off_then_on_rearms_and_can_report_again() {
        let mut wd = SafetyWatchdog::new(30, 0.1);
        wd.observe(t0(), true, 18.0);
        assert!(wd.observe(after(30), true, 18.0).is_some());

        // Heater cycles off: latch and window are cleared.
        wd.observe(after(40), false, 18.0);
        assert!(!wd.is_armed());

        // New run starting at t=50 stalls again at t=80.
        assert_eq!(wd.observe(after(50), true, 18.0), None);
        let second = wd.observe(after(80), true, 18.02);
        assert!(second.is_some(), "fresh ON-run must be able to report");
    }

    #[test]
    fn window_measured_from_arming_instant() {
        let mut wd = SafetyWatchdog::new(30, 0.1);
        wd.observe(after(10), true, 18.0); // armed at t=10
        assert_eq!(wd.observe(after(39), true, 18.0), None, "29s elapsed");
        assert!(wd.observe(after(40), true, 18.0).is_some(), "30s elapsed");
    }
}
