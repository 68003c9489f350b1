//! Cadence engine.
//!
//! Coexists with the 1 Hz decision cycle: slower recurring work
//! (weather refresh, habit-grid rebuild) is described as schedules that
//! fire every N seconds. The scheduler notifies a
//! [`SchedulerDelegate`] when schedules fire; the main loop implements
//! the delegate to push events into the queue.
//!
//! The struct is intentionally decoupled from the event system: when a
//! schedule fires it invokes the delegate callback rather than pushing
//! events directly, which keeps it independently testable.

use crate::app::ports::{ScheduleFiredKind, SchedulerDelegate};
use log::info;

// ═══════════════════════════════════════════════════════════════
//  Schedule types
// ═══════════════════════════════════════════════════════════════

/// A single schedule entry.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Human-readable label (e.g., "weather-refresh").
    pub label: &'static str,
    /// Type of schedule.
    pub kind: ScheduleKind,
    /// Whether this schedule is currently enabled.
    pub enabled: bool,
}

/// The type of schedule determines how and when it fires.
#[derive(Debug, Clone)]
pub enum ScheduleKind {
    /// Fire every `interval_secs` seconds.
    Periodic { interval_secs: u32 },
    /// Fire once after `delay_secs`, then auto-disable.
    /// `delay_secs: 0` fires on the first tick (startup priming).
    OneShot { delay_secs: u32 },
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent schedules.
const MAX_SCHEDULES: usize = 4;

/// The cadence engine.
pub struct Scheduler {
    /// Active schedules.
    schedules: [Option<ScheduleEntry>; MAX_SCHEDULES],
    /// Global enable flag.
    enabled: bool,
}

/// Internal bookkeeping for a live schedule.
#[derive(Debug, Clone)]
struct ScheduleEntry {
    schedule: Schedule,
    /// Ticks elapsed since last fire (for Periodic).
    elapsed_ticks: u64,
    /// Whether the schedule has fired (for OneShot).
    fired: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            schedules: [None, None, None, None],
            enabled: true,
        }
    }

    /// Add a schedule. Returns the slot index, or `None` if full.
    pub fn add(&mut self, schedule: Schedule) -> Option<usize> {
        for (i, slot) in self.schedules.iter_mut().enumerate() {
            if slot.is_none() {
                info!("scheduler: added '{}' at slot {}", schedule.label, i);
                *slot = Some(ScheduleEntry {
                    schedule,
                    elapsed_ticks: 0,
                    fired: false,
                });
                return Some(i);
            }
        }
        None // All slots full.
    }

    /// Remove a schedule by slot index.
    pub fn remove(&mut self, slot: usize) {
        if slot < MAX_SCHEDULES {
            if let Some(entry) = &self.schedules[slot] {
                info!(
                    "scheduler: removed '{}' from slot {}",
                    entry.schedule.label, slot
                );
            }
            self.schedules[slot] = None;
        }
    }

    /// Enable or disable the entire scheduler.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Tick the scheduler. Call once per control loop tick.
    ///
    /// When a schedule fires, `delegate.on_schedule_fired()` is called
    /// with the schedule label and fire kind. The caller decides what
    /// to do with the notification (e.g., push an event, log, etc.).
    ///
    /// * `tick_secs` — duration of one tick in seconds.
    pub fn tick(&mut self, tick_secs: f32, delegate: &mut dyn SchedulerDelegate) {
        if !self.enabled {
            return;
        }

        for slot in &mut self.schedules {
            let entry = match slot {
                Some(e) if e.schedule.enabled => e,
                _ => continue,
            };

            let elapsed_secs = entry.elapsed_ticks as f32 * tick_secs;
            entry.elapsed_ticks += 1;

            match &entry.schedule.kind {
                ScheduleKind::Periodic { interval_secs } => {
                    // First fire after one full interval.
                    if entry.elapsed_ticks as f32 * tick_secs >= *interval_secs as f32 {
                        info!(
                            "scheduler: '{}' periodic fire (every {}s)",
                            entry.schedule.label, interval_secs
                        );
                        delegate
                            .on_schedule_fired(entry.schedule.label, ScheduleFiredKind::Periodic);
                        entry.elapsed_ticks = 0;
                    }
                }

                ScheduleKind::OneShot { delay_secs } => {
                    if !entry.fired && elapsed_secs >= *delay_secs as f32 {
                        info!(
                            "scheduler: '{}' one-shot fired (after {}s)",
                            entry.schedule.label, delay_secs
                        );
                        delegate.on_schedule_fired(entry.schedule.label, ScheduleFiredKind::OneShot);
                        entry.fired = true;
                        entry.schedule.enabled = false; // Auto-disable.
                    }
                }
            }
        }
    }

    /// Number of active (enabled) schedules.
    pub fn active_count(&self) -> usize {
        self.schedules
            .iter()
            .filter(|s| s.as_ref().is_some_and(|e| e.schedule.enabled))
            .count()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    /// Test delegate that records fire events.
    struct RecordingDelegate {
        fires: Vec<(String, ScheduleFiredKind)>,
    }

    impl RecordingDelegate {
        fn new() -> Self {
            Self { fires: Vec::new() }
        }
    }

    impl SchedulerDelegate for RecordingDelegate {
        fn on_schedule_fired(&mut self, label: &str, kind: ScheduleFiredKind) {
            self.fires.push((label.to_string(), kind));
        }
    }

    #[test]
    fn periodic_fires_at_interval() {
        let mut sched = Scheduler::new();
        let mut delegate = RecordingDelegate::new();

        sched.add(Schedule {
            label: "test-periodic",
            kind: ScheduleKind::Periodic { interval_secs: 10 },
            enabled: true,
        });

        // Tick 9 times at 1s each — should NOT fire.
        for _ in 0..9 {
            sched.tick(1.0, &mut delegate);
        }
        assert!(delegate.fires.is_empty());

        // 10th tick — should fire.
        sched.tick(1.0, &mut delegate);
        assert_eq!(delegate.fires.len(), 1);
        assert_eq!(delegate.fires[0].0, "test-periodic");
        assert_eq!(delegate.fires[0].1, ScheduleFiredKind::Periodic);
    }

    #[test]
    fn periodic_keeps_firing() {
        let mut sched = Scheduler::new();
        let mut delegate = RecordingDelegate::new();

        sched.add(Schedule {
            label: "test-repeat",
            kind: ScheduleKind::Periodic { interval_secs: 5 },
            enabled: true,
        });

        for _ in 0..20 {
            sched.tick(1.0, &mut delegate);
        }
        assert_eq!(delegate.fires.len(), 4);
    }

    #[test]
    fn oneshot_fires_once() {
        let mut sched = Scheduler::new();
        let mut delegate = RecordingDelegate::new();

        sched.add(Schedule {
            label: "test-oneshot",
            kind: ScheduleKind::OneShot { delay_secs: 5 },
            enabled: true,
        });

        for _ in 0..5 {
            sched.tick(1.0, &mut delegate);
        }
        assert!(delegate.fires.is_empty());

        // 6th tick — elapsed reaches 5s, fires.
        sched.tick(1.0, &mut delegate);
        assert_eq!(delegate.fires.len(), 1);
        assert_eq!(delegate.fires[0].1, ScheduleFiredKind::OneShot);

        // Subsequent ticks — no more fires.
        for _ in 0..10 {
            sched.tick(1.0, &mut delegate);
        }
        assert_eq!(delegate.fires.len(), 1);
        assert_eq!(sched.active_count(), 0);
    }

    #[test]
    fn zero_delay_oneshot_fires_on_first_tick() {
        let mut sched = Scheduler::new();
        let mut delegate = RecordingDelegate::new();

        sched.add(Schedule {
            label: "prime",
            kind: ScheduleKind::OneShot { delay_secs: 0 },
            enabled: true,
        });

        sched.tick(1.0, &mut delegate);
        assert_eq!(delegate.fires.len(), 1);
    }

    #[test]
    fn disabled_scheduler_does_nothing() {
        let mut sched = Scheduler::new();
        let mut delegate = RecordingDelegate::new();

        sched.add(Schedule {
            label: "test-disabled",
            kind: ScheduleKind::Periodic { interval_secs: 1 },
            enabled: true,
        });
        sched.set_enabled(false);

        for _ in 0..10 {
            sched.tick(1.0, &mut delegate);
        }
        assert!(delegate.fires.is_empty());
    }

    #[test]
    fn remove_frees_the_slot() {
        let mut sched = Scheduler::new();
        let slot = sched
            .add(Schedule {
                label: "short-lived",
                kind: ScheduleKind::Periodic { interval_secs: 1 },
                enabled: true,
            })
            .unwrap();
        assert_eq!(sched.active_count(), 1);
        sched.remove(slot);
        assert_eq!(sched.active_count(), 0);
    }
}
