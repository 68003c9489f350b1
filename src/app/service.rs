//! Controller service — the hexagonal core.
//!
//! [`ControllerService`] owns the controller state, the habit source,
//! the safety watchdog and the echo guard. It exposes a clean,
//! transport-agnostic API. All I/O flows through port traits injected
//! at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!  InboundMessage ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                     │      ControllerService       │
//!        Reading ──▶  │  decide · Watchdog · Echo    │
//!                     └──────────────────────────────┘
//! ```

use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::echo::CommandEchoGuard;
use crate::habit::HabitSource;
use crate::watchdog::SafetyWatchdog;

use super::commands::{InboundMessage, OccupancySignal, SwitchState};
use super::events::{AppEvent, Reading};
use super::ports::{EventSink, HistoryStore, MotionRecord};

// ───────────────────────────────────────────────────────────────
// Controller state
// ───────────────────────────────────────────────────────────────

/// Combined heater/mode summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Automatic regulation, heater currently off.
    AutoOff,
    /// Automatic regulation, heater currently on.
    AutoOn,
    /// Manual override: automatic actuation disabled entirely.
    Manual,
}

/// Consolidated controller state.
///
/// A single logical owner even though updates originate from several
/// asynchronous sources: every mutation happens on the event-queue
/// consumer thread, inside [`ControllerService`].
#[derive(Debug, Clone, Copy)]
pub struct ControllerState {
    pub heater_on: bool,
    pub manual_mode: bool,
    pub target_temp_c: f32,
    pub tolerance_c: f32,
    pub live_occupancy: bool,
    pub hardware_online: bool,
    pub app_online: bool,
}

impl ControllerState {
    pub fn new(target_temp_c: f32, tolerance_c: f32) -> Self {
        Self {
            heater_on: false,
            manual_mode: false,
            target_temp_c,
            tolerance_c,
            live_occupancy: false,
            hardware_online: false,
            app_online: false,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.manual_mode {
            Mode::Manual
        } else if self.heater_on {
            Mode::AutoOn
        } else {
            Mode::AutoOff
        }
    }

    /// Whether both required collaborators report online.
    pub fn collaborators_online(&self) -> bool {
        self.hardware_online && self.app_online
    }
}

// ───────────────────────────────────────────────────────────────
// Decision function
// ───────────────────────────────────────────────────────────────

/// Per-cycle decision: at most one heater command.
///
/// Pure — all inputs are explicit, so the regulation policy is testable
/// in isolation. `None` means "leave the heater as it is"; the engine
/// therefore never emits two consecutive identical commands without an
/// external state change in between.
pub fn decide(
    state: &ControllerState,
    habit_active: bool,
    current_temp_c: f32,
) -> Option<SwitchState> {
    // Manual override disables all automatic actuation.
    if state.manual_mode {
        return None;
    }

    let occupied = state.live_occupancy || habit_active;
    if !occupied {
        // Empty house: energy saving — switch off if running.
        return state.heater_on.then_some(SwitchState::Off);
    }

    let deviation = (current_temp_c - state.target_temp_c).abs();
    if deviation <= state.tolerance_c {
        // Inside the hysteresis band: stop heating, never start it.
        state.heater_on.then_some(SwitchState::Off)
    } else if state.heater_on {
        None
    } else {
        Some(SwitchState::On)
    }
}

// ───────────────────────────────────────────────────────────────
// ControllerService
// ───────────────────────────────────────────────────────────────

/// The controller service orchestrates all domain logic.
pub struct ControllerService<H: HabitSource> {
    state: ControllerState,
    habit: H,
    watchdog: SafetyWatchdog,
    echo_guard: CommandEchoGuard,
    /// Most recent ambient reading; stays current until replaced.
    latest: Option<Reading>,
}

impl<H: HabitSource> ControllerService<H> {
    /// Construct the service from configuration and a habit source
    /// chosen by the caller (learning model or null object).
    pub fn new(config: &SystemConfig, habit: H) -> Self {
        Self {
            state: ControllerState::new(config.target_temp_c, config.tolerance_c),
            habit,
            watchdog: SafetyWatchdog::new(config.watchdog_window_secs, config.watchdog_min_rise_c),
            echo_guard: CommandEchoGuard::new(config.echo_window_ms),
            latest: None,
        }
    }

    /// Announce the initial mode. Call once before the first tick.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        info!("controller started in {:?}", self.state.mode());
        sink.emit(&AppEvent::Started(self.state.mode()));
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn latest_reading(&self) -> Option<Reading> {
        self.latest
    }

    // ── Inbound handling ──────────────────────────────────────

    /// Accept a fresh ambient reading and re-publish it as telemetry.
    pub fn update_reading(&mut self, reading: Reading, sink: &mut impl EventSink) {
        debug!(
            "reading: {:.2}C / {:.0}%RH",
            reading.temperature_c, reading.humidity_pct
        );
        self.latest = Some(reading);
        sink.emit(&AppEvent::Reading(reading));
    }

    /// Rebuild the habit grid from the full event log.
    pub fn rebuild_habits(&mut self) {
        self.habit.rebuild();
    }

    /// Process one decoded transport message.
    pub fn handle_message(
        &mut self,
        msg: InboundMessage,
        now: NaiveDateTime,
        history: &mut impl HistoryStore,
        sink: &mut impl EventSink,
    ) {
        let prev_mode = self.state.mode();

        match msg {
            InboundMessage::HeaterStatus(status) => {
                // Status reports are authoritative: they confirm our own
                // optimistic intent and track out-of-band switching.
                if self.state.heater_on != status.is_on() {
                    debug!("heater status: {status}");
                }
                self.state.heater_on = status.is_on();
            }

            InboundMessage::Occupancy(OccupancySignal::Detected) => {
                if !self.state.live_occupancy {
                    info!("motion detected — zone active");
                }
                self.state.live_occupancy = true;
                self.habit.record_event(now);
                if let Err(e) = history.append(&MotionRecord::at(now)) {
                    warn!("history append failed: {e}");
                }
            }

            InboundMessage::Occupancy(OccupancySignal::Clear) => {
                if self.state.live_occupancy {
                    info!("motion clear");
                }
                self.state.live_occupancy = false;
            }

            InboundMessage::TargetTemp(target) => {
                info!("new target received: {target:.1}C");
                self.state.target_temp_c = target;
            }

            InboundMessage::RemoteCommand(cmd) => {
                if self.echo_guard.suppresses(cmd, now) {
                    debug!("ignoring echo of own {cmd} command");
                } else {
                    self.state.manual_mode = cmd.is_on();
                    if self.state.manual_mode {
                        info!("manual override ACTIVATED — automatic logic suspended");
                    } else {
                        info!("manual override deactivated — returning to auto");
                    }
                }
            }

            InboundMessage::HardwareOnline(online) => {
                if self.state.hardware_online && !online {
                    warn!("heater hardware lost — pausing");
                } else if !self.state.hardware_online && online {
                    info!("heater hardware online");
                }
                self.state.hardware_online = online;
            }

            InboundMessage::AppOnline(online) => {
                if self.state.app_online && !online {
                    warn!("companion app disconnected — pausing");
                } else if !self.state.app_online && online {
                    info!("companion app online");
                }
                self.state.app_online = online;
            }
        }

        self.emit_mode_change(prev_mode, sink);
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one decision cycle: habit → watchdog → decide.
    ///
    /// Emits at most one heater command. Does nothing at all while a
    /// required collaborator is offline (the wait phase must not
    /// actuate the heater).
    pub fn tick(&mut self, now: NaiveDateTime, sink: &mut impl EventSink) {
        if !self.state.collaborators_online() {
            return;
        }

        // 1. Habit summary, published every cycle for the app.
        let probability = self.habit.probability_now(now);
        let habit_active = self.habit.is_habitual(now);
        let occupied = self.state.live_occupancy || habit_active;
        sink.emit(&AppEvent::HabitStatus {
            probability_pct: (probability * 100.0).round() as u8,
            occupied,
        });

        // 2. Everything below needs a temperature.
        let Some(reading) = self.latest else {
            return;
        };

        // 3. Safety watchdog runs regardless of mode: a manually forced
        //    heater can stall just as well as an automatic one.
        if let Some(stall) = self
            .watchdog
            .observe(now, self.state.heater_on, reading.temperature_c)
        {
            sink.emit(&AppEvent::Alert(format!(
                "ALERT: heater running for {}s with no temperature rise \
                 (delta {:+.2}C). Check windows/doors and heater!",
                stall.elapsed_secs, stall.delta_c
            )));
        }

        // 4. Regulation.
        if let Some(cmd) = decide(&self.state, habit_active, reading.temperature_c) {
            self.emit_command(cmd, now, sink);
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn emit_command(&mut self, cmd: SwitchState, now: NaiveDateTime, sink: &mut impl EventSink) {
        let prev_mode = self.state.mode();
        info!("heater command: {cmd}");
        self.echo_guard.engage(cmd, now);
        sink.emit(&AppEvent::HeaterCommand(cmd));
        // Intent is applied optimistically; the hardware's status echo
        // confirms it on a later cycle.
        self.state.heater_on = cmd.is_on();
        self.emit_mode_change(prev_mode, sink);
    }

    fn emit_mode_change(&self, prev: Mode, sink: &mut impl EventSink) {
        let mode = self.state.mode();
        if mode != prev {
            sink.emit(&AppEvent::ModeChanged {
                from: prev,
                to: mode,
            });
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests — decision function
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn auto_state(heater_on: bool, live_occupancy: bool) -> ControllerState {
        ControllerState {
            heater_on,
            manual_mode: false,
            target_temp_c: 20.0,
            tolerance_c: 0.5,
            live_occupancy,
            hardware_online: true,
            app_online: true,
        }
    }

    #[test]
    fn manual_mode_always_returns_none() {
        let mut state = auto_state(true, true);
        state.manual_mode = true;
        for temp in [0.0, 15.0, 20.0, 35.0] {
            assert_eq!(decide(&state, true, temp), None);
            assert_eq!(decide(&state, false, temp), None);
        }
        state.heater_on = false;
        assert_eq!(decide(&state, false, 10.0), None);
    }

    #[test]
    fn vacant_zone_switches_off_a_running_heater() {
        let state = auto_state(true, false);
        assert_eq!(decide(&state, false, 15.0), Some(SwitchState::Off));
    }

    #[test]
    fn vacant_zone_with_heater_off_stays_quiet() {
        let state = auto_state(false, false);
        assert_eq!(decide(&state, false, 15.0), None);
    }

    #[test]
    fn habit_alone_counts_as_occupancy() {
        let state = auto_state(false, false);
        assert_eq!(decide(&state, true, 15.0), Some(SwitchState::On));
    }

    #[test]
    fn hysteresis_band_prevents_cycling() {
        // Within band, heater off: nothing to do.
        let state = auto_state(false, true);
        assert_eq!(decide(&state, false, 20.3), None);

        // Deviation 0.8 > 0.5: start heating.
        assert_eq!(decide(&state, false, 19.2), Some(SwitchState::On));

        // Heater on, back inside the band: stop.
        let state = auto_state(true, true);
        assert_eq!(decide(&state, false, 20.3), Some(SwitchState::Off));
    }

    #[test]
    fn heater_keeps_running_outside_band_without_reissuing() {
        let state = auto_state(true, true);
        assert_eq!(decide(&state, false, 18.0), None, "already on — no duplicate");
    }

    #[test]
    fn band_edge_is_inclusive() {
        let state = auto_state(true, true);
        assert_eq!(decide(&state, false, 20.5), Some(SwitchState::Off));
        assert_eq!(decide(&state, false, 19.5), Some(SwitchState::Off));
    }

    #[test]
    fn mode_derivation() {
        let mut state = ControllerState::new(20.0, 0.5);
        assert_eq!(state.mode(), Mode::AutoOff);
        state.heater_on = true;
        assert_eq!(state.mode(), Mode::AutoOn);
        state.manual_mode = true;
        assert_eq!(state.mode(), Mode::Manual);
    }
}
