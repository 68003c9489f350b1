//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the process log. Used on its own when no transport is attached, and
//! alongside the MQTT sink as the local audit trail.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::HeaterCommand(cmd) => {
                info!("CMD   | heater {cmd}");
            }
            AppEvent::Alert(message) => {
                warn!("ALERT | {message}");
            }
            AppEvent::HabitStatus {
                probability_pct,
                occupied,
            } => {
                info!(
                    "HABIT | {probability_pct}% | occupied={}",
                    if *occupied { "yes" } else { "no" }
                );
            }
            AppEvent::Reading(r) => {
                info!(
                    "READ  | T={:.2}\u{00b0}C | RH={:.0}%",
                    r.temperature_c, r.humidity_pct
                );
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {from:?} -> {to:?}");
            }
            AppEvent::Started(mode) => {
                info!("START | initial_mode={mode:?}");
            }
        }
    }
}
