//! Outbound application events.
//!
//! The [`ControllerService`](super::service::ControllerService) emits
//! these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them — publish
//! over MQTT, write to the structured log, etc.

use super::commands::SwitchState;
use super::service::Mode;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Actuation request for the heater relay.
    HeaterCommand(SwitchState),

    /// One-shot safety notification, fire-and-forget.
    Alert(String),

    /// Per-cycle habit summary for the companion app.
    HabitStatus { probability_pct: u8, occupied: bool },

    /// A fresh ambient reading was accepted.
    Reading(Reading),

    /// The controller moved between auto/manual heater modes.
    ModeChanged { from: Mode, to: Mode },

    /// The controller service has started (carries initial mode).
    Started(Mode),
}

/// Ambient conditions supplied by the weather/sensor collaborator.
///
/// The engine tolerates stale readings: a `Reading` stays current
/// until the next refresh replaces it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}
