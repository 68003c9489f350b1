//! Inbound messages to the controller service.
//!
//! These represent everything the outside world can tell the engine:
//! hardware status echoes, occupancy transitions, setpoint changes,
//! manual overrides and collaborator liveness. The transport adapter
//! decodes raw payloads into these variants; malformed payloads are
//! dropped there and never reach the service.

use std::fmt;

/// Binary switch position used by both heater status and commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// Wire token, matching the hardware's payload convention.
    pub fn token(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Occupancy sensor transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancySignal {
    Detected,
    Clear,
}

/// Messages that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InboundMessage {
    /// The hardware reported the heater relay position.
    HeaterStatus(SwitchState),

    /// The motion sensor changed state.
    Occupancy(OccupancySignal),

    /// A new temperature setpoint (already parsed by the adapter).
    TargetTemp(f32),

    /// A manual override request — or the echo of our own command.
    RemoteCommand(SwitchState),

    /// Heater hardware liveness changed.
    HardwareOnline(bool),

    /// Companion app liveness changed.
    AppOnline(bool),
}
