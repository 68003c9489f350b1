//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the Hearth controller:
//! the per-cycle decision function, occupancy/temperature state,
//! watchdog evaluation and command-echo suppression. All interaction
//! with the transport, the weather source and the history file happens
//! through **port traits** defined in [`ports`], keeping this layer
//! fully testable without a broker or network access.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
