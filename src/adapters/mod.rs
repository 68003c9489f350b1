//! Driven adapters — the outer ring of the hexagon.
//!
//! Each adapter implements one port trait from
//! [`crate::app::ports`] against a real collaborator: the MQTT broker,
//! the Open-Meteo API, the motion-history file, or the structured log.
//! The domain core never touches any of this directly.

pub mod history;
pub mod log_sink;
pub mod mqtt;
pub mod weather;
