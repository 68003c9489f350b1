//! System configuration parameters
//!
//! All tunable parameters for the Hearth controller.
//! Values can be overridden via a JSON config file passed on the
//! command line; missing or unreadable files fall back to defaults.

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Transport ---
    /// Whether to bridge to an MQTT broker. When false the controller
    /// runs dry: it computes and logs decisions but sends nothing.
    pub transport_enabled: bool,
    /// MQTT broker hostname or IP
    pub broker_host: String,
    /// MQTT broker port
    pub broker_port: u16,

    // --- Weather source ---
    /// Latitude for the Open-Meteo current-conditions query
    pub latitude: f64,
    /// Longitude for the Open-Meteo current-conditions query
    pub longitude: f64,

    // --- Occupancy history ---
    /// Path to the motion history file (JSON array of records)
    pub history_file: String,
    /// Whether habit learning is active; when false a null habit
    /// source is wired in and only live occupancy drives decisions
    pub habit_enabled: bool,
    /// Grid probability at or above which an hour counts as habitual
    pub habit_threshold: f32,

    // --- Regulation ---
    /// Startup temperature setpoint (Celsius); updatable at runtime
    pub target_temp_c: f32,
    /// Hysteresis band around the setpoint (Celsius)
    pub tolerance_c: f32,

    // --- Safety watchdog ---
    /// Seconds the heater may run before a temperature rise is expected
    pub watchdog_window_secs: u16,
    /// Minimum rise (Celsius) expected over the observation window
    pub watchdog_min_rise_c: f32,

    // --- Command echo suppression ---
    /// Window (milliseconds) during which the echo of an emitted
    /// command is not reinterpreted as a manual override
    pub echo_window_ms: u32,

    // --- Timing ---
    /// Decision cycle interval (milliseconds)
    pub control_loop_interval_ms: u32,
    /// Weather refresh interval (seconds)
    pub weather_refresh_secs: u32,
    /// Habit grid rebuild interval (seconds)
    pub habit_rebuild_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Transport
            transport_enabled: true,
            broker_host: "localhost".into(),
            broker_port: 1883,

            // Weather source (El Jadida, Morocco)
            latitude: 33.25,
            longitude: -8.5,

            // Occupancy history
            history_file: "motion_history.json".into(),
            habit_enabled: true,
            habit_threshold: 0.4,

            // Regulation
            target_temp_c: 20.0,
            tolerance_c: 0.5,

            // Safety watchdog
            watchdog_window_secs: 30,
            watchdog_min_rise_c: 0.1,

            // Echo suppression
            echo_window_ms: 100,

            // Timing
            control_loop_interval_ms: 1000, // 1 Hz
            weather_refresh_secs: 60,
            habit_rebuild_secs: 900,
        }
    }
}

impl SystemConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
