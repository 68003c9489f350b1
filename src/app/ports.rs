//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControllerService (domain)
//! ```
//!
//! Driven adapters (transport, weather source, history file, event sinks)
//! implement these traits. The [`ControllerService`](super::service::ControllerService)
//! consumes them via generics, so the domain core never touches a socket
//! or the filesystem directly.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::events::{AppEvent, Reading};

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → transport / logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
/// Adapters decide where they go (MQTT topics, serial log, both).
///
/// Implementations must never block the decision cycle on network
/// round-trips: a disconnected transport drops events rather than
/// queueing them, so the latest state wins on redelivery.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn emit(&mut self, event: &AppEvent) {
        (**self).emit(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn emit(&mut self, event: &AppEvent) {
        (**self).emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Occupancy history port (driven adapter: domain ↔ persisted records)
// ───────────────────────────────────────────────────────────────

/// The wire/file form of one occupancy event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MotionRecord {
    /// `YYYY-MM-DD HH:MM:SS`, local wall-clock.
    pub timestamp: String,
    /// Always `MOTION_DETECTED` for records this controller writes.
    pub event: String,
}

impl MotionRecord {
    pub const MOTION_DETECTED: &'static str = "MOTION_DETECTED";

    pub fn at(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            event: Self::MOTION_DETECTED.to_string(),
        }
    }
}

/// Persistent store of raw occupancy events.
///
/// Read in full on startup/rebuild, appended to on each live
/// occupancy-detected transition. A missing or corrupt store is
/// treated as empty history, never as a fatal error.
pub trait HistoryStore {
    /// Load every record, in insertion order.
    fn load(&self) -> Result<Vec<MotionRecord>, HistoryError>;

    /// Append one record.
    fn append(&mut self, record: &MotionRecord) -> Result<(), HistoryError>;
}

// ───────────────────────────────────────────────────────────────
// Reading source port (driven adapter: weather/sensor → domain)
// ───────────────────────────────────────────────────────────────

/// Supplies ambient conditions at a bounded rate.
///
/// Implementations must substitute a synthetic/fallback reading rather
/// than fail: the core treats any supplied reading as valid input and
/// never distinguishes real from fallback.
pub trait ReadingSource {
    fn current(&mut self) -> Reading;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples cadence engine from event system)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a schedule fires.
///
/// This decouples the [`Scheduler`](crate::scheduler::Scheduler) from the
/// event queue. The main loop implements this by forwarding to
/// [`EventPublisher::push`](crate::events::EventPublisher::push), but the
/// scheduler itself knows nothing about queues or threads.
pub trait SchedulerDelegate {
    /// Called when a schedule fires.
    ///
    /// * `label` — the human-readable label of the schedule that fired.
    /// * `kind`  — whether it was a periodic or one-shot fire.
    fn on_schedule_fired(&mut self, label: &str, kind: ScheduleFiredKind);
}

/// Discriminant passed to [`SchedulerDelegate::on_schedule_fired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleFiredKind {
    /// A recurring periodic schedule fired.
    Periodic,
    /// A one-shot schedule fired (auto-disables after).
    OneShot,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`HistoryStore`] operations.
#[derive(Debug)]
pub enum HistoryError {
    /// The store does not exist yet (first run).
    NotFound,
    /// Stored records failed deserialization.
    Corrupted,
    /// Generic I/O error from the backing file.
    Io(std::io::Error),
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "history not found"),
            Self::Corrupted => write!(f, "history corrupted"),
            Self::Io(e) => write!(f, "history I/O error: {e}"),
        }
    }
}

impl std::error::Error for HistoryError {}

impl From<std::io::Error> for HistoryError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
