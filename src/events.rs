//! Event queue feeding the main control loop.
//!
//! Events are produced by:
//! - the transport connection thread (decoded inbound messages)
//! - the cadence scheduler (weather refresh, habit rebuild)
//! - the main loop itself (decision cycle ticks)
//!
//! Events are consumed by the single main-loop thread, which processes
//! them one at a time in arrival order. Because every mutation of the
//! controller state happens on that consumer thread, the queue is what
//! serializes access — there is no lock around the state itself.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ MQTT thread  │────▶│              │     │              │
//! │ Scheduler    │────▶│  Event Queue │────▶│  Main Loop   │
//! │ Cycle timer  │────▶│  (bounded)   │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};

use crate::app::commands::InboundMessage;

/// Maximum number of pending events. A full queue drops new events —
/// the latest state always wins on redelivery, so nothing is retried.
pub const EVENT_QUEUE_CAP: usize = 64;

/// Everything the main loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// Decision cycle tick (1 Hz).
    ControlTick,
    /// A decoded transport message.
    Message(InboundMessage),
    /// The weather refresh cadence fired.
    WeatherRefresh,
    /// The habit rebuild cadence fired.
    HabitRebuild,
}

/// Producer half. Cheap to clone; hand one to every event source.
#[derive(Clone)]
pub struct EventPublisher {
    tx: SyncSender<Event>,
}

impl EventPublisher {
    /// Push an event into the queue.
    /// Returns `false` if the queue is full or the consumer is gone
    /// (event dropped).
    pub fn push(&self, event: Event) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consumer half, owned by the main loop.
pub struct EventQueue {
    rx: Receiver<Event>,
}

impl EventQueue {
    /// Drain all pending events into a callback, FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Ok(event) = self.rx.try_recv() {
            handler(event);
        }
    }
}

/// Create a connected publisher/queue pair.
pub fn event_queue() -> (EventPublisher, EventQueue) {
    let (tx, rx) = sync_channel(EVENT_QUEUE_CAP);
    (EventPublisher { tx }, EventQueue { rx })
}
