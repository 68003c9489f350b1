//! Hearth Controller — Main Entry Point
//!
//! Hexagonal architecture with a single-consumer event loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  MqttTransport      OpenMeteoSource   JsonHistoryStore         │
//! │  (in/out bridge)    (ReadingSource)   (HistoryStore)           │
//! │  LogEventSink                                                  │
//! │  (EventSink)                                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ControllerService (pure logic)              │    │
//! │  │  decide · HabitModel · Watchdog · EchoGuard            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (delegate-driven) · EventQueue (mpsc, bounded)      │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::thread;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use log::{info, warn};

use hearth::adapters::history::JsonHistoryStore;
use hearth::adapters::log_sink::LogEventSink;
use hearth::adapters::mqtt::MqttTransport;
use hearth::adapters::weather::OpenMeteoSource;
use hearth::app::commands::InboundMessage;
use hearth::app::ports::{EventSink, ReadingSource, ScheduleFiredKind, SchedulerDelegate};
use hearth::app::service::ControllerService;
use hearth::config::SystemConfig;
use hearth::events::{Event, EventPublisher, EventQueue, event_queue};
use hearth::habit::{HabitModel, HabitSource, NullHabitSource};
use hearth::scheduler::{Schedule, ScheduleKind, Scheduler};

// ── Schedule labels ───────────────────────────────────────────

const WEATHER_PRIME: &str = "weather-prime";
const WEATHER_REFRESH: &str = "weather-refresh";
const HABIT_REBUILD: &str = "habit-rebuild";

// ── Scheduler delegate ────────────────────────────────────────
//
// Bridges the scheduler (which knows nothing about the event system)
// to the main-loop queue. This is the hexagonal adapter pattern: the
// scheduler calls `on_schedule_fired`, and this impl translates that
// into an event pushed onto the bounded queue.

struct EventQueueDelegate {
    publisher: EventPublisher,
}

impl SchedulerDelegate for EventQueueDelegate {
    fn on_schedule_fired(&mut self, label: &str, _kind: ScheduleFiredKind) {
        let event = match label {
            WEATHER_PRIME | WEATHER_REFRESH => Event::WeatherRefresh,
            HABIT_REBUILD => Event::HabitRebuild,
            _ => return,
        };
        if !self.publisher.push(event) {
            warn!("event queue full — dropped '{label}' fire");
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Hearth controller v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Load config (or defaults) ──────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hearth.json".to_string());
    let config = match SystemConfig::from_file(&config_path) {
        Ok(cfg) => {
            info!("config loaded from {config_path}");
            cfg
        }
        Err(e) => {
            warn!("config load failed ({e}), using defaults");
            SystemConfig::default()
        }
    };

    // ── 2. Event queue ────────────────────────────────────────
    let (publisher, queue) = event_queue();

    // ── 3. Transport bridge (or dry-run sink) ─────────────────
    let sink: Box<dyn EventSink> = if config.transport_enabled {
        Box::new(MqttTransport::connect(
            &config.broker_host,
            config.broker_port,
            publisher.clone(),
        )?)
    } else {
        info!("transport disabled — dry run, assuming collaborators present");
        publisher.push(Event::Message(InboundMessage::HardwareOnline(true)));
        publisher.push(Event::Message(InboundMessage::AppOnline(true)));
        Box::new(LogEventSink::new())
    };

    // ── 4. Weather source ─────────────────────────────────────
    let weather = OpenMeteoSource::new(config.latitude, config.longitude)?;

    // ── 5. Occupancy history ──────────────────────────────────
    let history = JsonHistoryStore::new(&config.history_file);

    // ── 6. Cadence scheduler ──────────────────────────────────
    let mut sched = Scheduler::new();
    sched.add(Schedule {
        label: WEATHER_PRIME,
        kind: ScheduleKind::OneShot { delay_secs: 0 },
        enabled: true,
    });
    sched.add(Schedule {
        label: WEATHER_REFRESH,
        kind: ScheduleKind::Periodic {
            interval_secs: config.weather_refresh_secs,
        },
        enabled: true,
    });
    if config.habit_enabled {
        sched.add(Schedule {
            label: HABIT_REBUILD,
            kind: ScheduleKind::Periodic {
                interval_secs: config.habit_rebuild_secs,
            },
            enabled: true,
        });
    }
    let delegate = EventQueueDelegate {
        publisher: publisher.clone(),
    };

    // ── 7. Controller service — habit source chosen here ──────
    if config.habit_enabled {
        let mut habit = HabitModel::from_records(&history.load_or_empty(), config.habit_threshold);
        habit.rebuild();
        let service = ControllerService::new(&config, habit);
        run(service, &config, queue, publisher, sched, delegate, history, weather, sink)
    } else {
        info!("habit learning disabled — live occupancy only");
        let service = ControllerService::new(&config, NullHabitSource);
        run(service, &config, queue, publisher, sched, delegate, history, weather, sink)
    }
}

// ── Event loop ────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn run<H: HabitSource>(
    mut service: ControllerService<H>,
    config: &SystemConfig,
    queue: EventQueue,
    publisher: EventPublisher,
    mut sched: Scheduler,
    mut delegate: EventQueueDelegate,
    mut history: JsonHistoryStore,
    mut weather: OpenMeteoSource,
    mut sink: Box<dyn EventSink>,
) -> Result<()> {
    service.start(&mut sink);

    let tick_secs = config.control_loop_interval_ms as f32 / 1000.0;
    let mut was_online = false;
    info!("waiting for hardware and app to come online");

    loop {
        thread::sleep(Duration::from_millis(u64::from(
            config.control_loop_interval_ms,
        )));
        publisher.push(Event::ControlTick);
        sched.tick(tick_secs, &mut delegate);

        queue.drain(|event| {
            let now = Local::now().naive_local();
            match event {
                Event::ControlTick => service.tick(now, &mut sink),
                Event::Message(msg) => service.handle_message(msg, now, &mut history, &mut sink),
                Event::WeatherRefresh => {
                    let reading = weather.current();
                    service.update_reading(reading, &mut sink);
                }
                Event::HabitRebuild => service.rebuild_habits(),
            }
        });

        // Wait-phase transitions, logged once per edge.
        let online = service.state().collaborators_online();
        if online && !was_online {
            info!("hardware and app connected — control loop active");
        } else if !online && was_online {
            warn!("collaborator lost — pausing actuation until both return");
        }
        was_online = online;
    }
}
