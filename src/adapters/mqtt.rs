//! MQTT transport bridge.
//!
//! Owns both directions of the broker link:
//!
//! - a connection thread that decodes raw publishes into
//!   [`InboundMessage`]s and pushes them onto the event queue;
//! - an [`EventSink`] implementation that maps outbound [`AppEvent`]s
//!   to the topic set the hardware and the companion app speak.
//!
//! Outgoing heater commands are published on the **same topic** the
//! bridge subscribes to for remote commands — the broker echoes every
//! emission straight back. That feedback loop is the reason the echo
//! guard exists in the core; this adapter just passes both directions
//! through faithfully.
//!
//! While disconnected, outbound events are dropped rather than queued:
//! the controller keeps computing and the latest state wins once the
//! link returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{Client, Connection, Event as MqttEvent, MqttOptions, Packet, QoS};

use crate::app::commands::{InboundMessage, OccupancySignal, SwitchState};
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::events::{Event, EventPublisher};

// ── Topics ────────────────────────────────────────────────────

pub const TOPIC_TEMP: &str = "chauffage/etat/temperature";
pub const TOPIC_HUMIDITY: &str = "chauffage/etat/humidite";
pub const TOPIC_HEATER_STATUS: &str = "chauffage/etat/statutChauffage";
pub const TOPIC_COMMAND: &str = "chauffage/commande/set";
pub const TOPIC_TARGET: &str = "chauffage/etat/target";
pub const TOPIC_PRESENCE: &str = "chauffage/etat/presence";
pub const TOPIC_HABIT: &str = "chauffage/etat/habit";
pub const TOPIC_HARDWARE_STATUS: &str = "chauffage/etat/esp32_status";
pub const TOPIC_APP_STATUS: &str = "chauffage/etat/app_status";
pub const TOPIC_ALERT: &str = "chauffage/alert";

const SUBSCRIPTIONS: [&str; 6] = [
    TOPIC_HEATER_STATUS,
    TOPIC_PRESENCE,
    TOPIC_HARDWARE_STATUS,
    TOPIC_APP_STATUS,
    TOPIC_TARGET,
    TOPIC_COMMAND,
];

const RECONNECT_BACKOFF_SECS: u64 = 5;

// ── Payload decoding ──────────────────────────────────────────

/// Decode one raw publish into an inbound message.
///
/// Malformed payloads (unparsable floats, unknown tokens) are logged
/// and dropped here — they never reach the controller core.
pub fn decode(topic: &str, payload: &str) -> Option<InboundMessage> {
    let payload = payload.trim();
    match topic {
        TOPIC_HEATER_STATUS => match decode_switch(payload) {
            Some(s) => Some(InboundMessage::HeaterStatus(s)),
            None => {
                warn!("ignoring invalid heater status: {payload:?}");
                None
            }
        },
        TOPIC_PRESENCE => match payload {
            "DETECTED" => Some(InboundMessage::Occupancy(OccupancySignal::Detected)),
            "CLEAR" | "NO_MOTION" => Some(InboundMessage::Occupancy(OccupancySignal::Clear)),
            _ => {
                warn!("ignoring invalid presence payload: {payload:?}");
                None
            }
        },
        TOPIC_TARGET => match payload.parse::<f32>() {
            Ok(target) => Some(InboundMessage::TargetTemp(target)),
            Err(_) => {
                warn!("ignoring invalid target: {payload:?}");
                None
            }
        },
        TOPIC_COMMAND => match decode_switch(payload) {
            Some(s) => Some(InboundMessage::RemoteCommand(s)),
            None => {
                warn!("ignoring unknown command token: {payload:?}");
                None
            }
        },
        TOPIC_HARDWARE_STATUS => Some(InboundMessage::HardwareOnline(payload == "ONLINE")),
        TOPIC_APP_STATUS => Some(InboundMessage::AppOnline(payload == "ONLINE")),
        _ => {
            debug!("unhandled topic: {topic}");
            None
        }
    }
}

fn decode_switch(payload: &str) -> Option<SwitchState> {
    match payload {
        "ON" => Some(SwitchState::On),
        "OFF" => Some(SwitchState::Off),
        _ => None,
    }
}

// ── Transport ─────────────────────────────────────────────────

/// MQTT bridge: connection thread plus outbound sink.
pub struct MqttTransport {
    client: Client,
    connected: Arc<AtomicBool>,
}

impl MqttTransport {
    /// Connect to the broker and spawn the connection thread, which
    /// subscribes on every (re)connect and feeds `publisher`.
    pub fn connect(host: &str, port: u16, publisher: EventPublisher) -> anyhow::Result<Self> {
        let client_id = format!("hearth-controller-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(60));

        let (client, connection) = Client::new(options, 16);
        let connected = Arc::new(AtomicBool::new(false));

        let loop_client = client.clone();
        let loop_connected = Arc::clone(&connected);
        thread::Builder::new()
            .name("mqtt".into())
            .spawn(move || connection_loop(connection, loop_client, &loop_connected, &publisher))?;

        Ok(Self { client, connected })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn publish(&mut self, topic: &str, payload: String) {
        if !self.is_connected() {
            debug!("transport offline — dropping publish to {topic}");
            return;
        }
        if let Err(e) = self
            .client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
        {
            warn!("publish to {topic} failed: {e}");
        }
    }
}

impl EventSink for MqttTransport {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::HeaterCommand(cmd) => {
                self.publish(TOPIC_COMMAND, cmd.token().to_string());
            }
            AppEvent::Alert(message) => {
                self.publish(TOPIC_ALERT, message.clone());
            }
            AppEvent::HabitStatus {
                probability_pct,
                occupied,
            } => {
                self.publish(
                    TOPIC_HABIT,
                    format!(
                        "Habit: {probability_pct}% | Active: {}",
                        if *occupied { "Yes" } else { "No" }
                    ),
                );
            }
            AppEvent::Reading(r) => {
                self.publish(TOPIC_TEMP, format!("{:.2}", r.temperature_c));
                self.publish(TOPIC_HUMIDITY, format!("{:.2}", r.humidity_pct));
            }
            // Mode transitions are local diagnostics, not wire traffic.
            AppEvent::ModeChanged { from, to } => {
                debug!("mode: {from:?} -> {to:?}");
            }
            AppEvent::Started(mode) => {
                debug!("controller up in {mode:?}");
            }
        }
    }
}

// ── Connection thread ─────────────────────────────────────────

fn connection_loop(
    mut connection: Connection,
    client: Client,
    connected: &AtomicBool,
    publisher: &EventPublisher,
) {
    for notification in connection.iter() {
        match notification {
            Ok(MqttEvent::Incoming(Packet::ConnAck(_))) => {
                info!("connected to MQTT broker");
                connected.store(true, Ordering::Relaxed);
                for topic in SUBSCRIPTIONS {
                    if let Err(e) = client.subscribe(topic, QoS::AtMostOnce) {
                        warn!("subscribe {topic} failed: {e}");
                    }
                }
            }
            Ok(MqttEvent::Incoming(Packet::Publish(publish))) => {
                let payload = String::from_utf8_lossy(&publish.payload);
                if let Some(msg) = decode(&publish.topic, &payload) {
                    if !publisher.push(Event::Message(msg)) {
                        warn!("event queue full — dropping {msg:?}");
                    }
                }
            }
            Ok(MqttEvent::Incoming(Packet::Disconnect)) => {
                warn!("broker closed the connection");
                connected.store(false, Ordering::Relaxed);
            }
            Ok(_) => {}
            Err(e) => {
                connected.store(false, Ordering::Relaxed);
                warn!("MQTT connection error: {e} — retrying in {RECONNECT_BACKOFF_SECS}s");
                thread::sleep(Duration::from_secs(RECONNECT_BACKOFF_SECS));
            }
        }
    }
    debug!("MQTT connection loop ended");
}

// ── Tests ─────────────────────────────────────────────────────
