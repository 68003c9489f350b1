//! Open-Meteo reading source.
//!
//! Fetches current temperature and relative humidity for the
//! configured coordinates. On any failure — network, HTTP status,
//! malformed body — a synthetic reading is substituted so the decision
//! cycle never stalls; the core treats all readings alike.

use log::{info, warn};
use rand::Rng;
use serde::Deserialize;

use crate::app::events::Reading;
use crate::app::ports::ReadingSource;

const FETCH_TIMEOUT_SECS: u64 = 10;

/// Shape of the Open-Meteo `current=` response we consume.
#[derive(Debug, Deserialize)]
struct CurrentConditions {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f32,
    relative_humidity_2m: f32,
}

/// [`ReadingSource`] backed by the Open-Meteo forecast API.
pub struct OpenMeteoSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl OpenMeteoSource {
    pub fn new(latitude: f64, longitude: f64) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            url: format!(
                "https://api.open-meteo.com/v1/forecast?latitude={latitude}&longitude={longitude}&current=temperature_2m,relative_humidity_2m"
            ),
            client,
        })
    }

    fn fetch(&self) -> anyhow::Result<Reading> {
        let body: CurrentConditions = self
            .client
            .get(&self.url)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(reading_from(&body))
    }
}

fn reading_from(conditions: &CurrentConditions) -> Reading {
    Reading {
        temperature_c: conditions.current.temperature_2m,
        humidity_pct: conditions.current.relative_humidity_2m,
    }
}

/// Fallback when the fetch fails: a plausible mild ambient reading.
fn synthetic_reading() -> Reading {
    let mut rng = rand::thread_rng();
    Reading {
        temperature_c: rng.gen_range(10.0..15.0),
        humidity_pct: 50.0,
    }
}

impl ReadingSource for OpenMeteoSource {
    fn current(&mut self) -> Reading {
        match self.fetch() {
            Ok(reading) => {
                info!(
                    "weather: {:.2}C / {:.0}%RH",
                    reading.temperature_c, reading.humidity_pct
                );
                reading
            }
            Err(e) => {
                let fallback = synthetic_reading();
                warn!(
                    "weather fetch failed ({e}); substituting synthetic {:.2}C",
                    fallback.temperature_c
                );
                fallback
            }
        }
    }
}
