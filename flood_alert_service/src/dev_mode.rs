/// Development mode utilities for working without a field device
///
/// When no sensor is attached, use this module to post a synthetic voltage
/// sweep to a running server's `/ingest` endpoint, exactly as the device
/// would, and read back the resulting status.

use serde_json::Value;
use std::error::Error;
use std::thread;
use std::time::Duration;

use crate::ingest::reading::SensorReading;
use crate::logging::{self, Component};

/// Full-scale output of the device's analog front end.
pub const FULL_SCALE_V: f64 = 3.3;

/// Configuration for a simulated device run
pub struct DevMode {
    /// Server root, e.g. `http://127.0.0.1:5000`
    pub base_url: String,
    /// Number of readings to post
    pub count: usize,
    /// Pause between readings (default: 1000 ms)
    pub interval: Duration,
}

/// Outcome of a simulated run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub sent: usize,
    pub acknowledged: usize,
    pub final_status: Value,
}

impl DevMode {
    pub fn new(base_url: &str, count: usize) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            count,
            interval: Duration::from_millis(1000),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Posts `count` readings of the synthetic sweep, then fetches
    /// `/api/status`.
    ///
    /// A reading the server does not acknowledge is logged and the run
    /// continues, like the device's own retry loop would.
    pub fn run(&self) -> Result<SimulationSummary, Box<dyn Error>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let ingest_url = format!("{}/ingest", self.base_url);

        let mut acknowledged = 0;
        let readings = synthetic_readings(self.count);
        for (i, reading) in readings.iter().enumerate() {
            match client.post(&ingest_url).json(reading).send() {
                Ok(response) if response.status().is_success() => {
                    acknowledged += 1;
                    logging::debug(
                        Component::Sensor,
                        Some(&format!("#{}", i + 1)),
                        &format!("Sent v={:.3} pct={:.1}", reading.voltage, reading.percent),
                    );
                }
                Ok(response) => logging::warn(
                    Component::Http,
                    Some(&ingest_url),
                    &format!("Reading #{} answered {}", i + 1, response.status()),
                ),
                Err(e) => logging::warn(
                    Component::Http,
                    Some(&ingest_url),
                    &format!("Reading #{} failed: {}", i + 1, e),
                ),
            }
            if i + 1 < readings.len() && !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
        }

        let final_status = fetch_status(&client, &self.base_url)?;
        Ok(SimulationSummary {
            sent: readings.len(),
            acknowledged,
            final_status,
        })
    }
}

/// Fetches and decodes `GET /api/status`.
pub fn fetch_status(
    client: &reqwest::blocking::Client,
    base_url: &str,
) -> Result<Value, Box<dyn Error>> {
    let response = client.get(format!("{}/api/status", base_url.trim_end_matches('/'))).send()?;
    if !response.status().is_success() {
        return Err(format!("status endpoint answered {}", response.status()).into());
    }
    Ok(response.json::<Value>()?)
}

/// Triangle sweep from 0 V to full scale and back, so every sensor level
/// is visited on the way up and on the way down. The peak sits at index
/// `count / 2`, so any sweep of two or more readings reaches full scale.
pub fn synthetic_readings(count: usize) -> Vec<SensorReading> {
    if count < 2 {
        return (0..count).map(|_| reading_at(0.0)).collect();
    }
    let peak = count / 2;
    (0..count)
        .map(|i| {
            let fraction = if i <= peak {
                i as f64 / peak as f64
            } else {
                (count - 1 - i) as f64 / (count - 1 - peak) as f64
            };
            reading_at(fraction * FULL_SCALE_V)
        })
        .collect()
}

fn reading_at(voltage: f64) -> SensorReading {
    let voltage = (voltage * 1000.0).round() / 1000.0;
    SensorReading {
        voltage,
        percent: (voltage / FULL_SCALE_V * 100.0 * 10.0).round() / 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SensorLevel;
    use crate::sensor::SensorBreakpoints;

    #[test]
    fn test_dev_mode_creation() {
        let dev = DevMode::new("http://127.0.0.1:5000/", 20);
        assert_eq!(dev.base_url, "http://127.0.0.1:5000");
        assert_eq!(dev.count, 20);
        assert_eq!(dev.interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_sweep_shape() {
        let sweep = synthetic_readings(9);
        assert_eq!(sweep.len(), 9);
        assert_eq!(sweep[0].voltage, 0.0);
        assert_eq!(sweep[4].voltage, FULL_SCALE_V);
        assert_eq!(sweep[8].voltage, 0.0);
        assert!(sweep.iter().all(|r| r.percent_in_range()));
    }

    #[test]
    fn test_sweep_visits_every_level() {
        let breakpoints = SensorBreakpoints::default();
        let levels: std::collections::HashSet<_> = synthetic_readings(21)
            .iter()
            .map(|r| breakpoints.level_for(r.voltage))
            .collect();
        for level in SensorLevel::ALL {
            assert!(levels.contains(&level), "sweep should reach level {}", level);
        }
    }

    #[test]
    fn test_degenerate_counts() {
        assert!(synthetic_readings(0).is_empty());
        assert_eq!(synthetic_readings(1).len(), 1);

        let two = synthetic_readings(2);
        assert_eq!(two[0].voltage, 0.0);
        assert_eq!(two[1].voltage, FULL_SCALE_V, "a two-reading sweep still reaches full scale");
    }

    #[test]
    fn test_every_sweep_reaches_full_scale() {
        for count in 2..=12 {
            let sweep = synthetic_readings(count);
            assert_eq!(sweep.len(), count);
            assert_eq!(sweep[count / 2].voltage, FULL_SCALE_V, "count {}", count);
            if count > 2 {
                assert_eq!(sweep[count - 1].voltage, 0.0, "count {} should end at 0 V", count);
            }
        }
    }

    #[test]
    fn test_readings_serialize_as_device_payload() {
        let json = serde_json::to_value(reading_at(1.65)).unwrap();
        assert_eq!(json["v"], 1.65);
        assert_eq!(json["pct"], 50.0);
    }
}
