//! Simulated hardware for local development.
//!
//! Models a capacitive moisture probe behind a serial link (random walk with
//! drift, per-reading noise, occasional junk lines, closed-loop watering
//! response), a flaky climate sensor, a button, and a PWM drive that feeds
//! the watering response back into the probe.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use plantcare_core::ports::{ClimateSensorLink, EdgeInterruptSource, EventSink, PwmDrive, SerialLink};
use tracing::{debug, info};

/// Sample from N(mean, sigma), Irwin-Hall approximation.
fn gaussian(mean: f64, sigma: f64) -> f64 {
    let std_normal: f64 = (0..12).map(|_| fastrand::f64()).sum::<f64>() - 6.0;
    mean + sigma * std_normal
}

// ---------------------------------------------------------------------------
// Scenario presets
// ---------------------------------------------------------------------------

/// Pre-configured moisture profiles selectable via the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Starts mid-range, drifts steadily toward dry. The default.
    Drying,
    /// Hovers near the centre with low noise; never triggers alerts.
    Stable,
    /// Noisy readings plus a stream of malformed and unrelated lines.
    Flaky,
    /// Starts wet, dries very slowly.
    Wet,
}

impl Scenario {
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "stable" => Self::Stable,
            "flaky" => Self::Flaky,
            "wet" => Self::Wet,
            _ => Self::Drying,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drying => write!(f, "drying"),
            Self::Stable => write!(f, "stable"),
            Self::Flaky => write!(f, "flaky"),
            Self::Wet => write!(f, "wet"),
        }
    }
}

// ---------------------------------------------------------------------------
// Moisture probe behind a serial link
// ---------------------------------------------------------------------------

/// Stateful moisture simulator speaking the `Moisture=NN%` line protocol.
pub struct SimMoistureProbe {
    percent: f64,
    drift_per_line: f64,
    noise_sigma: f64,
    junk_prob: f32,
    watering: Arc<AtomicBool>,
    /// Moisture gained per line while the drive is watering.
    wet_rate: f64,
}

impl SimMoistureProbe {
    pub fn new(scenario: Scenario, watering: Arc<AtomicBool>) -> Self {
        let (start, drift, noise_sigma, junk_prob) = match scenario {
            Scenario::Drying => (50.0, -0.25, 0.8, 0.01),
            Scenario::Stable => (55.0, 0.0, 0.3, 0.0),
            Scenario::Flaky => (45.0, -0.10, 2.5, 0.15),
            Scenario::Wet => (85.0, -0.02, 0.5, 0.01),
        };
        Self {
            percent: start,
            drift_per_line: drift,
            noise_sigma,
            junk_prob,
            watering,
            wet_rate: 2.0,
        }
    }

    fn next_line(&mut self) -> String {
        if fastrand::f32() < self.junk_prob {
            // The real probe occasionally interleaves boot chatter and
            // half-written lines.
            return if fastrand::bool() {
                "Moisture=NaN%".to_string()
            } else {
                "Battery=88%".to_string()
            };
        }

        let wet = if self.watering.load(Ordering::Relaxed) {
            self.wet_rate
        } else {
            0.0
        };
        self.percent = (self.percent + self.drift_per_line + wet).clamp(0.0, 100.0);

        let reading = gaussian(self.percent, self.noise_sigma)
            .round()
            .clamp(0.0, 100.0) as i64;
        format!("Moisture={reading}%")
    }
}

impl SerialLink for SimMoistureProbe {
    fn has_data_available(&mut self) -> bool {
        true
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        Ok(self.next_line().into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Climate sensor
// ---------------------------------------------------------------------------

/// Room-climate simulator with occasional transient read failures.
pub struct SimClimate {
    temperature_c: f64,
    humidity: f64,
    fail_prob: f32,
}

impl SimClimate {
    pub fn new() -> Self {
        Self {
            temperature_c: 22.0,
            humidity: 55.0,
            fail_prob: 0.05,
        }
    }
}

impl Default for SimClimate {
    fn default() -> Self {
        Self::new()
    }
}

impl ClimateSensorLink for SimClimate {
    fn read(&mut self) -> Result<(f64, f64)> {
        if fastrand::f32() < self.fail_prob {
            bail!("sensor read timed out");
        }
        self.temperature_c = (self.temperature_c + gaussian(0.0, 0.15)).clamp(10.0, 40.0);
        self.humidity = (self.humidity + gaussian(0.0, 0.5)).clamp(20.0, 95.0);
        Ok((self.temperature_c, self.humidity))
    }
}

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

/// Button whose presses are fired programmatically.
#[derive(Default)]
pub struct SimButton {
    callback: Mutex<Option<Box<dyn Fn() + Send + Sync + 'static>>>,
    level: AtomicBool,
}

impl SimButton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate one rising edge.
    pub fn press(&self) {
        let callback = self.callback.lock().expect("lock poisoned");
        if let Some(callback) = callback.as_ref() {
            callback();
        }
    }
}

impl EdgeInterruptSource for SimButton {
    fn set_rising_callback(&self, callback: Box<dyn Fn() + Send + Sync + 'static>) {
        *self.callback.lock().expect("lock poisoned") = Some(callback);
    }

    fn is_high(&self) -> bool {
        self.level.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// PWM drive
// ---------------------------------------------------------------------------

/// Drive that logs its movements and feeds the watering state back into the
/// moisture probe via the shared flag.
pub struct SimPwmDrive {
    watering: Arc<AtomicBool>,
}

impl SimPwmDrive {
    pub fn new(watering: Arc<AtomicBool>) -> Self {
        Self { watering }
    }
}

impl PwmDrive for SimPwmDrive {
    fn drive_min(&mut self) -> Result<()> {
        self.watering.store(false, Ordering::Relaxed);
        debug!("drive at minimum extent");
        Ok(())
    }

    fn drive_max(&mut self) -> Result<()> {
        self.watering.store(true, Ordering::Relaxed);
        debug!("drive at maximum extent (watering)");
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.watering.store(false, Ordering::Relaxed);
        debug!("drive output disabled");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Event sink
// ---------------------------------------------------------------------------

/// Sink that writes every event to the log; stands in for the notification
/// layer.
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: &str, payload: serde_json::Value) {
        info!(event, %payload, "event emitted");
    }
}

// ===========================================================================
// Tests
// ===========================================================================
