//! Moisture-driven visual indicator.

use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

use crate::state::PlantStatus;

/// The three lamp states: red for sensor-out/dry, yellow for medium, green
/// for ideal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorLight {
    Red,
    Yellow,
    Green,
}

/// Last-value-wins lamp selection from the shared moisture brackets. No
/// debouncing, no hysteresis.
#[derive(Default)]
pub struct StatusIndicator {
    current: Mutex<Option<IndicatorLight>>,
}

impl StatusIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a present moisture value onto a lamp. Callers only invoke this
    /// once a moisture reading exists.
    pub fn update(&self, moisture: i64) {
        let light = match PlantStatus::classify(Some(moisture)) {
            PlantStatus::SensorOut | PlantStatus::Dry => IndicatorLight::Red,
            PlantStatus::Medium => IndicatorLight::Yellow,
            _ => IndicatorLight::Green,
        };

        let mut current = self.current.lock().expect("lock poisoned");
        if *current != Some(light) {
            debug!(?light, moisture, "indicator changed");
        }
        *current = Some(light);
    }

    /// Current lamp, or `None` if `update` has never been called.
    pub fn state(&self) -> Option<IndicatorLight> {
        *self.current.lock().expect("lock poisoned")
    }
}

// ===========================================================================
// Tests
// ===========================================================================
