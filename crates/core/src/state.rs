//! Plant-status classification and the aggregated status snapshot.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;

use crate::actuator::Actuator;
use crate::button::ButtonEdgeSource;
use crate::climate::ClimateReader;
use crate::indicator::{IndicatorLight, StatusIndicator};
use crate::moisture::MoistureLinkReader;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Plant-care status derived from the soil-moisture percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantStatus {
    SensorOut,
    Dry,
    Medium,
    Ideal,
    Unknown,
}

impl PlantStatus {
    /// Bracket table: 0 → sensor out, 1–34 → dry, 36–65 → medium, everything
    /// else → ideal. Exactly 35 matches neither the dry nor the medium
    /// bracket and falls through to `Ideal`; the gap is a known quirk of the
    /// bracket table and must not be closed.
    pub fn classify(moisture: Option<i64>) -> Self {
        match moisture {
            None => Self::Unknown,
            Some(0) => Self::SensorOut,
            Some(m) if (1..35).contains(&m) => Self::Dry,
            Some(m) if (36..=65).contains(&m) => Self::Medium,
            Some(_) => Self::Ideal,
        }
    }

    /// Human-readable message bound to the status.
    pub fn message(self) -> &'static str {
        match self {
            Self::SensorOut => "Sensor is not in the soil",
            Self::Dry => "Plant is dehydrated and needs water",
            Self::Medium => "Soil moisture is medium, manual watering optional",
            Self::Ideal => "Soil moisture is ideal, no watering needed",
            Self::Unknown => "No soil moisture data available",
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time composite of every component's latest state.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub temperature_c: Option<f64>,
    pub temperature_f: Option<f64>,
    pub humidity: Option<f64>,
    pub soil_moisture: Option<i64>,
    pub plant_status: PlantStatus,
    pub plant_message: &'static str,
    pub indicator: Option<IndicatorLight>,
    pub irrigation_count: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_irrigation: Option<OffsetDateTime>,
    pub button_presses: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_moisture_update: Option<OffsetDateTime>,
}

impl StatusSnapshot {
    /// Multi-line plain-text rendering, for display surfaces and the
    /// assistant context.
    pub fn describe(&self) -> String {
        let mut lines = vec!["Current plant system state:".to_string()];

        match (self.temperature_c, self.temperature_f) {
            (Some(c), Some(f)) => lines.push(format!("Temperature: {c:.1}C ({f:.1}F)")),
            _ => lines.push("Temperature: not available".to_string()),
        }
        match self.humidity {
            Some(h) => lines.push(format!("Air humidity: {h:.1}%")),
            None => lines.push("Air humidity: not available".to_string()),
        }
        match self.soil_moisture {
            Some(m) => lines.push(format!("Soil moisture: {m}%")),
            None => lines.push("Soil moisture: not available".to_string()),
        }
        lines.push(format!("Plant status: {}", self.plant_message));
        lines.push(format!("Total irrigations: {}", self.irrigation_count));
        match self.last_irrigation {
            Some(at) => lines.push(format!("Last irrigation: {at}")),
            None => lines.push("Last irrigation: never".to_string()),
        }
        lines.push(format!("Button presses: {}", self.button_presses));

        lines.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Read-only composition point over all components.
///
/// Holds back-references for reading only; starting and stopping the
/// components stays with the wiring code.
pub struct StateAggregator {
    climate: Arc<ClimateReader>,
    moisture: Arc<MoistureLinkReader>,
    button: Arc<ButtonEdgeSource>,
    actuator: Arc<Actuator>,
    indicator: Arc<StatusIndicator>,
}

impl StateAggregator {
    pub fn new(
        climate: Arc<ClimateReader>,
        moisture: Arc<MoistureLinkReader>,
        button: Arc<ButtonEdgeSource>,
        actuator: Arc<Actuator>,
        indicator: Arc<StatusIndicator>,
    ) -> Self {
        Self {
            climate,
            moisture,
            button,
            actuator,
            indicator,
        }
    }

    /// Compose a snapshot from each component's own latest value.
    ///
    /// Each sub-read is atomic under that component's lock, but the composite
    /// is best-effort, not transactional: the reads happen a few microseconds
    /// apart, which is far below any sensor's rate of change.
    pub fn snapshot(&self) -> StatusSnapshot {
        let climate = self.climate.read();
        let moisture = self.moisture.read();
        let button = self.button.state();
        let record = self.actuator.state();
        let indicator = self.indicator.state();

        let soil_moisture = moisture.map(|m| m.percent);
        let plant_status = PlantStatus::classify(soil_moisture);

        StatusSnapshot {
            temperature_c: climate.map(|c| c.temperature_c),
            temperature_f: climate.map(|c| c.temperature_f),
            humidity: climate.map(|c| c.humidity),
            soil_moisture,
            plant_status,
            plant_message: plant_status.message(),
            indicator,
            irrigation_count: record.cycle_count,
            last_irrigation: record.last_cycle,
            button_presses: button.press_count,
            last_moisture_update: moisture.map(|m| m.updated_at),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
