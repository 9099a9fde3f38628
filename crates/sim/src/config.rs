//! TOML config for the simulation runner.
//!
//! Only caller-supplied knobs live here (poll intervals, status cadence,
//! simulation behaviour). Classification brackets, the settle/grace waits,
//! and the actuation phase table are fixed policy inside the core crate.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

const SCENARIOS: &[&str] = &["drying", "stable", "flaky", "wet"];

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sampling: Sampling,
    #[serde(default)]
    pub sim: Sim,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sampling {
    /// Seconds between climate sensor polls.
    pub climate_interval_secs: u64,
    /// Seconds between serial moisture polls.
    pub moisture_interval_secs: u64,
    /// Seconds between status log lines.
    pub status_interval_secs: u64,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            climate_interval_secs: 10,
            moisture_interval_secs: 1,
            status_interval_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sim {
    /// Moisture scenario preset: drying, stable, flaky, or wet.
    pub scenario: String,
    /// Bounds for the random wait between simulated button presses.
    pub button_min_secs: u64,
    pub button_max_secs: u64,
}

impl Default for Sim {
    fn default() -> Self {
        Self {
            scenario: "drying".to_string(),
            button_min_secs: 45,
            button_max_secs: 120,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling: Sampling::default(),
            sim: Sim::default(),
        }
    }
}

impl Config {
    /// Validate all entries, reporting every violation found.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.sampling.climate_interval_secs == 0 {
            errors.push("sampling.climate_interval_secs must be at least 1".to_string());
        }
        if self.sampling.moisture_interval_secs == 0 {
            errors.push("sampling.moisture_interval_secs must be at least 1".to_string());
        }
        if self.sampling.status_interval_secs == 0 {
            errors.push("sampling.status_interval_secs must be at least 1".to_string());
        }

        if !SCENARIOS.contains(&self.sim.scenario.as_str()) {
            errors.push(format!(
                "sim.scenario '{}' unknown (expected one of: {})",
                self.sim.scenario,
                SCENARIOS.join(", ")
            ));
        }
        if self.sim.button_min_secs == 0 {
            errors.push("sim.button_min_secs must be at least 1".to_string());
        }
        if self.sim.button_min_secs > self.sim.button_max_secs {
            errors.push(format!(
                "sim.button_min_secs ({}) exceeds sim.button_max_secs ({})",
                self.sim.button_min_secs, self.sim.button_max_secs
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }
}

/// Load and validate the config file; fall back to defaults when it does not
/// exist.
pub fn load(path: &str) -> Result<Config> {
    let config = match std::fs::read_to_string(path) {
        Ok(raw) => {
            toml::from_str(&raw).with_context(|| format!("parsing config file {path}"))?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path, "no config file, using defaults");
            Config::default()
        }
        Err(e) => return Err(e).with_context(|| format!("reading config file {path}")),
    };
    config.validate()?;
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
