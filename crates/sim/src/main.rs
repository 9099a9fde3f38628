//! Development runner: the full coordination stack wired against simulated
//! hardware. Moisture drifts per the configured scenario, a simulated hand
//! presses the button now and then, and watering feeds back into the probe.

mod config;
mod sim;

use std::env;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use plantcare_core::ports::EventSink;
use plantcare_core::{
    ActuationOrchestrator, Actuator, ButtonEdgeSource, ClimateReader, MoistureLinkReader,
    StateAggregator, StatusIndicator,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "sim.toml".to_string());
    let cfg = config::load(&config_path)?;

    let scenario = sim::Scenario::from_str_lossy(&cfg.sim.scenario);
    info!(%scenario, "starting plantcare sim");

    // ── Wiring ──────────────────────────────────────────────────────
    // The watering flag closes the loop: the drive sets it, the probe
    // responds to it.
    let watering = Arc::new(AtomicBool::new(false));

    let climate = Arc::new(ClimateReader::new(
        Box::new(sim::SimClimate::new()),
        Duration::from_secs(cfg.sampling.climate_interval_secs),
    ));
    let moisture = Arc::new(MoistureLinkReader::new(
        Box::new(sim::SimMoistureProbe::new(scenario, Arc::clone(&watering))),
        Duration::from_secs(cfg.sampling.moisture_interval_secs),
    ));
    let edge_input = Arc::new(sim::SimButton::new());
    let button = Arc::new(ButtonEdgeSource::new(edge_input.clone()));
    let actuator = Arc::new(Actuator::new(Box::new(sim::SimPwmDrive::new(Arc::clone(
        &watering,
    )))));
    let indicator = Arc::new(StatusIndicator::new());

    let aggregator = Arc::new(StateAggregator::new(
        Arc::clone(&climate),
        Arc::clone(&moisture),
        Arc::clone(&button),
        Arc::clone(&actuator),
        Arc::clone(&indicator),
    ));

    let sink: Arc<dyn EventSink> = Arc::new(sim::LogEventSink);
    let orchestrator =
        ActuationOrchestrator::new(Arc::clone(&aggregator), Arc::clone(&actuator), sink);

    // ── Startup ─────────────────────────────────────────────────────
    climate.start();
    moisture.start();
    orchestrator.start(button.subscribe());

    // Simulated hand pressing the button at random intervals.
    let presser = {
        let edge_input = Arc::clone(&edge_input);
        let (min, max) = (cfg.sim.button_min_secs, cfg.sim.button_max_secs);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(fastrand::u64(min..=max))).await;
                info!("simulated button press");
                edge_input.press();
            }
        })
    };

    // ── Monitor loop ────────────────────────────────────────────────
    let mut status_tick =
        tokio::time::interval(Duration::from_secs(cfg.sampling.status_interval_secs));

    loop {
        tokio::select! {
            _ = status_tick.tick() => {
                let snapshot = aggregator.snapshot();
                if let Some(moisture) = snapshot.soil_moisture {
                    indicator.update(moisture);
                }
                info!("\n{}", snapshot.describe());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // ── Shutdown ────────────────────────────────────────────────────
    info!("shutting down");
    presser.abort();
    climate.stop().await;
    moisture.stop().await;
    orchestrator.stop().await;
    actuator.cleanup().await?;
    info!("shutdown complete");

    Ok(())
}
