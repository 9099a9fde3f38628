//! Shared fakes and wiring helpers for the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use crate::actuator::Actuator;
use crate::button::ButtonEdgeSource;
use crate::climate::ClimateReader;
use crate::indicator::StatusIndicator;
use crate::moisture::MoistureLinkReader;
use crate::ports::{ClimateSensorLink, EdgeInterruptSource, EventSink, PwmDrive, SerialLink};
use crate::state::StateAggregator;

// ---------------------------------------------------------------------------
// Hardware fakes
// ---------------------------------------------------------------------------

/// Edge input whose presses are fired manually from the test body.
#[derive(Default)]
pub(crate) struct FakeEdgeInput {
    callback: Mutex<Option<Box<dyn Fn() + Send + Sync + 'static>>>,
    level: Mutex<bool>,
}

impl FakeEdgeInput {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Simulate one rising edge.
    pub(crate) fn press(&self) {
        let callback = self.callback.lock().unwrap();
        if let Some(callback) = callback.as_ref() {
            callback();
        }
    }

    pub(crate) fn set_level(&self, high: bool) {
        *self.level.lock().unwrap() = high;
    }
}

impl EdgeInterruptSource for FakeEdgeInput {
    fn set_rising_callback(&self, callback: Box<dyn Fn() + Send + Sync + 'static>) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    fn is_high(&self) -> bool {
        *self.level.lock().unwrap()
    }
}

/// Drive that records every successful operation, optionally failing a named
/// one. Failed operations are not recorded.
pub(crate) struct RecordingDrive {
    calls: Arc<Mutex<Vec<&'static str>>>,
    fail_on: Option<&'static str>,
}

impl RecordingDrive {
    pub(crate) fn ok() -> (Box<Self>, Arc<Mutex<Vec<&'static str>>>) {
        Self::build(None)
    }

    pub(crate) fn failing_on(op: &'static str) -> (Box<Self>, Arc<Mutex<Vec<&'static str>>>) {
        Self::build(Some(op))
    }

    fn build(fail_on: Option<&'static str>) -> (Box<Self>, Arc<Mutex<Vec<&'static str>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Self {
                calls: Arc::clone(&calls),
                fail_on,
            }),
            calls,
        )
    }

    fn record(&mut self, op: &'static str) -> Result<()> {
        if self.fail_on == Some(op) {
            bail!("drive fault during {op}");
        }
        self.calls.lock().unwrap().push(op);
        Ok(())
    }
}

impl PwmDrive for RecordingDrive {
    fn drive_min(&mut self) -> Result<()> {
        self.record("min")
    }

    fn drive_max(&mut self) -> Result<()> {
        self.record("max")
    }

    fn disable(&mut self) -> Result<()> {
        self.record("disable")
    }
}

/// Climate link that always fails; for rigs where climate is irrelevant.
pub(crate) struct DeadClimateLink;

impl ClimateSensorLink for DeadClimateLink {
    fn read(&mut self) -> Result<(f64, f64)> {
        Err(anyhow!("no sensor attached"))
    }
}

/// Serial link that never has data; for rigs where the value is seeded.
pub(crate) struct SilentSerialLink;

impl SerialLink for SilentSerialLink {
    fn has_data_available(&mut self) -> bool {
        false
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        bail!("no data available")
    }
}

/// Event sink that collects everything it is given.
#[derive(Default)]
pub(crate) struct CollectingSink {
    events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl CollectingSink {
    pub(crate) fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &str, payload: serde_json::Value) {
        self.events.lock().unwrap().push((event.to_string(), payload));
    }
}

// ---------------------------------------------------------------------------
// Full wiring
// ---------------------------------------------------------------------------

/// Everything the aggregator/orchestrator tests need, wired but not started.
pub(crate) struct TestRig {
    pub(crate) climate: Arc<ClimateReader>,
    pub(crate) moisture: Arc<MoistureLinkReader>,
    pub(crate) button: Arc<ButtonEdgeSource>,
    pub(crate) edge_input: Arc<FakeEdgeInput>,
    pub(crate) actuator: Arc<Actuator>,
    pub(crate) indicator: Arc<StatusIndicator>,
    pub(crate) aggregator: Arc<StateAggregator>,
    pub(crate) drive_calls: Arc<Mutex<Vec<&'static str>>>,
    pub(crate) sink: Arc<CollectingSink>,
}

pub(crate) fn test_rig() -> TestRig {
    test_rig_with_drive(RecordingDrive::ok())
}

pub(crate) fn test_rig_with_drive(
    (drive, drive_calls): (Box<RecordingDrive>, Arc<Mutex<Vec<&'static str>>>),
) -> TestRig {
    let climate = Arc::new(ClimateReader::new(
        Box::new(DeadClimateLink),
        Duration::from_secs(10),
    ));
    let moisture = Arc::new(MoistureLinkReader::new(
        Box::new(SilentSerialLink),
        Duration::from_secs(1),
    ));
    let edge_input = Arc::new(FakeEdgeInput::new());
    let button = Arc::new(ButtonEdgeSource::new(edge_input.clone()));
    let actuator = Arc::new(Actuator::new(drive));
    let indicator = Arc::new(StatusIndicator::new());

    let aggregator = Arc::new(StateAggregator::new(
        Arc::clone(&climate),
        Arc::clone(&moisture),
        Arc::clone(&button),
        Arc::clone(&actuator),
        Arc::clone(&indicator),
    ));

    TestRig {
        climate,
        moisture,
        button,
        edge_input,
        actuator,
        indicator,
        aggregator,
        drive_calls,
        sink: Arc::new(CollectingSink::default()),
    }
}
