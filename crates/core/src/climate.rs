//! Ambient temperature/humidity poller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::poller::PollTask;
use crate::ports::ClimateSensorLink;

/// Latest successfully measured ambient climate.
///
/// Fahrenheit is derived from the single measured Celsius value; the two
/// fields always describe the same measurement.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClimateReading {
    pub temperature_c: f64,
    pub temperature_f: f64,
    pub humidity: f64,
}

impl ClimateReading {
    pub(crate) fn from_celsius(temperature_c: f64, humidity: f64) -> Self {
        Self {
            temperature_c,
            temperature_f: temperature_c * 9.0 / 5.0 + 32.0,
            humidity,
        }
    }
}

/// Polls a [`ClimateSensorLink`] on a fixed interval.
///
/// `read()` is non-blocking and returns the last successful measurement; a
/// transient sensor failure keeps the previous value and waits for the next
/// scheduled poll (no mid-interval retry).
pub struct ClimateReader {
    latest: Arc<Mutex<Option<ClimateReading>>>,
    link: Mutex<Option<Box<dyn ClimateSensorLink>>>,
    interval: Duration,
    task: Mutex<Option<PollTask>>,
}

impl ClimateReader {
    pub fn new(link: Box<dyn ClimateSensorLink>, interval: Duration) -> Self {
        Self {
            latest: Arc::new(Mutex::new(None)),
            link: Mutex::new(Some(link)),
            interval,
            task: Mutex::new(None),
        }
    }

    /// Begin polling. A second call is a logged no-op.
    pub fn start(&self) {
        let Some(mut link) = self.link.lock().expect("lock poisoned").take() else {
            warn!("climate reader already started");
            return;
        };

        let latest = Arc::clone(&self.latest);
        let task = PollTask::spawn("climate", self.interval, move || match link.read() {
            Ok((temperature_c, humidity)) => {
                let reading = ClimateReading::from_celsius(temperature_c, humidity);
                *latest.lock().expect("lock poisoned") = Some(reading);
            }
            Err(e) => warn!("climate read failed: {e:#}"),
        });

        *self.task.lock().expect("lock poisoned") = Some(task);
    }

    /// Stop polling and join the task. Idempotent; the last reading survives.
    pub async fn stop(&self) {
        let task = self.task.lock().expect("lock poisoned").take();
        if let Some(task) = task {
            task.stop().await;
        }
    }

    /// Latest measurement, or `None` before the first successful poll.
    pub fn read(&self) -> Option<ClimateReading> {
        *self.latest.lock().expect("lock poisoned")
    }

    #[cfg(test)]
    pub(crate) fn seed(&self, temperature_c: f64, humidity: f64) {
        *self.latest.lock().expect("lock poisoned") =
            Some(ClimateReading::from_celsius(temperature_c, humidity));
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use std::collections::VecDeque;

    /// Link that replays a fixed script of responses, then keeps failing.
    struct ScriptedLink {
        script: VecDeque<Result<(f64, f64)>>,
    }

    impl ScriptedLink {
        fn new(script: Vec<Result<(f64, f64)>>) -> Box<Self> {
            Box::new(Self {
                script: script.into(),
            })
        }
    }

    impl ClimateSensorLink for ScriptedLink {
        fn read(&mut self) -> Result<(f64, f64)> {
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("script exhausted")))
        }
    }

    /// Let spawned tasks run under the paused clock.
    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    // -- Unit conversion ----------------------------------------------------

    #[test]
    fn from_celsius_freezing_point() {
        let r = ClimateReading::from_celsius(0.0, 50.0);
        assert_eq!(r.temperature_f, 32.0);
    }

    #[test]
    fn from_celsius_boiling_point() {
        let r = ClimateReading::from_celsius(100.0, 50.0);
        assert_eq!(r.temperature_f, 212.0);
    }

    #[test]
    fn from_celsius_room_temperature() {
        let r = ClimateReading::from_celsius(25.0, 40.0);
        assert_eq!(r.temperature_f, 77.0);
        assert_eq!(r.humidity, 40.0);
    }

    // -- Polling ------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn absent_before_first_poll() {
        let reader = ClimateReader::new(ScriptedLink::new(vec![]), Duration::from_secs(10));
        assert!(reader.read().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_populates_reading() {
        let reader = ClimateReader::new(
            ScriptedLink::new(vec![Ok((20.0, 55.0))]),
            Duration::from_secs(10),
        );
        reader.start();
        settle().await;

        let r = reader.read().expect("reading after first poll");
        assert_eq!(r.temperature_c, 20.0);
        assert_eq!(r.humidity, 55.0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_retains_previous_value() {
        let reader = ClimateReader::new(
            ScriptedLink::new(vec![
                Ok((20.0, 55.0)),
                Err(anyhow!("checksum error")),
                Ok((21.0, 56.0)),
            ]),
            Duration::from_secs(10),
        );
        reader.start();
        settle().await;

        // Second poll fails: previous value stays.
        tokio::time::sleep(Duration::from_secs(11)).await;
        settle().await;
        assert_eq!(reader.read().expect("reading").temperature_c, 20.0);

        // Third poll recovers.
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(reader.read().expect("reading").temperature_c, 21.0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_joins_and_keeps_last_value() {
        let reader = ClimateReader::new(
            ScriptedLink::new(vec![Ok((18.5, 60.0))]),
            Duration::from_secs(10),
        );
        reader.start();
        settle().await;

        reader.stop().await;
        let r = reader.read().expect("value survives stop");
        assert_eq!(r.temperature_c, 18.5);

        // Idempotent.
        reader.stop().await;
        assert!(reader.read().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_a_no_op() {
        let reader = ClimateReader::new(
            ScriptedLink::new(vec![Ok((20.0, 55.0))]),
            Duration::from_secs(10),
        );
        reader.start();
        reader.start(); // must not panic or spawn a second poller
        settle().await;
        assert!(reader.read().is_some());
        reader.stop().await;
    }
}
