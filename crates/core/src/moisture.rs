//! Soil-moisture telemetry over a line-oriented serial link.
//!
//! The probe firmware sends lines like `Moisture=42%`. Anything without the
//! `Moisture` token is unrelated chatter and is ignored; a token line whose
//! value does not parse is dropped with a logged parse failure, keeping the
//! previous value.

use std::num::ParseIntError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::poller::PollTask;
use crate::ports::SerialLink;

/// Latest soil-moisture percentage and when it arrived.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MoistureReading {
    pub percent: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Extract the moisture percentage from one serial line.
///
/// Returns `None` when the line carries no `Moisture` token, `Some(Err)` when
/// the token is present but the value between the first and second `=` does
/// not parse as an integer once `%` and whitespace are stripped.
pub(crate) fn parse_moisture_line(line: &str) -> Option<Result<i64, ParseIntError>> {
    if !line.contains("Moisture") {
        return None;
    }
    let value = line.split('=').nth(1).unwrap_or("");
    Some(value.replace('%', "").trim().parse())
}

/// Polls a [`SerialLink`] for moisture lines on a fixed interval.
///
/// Value and timestamp are updated together under one lock, so concurrent
/// readers never observe a new value with an old timestamp.
pub struct MoistureLinkReader {
    latest: Arc<Mutex<Option<MoistureReading>>>,
    link: Mutex<Option<Box<dyn SerialLink>>>,
    interval: Duration,
    task: Mutex<Option<PollTask>>,
}

impl MoistureLinkReader {
    pub fn new(link: Box<dyn SerialLink>, interval: Duration) -> Self {
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
            warn!("moisture reader already started");
            return;
        };

        let latest = Arc::clone(&self.latest);
        let task = PollTask::spawn("moisture", self.interval, move || {
            if !link.has_data_available() {
                return;
            }
            let raw = match link.read_line() {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("serial read failed: {e:#}");
                    return;
                }
            };
            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!("serial line is not valid utf-8: {e}");
                    return;
                }
            };
            debug!(line, "serial line received");

            match parse_moisture_line(line) {
                Some(Ok(percent)) => {
                    let mut latest = latest.lock().expect("lock poisoned");
                    *latest = Some(MoistureReading {
                        percent,
                        updated_at: OffsetDateTime::now_utc(),
                    });
                    info!(moisture = percent, "soil moisture updated");
                }
                Some(Err(e)) => warn!(line, "failed to parse moisture value: {e}"),
                None => {}
            }
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

    /// Latest reading, or `None` before the first accepted line.
    pub fn read(&self) -> Option<MoistureReading> {
        *self.latest.lock().expect("lock poisoned")
    }

    #[cfg(test)]
    pub(crate) fn seed(&self, percent: i64) {
        *self.latest.lock().expect("lock poisoned") = Some(MoistureReading {
            percent,
            updated_at: OffsetDateTime::now_utc(),
        });
    }
}

// ===========================================================================
// Tests
// ===========================================================================
