//! Timed irrigation actuation over a PWM drive.
//!
//! One physical mechanism, no position feedback. The whole protocol runs
//! under a single async lock, so overlapping `irrigate()` calls execute
//! strictly one after another, never interleaved.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use crate::ports::PwmDrive;

/// Target drive extent for a protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extent {
    Min,
    Max,
}

struct ProtocolPhase {
    label: &'static str,
    extent: Extent,
    hold: Duration,
}

/// The fixed watering sequence: prime at minimum, open to maximum for the
/// watering window, return to minimum, then cut the output.
const IRRIGATION_PROTOCOL: [ProtocolPhase; 3] = [
    ProtocolPhase {
        label: "prime",
        extent: Extent::Min,
        hold: Duration::from_millis(500),
    },
    ProtocolPhase {
        label: "water",
        extent: Extent::Max,
        hold: Duration::from_secs(2),
    },
    ProtocolPhase {
        label: "retract",
        extent: Extent::Min,
        hold: Duration::from_secs(1),
    },
];

/// Completed-cycle bookkeeping. Only successful cycles count.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActuationRecord {
    pub cycle_count: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_cycle: Option<OffsetDateTime>,
}

/// Serialized driver for the single irrigation mechanism.
pub struct Actuator {
    drive: AsyncMutex<Box<dyn PwmDrive>>,
    record: Mutex<ActuationRecord>,
}

impl Actuator {
    pub fn new(drive: Box<dyn PwmDrive>) -> Self {
        Self {
            drive: AsyncMutex::new(drive),
            record: Mutex::new(ActuationRecord::default()),
        }
    }

    /// Run one full irrigation cycle.
    ///
    /// Blocks the caller for the whole protocol (~3.5 s); a concurrent call
    /// waits on the drive lock rather than failing. On any drive fault the
    /// output is forced off and the cycle does not count.
    pub async fn irrigate(&self) -> Result<()> {
        let mut drive = self.drive.lock().await;
        info!("irrigation cycle started");

        match run_protocol(&mut **drive).await {
            Ok(()) => {
                let mut record = self.record.lock().expect("lock poisoned");
                record.cycle_count += 1;
                record.last_cycle = Some(OffsetDateTime::now_utc());
                info!(total = record.cycle_count, "irrigation cycle complete");
                Ok(())
            }
            Err(e) => {
                if let Err(disable_err) = drive.disable() {
                    error!("could not disable drive after fault: {disable_err:#}");
                }
                warn!("irrigation cycle failed: {e:#}");
                Err(e)
            }
        }
    }

    /// Counter and last-cycle timestamp. Never waits on an in-progress cycle.
    pub fn state(&self) -> ActuationRecord {
        self.record.lock().expect("lock poisoned").clone()
    }

    /// Force the drive output off, for shutdown. Waits for any in-progress
    /// cycle to release the drive first.
    pub async fn cleanup(&self) -> Result<()> {
        let mut drive = self.drive.lock().await;
        drive.disable().context("disabling drive during shutdown")
    }
}

async fn run_protocol(drive: &mut dyn PwmDrive) -> Result<()> {
    for phase in &IRRIGATION_PROTOCOL {
        match phase.extent {
            Extent::Min => drive.drive_min(),
            Extent::Max => drive.drive_max(),
        }
        .with_context(|| format!("moving drive in {} phase", phase.label))?;

        debug!(
            phase = phase.label,
            hold_ms = phase.hold.as_millis() as u64,
            "phase reached"
        );
        tokio::time::sleep(phase.hold).await;
    }
    drive.disable().context("disabling drive output")
}

// ===========================================================================
// Tests
// ===========================================================================
