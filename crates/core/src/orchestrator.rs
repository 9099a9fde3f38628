//! Button-triggered irrigation workflow.
//!
//! Each trigger runs one decision cycle: settle, read a snapshot, retry once
//! if moisture is missing, gate on the hard exclusions (no data, sensor out
//! of the soil), then run the actuator and publish the result. The same
//! workflow backs the externally-callable request path.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::button::EdgePress;
use crate::ports::EventSink;
use crate::state::{PlantStatus, StateAggregator};

/// Debounce against spurious immediate re-reads after a trigger.
const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// How long to wait for a missing moisture value before the single retry.
const DATA_GRACE: Duration = Duration::from_secs(2);

/// What a trigger led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No decision could be made; nothing was actuated and no event fired.
    Abandoned,
    /// The actuator ran; `success` mirrors the drive result.
    Finished { success: bool },
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Button,
    Request,
}

enum CycleState {
    AwaitingData { retried: bool },
    Deciding { moisture: i64 },
    Actuating { moisture: i64 },
}

/// The pieces one decision cycle works with.
#[derive(Clone)]
struct Workflow {
    aggregator: Arc<StateAggregator>,
    actuator: Arc<Actuator>,
    sink: Arc<dyn EventSink>,
}

impl Workflow {
    async fn run_cycle(&self, trigger: Trigger) -> CycleOutcome {
        tokio::time::sleep(SETTLE_DELAY).await;

        let mut state = CycleState::AwaitingData { retried: false };
        loop {
            state = match state {
                CycleState::AwaitingData { retried } => {
                    match self.aggregator.snapshot().soil_moisture {
                        Some(moisture) => CycleState::Deciding { moisture },
                        None if !retried => {
                            debug!(
                                grace_ms = DATA_GRACE.as_millis() as u64,
                                "no soil moisture yet, waiting for data"
                            );
                            tokio::time::sleep(DATA_GRACE).await;
                            CycleState::AwaitingData { retried: true }
                        }
                        None => {
                            warn!(?trigger, "still no soil moisture data, irrigation cancelled");
                            return CycleOutcome::Abandoned;
                        }
                    }
                }
                CycleState::Deciding { moisture } => {
                    if moisture == 0 {
                        warn!(?trigger, "sensor is not in the soil, irrigation cancelled");
                        return CycleOutcome::Abandoned;
                    }
                    match PlantStatus::classify(Some(moisture)) {
                        PlantStatus::Dry => info!(moisture, "soil is dry, starting irrigation"),
                        PlantStatus::Medium => {
                            info!(moisture, "soil moisture is medium, irrigating on request")
                        }
                        _ => info!(
                            moisture,
                            "soil moisture already adequate, irrigating on request anyway"
                        ),
                    }
                    CycleState::Actuating { moisture }
                }
                CycleState::Actuating { moisture } => {
                    let success = match self.actuator.irrigate().await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("irrigation failed: {e:#}");
                            false
                        }
                    };
                    self.sink.emit(
                        "irrigation_event",
                        json!({
                            "timestamp": OffsetDateTime::now_utc().unix_timestamp(),
                            "moisture": moisture,
                            "success": success,
                        }),
                    );
                    return CycleOutcome::Finished { success };
                }
            };
        }
    }
}

/// Consumes button edges and runs a decision cycle per press.
pub struct ActuationOrchestrator {
    workflow: Workflow,
    worker: Mutex<Option<(watch::Sender<bool>, JoinHandle<()>)>>,
}

impl ActuationOrchestrator {
    pub fn new(
        aggregator: Arc<StateAggregator>,
        actuator: Arc<Actuator>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            workflow: Workflow {
                aggregator,
                actuator,
                sink,
            },
            worker: Mutex::new(None),
        }
    }

    /// Start consuming `edges`. One cycle runs at a time; presses arriving
    /// mid-cycle queue in the channel.
    pub fn start(&self, mut edges: mpsc::Receiver<EdgePress>) {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let workflow = self.workflow.clone();

        let handle = tokio::spawn(async move {
            info!("actuation orchestrator running");
            loop {
                tokio::select! {
                    press = edges.recv() => match press {
                        Some(press) => {
                            info!(seq = press.seq, "button press received");
                            workflow.run_cycle(Trigger::Button).await;
                        }
                        None => {
                            debug!("edge channel closed");
                            break;
                        }
                    },
                    _ = stop_rx.changed() => break,
                }
            }
            info!("actuation orchestrator stopped");
        });

        *self.worker.lock().expect("lock poisoned") = Some((stop_tx, handle));
    }

    /// Stop consuming edges and join the worker. An in-progress cycle runs to
    /// completion first. Idempotent.
    pub async fn stop(&self) {
        let worker = self.worker.lock().expect("lock poisoned").take();
        if let Some((stop_tx, handle)) = worker {
            let _ = stop_tx.send(true);
            let _ = handle.await;
        }
    }

    /// Manually-triggered cycle, bypassing the button but not the workflow.
    pub async fn request_irrigation(&self) -> CycleOutcome {
        info!("irrigation requested directly");
        self.workflow.run_cycle(Trigger::Request).await
    }
}

// ===========================================================================
// Tests
// ===========================================================================
