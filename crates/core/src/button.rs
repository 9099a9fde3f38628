//! Rising-edge button events with press bookkeeping.
//!
//! The interrupt callback updates the counter under the button's own lock,
//! releases it, and only then hands the press to the subscriber via a bounded
//! channel `try_send`. A slow or dead subscriber therefore drops presses
//! instead of blocking edge delivery or `state()`.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ports::EdgeInterruptSource;

/// Presses queued for the subscriber before new edges are dropped.
const EDGE_QUEUE_DEPTH: usize = 8;

/// Bookkeeping exposed by [`ButtonEdgeSource::state`].
#[derive(Debug, Clone, Serialize)]
pub struct ButtonState {
    pub press_count: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_press: Option<OffsetDateTime>,
    pub is_pressed: bool,
}

/// One rising edge, as delivered to the subscriber.
#[derive(Debug, Clone, Copy)]
pub struct EdgePress {
    /// Press counter value at the time of this edge (starts at 1).
    pub seq: u64,
    pub at: OffsetDateTime,
}

struct Bookkeeping {
    press_count: u64,
    last_press: Option<OffsetDateTime>,
    subscriber: Option<mpsc::Sender<EdgePress>>,
}

/// Translates hardware rising edges into [`EdgePress`] events for a single
/// subscriber, while tracking press count and last-press time.
pub struct ButtonEdgeSource {
    inner: Arc<Mutex<Bookkeeping>>,
    input: Arc<dyn EdgeInterruptSource>,
}

impl ButtonEdgeSource {
    /// Wire up the edge callback. The returned source is immediately live:
    /// presses are counted even before anyone subscribes.
    pub fn new(input: Arc<dyn EdgeInterruptSource>) -> Self {
        let inner = Arc::new(Mutex::new(Bookkeeping {
            press_count: 0,
            last_press: None,
            subscriber: None,
        }));

        let callback_inner = Arc::clone(&inner);
        input.set_rising_callback(Box::new(move || {
            let now = OffsetDateTime::now_utc();
            // Bookkeeping under lock; subscriber notified after release.
            let (press, subscriber) = {
                let mut inner = callback_inner.lock().expect("lock poisoned");
                inner.press_count += 1;
                inner.last_press = Some(now);
                (
                    EdgePress {
                        seq: inner.press_count,
                        at: now,
                    },
                    inner.subscriber.clone(),
                )
            };
            debug!(seq = press.seq, "button rising edge");

            if let Some(subscriber) = subscriber {
                match subscriber.try_send(press) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(seq = press.seq, "subscriber lagging, press dropped")
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!("no live subscriber for button press")
                    }
                }
            }
        }));

        Self { inner, input }
    }

    /// Register the press subscriber, replacing any previous one (whose
    /// receiver then sees its channel close).
    pub fn subscribe(&self) -> mpsc::Receiver<EdgePress> {
        let (tx, rx) = mpsc::channel(EDGE_QUEUE_DEPTH);
        self.inner.lock().expect("lock poisoned").subscriber = Some(tx);
        rx
    }

    pub fn state(&self) -> ButtonState {
        let inner = self.inner.lock().expect("lock poisoned");
        ButtonState {
            press_count: inner.press_count,
            last_press: inner.last_press,
            is_pressed: self.input.is_high(),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeEdgeInput;

    #[tokio::test]
    async fn presses_are_counted_and_delivered() {
        let input = Arc::new(FakeEdgeInput::new());
        let source = ButtonEdgeSource::new(input.clone());
        let mut rx = source.subscribe();

        input.press();
        input.press();

        let first = rx.recv().await.expect("first press");
        let second = rx.recv().await.expect("second press");
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);

        let state = source.state();
        assert_eq!(state.press_count, 2);
        assert!(state.last_press.is_some());
    }

    #[tokio::test]
    async fn presses_before_subscribe_are_still_counted() {
        let input = Arc::new(FakeEdgeInput::new());
        let source = ButtonEdgeSource::new(input.clone());

        input.press();
        assert_eq!(source.state().press_count, 1);
    }

    #[tokio::test]
    async fn new_subscriber_replaces_previous() {
        let input = Arc::new(FakeEdgeInput::new());
        let source = ButtonEdgeSource::new(input.clone());

        let mut old_rx = source.subscribe();
        let mut new_rx = source.subscribe();

        input.press();

        // Old receiver's sender was dropped on replacement.
        assert!(old_rx.recv().await.is_none());
        assert_eq!(new_rx.recv().await.expect("press").seq, 1);
    }

    #[tokio::test]
    async fn lagging_subscriber_drops_presses_but_keeps_counting() {
        let input = Arc::new(FakeEdgeInput::new());
        let source = ButtonEdgeSource::new(input.clone());
        let mut rx = source.subscribe();

        // Fill the queue and then some, without consuming.
        for _ in 0..EDGE_QUEUE_DEPTH + 3 {
            input.press();
        }

        // Every edge was counted even though some were dropped.
        assert_eq!(source.state().press_count, (EDGE_QUEUE_DEPTH + 3) as u64);

        let mut delivered = 0;
        while let Ok(press) = rx.try_recv() {
            delivered += 1;
            assert!(press.seq <= EDGE_QUEUE_DEPTH as u64);
        }
        assert_eq!(delivered, EDGE_QUEUE_DEPTH);
    }

    #[tokio::test]
    async fn state_reflects_instantaneous_level() {
        let input = Arc::new(FakeEdgeInput::new());
        let source = ButtonEdgeSource::new(input.clone());

        assert!(!source.state().is_pressed);
        input.set_level(true);
        assert!(source.state().is_pressed);
    }
}
