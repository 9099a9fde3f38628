//! Plant monitoring and irrigation coordination.
//!
//! Background pollers read ambient climate and soil moisture into
//! per-component stores, the [`StateAggregator`] composes them into a
//! classified [`StatusSnapshot`], and the [`ActuationOrchestrator`] turns
//! button presses (or direct requests) into serialized, timed irrigation
//! cycles on the [`Actuator`].
//!
//! Hardware is injected through the traits in [`ports`]; this crate contains
//! no driver code. Every stateful component guards only its own fields with
//! its own lock — there is no global lock, and a snapshot is a best-effort
//! composite of independently-locked reads, not a transaction.

mod actuator;
mod button;
mod climate;
mod indicator;
mod moisture;
mod orchestrator;
mod poller;
pub mod ports;
mod state;
#[cfg(test)]
mod testutil;

pub use actuator::{ActuationRecord, Actuator};
pub use button::{ButtonEdgeSource, ButtonState, EdgePress};
pub use climate::{ClimateReader, ClimateReading};
pub use indicator::{IndicatorLight, StatusIndicator};
pub use moisture::{MoistureLinkReader, MoistureReading};
pub use orchestrator::{ActuationOrchestrator, CycleOutcome};
pub use state::{PlantStatus, StateAggregator, StatusSnapshot};
