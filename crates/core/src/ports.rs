//! Capability traits at the hardware boundary.
//!
//! The coordination core never touches GPIO, PWM, or serial ports directly.
//! Hardware-facing adapters (or the simulators in `plantcare-sim`) implement
//! these traits and are injected at construction time; the core consumes them
//! and publishes results through [`EventSink`].

use anyhow::Result;

/// Ambient temperature/humidity sensor.
///
/// One call per poll tick. A failed read is transient: the caller keeps its
/// previous value and tries again on the next tick.
pub trait ClimateSensorLink: Send {
    /// Read the sensor once. Returns `(temperature_celsius, relative_humidity)`.
    fn read(&mut self) -> Result<(f64, f64)>;
}

/// Line-oriented byte stream carrying soil-moisture telemetry.
pub trait SerialLink: Send {
    /// Whether at least one complete line is ready to be read.
    fn has_data_available(&mut self) -> bool;

    /// Read one line, without the trailing newline.
    fn read_line(&mut self) -> Result<Vec<u8>>;
}

/// Interrupt-driven push button.
///
/// The callback fires once per rising edge (idle → pressed), on whatever
/// execution context the underlying interrupt uses. It must never fire for a
/// held-down level.
pub trait EdgeInterruptSource: Send + Sync {
    /// Register the rising-edge callback, replacing any previous one.
    fn set_rising_callback(&self, callback: Box<dyn Fn() + Send + Sync + 'static>);

    /// Instantaneous pin level (`true` = pressed).
    fn is_high(&self) -> bool;
}

/// PWM output driving the irrigation mechanism. No position feedback.
pub trait PwmDrive: Send {
    /// Drive to minimum extent.
    fn drive_min(&mut self) -> Result<()>;

    /// Drive to maximum extent (the watering position).
    fn drive_max(&mut self) -> Result<()>;

    /// Disable the PWM output entirely.
    fn disable(&mut self) -> Result<()>;
}

/// Outbound push channel for actuation results.
///
/// The orchestrator emits `irrigation_event` records through this; the
/// notification layer on the other side decides the transport. Payloads are
/// flat key/value JSON objects.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &str, payload: serde_json::Value);
}
