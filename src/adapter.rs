//! ==============================================================================
//! adapter.rs - stream adapter between the device link and the dashboard
//! ==============================================================================
//!
//! purpose:
//!     turns inbound `sensor` payloads into window appends and dashboard
//!     updates, and turns dashboard servo requests into outbound commands.
//!
//! flow:
//!
//! ```text
//!     sensor payload ──► decode ──► window.append ──► status text
//!                          │                       └► redraw(snapshot)
//!                          └─ malformed: dropped, window untouched
//!
//!     command(angle) ──► CommandSink::emit (fire-and-forget)
//! ```
//!
//! relationships:
//!     - owns: window.rs (SeriesWindow, exclusively)
//!     - used by: main.rs event loop (one event at a time, run to completion)
//!     - implemented by: server.rs (Dashboard), link.rs (CommandSink)
//!
//! ==============================================================================

use crate::domain::{HostEvent, PayloadError, Reading, RedrawMode, ServoCommand, StatusText};
use crate::window::{SeriesWindow, WindowSnapshot};
use tokio::sync::mpsc;

/// rendering + text display collaborator
pub trait Dashboard {
    /// redraw the chart from a full snapshot
    fn redraw(&mut self, snapshot: WindowSnapshot, mode: RedrawMode);
    /// replace the distance / motion text slots
    fn show_status(&mut self, status: StatusText);
}

/// outbound command channel towards the device
///
/// delivery is not guaranteed: implementations drop and log on failure
/// and never report back.
pub trait CommandSink {
    fn emit(&self, command: ServoCommand);
}

/// produces the x axis label for a new sample
pub trait LabelClock {
    fn label(&self) -> String;
}

/// local wall clock, `HH:MM:SS`
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl LabelClock for WallClock {
    fn label(&self) -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

pub struct StreamAdapter<D, C, K = WallClock> {
    window: SeriesWindow,
    dashboard: D,
    commands: C,
    clock: K,
    /// log every accepted reading at info level
    show_sensor_data: bool,
}

impl<D: Dashboard, C: CommandSink, K: LabelClock> StreamAdapter<D, C, K> {
    pub fn new(window: SeriesWindow, dashboard: D, commands: C, clock: K) -> Self {
        Self {
            window,
            dashboard,
            commands,
            clock,
            show_sensor_data: false,
        }
    }

    pub fn with_sensor_logging(mut self, enabled: bool) -> Self {
        self.show_sensor_data = enabled;
        self
    }

    pub fn window(&self) -> &SeriesWindow {
        &self.window
    }

    pub fn dashboard(&self) -> &D {
        &self.dashboard
    }

    pub fn commands(&self) -> &C {
        &self.commands
    }

    /// single entry point for the event loop
    pub fn dispatch(&mut self, event: HostEvent) {
        match event {
            HostEvent::Sensor(payload) => {
                if let Err(e) = self.on_reading(&payload) {
                    tracing::warn!("[SENSOR] dropped payload {}: {}", payload, e);
                }
            }
            HostEvent::Command(command) => self.send_command(command.angle),
            HostEvent::ClientConnected => self.on_connect(),
            HostEvent::ClientDisconnected => self.on_disconnect(),
        }
    }

    /// Handles one `sensor` payload.
    ///
    /// A payload that fails to decode leaves the window and the dashboard
    /// untouched. Otherwise the status text is derived from the payload
    /// itself, not from the window, and the chart is redrawn exactly once.
    pub fn on_reading(&mut self, payload: &serde_json::Value) -> Result<(), PayloadError> {
        let reading = Reading::from_payload(payload)?;

        let label = self.clock.label();
        if self.show_sensor_data {
            tracing::info!(
                "[SENSOR] {} | Distance: {} cm | Motion: {}",
                label,
                reading.distance,
                reading.motion_detected
            );
        }
        self.window
            .append(label, reading.distance, reading.motion_detected);

        self.dashboard.show_status(StatusText::from_reading(&reading));
        self.dashboard
            .redraw(self.window.snapshot(), RedrawMode::Immediate);
        Ok(())
    }

    /// forward a servo angle to the device, no acknowledgement
    pub fn send_command(&self, angle: f64) {
        tracing::info!("[COMMAND] servo angle {}", angle);
        self.commands.emit(ServoCommand { angle });
    }

    pub fn on_connect(&self) {
        tracing::info!("[CLIENT] dashboard connected");
    }

    pub fn on_disconnect(&self) {
        tracing::info!("[CLIENT] dashboard disconnected");
    }

    /// Event loop: handles events strictly in arrival order, each one to
    /// completion, until every sender is gone.
    pub async fn run(mut self, mut events: mpsc::Receiver<HostEvent>) -> Self {
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
        tracing::info!("[RUNTIME] event loop stopped");
        self
    }
}
