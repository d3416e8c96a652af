//! ==============================================================================
//! link.rs - device link (serial gate controller or simulator)
//! ==============================================================================
//!
//! purpose:
//!     produces `sensor` events for the event loop and delivers servo
//!     commands to the device.
//!
//! modes:
//!     - serial: the gate controller on a UART (feature = "hardware").
//!       a blocking reader thread assembles lines, a writer thread sends
//!       `<angle>\n` for every command.
//!     - simulator: synthetic readings around a base distance with rare
//!       motion events. commands are logged and dropped.
//!
//! ```text
//!     serial is attempted only when enabled in config. if the build has no
//!     hardware support or the port cannot be opened the simulator takes over.
//! ```
//!
//! relationships:
//!     - used by: main.rs (start), adapter.rs (via ChannelCommandSink)
//!     - uses: protocol.rs (line parsing, command encoding)
//!     - uses: rppal (on feature="hardware")
//!
//! ==============================================================================

use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::adapter::CommandSink;
use crate::config::{HostConfig, SimulatorConfig};
use crate::domain::{HostEvent, ServoCommand};

/// commands queued towards the device before new ones are dropped
pub const COMMAND_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Serial,
    Simulator,
}

impl std::fmt::Display for LinkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkMode::Serial => write!(f, "serial"),
            LinkMode::Simulator => write!(f, "simulator"),
        }
    }
}

// ==============================================================================
// outbound commands
// ==============================================================================

/// fire-and-forget sender used by the adapter
#[derive(Clone, Debug)]
pub struct ChannelCommandSink {
    tx: mpsc::Sender<ServoCommand>,
}

pub fn command_channel(depth: usize) -> (ChannelCommandSink, mpsc::Receiver<ServoCommand>) {
    let (tx, rx) = mpsc::channel(depth);
    (ChannelCommandSink { tx }, rx)
}

impl CommandSink for ChannelCommandSink {
    fn emit(&self, command: ServoCommand) {
        if let Err(e) = self.tx.try_send(command) {
            tracing::warn!("[COMMAND] dropped angle {}: {}", command.angle, e);
        }
    }
}

// ==============================================================================
// startup
// ==============================================================================

/// Start the device link and return which mode ended up running.
pub fn start(
    config: &HostConfig,
    events: mpsc::Sender<HostEvent>,
    commands: mpsc::Receiver<ServoCommand>,
) -> LinkMode {
    if config.serial.enabled {
        match serial::open(&config.serial) {
            Ok(port) => {
                tracing::info!(
                    "[LINK] serial {} @ {} baud",
                    config.serial.port,
                    config.serial.baud
                );
                serial::spawn(port, events, commands);
                return LinkMode::Serial;
            }
            Err(e) => {
                tracing::warn!("[LINK] serial unavailable ({:#}), falling back to simulator", e);
            }
        }
    }

    tracing::info!(
        "[LINK] simulator every {} ms",
        config.simulator.emit_interval_ms
    );
    tokio::spawn(run_simulator(config.simulator.clone(), events));
    tokio::spawn(drain_commands(commands));
    LinkMode::Simulator
}

// ==============================================================================
// simulator
// ==============================================================================

/// one synthetic `sensor` payload
pub fn simulate_reading<R: Rng>(config: &SimulatorConfig, rng: &mut R) -> Value {
    let noise = rng.gen_range(-config.jitter..=config.jitter);
    let dist = config.base_distance.saturating_add(noise).max(0);
    let mov = u8::from(rng.gen_bool(config.motion_probability));
    json!({ "dist": dist, "mov": mov })
}

async fn run_simulator(config: SimulatorConfig, events: mpsc::Sender<HostEvent>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(config.emit_interval_ms));
    loop {
        ticker.tick().await;
        let payload = {
            let mut rng = rand::thread_rng();
            simulate_reading(&config, &mut rng)
        };
        if events.send(HostEvent::Sensor(payload)).await.is_err() {
            tracing::debug!("[SIM] event loop closed, stopping");
            break;
        }
    }
}

async fn drain_commands(mut commands: mpsc::Receiver<ServoCommand>) {
    while let Some(command) = commands.recv().await {
        tracing::info!("[SIM] no device attached, servo angle {} ignored", command.angle);
    }
}

// ==============================================================================
// serial line assembly
// ==============================================================================

/// accumulates raw UART bytes and yields complete lines
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
    /// inside an overlong line, skipping until its newline
    discarding: bool,
}

impl LineAssembler {
    /// longest partial line kept before it is discarded as garbage
    const MAX_PENDING: usize = 256;

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                if self.discarding {
                    self.discarding = false;
                    continue;
                }
                let line = String::from_utf8_lossy(&self.pending).trim().to_string();
                self.pending.clear();
                if !line.is_empty() {
                    lines.push(line);
                }
            } else if !self.discarding {
                self.pending.push(b);
                if self.pending.len() > Self::MAX_PENDING {
                    self.pending.clear();
                    self.discarding = true;
                }
            }
        }
        lines
    }
}

/// Feed one UART read (possibly empty) through the assembler and forward
/// every data line as a `sensor` event.
///
/// returns false once the event loop is gone and the reader should stop.
pub fn forward_bytes(
    lines: &mut LineAssembler,
    bytes: &[u8],
    events: &mpsc::Sender<HostEvent>,
) -> bool {
    if events.is_closed() {
        return false;
    }
    for line in lines.push(bytes) {
        let Some(payload) = crate::protocol::parse_line(&line) else {
            tracing::debug!("[SERIAL] ignored line {:?}", line);
            continue;
        };
        if events.blocking_send(HostEvent::Sensor(payload)).is_err() {
            return false;
        }
    }
    true
}

// ==============================================================================
// REAL SERIAL (rppal uart)
// ==============================================================================
#[cfg(feature = "hardware")]
mod serial {
    use super::LineAssembler;
    use crate::config::SerialConfig;
    use crate::domain::{HostEvent, ServoCommand};
    use crate::protocol;

    use anyhow::{Context, Result};
    use rppal::uart::{Parity, Uart};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// the gate controller resets when the port opens
    const RESET_DELAY: Duration = Duration::from_secs(2);
    const READ_TIMEOUT: Duration = Duration::from_millis(100);
    const ERROR_BACKOFF: Duration = Duration::from_millis(200);

    pub struct Port(Uart);

    pub fn open(config: &SerialConfig) -> Result<Port> {
        let mut uart = Uart::with_path(&config.port, config.baud, Parity::None, 8, 1)
            .with_context(|| format!("opening {}", config.port))?;
        uart.set_read_mode(0, READ_TIMEOUT)?;
        Ok(Port(uart))
    }

    pub fn spawn(
        port: Port,
        events: mpsc::Sender<HostEvent>,
        mut commands: mpsc::Receiver<ServoCommand>,
    ) {
        let uart = Arc::new(Mutex::new(port.0));

        let reader = uart.clone();
        std::thread::spawn(move || {
            std::thread::sleep(RESET_DELAY);
            let mut lines = LineAssembler::default();
            let mut buf = [0u8; 128];
            loop {
                let read = match reader.lock() {
                    Ok(mut uart) => uart.read(&mut buf),
                    Err(_) => break,
                };
                match read {
                    // a timed out read still notices a stopped event loop
                    Ok(n) => {
                        if !super::forward_bytes(&mut lines, &buf[..n], &events) {
                            tracing::debug!("[SERIAL] event loop closed, stopping reader");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("[SERIAL] read error: {}", e);
                        std::thread::sleep(ERROR_BACKOFF);
                    }
                }
            }
        });

        std::thread::spawn(move || {
            while let Some(command) = commands.blocking_recv() {
                let line = protocol::format_command(command.angle);
                let written = match uart.lock() {
                    Ok(mut uart) => uart.write(line.as_bytes()),
                    Err(_) => break,
                };
                match written {
                    Ok(_) => tracing::debug!("[SERIAL] sent {:?}", line.trim_end()),
                    Err(e) => tracing::warn!("[SERIAL] write failed for angle {}: {}", command.angle, e),
                }
            }
        });
    }
}

// ==============================================================================
// MOCK SERIAL (non-hardware build)
// ==============================================================================
#[cfg(not(feature = "hardware"))]
mod serial {
    use crate::config::SerialConfig;
    use crate::domain::{HostEvent, ServoCommand};

    use anyhow::{bail, Result};
    use tokio::sync::mpsc;

    /// cannot be constructed without hardware support
    pub enum Port {}

    pub fn open(config: &SerialConfig) -> Result<Port> {
        bail!("built without the hardware feature, cannot open {}", config.port)
    }

    pub fn spawn(
        port: Port,
        _events: mpsc::Sender<HostEvent>,
        _commands: mpsc::Receiver<ServoCommand>,
    ) {
        match port {}
    }
}
