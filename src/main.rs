//! ==============================================================================
//! main.rs - gate host entry point
//! ==============================================================================
//!
//! purpose:
//!     wires the device link, the event loop and the dashboard server
//!     together and keeps them running.
//!
//! responsibilities:
//!     - load configuration (host.toml + environment overrides)
//!     - initialize logging
//!     - build the sliding window and the stream adapter (fail fast on a
//!       zero-size window)
//!     - start the device link (serial or simulator)
//!     - serve the dashboard
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                    rust host (this file)                     │
//!     │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//!     │  │ device link │  │ event loop  │  │ web server          │  │
//!     │  │ serial/sim  │─►│ adapter +   │─►│ /ws  /api/snapshot  │  │
//!     │  │             │◄─│ window      │◄─│ /api/command        │  │
//!     │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//!     │     commands         owns all          broadcast frames      │
//!     │                      mutable state                           │
//!     └─────────────────────────────────────────────────────────────┘
//!
//!     only the event loop touches the window. everything else talks to it
//!     through one mpsc channel, so readings are applied in delivery order
//!     and no lock guards the buffer.
//!
//! ==============================================================================

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use gate_host::config::HostConfig;
use gate_host::link;
use gate_host::server::{self, AppState, BroadcastDashboard};
use gate_host::{SeriesWindow, StreamAdapter, WallClock};

/// inbound events buffered before the device link has to wait
const EVENT_QUEUE_DEPTH: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Gate Host - Live Sensor Dashboard");
    println!("===========================================================");

    // step 1: load configuration
    let mut config = HostConfig::load_or_default();
    config.apply_env()?;
    config.validate()?;
    config.print_summary();

    // step 2: logging (RUST_LOG wins over host.toml)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // step 3: window + adapter
    let window = SeriesWindow::new(config.window.max_points)
        .context("invalid window configuration")?;
    let dashboard = BroadcastDashboard::new();
    let (command_sink, command_rx) = link::command_channel(link::COMMAND_QUEUE_DEPTH);
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let state = AppState::new(events_tx.clone(), &dashboard);

    let adapter = StreamAdapter::new(window, dashboard, command_sink, WallClock)
        .with_sensor_logging(config.logging.show_sensor_data);

    // step 4: device link
    let mode = link::start(&config, events_tx, command_rx);
    tracing::info!("[STARTUP] ✓ device link: {}", mode);

    // step 5: web server in background
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("[STARTUP] ✓ Dashboard live at http://{}", addr);
    let web_server = tokio::spawn(async move { server::run_server(&addr, state).await });

    // step 6: event loop owns the adapter until shutdown
    let event_loop = tokio::spawn(adapter.run(events_rx));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("[RUNTIME] shutting down");
        }
        result = event_loop => {
            result?;
        }
        result = web_server => {
            result?.context("web server stopped")?;
        }
    }
    Ok(())
}
