//! ==============================================================================
//! gate-host - live telemetry dashboard for a gate controller
//! ==============================================================================
//!
//! the host reads distance/motion readings from the gate controller (or a
//! simulator), keeps the most recent ones in a bounded window and pushes
//! chart frames to browsers. servo commands flow the other way.
//!
//! ```text
//!     device link ──► event loop (StreamAdapter + SeriesWindow) ──► websocket clients
//!          ▲                          │
//!          └──────── servo commands ──┘
//! ```
//!
//! ==============================================================================

pub mod adapter;
pub mod config;
pub mod domain;
pub mod link;
pub mod protocol;
pub mod server;
pub mod window;

pub use adapter::{CommandSink, Dashboard, LabelClock, StreamAdapter, WallClock};
pub use domain::{HostEvent, Reading, ServoCommand, StatusText};
pub use window::{MotionMarker, SeriesWindow, WindowError, WindowSnapshot};
