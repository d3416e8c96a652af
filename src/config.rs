//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     the deployment environment overrides (PORT, USE_SERIAL, ...).
//!
//! structure:
//!     - ServerConfig: Where the dashboard listens.
//!     - WindowConfig: How many points the chart keeps.
//!     - SerialConfig: UART path and baud rate of the gate controller.
//!     - SimulatorConfig: Synthetic readings when no device is attached.
//!     - LoggingConfig: Log level and per-reading output.
//!
//! ==============================================================================

use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::Path;

use crate::window::DEFAULT_MAX_POINTS;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HostConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WindowConfig {
    pub max_points: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialConfig {
    pub enabled: bool,
    pub port: String,
    pub baud: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorConfig {
    pub emit_interval_ms: u64,
    pub base_distance: i64,
    pub jitter: i64,
    pub motion_probability: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5000 }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { max_points: DEFAULT_MAX_POINTS }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { enabled: false, port: "/dev/ttyACM0".to_string(), baud: 9600 }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            emit_interval_ms: 600,
            base_distance: 2500,
            jitter: 50,
            motion_probability: 0.05,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: false }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }

    /// Load with default fallback
    ///
    /// runs before the log subscriber exists, so it reports on stdout.
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("config").join("host.toml"),
            std::path::PathBuf::from("..").join("config").join("host.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Apply process environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overrides: PORT, USE_SERIAL, SERIAL_PORT, SERIAL_BAUD, EMIT_INTERVAL (seconds)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT {:?}: {}", port, e))?;
        }
        if let Some(flag) = lookup("USE_SERIAL") {
            self.serial.enabled = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(path) = lookup("SERIAL_PORT") {
            self.serial.port = path;
        }
        if let Some(baud) = lookup("SERIAL_BAUD") {
            self.serial.baud = baud
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid SERIAL_BAUD {:?}: {}", baud, e))?;
        }
        if let Some(interval) = lookup("EMIT_INTERVAL") {
            let seconds: f64 = interval
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid EMIT_INTERVAL {:?}: {}", interval, e))?;
            self.simulator.emit_interval_ms = (seconds * 1000.0).round() as u64;
        }
        Ok(())
    }

    /// Reject configurations the host cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.window.max_points == 0 {
            bail!("window.max_points must be greater than zero");
        }
        if self.simulator.emit_interval_ms == 0 {
            bail!("simulator.emit_interval_ms must be greater than zero");
        }
        if !(0.0..=1.0).contains(&self.simulator.motion_probability) {
            bail!(
                "simulator.motion_probability must be within [0, 1], got {}",
                self.simulator.motion_probability
            );
        }
        if self.simulator.jitter < 0 {
            bail!("simulator.jitter must not be negative");
        }
        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│           HOST CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Listen: {}:{}", self.server.host, self.server.port);
        println!("│ Window: {} points", self.window.max_points);
        if self.serial.enabled {
            println!("│ Source: serial {} @ {} baud", self.serial.port, self.serial.baud);
        } else {
            println!("│ Source: simulator ({} ms)", self.simulator.emit_interval_ms);
        }
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.window.max_points, 120);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.simulator.emit_interval_ms, 600);
        assert!(!config.serial.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let config = HostConfig::parse(
            r#"
            [window]
            max_points = 30

            [serial]
            enabled = true
            port = "/dev/ttyUSB0"
            baud = 115200
            "#,
        )
        .unwrap();
        assert_eq!(config.window.max_points, 30);
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = HostConfig::parse(
            r#"
            [window]
            max_points = 60

            [simulator]
            emit_interval_ms = 300
            "#,
        )
        .unwrap();
        assert_eq!(config.window.max_points, 60);
        assert_eq!(config.simulator.emit_interval_ms, 300);
        assert_eq!(config.simulator.base_distance, 2500);
        assert_eq!(config.simulator.jitter, 50);
        assert_eq!(config.simulator.motion_probability, 0.05);
    }

    #[test]
    fn test_zero_capacity_fails_validation() {
        let config = HostConfig::parse("[window]\nmax_points = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "8080"),
            ("USE_SERIAL", "Yes"),
            ("SERIAL_PORT", "/dev/serial0"),
            ("SERIAL_BAUD", "19200"),
            ("EMIT_INTERVAL", "0.25"),
        ]
        .into_iter()
        .collect();

        let mut config = HostConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.serial.enabled);
        assert_eq!(config.serial.port, "/dev/serial0");
        assert_eq!(config.serial.baud, 19200);
        assert_eq!(config.simulator.emit_interval_ms, 250);
    }

    #[test]
    fn test_bad_override_is_error() {
        let mut config = HostConfig::default();
        assert!(config
            .apply_overrides(|k| (k == "PORT").then(|| "not-a-port".to_string()))
            .is_err());
    }
}
