//! Stampede Configuration Module
//!
//! This module provides configuration types and protocol constants shared by
//! the stampede load-generation crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Control-protocol version spoken by managers and the controller.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Default controller listen port for the client-manager link.
pub const DEFAULT_CONTROLLER_PORT: u16 = 3000;

/// Maximum size of a single framed element on the control link.
pub const MAX_ELEMENT_SIZE: usize = 1_048_576; // 1MB

/// Upper bound on any blocking wait before the stop flag is rechecked.
pub const MAX_BLOCK_TIME_MS: u64 = 5000;

/// Socket read deadline on the connected control link. Kept short so the
/// manager loop can service child-process exits between reads.
pub const LINK_READ_TIMEOUT_MS: u64 = 5000;

/// Delay between reconnect attempts after the link drops.
pub const RECONNECT_WAIT_MS: u64 = 30_000;

/// Default sleep for a worker whose activation flag is off.
pub const DEFAULT_IDLE_SLEEP_MS: u64 = 100;

/// Maximum sleep of the variance scheduler between event checks.
pub const SCHEDULER_TICK_MS: u64 = 100;

/// Transport security mode for the control link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransportMode {
    #[default]
    Plain,
    Tls,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Plain => write!(f, "plain"),
            TransportMode::Tls => write!(f, "tls"),
        }
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "tcp" => Ok(TransportMode::Plain),
            "tls" | "ssl" => Ok(TransportMode::Tls),
            _ => Err(format!("Unknown transport mode: {}", s)),
        }
    }
}

/// Client-manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Controller host name or address.
    pub controller_address: String,
    /// Controller port.
    pub controller_port: u16,
    /// Optional local address to bind before connecting out.
    pub source_address: Option<String>,
    /// Transport security mode.
    pub transport: TransportMode,
    /// Accept any server certificate when connecting over TLS.
    pub accept_any_certificate: bool,
    /// Optional PEM file with additional trusted root certificates.
    pub ca_certificate_file: Option<String>,
    /// Identifier reported to the controller in the hello message.
    pub client_id: String,
    /// Maximum number of client processes this manager may run at once.
    pub max_clients: usize,
    /// Number of client processes spawned immediately after a successful
    /// handshake.
    pub auto_create_clients: usize,
    /// Command line executed to start one client process.
    pub start_command: String,
    /// Socket read deadline while connected, in milliseconds.
    pub read_timeout_ms: u64,
    /// Delay between reconnect attempts, in milliseconds.
    pub reconnect_wait_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            controller_address: "localhost".to_string(),
            controller_port: DEFAULT_CONTROLLER_PORT,
            source_address: None,
            transport: TransportMode::Plain,
            accept_any_certificate: false,
            ca_certificate_file: None,
            client_id: "unidentified".to_string(),
            max_clients: 10,
            auto_create_clients: 0,
            start_command: "stampede-client".to_string(),
            read_timeout_ms: LINK_READ_TIMEOUT_MS,
            reconnect_wait_ms: RECONNECT_WAIT_MS,
        }
    }
}

impl ManagerConfig {
    /// The controller endpoint in `host:port` form.
    pub fn controller_endpoint(&self) -> String {
        format!("{}:{}", self.controller_address, self.controller_port)
    }

    /// Socket read deadline while connected.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Delay between reconnect attempts.
    pub fn reconnect_wait(&self) -> Duration {
        Duration::from_millis(self.reconnect_wait_ms)
    }
}

/// Per-job configuration for one client process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientJobConfig {
    /// Number of worker threads started for the job.
    pub workers: usize,
    /// Sleep applied by an inactive worker before rechecking its flag,
    /// in milliseconds.
    pub idle_sleep_ms: u64,
    /// Restart the variance program from the beginning when it runs out.
    pub loop_variance: bool,
    /// Path to the workload script.
    pub script_file: String,
    /// Optional path to the variance program file. Absent means every worker
    /// is activated at job start.
    pub variance_file: Option<String>,
    /// Total job duration in seconds. Zero means run until stopped.
    pub duration_secs: u64,
}

impl Default for ClientJobConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            idle_sleep_ms: DEFAULT_IDLE_SLEEP_MS,
            loop_variance: false,
            script_file: "job.script".to_string(),
            variance_file: None,
            duration_secs: 0,
        }
    }
}

impl ClientJobConfig {
    /// Idle sleep as a duration.
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
}

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse configuration file {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Loads a TOML configuration file into the given type.
pub fn load_toml<T, P>(path: P) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path_text = path.as_ref().display().to_string();
    let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
        path: path_text.clone(),
        reason: e.to_string(),
    })?;
    toml::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path_text,
        reason: e.to_string(),
    })
}
