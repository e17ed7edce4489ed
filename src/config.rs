//! Configuration management for Orba GW
//!
//! Handles loading and validation of the YAML configuration file. Every
//! section is optional; command-line flags override file values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::error::{GatewayError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// MIDI input configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DeviceConfig {
    /// Port name substring or numeric index; first port when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_port: Option<String>,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// How often to check that the device is still present (0 disables)
    #[serde(default = "default_presence_check_ms")]
    pub presence_check_ms: u64,
}

/// WebSocket server configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Send the current snapshot to a client as soon as it connects
    #[serde(default = "default_true")]
    pub initial_snapshot: bool,
}

/// Extra outputs
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct OutputConfig {
    /// Echo every snapshot to stdout as NDJSON
    #[serde(default)]
    pub stdout: bool,
}

fn default_client_name() -> String {
    "orba-gw".to_string()
}

fn default_presence_check_ms() -> u64 {
    1000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    crate::api::DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            input_port: None,
            client_name: default_client_name(),
            presence_check_ms: default_presence_check_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            initial_snapshot: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).await.map_err(|e| {
            GatewayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.client_name.trim().is_empty() {
            return Err(GatewayError::Config(
                "device.client_name must not be empty".to_string(),
            ));
        }
        if let Some(port) = &self.device.input_port {
            if port.trim().is_empty() {
                return Err(GatewayError::Config(
                    "device.input_port must not be empty when set".to_string(),
                ));
            }
        }
        if self.server.host.trim().is_empty() {
            return Err(GatewayError::Config("server.host must not be empty".to_string()));
        }
        Ok(())
    }

    /// `host:port` string for logging and binding
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
