//! Gateway error types.

use thiserror::Error;

/// Gateway error type.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No MIDI input port is available at all.
    #[error("No MIDI input devices found - plug in the controller and retry")]
    NoInputDevice,

    /// A port was requested by name or index but nothing matched.
    #[error("No MIDI input port matching '{0}'")]
    PortNotFound(String),

    /// Backend MIDI error (port enumeration, connection).
    #[error("MIDI error: {0}")]
    Midi(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<midir::InitError> for GatewayError {
    fn from(e: midir::InitError) -> Self {
        GatewayError::Midi(e.to_string())
    }
}

impl<T> From<midir::ConnectError<T>> for GatewayError {
    fn from(e: midir::ConnectError<T>) -> Self {
        GatewayError::Midi(e.to_string())
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
