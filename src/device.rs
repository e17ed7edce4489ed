//! MIDI device input
//!
//! Opens the controller's input port with midir and turns its callback
//! stream into an ordered event source for the pipeline.

use async_trait::async_trait;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::DeviceConfig;
use crate::error::{GatewayError, Result};
use crate::midi::{format_hex, RawEvent};
use crate::pipeline::EventSource;

/// Information about a MIDI input port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
    pub is_virtual: bool,
}

/// Discover input ports
pub fn discover_input_ports(client_name: &str) -> Result<Vec<PortInfo>> {
    let midi_in = MidiInput::new(&format!("{}-discovery", client_name))?;

    let port_infos = midi_in
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            let name = midi_in.port_name(port).ok()?;
            let is_virtual =
                name.contains("Virtual") || name.contains("loopMIDI") || name.contains("IAC");
            Some(PortInfo {
                index,
                name,
                is_virtual,
            })
        })
        .collect();

    Ok(port_infos)
}

/// Pick a port by numeric index or case-insensitive name substring.
/// Without a pattern the first port wins.
fn select_port(midi_in: &MidiInput, pattern: Option<&str>) -> Result<(MidiInputPort, String)> {
    let ports = midi_in.ports();
    if ports.is_empty() {
        return Err(GatewayError::NoInputDevice);
    }

    let named = |port: &MidiInputPort| midi_in.port_name(port).ok().map(|n| (port.clone(), n));

    let found = match pattern {
        None => ports.first().and_then(named),
        Some(pattern) => match pattern.parse::<usize>() {
            Ok(index) => ports.get(index).and_then(named),
            Err(_) => {
                let needle = pattern.to_lowercase();
                ports
                    .iter()
                    .filter_map(named)
                    .find(|(_, name)| name.to_lowercase().contains(&needle))
            }
        },
    };

    found.ok_or_else(|| GatewayError::PortNotFound(pattern.unwrap_or("<first>").to_string()))
}

/// Connect to the configured input port, invoking `on_message` from the
/// midir callback thread for every incoming message.
pub fn connect_input<F>(
    config: &DeviceConfig,
    mut on_message: F,
) -> Result<(MidiInputConnection<()>, String)>
where
    F: FnMut(&[u8]) + Send + 'static,
{
    let mut midi_in = MidiInput::new(&config.client_name)?;
    // SysEx, clock and active sensing carry no controller input
    midi_in.ignore(Ignore::All);

    debug!("Found {} MIDI input ports", midi_in.port_count());

    let (port, port_name) = select_port(&midi_in, config.input_port.as_deref())?;
    info!("Connecting to input port: {}", port_name);

    let connection = midi_in.connect(
        &port,
        &config.client_name,
        move |_timestamp, data, _| on_message(data),
        (),
    )?;

    Ok((connection, port_name))
}

fn port_present(client_name: &str, port_name: &str) -> bool {
    match MidiInput::new(&format!("{}-probe", client_name)) {
        Ok(midi_in) => midi_in
            .ports()
            .iter()
            .any(|port| midi_in.port_name(port).map_or(false, |n| n == port_name)),
        // Can't tell; assume the device is still there
        Err(_) => true,
    }
}

/// Live connection to the controller
///
/// Yields events in arrival order and ends the stream when the port
/// disappears.
pub struct DeviceInput {
    connection: Option<MidiInputConnection<()>>,
    rx: mpsc::UnboundedReceiver<RawEvent>,
    port_name: String,
    client_name: String,
    presence: Option<Interval>,
}

impl DeviceInput {
    /// Open the configured device. Must be called inside a Tokio runtime.
    pub fn open(config: &DeviceConfig) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let (connection, port_name) = connect_input(config, move |data| {
            match RawEvent::from_bytes(data) {
                Some(event) => {
                    // Receiver gone means we are shutting down
                    let _ = tx.send(event);
                }
                None => trace!("Ignored MIDI: {}", format_hex(data)),
            }
        })?;

        let presence = (config.presence_check_ms > 0).then(|| {
            let mut ticker = interval(Duration::from_millis(config.presence_check_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        Ok(Self {
            connection: Some(connection),
            rx,
            port_name,
            client_name: config.client_name.clone(),
            presence,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Close the MIDI connection
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            info!("Closed MIDI input: {}", self.port_name);
        }
    }
}

impl Drop for DeviceInput {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait(?Send)]
impl EventSource for DeviceInput {
    async fn next_event(&mut self) -> Option<RawEvent> {
        if self.connection.is_none() {
            return None;
        }

        loop {
            let Some(presence) = self.presence.as_mut() else {
                return self.rx.recv().await;
            };

            tokio::select! {
                event = self.rx.recv() => return event,
                _ = presence.tick() => {
                    if !port_present(&self.client_name, &self.port_name) {
                        warn!("MIDI device '{}' disconnected", self.port_name);
                        if let Some(connection) = self.connection.take() {
                            connection.close();
                        }
                        return None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_discovery() {
        // Just ensure discovery doesn't panic on machines without MIDI
        let _ = discover_input_ports("orba-gw-test");
    }
}
