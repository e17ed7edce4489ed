//! MIDI sniffer for debugging and development
//!
//! Lists input ports and prints each incoming message together with the
//! field updates it normalizes to.

use anyhow::{Context, Result};
use colored::*;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::config::DeviceConfig;
use crate::device::{connect_input, discover_input_ports};
use crate::midi::{format_hex, MidiMessage, RawEvent};
use crate::normalizer::normalize;
use crate::state::FieldUpdate;

/// Captured MIDI message
#[derive(Debug, Clone)]
pub struct SnifferEvent {
    pub timestamp_ms: u64,
    pub data: Vec<u8>,
    pub message: Option<MidiMessage>,
}

/// CLI MIDI sniffer: runs until Ctrl+C
pub async fn run_cli_sniffer(config: &DeviceConfig) -> Result<()> {
    println!("{}", "=== MIDI Sniffer ===".bold().cyan());
    println!("Press Ctrl+C to exit\n");

    let (event_tx, mut event_rx) = mpsc::channel::<SnifferEvent>(1000);
    let start_time = Instant::now();

    let (connection, port_name) = connect_input(config, move |data| {
        let event = SnifferEvent {
            timestamp_ms: start_time.elapsed().as_millis() as u64,
            data: data.to_vec(),
            message: MidiMessage::parse(data),
        };
        let _ = event_tx.try_send(event);
    })
    .context("Failed to open MIDI input for sniffing")?;

    println!("{} {}", "Monitoring:".green(), port_name.bright_white());
    println!(
        "{}",
        "Format: [timestamp] HEX => PARSED | UPDATES".dimmed()
    );
    println!("{}\n", "─".repeat(80).dimmed());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => print_event(&event),
            _ = &mut ctrl_c => break,
        }
    }

    connection.close();
    println!("\n{}", "Sniffer stopped".yellow());
    Ok(())
}

fn print_event(event: &SnifferEvent) {
    let timestamp = format!("{:08}", event.timestamp_ms);
    let hex = format_hex(&event.data);

    let Some(message) = &event.message else {
        println!("[{}ms] {}", timestamp.dimmed(), hex.bright_black());
        return;
    };

    let hex_colored = match message {
        MidiMessage::NoteOn { .. } => hex.bright_green(),
        MidiMessage::NoteOff { .. } => hex.bright_red(),
        MidiMessage::ControlChange { .. } => hex.bright_yellow(),
        _ => hex.normal(),
    };

    let updates = RawEvent::from_message(message)
        .map(|raw| describe_updates(&normalize(&raw)))
        .unwrap_or_default();

    println!(
        "[{}ms] {} => {} {}",
        timestamp.dimmed(),
        hex_colored,
        message.to_string().bright_blue(),
        updates
    );
}

/// Render updates as `| field=value ...`, empty when nothing applies
pub fn describe_updates(updates: &[FieldUpdate]) -> String {
    if updates.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = updates
        .iter()
        .map(|update| {
            let value = match *update {
                FieldUpdate::Category(c) => c.to_string(),
                FieldUpdate::Contact(b) => b.to_string(),
                FieldUpdate::Note(v)
                | FieldUpdate::Force(v)
                | FieldUpdate::Swell(v)
                | FieldUpdate::RotationalVelocity(v)
                | FieldUpdate::Gyroscope(v)
                | FieldUpdate::Accelerometer(v) => format!("{:.4}", v),
            };
            format!("{}={}", update.field_name(), value)
        })
        .collect();

    format!("| {}", parts.join(" "))
}

/// List all input ports in a formatted way
pub fn list_ports_formatted(client_name: &str) {
    println!("\n{}", "=== Available MIDI Input Ports ===".bold().cyan());

    match discover_input_ports(client_name) {
        Ok(inputs) if inputs.is_empty() => {
            println!("  {}", "No input ports found".dimmed());
        }
        Ok(inputs) => {
            for port in inputs {
                let marker = if port.is_virtual {
                    "[VIRTUAL]".yellow()
                } else {
                    "[PHYSICAL]".green()
                };
                println!("  {:>2} {} {}", port.index, marker, port.name);
            }
        }
        Err(e) => println!("  {} {}", "Failed to enumerate ports:".red(), e),
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Category;

    #[test]
    fn test_describe_updates() {
        assert_eq!(describe_updates(&[]), "");
        assert_eq!(
            describe_updates(&[
                FieldUpdate::Category(Category::Treble),
                FieldUpdate::Note(0.5),
                FieldUpdate::Contact(true),
            ]),
            "| category=treble note=0.5000 contact=true"
        );
    }
}
