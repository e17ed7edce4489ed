//! MIDI message parsing and conversion into raw controller events
//!
//! The device transport hands us raw MIDI bytes. Only channel voice messages
//! carry controller input; everything else is parsed for diagnostics and then
//! dropped before it reaches the normalizer.

use std::fmt;

/// MIDI message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Polyphonic Key Pressure: channel (0-15), note (0-127), pressure (0-127)
    PolyPressure { channel: u8, note: u8, pressure: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },

    /// Channel Pressure: channel (0-15), pressure (0-127)
    ChannelPressure { channel: u8, pressure: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },

    /// Any system message (SysEx, clock, active sensing...), identified by status byte
    System { status: u8 },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    ///
    /// Running status is not tracked; a leading data byte yields `None`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;

        if status < 0x80 {
            return None;
        }

        if status >= 0xF0 {
            return Some(MidiMessage::System { status });
        }

        let channel = status & 0x0F;
        let d1 = rest.first().map(|b| b & 0x7F);
        let d2 = rest.get(1).map(|b| b & 0x7F);

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff {
                channel,
                note: d1?,
                velocity: d2?,
            }),
            // Velocity 0 stays a Note On; the Orba sends it as a press
            0x90 => Some(MidiMessage::NoteOn {
                channel,
                note: d1?,
                velocity: d2?,
            }),
            0xA0 => Some(MidiMessage::PolyPressure {
                channel,
                note: d1?,
                pressure: d2?,
            }),
            0xB0 => Some(MidiMessage::ControlChange {
                channel,
                cc: d1?,
                value: d2?,
            }),
            0xC0 => Some(MidiMessage::ProgramChange { channel, program: d1? }),
            0xD0 => Some(MidiMessage::ChannelPressure { channel, pressure: d1? }),
            0xE0 => {
                let lsb = u16::from(d1?);
                let msb = u16::from(d2?);
                Some(MidiMessage::PitchBend {
                    channel,
                    value: (msb << 7) | lsb,
                })
            }
            _ => None,
        }
    }

}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel, note, velocity)
            }
            MidiMessage::PolyPressure { channel, note, pressure } => {
                write!(f, "PolyPressure ch:{} n:{} p:{}", channel, note, pressure)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel, cc, value)
            }
            MidiMessage::ProgramChange { channel, program } => {
                write!(f, "ProgramChange ch:{} p:{}", channel, program)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                write!(f, "ChannelPressure ch:{} p:{}", channel, pressure)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel, value)
            }
            MidiMessage::System { status } => write!(f, "System {:02X}", status),
        }
    }
}

/// Kind of controller event fed to the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Control change
    Control,
    /// Note on
    Press,
    /// Note off
    Release,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Control => write!(f, "control"),
            EventKind::Press => write!(f, "press"),
            EventKind::Release => write!(f, "release"),
        }
    }
}

/// An already-decoded controller event
///
/// Lives only for the duration of one reduction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub channel: u8,
    /// Controller number for `Control`, note number for `Press`/`Release`
    pub identifier: u8,
    /// Controller value or velocity
    pub value: u8,
}

impl RawEvent {
    pub fn control(channel: u8, identifier: u8, value: u8) -> Self {
        Self { kind: EventKind::Control, channel, identifier, value }
    }

    pub fn press(channel: u8, identifier: u8, value: u8) -> Self {
        Self { kind: EventKind::Press, channel, identifier, value }
    }

    pub fn release(channel: u8, identifier: u8, value: u8) -> Self {
        Self { kind: EventKind::Release, channel, identifier, value }
    }

    /// Convert a parsed MIDI message; messages that carry no controller
    /// input return `None`.
    pub fn from_message(message: &MidiMessage) -> Option<Self> {
        match *message {
            MidiMessage::ControlChange { channel, cc, value } => {
                Some(Self::control(channel, cc, value))
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                Some(Self::press(channel, note, velocity))
            }
            MidiMessage::NoteOff { channel, note, velocity } => {
                Some(Self::release(channel, note, velocity))
            }
            _ => None,
        }
    }

    /// Parse raw bytes straight into an event
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        MidiMessage::parse(data).as_ref().and_then(Self::from_message)
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ch:{} id:{} v:{}",
            self.kind, self.channel, self.identifier, self.value
        )
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_parsing() {
        let msg = MidiMessage::parse(&[0x99, 39, 100]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOn {
                channel: 9,
                note: 39,
                velocity: 100,
            }
        );
    }

    #[test]
    fn test_note_on_velocity_zero_is_press() {
        let msg = MidiMessage::parse(&[0x90, 64, 0]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOn {
                channel: 0,
                note: 64,
                velocity: 0,
            }
        );
        assert_eq!(RawEvent::from_message(&msg), Some(RawEvent::press(0, 64, 0)));
    }

    #[test]
    fn test_note_off_is_release() {
        let event = RawEvent::from_bytes(&[0x89, 39, 64]).unwrap();
        assert_eq!(event, RawEvent::release(9, 39, 64));
    }

    #[test]
    fn test_control_change() {
        let event = RawEvent::from_bytes(&[0xB2, 74, 127]).unwrap();
        assert_eq!(event, RawEvent::control(2, 74, 127));
    }

    #[test]
    fn test_pitch_bend() {
        let msg = MidiMessage::parse(&[0xE0, 0x00, 0x40]).unwrap();
        assert_eq!(msg, MidiMessage::PitchBend { channel: 0, value: 8192 });
        assert_eq!(RawEvent::from_message(&msg), None);
    }

    #[test]
    fn test_truncated_and_running_status() {
        assert_eq!(MidiMessage::parse(&[]), None);
        assert_eq!(MidiMessage::parse(&[0x90, 60]), None);
        assert_eq!(MidiMessage::parse(&[60, 100]), None);
    }

    #[test]
    fn test_system_messages_are_not_events() {
        let msg = MidiMessage::parse(&[0xF8]).unwrap();
        assert_eq!(msg, MidiMessage::System { status: 0xF8 });
        assert_eq!(RawEvent::from_bytes(&[0xF8]), None);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x99, 0x27, 0x64]), "99 27 64");
    }
}
