//! Controller state type definitions
//!
//! Defines the canonical state record, the instrument categories and the
//! typed field updates produced by the normalizer.

use serde::{Deserialize, Serialize};

/// Instrument category selected by the last press
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Drums,
    Bass,
    Chord,
    Treble,
}

impl Category {
    /// Look up the category for a MIDI channel (0-15)
    pub fn from_channel(channel: u8) -> Option<Self> {
        match channel {
            9 => Some(Category::Drums),
            8 => Some(Category::Bass),
            15 => Some(Category::Chord),
            0 => Some(Category::Treble),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Drums => write!(f, "drums"),
            Category::Bass => write!(f, "bass"),
            Category::Chord => write!(f, "chord"),
            Category::Treble => write!(f, "treble"),
        }
    }
}

/// Canonical controller state
///
/// Field order is the wire order of the snapshot. Continuous values are
/// normalized to [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub category: Category,
    pub note: f64,
    pub force: f64,
    pub swell: f64,
    pub rotational_velocity: f64,
    pub gyroscope: f64,
    pub accelerometer: f64,
    pub contact: bool,
}

/// A single assignment to one state field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldUpdate {
    Category(Category),
    Note(f64),
    Force(f64),
    Swell(f64),
    RotationalVelocity(f64),
    Gyroscope(f64),
    Accelerometer(f64),
    Contact(bool),
}

impl FieldUpdate {
    /// Name of the targeted field, as it appears in the snapshot
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldUpdate::Category(_) => "category",
            FieldUpdate::Note(_) => "note",
            FieldUpdate::Force(_) => "force",
            FieldUpdate::Swell(_) => "swell",
            FieldUpdate::RotationalVelocity(_) => "rotational_velocity",
            FieldUpdate::Gyroscope(_) => "gyroscope",
            FieldUpdate::Accelerometer(_) => "accelerometer",
            FieldUpdate::Contact(_) => "contact",
        }
    }
}

impl ControllerState {
    /// Apply one field update in place.
    ///
    /// Returns `true` only when the field actually took a new value.
    pub fn apply(&mut self, update: &FieldUpdate) -> bool {
        match *update {
            FieldUpdate::Category(v) => replace_if_changed(&mut self.category, v),
            FieldUpdate::Note(v) => replace_if_changed(&mut self.note, v),
            FieldUpdate::Force(v) => replace_if_changed(&mut self.force, v),
            FieldUpdate::Swell(v) => replace_if_changed(&mut self.swell, v),
            FieldUpdate::RotationalVelocity(v) => {
                replace_if_changed(&mut self.rotational_velocity, v)
            }
            FieldUpdate::Gyroscope(v) => replace_if_changed(&mut self.gyroscope, v),
            FieldUpdate::Accelerometer(v) => replace_if_changed(&mut self.accelerometer, v),
            FieldUpdate::Contact(v) => replace_if_changed(&mut self.contact, v),
        }
    }

    /// Serialize to a single NDJSON record (no trailing newline)
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
