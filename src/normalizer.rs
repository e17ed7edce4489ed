//! Event normalization
//!
//! Maps a raw controller event onto zero or more typed field updates using
//! fixed routing tables. Pure and infallible: anything unrecognized simply
//! produces no updates.

use crate::midi::{EventKind, RawEvent};
use crate::state::{Category, FieldUpdate};

/// Motion sensor: rotation
pub const CC_ROTATIONAL_VELOCITY: u8 = 112;
/// Motion sensor: tilt
pub const CC_GYROSCOPE: u8 = 1;
/// Expressive swell
pub const CC_SWELL: u8 = 74;
/// Motion sensor: shake
pub const CC_ACCELEROMETER: u8 = 113;

/// Contact sensor (table hit) channel
pub const CONTACT_CHANNEL: u8 = 9;
/// Contact sensor (table hit) note
pub const CONTACT_NOTE: u8 = 39;

/// Map a 7-bit value onto [0, 1], clamping anything above 127
pub fn normalize_7bit(value: u8) -> f64 {
    (f64::from(value) / 127.0).clamp(0.0, 1.0)
}

fn is_contact(event: &RawEvent) -> bool {
    event.channel == CONTACT_CHANNEL && event.identifier == CONTACT_NOTE
}

/// Translate one raw event into field updates
pub fn normalize(event: &RawEvent) -> Vec<FieldUpdate> {
    match event.kind {
        EventKind::Control => {
            let value = normalize_7bit(event.value);
            let update = match event.identifier {
                CC_ROTATIONAL_VELOCITY => FieldUpdate::RotationalVelocity(value),
                CC_GYROSCOPE => FieldUpdate::Gyroscope(value),
                CC_SWELL => FieldUpdate::Swell(value),
                CC_ACCELEROMETER => FieldUpdate::Accelerometer(value),
                _ => return Vec::new(),
            };
            vec![update]
        }
        EventKind::Press if is_contact(event) => vec![FieldUpdate::Contact(true)],
        EventKind::Press => {
            let mut updates = Vec::with_capacity(3);
            // Unmapped channels keep whatever category was last selected
            if let Some(category) = Category::from_channel(event.channel) {
                updates.push(FieldUpdate::Category(category));
            }
            updates.push(FieldUpdate::Note(normalize_7bit(event.identifier)));
            updates.push(FieldUpdate::Force(normalize_7bit(event.value)));
            updates
        }
        EventKind::Release if is_contact(event) => vec![FieldUpdate::Contact(false)],
        // Note/force/category persist across note-off
        EventKind::Release => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_routing_table() {
        assert_eq!(
            normalize(&RawEvent::control(0, 112, 127)),
            vec![FieldUpdate::RotationalVelocity(1.0)]
        );
        assert_eq!(
            normalize(&RawEvent::control(3, 1, 0)),
            vec![FieldUpdate::Gyroscope(0.0)]
        );
        assert_eq!(
            normalize(&RawEvent::control(15, 74, 127)),
            vec![FieldUpdate::Swell(1.0)]
        );
        assert_eq!(
            normalize(&RawEvent::control(0, 113, 0)),
            vec![FieldUpdate::Accelerometer(0.0)]
        );
    }

    #[test]
    fn test_unmapped_controller_is_ignored() {
        assert!(normalize(&RawEvent::control(0, 7, 100)).is_empty());
        assert!(normalize(&RawEvent::control(0, 64, 127)).is_empty());
    }

    #[test]
    fn test_out_of_range_value_is_clamped() {
        assert_eq!(normalize_7bit(200), 1.0);
        assert_eq!(
            normalize(&RawEvent::control(0, 74, 255)),
            vec![FieldUpdate::Swell(1.0)]
        );
    }

    #[test]
    fn test_contact_press_and_release() {
        assert_eq!(
            normalize(&RawEvent::press(9, 39, 90)),
            vec![FieldUpdate::Contact(true)]
        );
        assert_eq!(
            normalize(&RawEvent::release(9, 39, 0)),
            vec![FieldUpdate::Contact(false)]
        );
    }

    #[test]
    fn test_contact_note_on_other_channel_is_music() {
        let updates = normalize(&RawEvent::press(8, 39, 64));
        assert_eq!(updates[0], FieldUpdate::Category(Category::Bass));
        assert_eq!(updates.len(), 3);
    }

    #[test]
    fn test_music_press() {
        let updates = normalize(&RawEvent::press(0, 64, 100));
        assert_eq!(
            updates,
            vec![
                FieldUpdate::Category(Category::Treble),
                FieldUpdate::Note(64.0 / 127.0),
                FieldUpdate::Force(100.0 / 127.0),
            ]
        );
    }

    #[test]
    fn test_unmapped_channel_press_leaves_category_alone() {
        let updates = normalize(&RawEvent::press(4, 60, 80));
        assert_eq!(
            updates,
            vec![
                FieldUpdate::Note(60.0 / 127.0),
                FieldUpdate::Force(80.0 / 127.0),
            ]
        );
    }

    #[test]
    fn test_music_release_is_ignored() {
        assert!(normalize(&RawEvent::release(0, 64, 0)).is_empty());
        assert!(normalize(&RawEvent::release(9, 40, 0)).is_empty());
    }
}
