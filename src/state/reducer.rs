//! State reducer - the single writer of controller state

use tracing::trace;

use super::types::{ControllerState, FieldUpdate};
use crate::midi::RawEvent;
use crate::normalizer::normalize;

/// Owns the canonical [`ControllerState`] and applies updates to it.
///
/// All updates derived from one raw event are applied as a batch and yield
/// a single changed/unchanged verdict, so callers emit at most once per event.
#[derive(Debug, Default)]
pub struct StateReducer {
    state: ControllerState,
}

impl StateReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Apply a batch of updates; `true` if any field took a new value
    pub fn reduce(&mut self, updates: &[FieldUpdate]) -> bool {
        let mut changed = false;
        for update in updates {
            if self.state.apply(update) {
                trace!("{} -> {:?}", update.field_name(), update);
                changed = true;
            }
        }
        changed
    }

    /// Normalize and reduce one raw event
    pub fn process(&mut self, event: &RawEvent) -> bool {
        let updates = normalize(event);
        if updates.is_empty() {
            return false;
        }
        self.reduce(&updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Category;

    #[test]
    fn test_control_sets_field() {
        let mut reducer = StateReducer::new();
        assert!(reducer.process(&RawEvent::control(0, 74, 127)));
        assert_eq!(reducer.state().swell, 1.0);
    }

    #[test]
    fn test_steady_control_does_not_change() {
        let mut reducer = StateReducer::new();
        assert!(reducer.process(&RawEvent::control(0, 112, 64)));
        assert!(!reducer.process(&RawEvent::control(0, 112, 64)));
        // Zero on a zero field is not a change either
        assert!(!reducer.process(&RawEvent::control(0, 1, 0)));
    }

    #[test]
    fn test_press_is_one_transition() {
        let mut reducer = StateReducer::new();
        assert!(reducer.process(&RawEvent::press(0, 64, 100)));
        let state = reducer.state();
        assert_eq!(state.category, Category::Treble);
        assert!((state.note - 0.5039).abs() < 1e-4);
        assert!((state.force - 0.7874).abs() < 1e-4);
    }

    #[test]
    fn test_replayed_press_is_noop() {
        let mut reducer = StateReducer::new();
        let event = RawEvent::press(8, 50, 70);
        assert!(reducer.process(&event));
        assert!(!reducer.process(&event));
    }

    #[test]
    fn test_contact_toggling() {
        let mut reducer = StateReducer::new();
        assert!(reducer.process(&RawEvent::press(9, 39, 100)));
        assert!(!reducer.process(&RawEvent::press(9, 39, 100)));
        assert!(reducer.state().contact);
        assert!(reducer.process(&RawEvent::release(9, 39, 0)));
        assert!(!reducer.process(&RawEvent::release(9, 39, 0)));
        assert!(!reducer.state().contact);
    }

    #[test]
    fn test_music_release_keeps_last_values() {
        let mut reducer = StateReducer::new();
        reducer.process(&RawEvent::press(15, 60, 90));
        let before = *reducer.state();
        assert!(!reducer.process(&RawEvent::release(15, 60, 0)));
        assert_eq!(*reducer.state(), before);
    }

    #[test]
    fn test_unmapped_channel_retains_previous_category() {
        let mut reducer = StateReducer::new();
        reducer.process(&RawEvent::press(8, 40, 100));
        assert_eq!(reducer.state().category, Category::Bass);

        assert!(reducer.process(&RawEvent::press(5, 41, 100)));
        assert_eq!(reducer.state().category, Category::Bass);
        assert_eq!(reducer.state().note, 41.0 / 127.0);
    }

    #[test]
    fn test_partial_change_in_batch_still_counts() {
        let mut reducer = StateReducer::new();
        reducer.process(&RawEvent::press(0, 64, 100));
        // Same category and note, new force
        assert!(reducer.process(&RawEvent::press(0, 64, 101)));
    }
}
