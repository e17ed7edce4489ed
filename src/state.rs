//! State management module - canonical controller state
//!
//! Holds the single state record for the connected controller and the
//! reducer that is its only writer.

mod reducer;
mod types;

pub use reducer::StateReducer;
pub use types::{Category, ControllerState, FieldUpdate};
