//! Inline-button callbacks. These are handled outside the text state machine:
//! the callback data alone (action code + entity id) decides what happens.

pub mod callback_handler;
pub mod ids;
