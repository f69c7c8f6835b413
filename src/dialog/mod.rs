//! The conversation engine: a per-chat state machine that collects a role, the
//! categories, a locality and (for volunteers) a description.
//!
//! `state` holds the data and the pure transition table; `engine` drives one
//! inbound text through the current step; `volunteer`, `seeker` and `locality`
//! are the step handlers.

pub mod engine;
pub mod locality;
pub mod seeker;
pub mod state;
pub mod volunteer;
