// src/commands/mod.rs
// Slash commands. Each one runs after the handler has discarded the chat's session.

pub mod my_help;
pub mod my_subscriptions;
pub mod start;
pub mod support;
