// Library entry so integration tests and the locality importer can reference internal modules.
// The binary (`main.rs`) only wires these together.
pub mod commands;
pub mod config;
pub mod constants;
pub mod database;
pub mod dialog;
pub mod handler;
pub mod i18n;
pub mod interactions;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod session;
pub mod transport;
pub mod ui;

pub use model::AppState;
