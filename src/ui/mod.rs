//! Rendering: reply keyboards with stable action codes and plain-text cards.
pub mod cards;
pub mod keyboard;
