//! Per-event handlers for the UI connection

pub mod input;
pub mod window;
