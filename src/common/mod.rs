//! Types and helpers shared by the engine and the X11 collaborators

pub mod color;
pub mod types;
