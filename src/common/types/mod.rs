//! Shared value types

pub mod geometry;

pub use geometry::{Dimensions, Position, Rect, saturate_i16, saturate_u16};
