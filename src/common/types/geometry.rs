//! Geometric types for desktop coordinates and sizes
//!
//! Provides type-safe wrappers for positions and sizes to avoid
//! common integer confusion (e.g., swapping width/height or x/y).
//! Arithmetic happens in `i32`/`u32`; values are saturated at the X11 boundary.

use serde::{Deserialize, Serialize};

/// A position in 2D space (root window coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Create a new position
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Vector from `origin` to this position
    pub fn offset_from(self, origin: Position) -> Position {
        Position::new(self.x - origin.x, self.y - origin.y)
    }

    pub fn translate(self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

impl From<(i32, i32)> for Position {
    fn from(tuple: (i32, i32)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

/// Width × height
/// Using a newtype prevents accidentally swapping width and height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An axis-aligned rectangle with inclusive left/top and exclusive right/bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(origin: Position, size: Dimensions) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn size(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(clamp_to_i32(self.width))
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(clamp_to_i32(self.height))
    }

    pub fn contains(&self, point: Position) -> bool {
        point.x >= self.left() && point.x < self.right() && point.y >= self.top() && point.y < self.bottom()
    }
}

fn clamp_to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Saturating conversion for X11 coordinates (INT16)
pub fn saturate_i16(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Saturating conversion for X11 sizes (CARD16)
pub fn saturate_u16(v: u32) -> u16 {
    v.min(u16::MAX as u32) as u16
}
