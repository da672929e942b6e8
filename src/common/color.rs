//! Color type conversions and utilities
//!
//! Provides type-safe color handling with conversions between:
//! - configuration ARGB channels ({alpha, red, green, blue})
//! - ARGB32 values (u32)
//! - X11 render Colors (16-bit per channel, straight or premultiplied)

use serde::{Deserialize, Serialize};
use x11rb::protocol::render::Color;

/// An 8-bit-per-channel color as stored in the configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Argb {
    pub alpha: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Argb {
    pub const fn new(alpha: u8, red: u8, green: u8, blue: u8) -> Self {
        Self {
            alpha,
            red,
            green,
            blue,
        }
    }

    /// Get raw ARGB32 value
    pub fn argb32(self) -> u32 {
        (self.alpha as u32) << 24 | (self.red as u32) << 16 | (self.green as u32) << 8 | self.blue as u32
    }

    /// Convert to X11 Color (16-bit per channel, 0-65535 range)
    pub fn to_x11_color(self) -> Color {
        Color {
            red: scale(self.red),
            green: scale(self.green),
            blue: scale(self.blue),
            alpha: scale(self.alpha),
        }
    }

    /// Convert to a premultiplied X11 Color, as Render expects for `OVER` fills
    pub fn to_premultiplied_x11_color(self) -> Color {
        let premultiply = |v: u8| ((v as u32 * self.alpha as u32 + 127) / 255) as u8;
        Color {
            red: scale(premultiply(self.red)),
            green: scale(premultiply(self.green)),
            blue: scale(premultiply(self.blue)),
            alpha: scale(self.alpha),
        }
    }
}

/// Scale from 8-bit (0-255) to 16-bit (0-65535)
fn scale(v: u8) -> u16 {
    (v as u16) << 8 | v as u16
}

/// Opacity as a fraction (0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opacity(f64);

impl Opacity {
    /// Create from a fraction, clamped to 0.0 - 1.0 (NaN becomes opaque)
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction.is_nan() {
            Self(1.0)
        } else {
            Self(fraction.clamp(0.0, 1.0))
        }
    }

    pub fn fraction(self) -> f64 {
        self.0
    }

    /// Value for _NET_WM_WINDOW_OPACITY (0 - 0xFFFFFFFF)
    pub fn to_cardinal(self) -> u32 {
        (self.0 * u32::MAX as f64).round() as u32
    }

    /// Alpha-only render color for an opacity mask
    pub fn to_mask_color(self) -> Color {
        Color {
            red: 0,
            green: 0,
            blue: 0,
            alpha: (self.0 * u16::MAX as f64).round() as u16,
        }
    }
}
