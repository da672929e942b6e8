//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// X11 protocol and rendering constants
pub mod x11 {
    /// Standard 32-bit color depth required for X11 composition
    pub const ARGB_DEPTH: u8 = 32;

    /// Override redirect flag for unmanaged windows
    pub const OVERRIDE_REDIRECT: u32 = 1;

    /// Source indication for _NET_ACTIVE_WINDOW (2 = pager/direct user action)
    pub const ACTIVE_WINDOW_SOURCE_PAGER: u32 = 2;

    /// _NET_WM_STATE action: remove/unset property (0)
    pub const NET_WM_STATE_REMOVE: u32 = 0;

    /// WM_STATE value of an iconified window
    pub const ICONIC_STATE: u32 = 3;

    /// WM_CLASS of pane windows (instance\0class\0)
    pub const WM_CLASS: &[u8] = b"livepane\0livepane\0";

    /// Render filter used when scaling thumbnails
    pub const SCALE_FILTER: &[u8] = b"bilinear";

    /// X11 arc angles are expressed in 1/64ths of a degree
    pub const ARC_UNITS_PER_DEGREE: i32 = 64;
}

/// Fixed-point arithmetic constants (X11 render transforms)
pub mod fixed_point {
    /// Fixed-point multiplier for conversion (2^16)
    pub const MULTIPLIER: f32 = 65536.0;
}

/// Mouse button constants
pub mod mouse {
    /// Left mouse button number
    pub const BUTTON_LEFT: u8 = 1;
}

/// Monitor loop tuning
pub mod monitor {
    /// Immediate attempts at enumerating windows before a tick is skipped
    pub const ENUMERATION_ATTEMPTS: usize = 3;
}

/// Press-and-hold countdown indicator
pub mod countdown {
    /// Redraw interval of the indicator in milliseconds
    pub const FRAME_INTERVAL_MS: u64 = 10;

    /// Radius of the indicator circle in pixels
    pub const RADIUS: i32 = 25;

    /// Padding around the circle inside the indicator box
    pub const PADDING: i32 = 2;

    /// Stroke width of the pie outline
    pub const STROKE_WIDTH: u32 = 2;

    /// Indicator background (red, green, blue)
    pub const BACKGROUND_RGB: (u8, u8, u8) = (0, 162, 232);
}

/// Configuration paths and filenames
pub mod config {
    /// Application directory name under XDG config
    pub const APP_DIR: &str = "livepane";

    /// Configuration filename
    pub const FILENAME: &str = "config.json";

    /// Suffix inserted between the config path and the backup counter
    pub const BACKUP_SUFFIX: &str = ".backup";
}

/// Tray identity
pub mod tray {
    pub const ID: &str = "livepane";
    pub const TITLE: &str = "Live Pane";
    pub const ICON_NAME: &str = "video-display";
}

/// Title label drawn over each pane's thumbnail
pub mod title {
    use crate::common::color::Argb;

    /// Tried in order through fontconfig
    pub const FONT_CANDIDATES: &[&str] = &["Arial", "Liberation Sans", "DejaVu Sans"];

    /// Generic family accepted with whatever fontconfig substitutes
    pub const FALLBACK_FAMILY: &str = "sans-serif";

    /// Pixel size passed to the rasterizer
    pub const FONT_SIZE: f32 = 16.0;

    pub const COLOR: Argb = Argb::new(255, 255, 255, 255);
}

/// Default configuration values
/// These are used when the document and the rule leave a field unset
pub mod defaults {
    use crate::common::color::Argb;

    /// Hold time before a pressed pane starts moving
    pub const MOVE_DELAY_MS: u64 = 500;

    /// Pane and thumbnail opacity (0.0 - 1.0)
    pub const OPACITY: f64 = 0.75;

    /// Snapping distance in pixels
    pub const MAGNETIZE_DISTANCE: i32 = 25;

    /// Index into the monitor list used for screen-edge snapping
    pub const SCREEN_INDEX: usize = 0;

    /// Delay between two monitor ticks
    pub const POLL_INTERVAL_MS: u64 = 250;

    /// Mirror the window frame (title bar included) instead of the client area
    pub const SHOW_TITLE_BAR: bool = false;

    /// Border thickness in pixels
    pub const BORDER_WIDTH: u32 = 7;

    pub const ACTIVE_ARGB: Argb = Argb::new(255, 34, 177, 76);
    pub const INACTIVE_ARGB: Argb = Argb::new(10, 0, 0, 0);
    pub const MINIMIZED_ARGB: Argb = Argb::new(255, 237, 28, 36);
}
