//! Effective values: rule override, then document default, then built-in constant

use std::time::Duration;

use crate::common::color::{Argb, Opacity};
use crate::common::types::{Dimensions, Position, Rect};
use crate::constants::defaults;

use super::rules::{GlobalDefaults, MatchRule};

impl GlobalDefaults {
    /// Document defaults with every field filled from the built-in constants
    pub fn builtin() -> Self {
        Self {
            millisecond_delay_to_move: Some(defaults::MOVE_DELAY_MS),
            base_opacity: Some(defaults::OPACITY),
            magnetize_pixel_distance: Some(defaults::MAGNETIZE_DISTANCE),
            default_screen_index: Some(defaults::SCREEN_INDEX),
            monitor_millisecond_interval: Some(defaults::POLL_INTERVAL_MS),
            base_border_width: Some(defaults::BORDER_WIDTH as i32),
            active_argb: Some(defaults::ACTIVE_ARGB),
            inactive_argb: Some(defaults::INACTIVE_ARGB),
            minimized_argb: Some(defaults::MINIMIZED_ARGB),
        }
    }

    pub fn move_delay(&self) -> Duration {
        Duration::from_millis(self.millisecond_delay_to_move.unwrap_or(defaults::MOVE_DELAY_MS))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.monitor_millisecond_interval
                .unwrap_or(defaults::POLL_INTERVAL_MS),
        )
    }

    pub fn magnetize_distance(&self) -> i32 {
        self.magnetize_pixel_distance
            .unwrap_or(defaults::MAGNETIZE_DISTANCE)
            .max(0)
    }
}

/// Border colors for the three border modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderColors {
    pub active: Argb,
    pub inactive: Argb,
    pub minimized: Argb,
}

/// Everything a pane needs, resolved once at creation
#[derive(Debug, Clone, PartialEq)]
pub struct PaneSettings {
    /// Menu label: the label override, or the window title
    pub label: String,
    /// Top-left corner of the mirrored area (inside the border)
    pub origin: Position,
    pub size: Dimensions,
    pub opacity: Opacity,
    pub screen_index: usize,
    pub show_title_bar: bool,
    pub border_width: u32,
    pub colors: BorderColors,
}

impl PaneSettings {
    pub fn resolve(rule: &MatchRule, globals: &GlobalDefaults, title: &str) -> Self {
        let opacity = rule
            .opacity
            .or(globals.base_opacity)
            .unwrap_or(defaults::OPACITY);
        let border_width = rule
            .border_width
            .or(globals.base_border_width)
            .map(|w| u32::try_from(w).unwrap_or(0))
            .unwrap_or(defaults::BORDER_WIDTH);

        Self {
            label: rule
                .title_label_override
                .clone()
                .filter(|label| !label.trim().is_empty())
                .unwrap_or_else(|| title.to_string()),
            origin: Position::new(rule.x, rule.y),
            size: Dimensions::new(
                u32::try_from(rule.width).unwrap_or(0),
                u32::try_from(rule.height).unwrap_or(0),
            ),
            opacity: Opacity::from_fraction(opacity),
            screen_index: rule
                .screen_index
                .or(globals.default_screen_index)
                .unwrap_or(defaults::SCREEN_INDEX),
            show_title_bar: rule.show_title_bar.unwrap_or(defaults::SHOW_TITLE_BAR),
            border_width,
            colors: BorderColors {
                active: rule
                    .active_argb
                    .or(globals.active_argb)
                    .unwrap_or(defaults::ACTIVE_ARGB),
                inactive: rule
                    .inactive_argb
                    .or(globals.inactive_argb)
                    .unwrap_or(defaults::INACTIVE_ARGB),
                minimized: rule
                    .minimized_argb
                    .or(globals.minimized_argb)
                    .unwrap_or(defaults::MINIMIZED_ARGB),
            },
        }
    }

    fn border(&self) -> i32 {
        i32::try_from(self.border_width).unwrap_or(i32::MAX)
    }

    /// Outer size of the pane surface, border included
    pub fn outer_size(&self) -> Dimensions {
        let extra = self.border_width.saturating_mul(2);
        Dimensions::new(
            self.size.width.saturating_add(extra),
            self.size.height.saturating_add(extra),
        )
    }

    /// Pane surface bounds for a mirrored area at `origin`
    pub fn outer_bounds_at(&self, origin: Position) -> Rect {
        let bw = self.border();
        Rect::from_parts(origin.translate(-bw, -bw), self.outer_size())
    }

    pub fn outer_bounds(&self) -> Rect {
        self.outer_bounds_at(self.origin)
    }

    /// Where the thumbnail lands, relative to the pane surface
    pub fn thumbnail_destination(&self) -> Rect {
        let bw = self.border();
        Rect::new(bw, bw, self.size.width, self.size.height)
    }

    /// Mirrored-area origin for a pane surface placed at `outer`
    pub fn inner_origin(&self, outer: Position) -> Position {
        let bw = self.border();
        outer.translate(bw, bw)
    }
}
