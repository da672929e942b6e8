//! Overlay pane state owned by the UI thread

use std::sync::Weak;

use crate::common::color::Argb;
use crate::common::types::{Position, Rect};
use crate::config::{PaneSettings, RuleCell};
use crate::constants::countdown;

use super::backend::{PaneId, SurfaceId, ThumbnailId, ThumbnailProperties, WindowId};
use super::border::BorderState;
use super::countdown::CountdownHandle;
use super::drag::DragState;

#[derive(Debug)]
pub struct OverlayPane {
    pub id: PaneId,
    pub target: WindowId,
    pub title: String,
    /// Never owned: the store keeps the rule alive
    pub rule: Weak<RuleCell>,
    pub settings: PaneSettings,
    pub surface: SurfaceId,
    pub thumbnail: ThumbnailId,
    pub border: BorderState,
    pub drag: DragState,
    /// Outer origin of the surface in root coordinates
    pub origin: Position,
    pub countdown: Option<CountdownHandle>,
    /// Top-left of the countdown indicator, relative to the surface
    pub countdown_anchor: Position,
    pub hovered: bool,
}

impl OverlayPane {
    pub fn new(
        id: PaneId,
        target: WindowId,
        title: String,
        rule: Weak<RuleCell>,
        settings: PaneSettings,
        surface: SurfaceId,
        thumbnail: ThumbnailId,
    ) -> Self {
        let origin = settings.outer_bounds().origin();
        Self {
            id,
            target,
            title,
            rule,
            settings,
            surface,
            thumbnail,
            border: BorderState::default(),
            drag: DragState::default(),
            origin,
            countdown: None,
            countdown_anchor: Position::default(),
            hovered: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_parts(self.origin, self.settings.outer_size())
    }

    pub fn border_color(&self) -> Argb {
        self.border.mode().color(&self.settings.colors)
    }

    pub fn thumbnail_properties(&self, visible: bool) -> ThumbnailProperties {
        ThumbnailProperties {
            destination: self.settings.thumbnail_destination(),
            opacity: self.settings.opacity,
            visible,
            client_area_only: !self.settings.show_title_bar,
        }
    }

    /// Indicator box centred on the cursor
    pub fn countdown_anchor_for(&self, cursor: Position) -> Position {
        let half = countdown::RADIUS + countdown::PADDING;
        cursor.offset_from(self.origin).translate(-half, -half)
    }

    /// Where the rule's own coordinates point for the current surface origin
    pub fn inner_origin(&self) -> Position {
        self.settings.inner_origin(self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GlobalDefaults, MatchRule};

    fn pane() -> OverlayPane {
        let rule = MatchRule {
            title: Some("Notepad".to_string()),
            x: 100,
            y: 100,
            width: 400,
            height: 300,
            border_width: Some(5),
            ..Default::default()
        };
        let settings = PaneSettings::resolve(&rule, &GlobalDefaults::default(), "Notepad");
        OverlayPane::new(PaneId(1), 10, "Notepad".into(), Weak::new(), settings, 77, ThumbnailId(3))
    }

    #[test]
    fn test_geometry_includes_border() {
        let pane = pane();
        assert_eq!(pane.origin, Position::new(95, 95));
        assert_eq!(pane.bounds(), Rect::new(95, 95, 410, 310));
        assert_eq!(pane.inner_origin(), Position::new(100, 100));
    }

    #[test]
    fn test_thumbnail_properties() {
        let props = pane().thumbnail_properties(true);
        assert_eq!(props.destination, Rect::new(5, 5, 400, 300));
        assert!(props.visible);
        assert!(props.client_area_only);
    }

    #[test]
    fn test_countdown_anchor_centres_on_cursor() {
        let pane = pane();
        let anchor = pane.countdown_anchor_for(Position::new(200, 200));
        let half = countdown::RADIUS + countdown::PADDING;
        assert_eq!(anchor, Position::new(105 - half, 105 - half));
    }
}
