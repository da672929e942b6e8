//! Collaborator seams of the engine
//!
//! The monitor only talks to a [`WindowSystem`]; the pane host drives a
//! [`SurfaceHost`], a [`Compositor`] and a [`PaneMenu`]. The X11 and tray
//! implementations live outside this module so the engine runs against fakes
//! in tests.

use anyhow::Result;

use crate::common::color::{Argb, Opacity};
use crate::common::types::{Dimensions, Position, Rect};
use crate::errors::EngineError;

/// Native handle of a top-level window
pub type WindowId = u32;

/// Native handle of a pane surface
pub type SurfaceId = u32;

/// Identity of a pane, allocated in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaneId(pub u64);

/// Correlation id of a registered thumbnail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailId(pub u32);

/// Read-only queries about the desktop's top-level windows
pub trait WindowSystem {
    fn top_level_windows(&self) -> Result<Vec<WindowId>>;
    fn window_title(&self, window: WindowId) -> Result<Option<String>>;
    fn owning_pid(&self, window: WindowId) -> Result<Option<u32>>;
    fn foreground_window(&self) -> Result<Option<WindowId>>;
    fn is_iconic(&self, window: WindowId) -> Result<bool>;
    /// `None` once the window is gone
    fn window_bounds(&self, window: WindowId) -> Result<Option<Rect>>;
}

/// Thumbnail properties pushed on every geometry or visibility change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailProperties {
    /// Relative to the pane surface
    pub destination: Rect,
    pub opacity: Opacity,
    pub visible: bool,
    /// Mirror the client area only, excluding the frame and title bar
    pub client_area_only: bool,
}

pub trait Compositor {
    fn register_thumbnail(
        &mut self,
        surface: SurfaceId,
        source: WindowId,
    ) -> Result<ThumbnailId, EngineError>;
    fn update_thumbnail(&mut self, id: ThumbnailId, properties: &ThumbnailProperties)
    -> Result<()>;
    fn unregister_thumbnail(&mut self, id: ThumbnailId) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSpec {
    /// Window title of the surface itself
    pub title: String,
    /// Text drawn over the thumbnail
    pub label: String,
    pub bounds: Rect,
    pub opacity: Opacity,
    pub visible: bool,
}

/// Pane surfaces and the window operations the UI thread performs
pub trait SurfaceHost {
    fn create_surface(&mut self, spec: &SurfaceSpec) -> Result<SurfaceId>;
    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<()>;
    fn move_surface(&mut self, surface: SurfaceId, origin: Position) -> Result<()>;
    fn set_surface_opacity(&mut self, surface: SurfaceId, opacity: Opacity) -> Result<()>;
    fn set_surface_visible(&mut self, surface: SurfaceId, visible: bool) -> Result<()>;
    fn paint_border(
        &mut self,
        surface: SurfaceId,
        size: Dimensions,
        width: u32,
        color: Argb,
    ) -> Result<()>;
    /// `anchor` is relative to the surface; `fraction` is in [0, 1]
    fn paint_countdown(&mut self, surface: SurfaceId, anchor: Position, fraction: f64)
    -> Result<()>;
    fn clear_countdown(&mut self, surface: SurfaceId) -> Result<()>;
    /// Bounds of the screen at `index`, `None` when out of range
    fn screen_bounds(&self, index: usize) -> Result<Option<Rect>>;
    fn activate_window(&mut self, window: WindowId) -> Result<()>;
    fn restore_window(&mut self, window: WindowId) -> Result<()>;
    fn is_iconic(&self, window: WindowId) -> Result<bool>;
}

/// Per-pane menu entries and user-facing status messages
pub trait PaneMenu {
    fn add_entry(&mut self, pane: PaneId, label: &str);
    fn remove_entry(&mut self, pane: PaneId);
    fn report(&mut self, message: &str);
}
