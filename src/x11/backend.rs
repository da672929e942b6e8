//! X11 implementation of the pane host's collaborators

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::protocol::damage::Damage;
use x11rb::protocol::randr::ConnectionExt as RandrExt;
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

use crate::common::color::{Argb, Opacity};
use crate::common::types::{Dimensions, Position, Rect};
use crate::constants::title;
use crate::daemon::backend::{
    Compositor, SurfaceHost, SurfaceId, SurfaceSpec, ThumbnailId, ThumbnailProperties, WindowId,
};
use crate::errors::EngineError;

use super::compositor::Thumbnail;
use super::font::TitleFont;
use super::surface::PaneSurface;
use super::{CachedFormats, X11Context, query, window};

/// Pane surfaces and thumbnails over the UI thread's connection
pub struct X11Panes {
    ctx: Rc<X11Context>,
    formats: CachedFormats,
    /// `None` draws panes without titles
    title_font: Option<TitleFont>,
    surfaces: HashMap<SurfaceId, PaneSurface>,
    thumbnails: HashMap<ThumbnailId, (SurfaceId, Thumbnail)>,
    by_damage: HashMap<Damage, ThumbnailId>,
    next_thumbnail: u32,
}

impl X11Panes {
    pub fn connect() -> Result<Self> {
        let ctx = X11Context::connect().context("Failed to open pane connection")?;
        ctx.enable_compositing()?;
        let formats = CachedFormats::new(&ctx).context("Failed to cache picture formats at startup")?;
        let title_font = match TitleFont::resolve(title::FONT_CANDIDATES, title::FALLBACK_FAMILY, title::FONT_SIZE) {
            Ok(font) => {
                info!(font = font.family(), "Pane titles enabled");
                Some(font)
            }
            Err(e) => {
                warn!(error = format!("{:#}", e), "No title font available, panes are drawn without titles");
                None
            }
        };
        Ok(Self {
            ctx: Rc::new(ctx),
            formats,
            title_font,
            surfaces: HashMap::new(),
            thumbnails: HashMap::new(),
            by_damage: HashMap::new(),
            next_thumbnail: 0,
        })
    }

    pub fn connection(&self) -> &RustConnection {
        &self.ctx.conn
    }

    fn surface(&self, surface: SurfaceId) -> Result<&PaneSurface> {
        self.surfaces
            .get(&surface)
            .ok_or_else(|| anyhow::anyhow!("Unknown pane surface {}", surface))
    }

    /// Redraw the thumbnail a damage report belongs to
    pub fn refresh_damage(&self, damage: Damage) -> Result<()> {
        let Some((_, thumbnail)) = self
            .by_damage
            .get(&damage)
            .and_then(|id| self.thumbnails.get(id))
        else {
            return Ok(());
        };
        thumbnail.refresh()
    }

    /// Monitor rectangles, primary first; the root window when RandR has none
    fn monitors(&self) -> Result<Vec<Rect>> {
        let conn = &self.ctx.conn;
        let reply = conn
            .randr_get_monitors(self.ctx.root, true)
            .context("Failed to query RandR monitors")?
            .reply();
        let mut monitors = match reply {
            Ok(reply) => reply.monitors,
            Err(e) => {
                debug!(error = %e, "RandR monitors unavailable");
                Vec::new()
            }
        };
        monitors.sort_by_key(|m| !m.primary);

        let rects: Vec<Rect> = monitors
            .iter()
            .map(|m| Rect::new(m.x as i32, m.y as i32, m.width as u32, m.height as u32))
            .collect();
        if rects.is_empty() {
            let (width, height) = self.ctx.root_size;
            return Ok(vec![Rect::new(0, 0, width as u32, height as u32)]);
        }
        Ok(rects)
    }
}

impl SurfaceHost for X11Panes {
    fn create_surface(&mut self, spec: &SurfaceSpec) -> Result<SurfaceId> {
        let surface = PaneSurface::create(&self.ctx, &self.formats, self.title_font.as_ref(), spec)?;
        let id = surface.window;
        self.surfaces.insert(id, surface);
        Ok(id)
    }

    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<()> {
        self.surfaces.remove(&surface);
        Ok(())
    }

    fn move_surface(&mut self, surface: SurfaceId, origin: Position) -> Result<()> {
        self.surface(surface)?.move_to(origin)
    }

    fn set_surface_opacity(&mut self, surface: SurfaceId, opacity: Opacity) -> Result<()> {
        self.surface(surface)?.set_opacity(opacity)
    }

    fn set_surface_visible(&mut self, surface: SurfaceId, visible: bool) -> Result<()> {
        self.surface(surface)?.set_visible(visible)
    }

    fn paint_border(&mut self, surface: SurfaceId, size: Dimensions, width: u32, color: Argb) -> Result<()> {
        self.surface(surface)?.paint_border(size, width, color)
    }

    fn paint_countdown(&mut self, surface: SurfaceId, anchor: Position, fraction: f64) -> Result<()> {
        self.surface(surface)?.paint_countdown(anchor, fraction)
    }

    fn clear_countdown(&mut self, surface: SurfaceId) -> Result<()> {
        // The host repaints the thumbnail over the indicator
        self.surface(surface).map(|_| ())
    }

    fn screen_bounds(&self, index: usize) -> Result<Option<Rect>> {
        Ok(self.monitors()?.get(index).copied())
    }

    fn activate_window(&mut self, window: WindowId) -> Result<()> {
        window::activate_window(&self.ctx.conn, self.ctx.root, &self.ctx.atoms, window)
    }

    fn restore_window(&mut self, window: WindowId) -> Result<()> {
        window::restore_window(&self.ctx.conn, self.ctx.root, &self.ctx.atoms, window)
    }

    fn is_iconic(&self, window: WindowId) -> Result<bool> {
        query::is_window_minimized(&self.ctx.conn, window, &self.ctx.atoms)
    }
}

impl Compositor for X11Panes {
    fn register_thumbnail(&mut self, surface: SurfaceId, source: WindowId) -> Result<ThumbnailId, EngineError> {
        let registration_error = |reason: String| EngineError::CompositorRegistration {
            window: source,
            reason,
        };
        let (dst_picture, title) = self
            .surfaces
            .get(&surface)
            .map(|s| (s.picture, s.title_stamp()))
            .ok_or_else(|| registration_error(format!("unknown pane surface {}", surface)))?;

        // Frame capture is decided on the first update; start with the client
        let thumbnail = Thumbnail::new(&self.ctx, &self.formats, source, dst_picture, title, true)
            .map_err(|e| registration_error(format!("{:#}", e)))?;

        self.next_thumbnail += 1;
        let id = ThumbnailId(self.next_thumbnail);
        self.by_damage.insert(thumbnail.damage, id);
        self.thumbnails.insert(id, (surface, thumbnail));
        Ok(id)
    }

    fn update_thumbnail(&mut self, id: ThumbnailId, properties: &ThumbnailProperties) -> Result<()> {
        let Some((surface, thumbnail)) = self.thumbnails.get(&id) else {
            anyhow::bail!("Unknown thumbnail {}", id.0);
        };

        // Switching between client area and frame needs a new source picture
        let wants_frame = !properties.client_area_only;
        let is_frame = thumbnail.captures_frame();
        if wants_frame != is_frame {
            let surface = *surface;
            let source = thumbnail.source();
            let target = self.surface(surface)?;
            let (dst_picture, title) = (target.picture, target.title_stamp());
            let replacement = Thumbnail::new(&self.ctx, &self.formats, source, dst_picture, title, !wants_frame)?;
            if let Some((_, old)) = self.thumbnails.insert(id, (surface, replacement)) {
                self.by_damage.remove(&old.damage);
            }
            if let Some((_, current)) = self.thumbnails.get(&id) {
                self.by_damage.insert(current.damage, id);
            }
        }

        match self.thumbnails.get_mut(&id) {
            Some((_, thumbnail)) => thumbnail.update(properties),
            None => Ok(()),
        }
    }

    fn unregister_thumbnail(&mut self, id: ThumbnailId) -> Result<()> {
        match self.thumbnails.remove(&id) {
            Some((_, thumbnail)) => {
                self.by_damage.remove(&thumbnail.damage);
                Ok(())
            }
            None => {
                warn!(thumbnail = id.0, "Unregistering unknown thumbnail");
                Ok(())
            }
        }
    }
}
