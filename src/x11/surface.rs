//! Pane surface windows
//!
//! Each pane is an override-redirect window on the root. Borders and the
//! countdown indicator are drawn straight into it; the thumbnail is
//! composited into the area inside the border by [`super::compositor`],
//! followed by the surface's title label.

use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::render::{ConnectionExt as RenderExt, CreatePictureAux, PictOp, Picture};
use x11rb::protocol::xproto::*;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::common::color::{Argb, Opacity};
use crate::common::types::{Dimensions, Position, saturate_i16, saturate_u16};
use crate::constants::{countdown, title, x11};
use crate::daemon::backend::SurfaceSpec;

use super::font::TitleFont;
use super::query::request_size;
use super::title::{TitleImage, TitleStamp};
use super::{CachedFormats, X11Context};

pub struct PaneSurface {
    ctx: Rc<X11Context>,
    pub window: Window,
    pub picture: Picture,
    gc: Gcontext,
    title: Option<TitleImage>,
}

impl std::fmt::Debug for PaneSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaneSurface")
            .field("window", &self.window)
            .field("picture", &self.picture)
            .finish()
    }
}

/// Pixel value of an RGB color on a TrueColor root visual
fn pixel(red: u8, green: u8, blue: u8) -> u32 {
    (red as u32) << 16 | (green as u32) << 8 | blue as u32
}

/// Border strips of a surface, clockwise from the top
fn border_rects(size: Dimensions, width: u32) -> Vec<Rectangle> {
    let (w, h) = (size.width, size.height);
    let bw = width.min(w / 2).min(h / 2);
    if bw == 0 {
        return Vec::new();
    }
    let inner_h = h - 2 * bw;
    let rect = |x: u32, y: u32, width: u32, height: u32| Rectangle {
        x: saturate_i16(x as i32),
        y: saturate_i16(y as i32),
        width: saturate_u16(width),
        height: saturate_u16(height),
    };
    vec![
        rect(0, 0, w, bw),
        rect(w - bw, bw, bw, inner_h),
        rect(0, h - bw, w, bw),
        rect(0, bw, bw, inner_h),
    ]
}

/// Clockwise pie from twelve o'clock, in X11 arc units
fn pie_extent(fraction: f64) -> i16 {
    let degrees = fraction.clamp(0.0, 1.0) * 360.0;
    -((degrees * x11::ARC_UNITS_PER_DEGREE as f64).round() as i16)
}

impl PaneSurface {
    fn create_window(ctx: &X11Context, spec: &SurfaceSpec) -> Result<Window> {
        let window = ctx
            .conn
            .generate_id()
            .context("Failed to generate X11 window ID")?;
        let (width, height) = request_size(spec.bounds.width, spec.bounds.height);
        ctx.conn
            .create_window(
                ctx.root_depth,
                window,
                ctx.root,
                saturate_i16(spec.bounds.x),
                saturate_i16(spec.bounds.y),
                width.max(1),
                height.max(1),
                0,
                WindowClass::INPUT_OUTPUT,
                ctx.root_visual,
                &CreateWindowAux::new()
                    .background_pixel(pixel(0, 0, 0))
                    .override_redirect(x11::OVERRIDE_REDIRECT)
                    .event_mask(
                        EventMask::EXPOSURE
                            | EventMask::BUTTON_PRESS
                            | EventMask::BUTTON_RELEASE
                            | EventMask::POINTER_MOTION
                            | EventMask::ENTER_WINDOW
                            | EventMask::LEAVE_WINDOW,
                    ),
            )
            .context(format!("Failed to create pane window '{}'", spec.title))?;
        Ok(window)
    }

    /// Title, PID, class, opacity and always-on-top
    fn setup_window_properties(ctx: &X11Context, window: Window, spec: &SurfaceSpec) -> Result<()> {
        let conn = &ctx.conn;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            ctx.atoms.wm_name,
            AtomEnum::STRING,
            spec.title.as_bytes(),
        )
        .context(format!("Failed to set WM_NAME for '{}'", spec.title))?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            ctx.atoms.net_wm_name,
            ctx.atoms.utf8_string,
            spec.title.as_bytes(),
        )
        .context(format!("Failed to set _NET_WM_NAME for '{}'", spec.title))?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            ctx.atoms.net_wm_pid,
            AtomEnum::CARDINAL,
            &[std::process::id()],
        )
        .context(format!("Failed to set _NET_WM_PID for '{}'", spec.title))?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            ctx.atoms.wm_class,
            AtomEnum::STRING,
            x11::WM_CLASS,
        )
        .context(format!("Failed to set WM_CLASS for '{}'", spec.title))?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            ctx.atoms.net_wm_state,
            AtomEnum::ATOM,
            &[ctx.atoms.net_wm_state_above],
        )
        .context(format!("Failed to set window always-on-top for '{}'", spec.title))?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            ctx.atoms.net_wm_window_opacity,
            AtomEnum::CARDINAL,
            &[spec.opacity.to_cardinal()],
        )
        .context(format!("Failed to set window opacity for '{}'", spec.title))?;
        Ok(())
    }

    /// Label picture, or `None` without a font or with an empty label
    fn create_title(
        ctx: &Rc<X11Context>,
        formats: &CachedFormats,
        font: Option<&TitleFont>,
        spec: &SurfaceSpec,
    ) -> Option<TitleImage> {
        let font = font?;
        let text = font.render(&spec.label, title::COLOR, spec.bounds.width as usize);
        TitleImage::upload(ctx, formats, &text)
            .inspect_err(|e| warn!(label = %spec.label, error = format!("{:#}", e), "Pane drawn without title"))
            .ok()
            .flatten()
    }

    pub fn create(
        ctx: &Rc<X11Context>,
        formats: &CachedFormats,
        font: Option<&TitleFont>,
        spec: &SurfaceSpec,
    ) -> Result<Self> {
        let window = Self::create_window(ctx, spec)?;

        // Destroys the window if initialization fails partway
        struct WindowGuard<'a> {
            ctx: &'a X11Context,
            window: Window,
            should_cleanup: bool,
        }

        impl Drop for WindowGuard<'_> {
            fn drop(&mut self) {
                if self.should_cleanup {
                    if let Err(e) = self.ctx.conn.destroy_window(self.window) {
                        error!(
                            window = self.window,
                            error = %e,
                            "Failed to cleanup window after initialization failure"
                        );
                    }
                    let _ = self.ctx.conn.flush();
                }
            }
        }

        let mut window_guard = WindowGuard {
            ctx,
            window,
            should_cleanup: true,
        };

        Self::setup_window_properties(ctx, window, spec)?;

        let picture = ctx
            .conn
            .generate_id()
            .context("Failed to generate ID for pane picture")?;
        ctx.conn
            .render_create_picture(picture, window, formats.rgb, &CreatePictureAux::new())
            .context(format!("Failed to create pane picture for '{}'", spec.title))?;

        let gc = ctx
            .conn
            .generate_id()
            .context("Failed to generate ID for pane graphics context")?;
        ctx.conn
            .create_gc(
                gc,
                window,
                &CreateGCAux::new()
                    .line_width(countdown::STROKE_WIDTH)
                    .arc_mode(ArcMode::PIE_SLICE)
                    .graphics_exposures(0),
            )
            .context(format!("Failed to create graphics context for '{}'", spec.title))?;

        if spec.visible {
            ctx.conn
                .map_window(window)
                .context(format!("Failed to map pane window for '{}'", spec.title))?;
        }
        ctx.conn
            .flush()
            .context("Failed to flush X11 connection after pane creation")?;
        info!(window = window, title = %spec.title, "Created pane window");

        window_guard.should_cleanup = false;
        Ok(Self {
            ctx: Rc::clone(ctx),
            window,
            picture,
            gc,
            title: Self::create_title(ctx, formats, font, spec),
        })
    }

    pub fn title_stamp(&self) -> Option<TitleStamp> {
        self.title.as_ref().map(TitleImage::stamp)
    }

    pub fn move_to(&self, origin: Position) -> Result<()> {
        self.ctx
            .conn
            .configure_window(self.window, &ConfigureWindowAux::new().x(origin.x).y(origin.y))
            .context(format!("Failed to move pane window {} to ({}, {})", self.window, origin.x, origin.y))?;
        self.ctx
            .conn
            .flush()
            .context("Failed to flush X11 connection after reposition")?;
        Ok(())
    }

    pub fn set_opacity(&self, opacity: Opacity) -> Result<()> {
        self.ctx
            .conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.ctx.atoms.net_wm_window_opacity,
                AtomEnum::CARDINAL,
                &[opacity.to_cardinal()],
            )
            .context(format!("Failed to set opacity of pane window {}", self.window))?;
        self.ctx.conn.flush()?;
        Ok(())
    }

    pub fn set_visible(&self, visible: bool) -> Result<()> {
        if visible {
            self.ctx.conn.map_window(self.window)?;
        } else {
            self.ctx.conn.unmap_window(self.window)?;
        }
        self.ctx.conn.flush()?;
        debug!(window = self.window, visible, "Changed pane visibility");
        Ok(())
    }

    /// Border strips, blended over the black background
    pub fn paint_border(&self, size: Dimensions, width: u32, color: Argb) -> Result<()> {
        let rects = border_rects(size, width);
        if rects.is_empty() {
            return Ok(());
        }
        self.ctx
            .conn
            .render_fill_rectangles(PictOp::SRC, self.picture, color.to_premultiplied_x11_color(), &rects)
            .context(format!("Failed to paint border of pane window {}", self.window))?;
        self.ctx.conn.flush()?;
        Ok(())
    }

    pub fn paint_countdown(&self, anchor: Position, fraction: f64) -> Result<()> {
        let conn = &self.ctx.conn;
        let side = saturate_u16((2 * (countdown::RADIUS + countdown::PADDING)) as u32);
        let diameter = saturate_u16((2 * countdown::RADIUS) as u32);
        let circle = Arc {
            x: saturate_i16(anchor.x + countdown::PADDING),
            y: saturate_i16(anchor.y + countdown::PADDING),
            width: diameter,
            height: diameter,
            angle1: (90 * x11::ARC_UNITS_PER_DEGREE) as i16,
            angle2: (360 * x11::ARC_UNITS_PER_DEGREE) as i16,
        };

        let (r, g, b) = countdown::BACKGROUND_RGB;
        conn.change_gc(self.gc, &ChangeGCAux::new().foreground(pixel(r, g, b)))?;
        conn.poly_fill_rectangle(
            self.window,
            self.gc,
            &[Rectangle {
                x: saturate_i16(anchor.x),
                y: saturate_i16(anchor.y),
                width: side,
                height: side,
            }],
        )
        .context(format!("Failed to paint countdown box on pane window {}", self.window))?;

        conn.change_gc(self.gc, &ChangeGCAux::new().foreground(pixel(0, 0, 0)))?;
        conn.poly_fill_arc(
            self.window,
            self.gc,
            &[Arc {
                angle2: pie_extent(fraction),
                ..circle
            }],
        )
        .context(format!("Failed to paint countdown pie on pane window {}", self.window))?;
        conn.poly_arc(self.window, self.gc, &[circle])
            .context(format!("Failed to paint countdown outline on pane window {}", self.window))?;
        conn.flush()?;
        Ok(())
    }
}

impl Drop for PaneSurface {
    fn drop(&mut self) {
        let conn = &self.ctx.conn;
        if let Err(e) = conn.render_free_picture(self.picture) {
            error!(picture = self.picture, error = %e, "Failed to free pane picture");
        }
        if let Err(e) = conn.free_gc(self.gc) {
            error!(gc = self.gc, error = %e, "Failed to free pane graphics context");
        }
        if let Err(e) = conn.destroy_window(self.window) {
            error!(window = self.window, error = %e, "Failed to destroy pane window");
        }
        let _ = conn.flush();
    }
}
