//! Live thumbnails of source windows
//!
//! A thumbnail tracks its source with a Damage object and scales the
//! source's contents into the destination rectangle of a pane surface. The
//! surface's title label is stamped on top after each redraw.

use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use x11rb::connection::Connection;
use x11rb::protocol::damage::{ConnectionExt as DamageExt, Damage, ReportLevel as DamageReportLevel};
use x11rb::protocol::render::{
    ConnectionExt as RenderExt, CreatePictureAux, PictOp, Picture, Transform,
};
use x11rb::protocol::xproto::*;

use crate::common::types::{saturate_i16, saturate_u16};
use crate::constants::x11;
use crate::daemon::backend::ThumbnailProperties;

use super::title::TitleStamp;
use super::{CachedFormats, X11Context, query, to_fixed};

pub struct Thumbnail {
    ctx: Rc<X11Context>,
    source: Window,
    client_area_only: bool,
    /// Window whose contents are mirrored: the client, or its frame
    capture: Window,
    pub damage: Damage,
    src_picture: Picture,
    mask_picture: Picture,
    mask_pixmap: Pixmap,
    /// Destination picture, owned by the pane surface
    dst_picture: Picture,
    /// Label picture, owned by the pane surface
    title: Option<TitleStamp>,
    properties: Option<ThumbnailProperties>,
}

impl std::fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnail")
            .field("capture", &self.capture)
            .field("damage", &self.damage)
            .finish()
    }
}

impl Thumbnail {
    /// Starts mirroring `source` into `dst_picture`
    pub fn new(
        ctx: &Rc<X11Context>,
        formats: &CachedFormats,
        source: Window,
        dst_picture: Picture,
        title: Option<TitleStamp>,
        client_area_only: bool,
    ) -> Result<Self> {
        let conn = &ctx.conn;
        let capture = if client_area_only {
            source
        } else {
            query::frame_window(conn, ctx.root, source)?.unwrap_or(source)
        };
        let Some((_, _, depth)) = query::drawable_size(conn, capture)? else {
            anyhow::bail!("Source window {} is gone", source);
        };

        let src_picture = conn
            .generate_id()
            .context("Failed to generate ID for source picture")?;
        conn.render_create_picture(
            src_picture,
            capture,
            formats.for_depth(depth),
            &CreatePictureAux::new().subwindowmode(SubwindowMode::INCLUDE_INFERIORS),
        )
        .context(format!("Failed to create source picture for window {}", capture))?;
        conn.render_set_picture_filter(src_picture, x11::SCALE_FILTER, &[])
            .context(format!("Failed to set bilinear filter for window {}", capture))?;

        // 1x1 repeating alpha mask carrying the thumbnail opacity
        let mask_pixmap = conn
            .generate_id()
            .context("Failed to generate ID for opacity mask pixmap")?;
        conn.create_pixmap(x11::ARGB_DEPTH, mask_pixmap, ctx.root, 1, 1)
            .context("Failed to create opacity mask pixmap")?;
        let mask_picture = conn
            .generate_id()
            .context("Failed to generate ID for opacity mask picture")?;
        conn.render_create_picture(
            mask_picture,
            mask_pixmap,
            formats.argb,
            &CreatePictureAux::new().repeat(x11rb::protocol::render::Repeat::NORMAL),
        )
        .context("Failed to create opacity mask picture")?;

        let damage = conn
            .generate_id()
            .context("Failed to generate ID for damage tracking")?;
        conn.damage_create(damage, capture, DamageReportLevel::RAW_RECTANGLES)
            .context(format!(
                "Failed to create damage tracking for window {} (check DAMAGE extension)",
                capture
            ))?;

        info!(source, capture, depth, "Registered thumbnail");
        Ok(Self {
            ctx: Rc::clone(ctx),
            source,
            client_area_only,
            capture,
            damage,
            src_picture,
            mask_picture,
            mask_pixmap,
            dst_picture,
            title,
            properties: None,
        })
    }

    pub fn source(&self) -> Window {
        self.source
    }

    /// Whether the frame was asked for, even if the window has none
    pub fn captures_frame(&self) -> bool {
        !self.client_area_only
    }

    pub fn update(&mut self, properties: &ThumbnailProperties) -> Result<()> {
        let mask = Rectangle {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        };
        self.ctx
            .conn
            .render_fill_rectangles(PictOp::SRC, self.mask_picture, properties.opacity.to_mask_color(), &[mask])
            .context("Failed to fill opacity mask")?;
        self.properties = Some(*properties);
        self.render()
    }

    /// Composite the current source contents, scaled into the destination
    pub fn render(&self) -> Result<()> {
        let Some(properties) = self.properties.filter(|p| p.visible) else {
            return Ok(());
        };
        let dest = properties.destination;
        if dest.width == 0 || dest.height == 0 {
            return Ok(());
        }
        let conn = &self.ctx.conn;

        let Some((width, height, _)) = query::drawable_size(conn, self.capture)? else {
            return Ok(());
        };
        // 1x1 sources are unmapped placeholders; compositing them is unsafe on some drivers
        if width <= 1 || height <= 1 {
            debug!(window = self.capture, width, height, "Skipping capture of empty window");
            return Ok(());
        }

        let transform = Transform {
            matrix11: to_fixed(width as f32 / dest.width as f32),
            matrix22: to_fixed(height as f32 / dest.height as f32),
            matrix33: to_fixed(1.0),
            ..Default::default()
        };
        conn.render_set_picture_transform(self.src_picture, transform)
            .context(format!("Failed to set transform for window {}", self.capture))?;

        let (x, y) = (saturate_i16(dest.x), saturate_i16(dest.y));
        let (w, h) = (saturate_u16(dest.width), saturate_u16(dest.height));
        let black = x11rb::protocol::render::Color {
            red: 0,
            green: 0,
            blue: 0,
            alpha: u16::MAX,
        };
        conn.render_fill_rectangles(
            PictOp::SRC,
            self.dst_picture,
            black,
            &[Rectangle {
                x,
                y,
                width: w,
                height: h,
            }],
        )
        .context("Failed to clear thumbnail area")?;
        conn.render_composite(
            PictOp::OVER,
            self.src_picture,
            self.mask_picture,
            self.dst_picture,
            0,
            0,
            0,
            0,
            x,
            y,
            w,
            h,
        )
        .context(format!("Failed to composite source window {}", self.capture))?;

        if let Some(title) = self.title {
            let (tw, th) = title.clipped(w, h);
            conn.render_composite(PictOp::OVER, title.picture, 0u32, self.dst_picture, 0, 0, 0, 0, x, y, tw, th)
                .context(format!("Failed to stamp title over window {}", self.capture))?;
        }
        Ok(())
    }

    /// Redraw after a damage report and acknowledge it
    pub fn refresh(&self) -> Result<()> {
        self.render()?;
        self.ctx
            .conn
            .damage_subtract(self.damage, 0u32, 0u32)
            .context(format!("Failed to subtract damage region (damage={})", self.damage))?;
        self.ctx
            .conn
            .flush()
            .context("Failed to flush X11 connection after damage update")?;
        Ok(())
    }
}

impl Drop for Thumbnail {
    fn drop(&mut self) {
        let conn = &self.ctx.conn;
        if let Err(e) = conn.damage_destroy(self.damage) {
            error!(damage = self.damage, error = %e, "Failed to destroy damage");
        }
        if let Err(e) = conn.render_free_picture(self.src_picture) {
            error!(picture = self.src_picture, error = %e, "Failed to free source picture");
        }
        if let Err(e) = conn.render_free_picture(self.mask_picture) {
            error!(picture = self.mask_picture, error = %e, "Failed to free mask picture");
        }
        if let Err(e) = conn.free_pixmap(self.mask_pixmap) {
            error!(pixmap = self.mask_pixmap, error = %e, "Failed to free mask pixmap");
        }
        let _ = conn.flush();
    }
}
