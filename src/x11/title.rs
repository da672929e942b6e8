//! Pane title label as a Render picture
//!
//! The label is rasterized once when the pane is created and stamped over the
//! thumbnail after every redraw.

use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::error;
use x11rb::connection::Connection;
use x11rb::protocol::render::{ConnectionExt as RenderExt, CreatePictureAux, Picture};
use x11rb::protocol::xproto::{ConnectionExt as XprotoExt, CreateGCAux, ImageFormat, Pixmap};

use crate::common::types::saturate_u16;
use crate::constants::x11;

use super::font::RenderedText;
use super::{CachedFormats, X11Context};

/// What a thumbnail needs to stamp the label; the picture is owned by [`TitleImage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleStamp {
    pub picture: Picture,
    pub width: u16,
    pub height: u16,
}

impl TitleStamp {
    /// Label extent clipped to the area it is stamped into
    pub fn clipped(&self, width: u16, height: u16) -> (u16, u16) {
        (self.width.min(width), self.height.min(height))
    }
}

pub struct TitleImage {
    ctx: Rc<X11Context>,
    pixmap: Pixmap,
    stamp: TitleStamp,
}

impl std::fmt::Debug for TitleImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitleImage")
            .field("pixmap", &self.pixmap)
            .field("stamp", &self.stamp)
            .finish()
    }
}

impl TitleImage {
    /// Uploads rendered text into an ARGB picture; `None` for empty text
    pub fn upload(ctx: &Rc<X11Context>, formats: &CachedFormats, text: &RenderedText) -> Result<Option<Self>> {
        if text.is_empty() {
            return Ok(None);
        }
        let (width, height) = (saturate_u16(text.width as u32), saturate_u16(text.height as u32));
        let conn = &ctx.conn;

        let pixmap = conn
            .generate_id()
            .context("Failed to generate ID for title pixmap")?;
        conn.create_pixmap(x11::ARGB_DEPTH, pixmap, ctx.root, width, height)
            .context("Failed to create title pixmap")?;

        let picture = match Self::fill(ctx, formats, pixmap, width, height, &text.data) {
            Ok(picture) => picture,
            Err(e) => {
                let _ = conn.free_pixmap(pixmap);
                return Err(e);
            }
        };

        Ok(Some(Self {
            ctx: Rc::clone(ctx),
            pixmap,
            stamp: TitleStamp {
                picture,
                width,
                height,
            },
        }))
    }

    fn fill(
        ctx: &X11Context,
        formats: &CachedFormats,
        pixmap: Pixmap,
        width: u16,
        height: u16,
        data: &[u8],
    ) -> Result<Picture> {
        let conn = &ctx.conn;
        let gc = conn
            .generate_id()
            .context("Failed to generate ID for title graphics context")?;
        conn.create_gc(gc, pixmap, &CreateGCAux::new())
            .context("Failed to create title graphics context")?;
        let uploaded = conn
            .put_image(ImageFormat::Z_PIXMAP, pixmap, gc, width, height, 0, 0, 0, x11::ARGB_DEPTH, data)
            .context("Failed to upload title image");
        let _ = conn.free_gc(gc);
        uploaded?;

        let picture = conn
            .generate_id()
            .context("Failed to generate ID for title picture")?;
        conn.render_create_picture(picture, pixmap, formats.argb, &CreatePictureAux::new())
            .context("Failed to create title picture")?;
        Ok(picture)
    }

    pub fn stamp(&self) -> TitleStamp {
        self.stamp
    }
}

impl Drop for TitleImage {
    fn drop(&mut self) {
        let conn = &self.ctx.conn;
        if let Err(e) = conn.render_free_picture(self.stamp.picture) {
            error!(picture = self.stamp.picture, error = %e, "Failed to free title picture");
        }
        if let Err(e) = conn.free_pixmap(self.pixmap) {
            error!(pixmap = self.pixmap, error = %e, "Failed to free title pixmap");
        }
    }
}
